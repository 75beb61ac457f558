//! Format-agnostic archive rebuild.
//!
//! # Algorithm
//!
//! 1. Read the original directory through a position-preserving probe. A table
//!    that cannot be read completely fails the whole rebuild.
//! 2. `slot_count = max(highest replacement slot + 1, original entry count)`, so
//!    replacements may extend the archive.
//! 3. Reserve a zero-filled header for `slot_count` entries plus one reserved null
//!    entry, padded to the alignment.
//! 4. Walk the slots in order with a running offset that starts after the header:
//!    - **Replaced**: bind the replacement, then zero padding up to the alignment.
//!    - **Original**: bind the original entry's padded region as a mergeable file
//!      region. The original is assumed to pad its entries already; if it does not,
//!      the padding swallows the start of the next original entry.
//!    - **Neither**: write a zero/zero entry and bind nothing.
//! 5. Merge the mergeable bindings, place the header at offset 0 and build the
//!    [`CompositeStream`].

use crate::error::{Error, Result};
use crate::format::{ArchiveFormat, TableEntry};
use crate::replacements::ReplacementSet;
use camino::{Utf8Path, Utf8PathBuf};
use ltk_vstream::{
    merge_bindings, round_up, BackingFile, ByteSource, CompositeReader, CompositeStream,
    SourceOffsetBinding,
};
use std::io::{self, Read, Seek};
use std::sync::Arc;

/// Knobs for a single rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Boundary every contained file is padded to.
    pub alignment: u64,
    /// Coalesce untouched original regions before building the stream.
    pub merge_regions: bool,
}

impl RebuildOptions {
    /// Defaults for `F`: its native alignment, merging enabled.
    pub fn for_format<F: ArchiveFormat>() -> Self {
        Self {
            alignment: F::DEFAULT_ALIGNMENT,
            merge_regions: true,
        }
    }
}

/// Statistics from one rebuild.
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    /// Slots in the rebuilt directory.
    pub slot_count: usize,
    /// Entries in the original directory.
    pub original_entries: usize,
    /// Slots served from replacement content.
    pub replacements_applied: usize,
    /// Slots with neither replacement nor original content.
    pub gap_slots: usize,
    /// Bindings before the merge pass (header excluded).
    pub bindings_before_merge: usize,
    /// Bindings after the merge pass (header excluded).
    pub bindings_after_merge: usize,
    /// Size of the rebuilt header.
    pub header_len: u64,
    /// Size of the rebuilt archive.
    pub total_len: u64,
    /// Time taken to compute the layout.
    pub elapsed_ms: u128,
}

/// A rebuilt archive, ready to be served.
#[derive(Debug)]
pub struct EmulatedArchive {
    format: &'static str,
    source_path: Utf8PathBuf,
    header: Arc<[u8]>,
    entries: Vec<TableEntry>,
    stream: Arc<CompositeStream>,
    stats: RebuildStats,
}

impl EmulatedArchive {
    /// Name of the format this archive was rebuilt as.
    pub fn format(&self) -> &'static str {
        self.format
    }

    /// Path of the original archive.
    pub fn source_path(&self) -> &Utf8Path {
        &self.source_path
    }

    /// The rebuilt header, also served as the first bytes of the stream.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The rebuilt directory, one entry per slot.
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn entry(&self, slot: usize) -> Option<TableEntry> {
        self.entries.get(slot).copied()
    }

    pub fn stream(&self) -> &Arc<CompositeStream> {
        &self.stream
    }

    pub fn stats(&self) -> &RebuildStats {
        &self.stats
    }

    /// Length of the rebuilt archive.
    pub fn len(&self) -> u64 {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// See [`CompositeStream::read_at`].
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read_at(offset, buf)
    }

    /// A fresh `Read + Seek` cursor at offset 0.
    pub fn reader(&self) -> CompositeReader {
        CompositeReader::new(self.stream.clone())
    }
}

/// Rebuild the archive behind `original` with `replacements` applied.
///
/// `original` is only read through a probe and is left where it was found.
/// Untouched entries are served from `original_path`, which the returned stream
/// opens on first read.
pub fn rebuild<F, R>(
    original: &mut R,
    original_path: &Utf8Path,
    replacements: &ReplacementSet,
    options: RebuildOptions,
) -> Result<EmulatedArchive>
where
    F: ArchiveFormat,
    R: Read + Seek,
{
    let start = std::time::Instant::now();

    if options.alignment == 0 {
        return Err(Error::InvalidConfig(format!(
            "{} alignment must be non-zero",
            F::NAME
        )));
    }
    if let Some(slot) = replacements.highest_slot() {
        if slot > F::MAX_SLOT_INDEX {
            return Err(Error::SlotOutOfRange {
                slot: slot.into(),
                max: F::MAX_SLOT_INDEX,
            });
        }
    }

    let (original_entries, file_len) = F::read_table(original)?;

    let slot_count = replacements
        .highest_slot()
        .map(|slot| slot as usize + 1)
        .unwrap_or(0)
        .max(original_entries.len());
    let alignment = options.alignment;
    let header_len = F::header_len(slot_count as u64, alignment);
    if header_len > F::MAX_FIELD_VALUE {
        return Err(Error::OffsetOverflow {
            format: F::NAME,
            value: header_len,
        });
    }

    let origin = BackingFile::new(original_path);
    let mut entries = Vec::new();
    reserve(&mut entries, slot_count)?;
    entries.resize(slot_count, TableEntry::default());
    let mut bindings = Vec::new();
    reserve(&mut bindings, slot_count + replacements.len())?;
    let mut running_offset = header_len;
    let mut replacements_applied = 0usize;
    let mut gap_slots = 0usize;

    for (slot, entry) in entries.iter_mut().enumerate() {
        let padded_len = if let Some(content) = replacements.get(slot as u32) {
            let source = content.to_source()?;
            let actual_len = source.len();
            let padded_len = round_up(actual_len, alignment);

            bindings.push(SourceOffsetBinding::new(source, running_offset));
            push_padding(&mut bindings, running_offset + actual_len, padded_len - actual_len)?;

            *entry = TableEntry::new(running_offset, actual_len);
            replacements_applied += 1;
            padded_len
        } else if let Some(original_entry) = original_entries.get(slot) {
            let padded_len = round_up(original_entry.length, alignment);
            // The last entry may stop at end of file without its padding.
            let region_len = padded_len.min(file_len - original_entry.offset);

            bindings.push(SourceOffsetBinding::mergeable(
                ByteSource::file_region(origin.clone(), original_entry.offset, region_len),
                running_offset,
            ));
            push_padding(&mut bindings, running_offset + region_len, padded_len - region_len)?;

            *entry = TableEntry::new(running_offset, original_entry.length);
            padded_len
        } else {
            gap_slots += 1;
            0
        };

        running_offset += padded_len;
    }

    let bindings_before_merge = bindings.len();
    let bindings = if options.merge_regions {
        let (mergeable, mut fixed): (Vec<_>, Vec<_>) =
            bindings.into_iter().partition(|b| b.is_mergeable());
        let mut merged = merge_bindings(mergeable);
        merged.append(&mut fixed);
        merged
    } else {
        bindings
    };
    let bindings_after_merge = bindings.len();

    let header_size = usize::try_from(header_len).map_err(|_| Error::OffsetOverflow {
        format: F::NAME,
        value: header_len,
    })?;
    let mut header = Vec::new();
    reserve(&mut header, header_size)?;
    header.resize(header_size, 0u8);
    F::encode_header(&entries, &mut header)?;
    let header: Arc<[u8]> = header.into();

    let stream = CompositeStream::with_header(header.clone(), bindings)?;
    let stats = RebuildStats {
        slot_count,
        original_entries: original_entries.len(),
        replacements_applied,
        gap_slots,
        bindings_before_merge,
        bindings_after_merge,
        header_len,
        total_len: stream.len(),
        elapsed_ms: start.elapsed().as_millis(),
    };

    tracing::info!(
        "Rebuilt {} archive src={} slots={} replaced={} gaps={} bindings={}->{} len={} elapsed_ms={}",
        F::NAME,
        original_path,
        stats.slot_count,
        stats.replacements_applied,
        stats.gap_slots,
        stats.bindings_before_merge,
        stats.bindings_after_merge,
        stats.total_len,
        stats.elapsed_ms
    );

    Ok(EmulatedArchive {
        format: F::NAME,
        source_path: original_path.to_path_buf(),
        header,
        entries,
        stream: Arc::new(stream),
        stats,
    })
}

/// Reserve up front so an oversized layout is an error instead of an abort.
fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<()> {
    vec.try_reserve_exact(additional).map_err(|e| {
        Error::Other(format!(
            "cannot allocate {additional} {}: {e}",
            std::any::type_name::<T>()
        ))
    })
}

fn push_padding(bindings: &mut Vec<SourceOffsetBinding>, at: u64, len: u64) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let len = usize::try_from(len).map_err(|_| Error::Other(format!("padding of {len} bytes")))?;
    bindings.push(SourceOffsetBinding::new(ByteSource::zeroes(len), at));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Afs, Pak16};
    use crate::replacements::ReplacementContent;
    use std::io::Cursor;

    fn pak16_fixture() -> Vec<u8> {
        // Three entries padded to 16: 5 bytes @48, 20 bytes @64, 3 bytes @96.
        let mut bytes = vec![0u8; 112];
        bytes[..4].copy_from_slice(b"PK16");
        bytes[4..6].copy_from_slice(&3u16.to_be_bytes());
        for (i, (offset, length)) in [(48u32, 5u32), (64, 20), (96, 3)].iter().enumerate() {
            let at = 8 + i * 8;
            bytes[at..at + 4].copy_from_slice(&offset.to_be_bytes());
            bytes[at + 4..at + 8].copy_from_slice(&length.to_be_bytes());
        }
        bytes[48..53].copy_from_slice(b"alpha");
        bytes[64..84].copy_from_slice(b"bravo-bravo-bravo-br");
        bytes[96..99].copy_from_slice(b"cat");
        bytes
    }

    #[test]
    fn test_rejects_zero_alignment() {
        let mut cursor = Cursor::new(pak16_fixture());
        let options = RebuildOptions {
            alignment: 0,
            merge_regions: true,
        };
        let err = rebuild::<Pak16, _>(
            &mut cursor,
            Utf8Path::new("unused.pk16"),
            &ReplacementSet::for_format::<Pak16>(),
            options,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_set_built_for_wider_format() {
        let mut set = ReplacementSet::for_format::<Afs>();
        set.insert(70_000, ReplacementContent::bytes(b"x".to_vec())).unwrap();

        let mut cursor = Cursor::new(pak16_fixture());
        let err = rebuild::<Pak16, _>(
            &mut cursor,
            Utf8Path::new("unused.pk16"),
            &set,
            RebuildOptions::for_format::<Pak16>(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SlotOutOfRange { slot: 70_000, .. }));
    }

    #[test]
    fn test_oversized_header_is_rejected_before_allocating() {
        let mut cursor = Cursor::new(b"AFS\0\0\0\0\0".to_vec());
        let mut set = ReplacementSet::for_format::<Afs>();
        set.insert(
            Afs::MAX_SLOT_INDEX.into(),
            ReplacementContent::bytes(b"x".to_vec()),
        )
        .unwrap();

        // The directory fits a u32 unpadded, but not once padded to 2048.
        let err = rebuild::<Afs, _>(
            &mut cursor,
            Utf8Path::new("unused.afs"),
            &set,
            RebuildOptions::for_format::<Afs>(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetOverflow {
                format: "AFS",
                value: 4_294_967_296
            }
        ));
    }

    #[test]
    fn test_afs_rejects_slots_its_offsets_cannot_reach() {
        let mut set = ReplacementSet::for_format::<Afs>();
        let err = set
            .insert(700_000_000, ReplacementContent::bytes(b"x".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::SlotOutOfRange { slot: 700_000_000, .. }));
        assert!(set.is_empty());

        // A set bounded more loosely is still caught before the layout is built.
        let mut wide = ReplacementSet::new(u32::MAX - 1);
        wide.insert(700_000_000, ReplacementContent::bytes(b"x".to_vec()))
            .unwrap();
        let mut cursor = Cursor::new(b"AFS\0\0\0\0\0".to_vec());
        let err = rebuild::<Afs, _>(
            &mut cursor,
            Utf8Path::new("unused.afs"),
            &wide,
            RebuildOptions::for_format::<Afs>(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SlotOutOfRange { slot: 700_000_000, .. }));
    }

    #[test]
    fn test_layout_without_touching_backing_file() {
        // Layout is computed from the table alone; the original is not opened until
        // the stream is read.
        let mut cursor = Cursor::new(pak16_fixture());
        cursor.set_position(17);
        let mut set = ReplacementSet::for_format::<Pak16>();
        set.insert(1, ReplacementContent::bytes(b"delta".to_vec())).unwrap();

        let archive = rebuild::<Pak16, _>(
            &mut cursor,
            Utf8Path::new("does/not/exist.pk16"),
            &set,
            RebuildOptions::for_format::<Pak16>(),
        )
        .unwrap();

        assert_eq!(cursor.position(), 17);
        assert_eq!(archive.format(), "PK16");
        assert_eq!(archive.stats().header_len, 48);
        assert_eq!(
            archive.entries(),
            &[
                TableEntry::new(48, 5),
                TableEntry::new(64, 5),
                TableEntry::new(80, 3),
            ]
        );
        assert_eq!(archive.len(), 96);
        assert_eq!(&archive.header()[..4], b"PK16");

        // Reading the untouched region surfaces the missing original file.
        let mut buf = [0u8; 4];
        let err = archive.read_at(48, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        // The header and replacement are still served from memory.
        assert_eq!(archive.read_at(64, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"delt");
    }
}
