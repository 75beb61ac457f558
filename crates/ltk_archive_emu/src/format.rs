//! Format capability trait shared by every archive emulator.
//!
//! The rebuild algorithm in [`crate::rebuild`] is written once against
//! [`ArchiveFormat`]. A format only describes its header layout: the signature, the
//! size of the fixed prefix and of one directory entry, the largest slot and offset
//! it can address, and how to decode and encode the directory itself.

use crate::error::{Error, Result};
use ltk_vstream::{probe, round_up};
use std::io::{self, Read, Seek, SeekFrom};

/// One directory entry: where a contained file lives and how long it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableEntry {
    pub offset: u64,
    pub length: u64,
}

impl TableEntry {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// A slot with no content.
    pub fn is_null(&self) -> bool {
        self.offset == 0 && self.length == 0
    }
}

/// Header layout of an archive format with a positional directory table.
pub trait ArchiveFormat {
    /// Display name, used in errors and logs.
    const NAME: &'static str;
    /// Signature at offset 0.
    const MAGIC: &'static [u8];
    /// Bytes before the first directory entry (signature and count fields).
    const PREFIX_SIZE: u64;
    /// Bytes per directory entry.
    const ENTRY_SIZE: u64;
    /// Largest slot index a replacement may target.
    const MAX_SLOT_INDEX: u32;
    /// Largest offset or length a directory entry can store.
    const MAX_FIELD_VALUE: u64;
    /// Alignment the format pads contained files to.
    const DEFAULT_ALIGNMENT: u64;

    /// Decode the directory from a reader positioned at the start of the file.
    ///
    /// `file_len` is the length of the whole file, so a table that claims more
    /// entries than the file can hold is reported as truncated before any entry is
    /// read.
    fn decode_table<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<Vec<TableEntry>>;

    /// Write the signature, count fields and directory into a zero-filled header.
    ///
    /// `header` is at least [`header_len`](Self::header_len) bytes; the reserved entry
    /// after the table is left zeroed.
    fn encode_header(entries: &[TableEntry], header: &mut [u8]) -> Result<()>;

    /// Header size for `slot_count` entries plus the reserved null entry, padded to
    /// `alignment`.
    fn header_len(slot_count: u64, alignment: u64) -> u64 {
        round_up(
            Self::PREFIX_SIZE + (slot_count + 1) * Self::ENTRY_SIZE,
            alignment,
        )
    }

    /// Check the signature without moving the reader's cursor.
    fn is_format<R: Read + Seek>(reader: &mut R) -> Result<bool> {
        probe(reader, |r| -> Result<bool> {
            r.seek(SeekFrom::Start(0))?;
            let mut magic = vec![0u8; Self::MAGIC.len()];
            match r.read_exact(&mut magic) {
                Ok(()) => Ok(magic == Self::MAGIC),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
                Err(e) => Err(Error::Io(e)),
            }
        })
    }

    /// Read the directory without moving the reader's cursor.
    ///
    /// Returns the entries and the total file length. Every entry must lie inside
    /// the file.
    fn read_table<R: Read + Seek>(reader: &mut R) -> Result<(Vec<TableEntry>, u64)> {
        probe(reader, |r| -> Result<(Vec<TableEntry>, u64)> {
            let file_len = r.seek(SeekFrom::End(0))?;
            r.seek(SeekFrom::Start(0))?;
            let entries = Self::decode_table(r, file_len)?;

            for (slot, entry) in entries.iter().enumerate() {
                let in_bounds = entry
                    .offset
                    .checked_add(entry.length)
                    .is_some_and(|end| end <= file_len);
                if !in_bounds {
                    return Err(Error::CorruptEntry {
                        format: Self::NAME,
                        slot,
                        offset: entry.offset,
                        length: entry.length,
                        file_len,
                    });
                }
            }

            Ok((entries, file_len))
        })
    }
}

/// Compare the signature read from `reader` against `F::MAGIC`.
pub(crate) fn expect_magic<F: ArchiveFormat, R: Read>(reader: &mut R) -> Result<()> {
    let mut magic = vec![0u8; F::MAGIC.len()];
    reader.read_exact(&mut magic)?;
    if magic != F::MAGIC {
        return Err(Error::InvalidMagic { format: F::NAME });
    }
    Ok(())
}

/// Fail unless `count` directory entries fit in a file of `file_len` bytes.
pub(crate) fn ensure_table_fits<F: ArchiveFormat>(count: u64, file_len: u64) -> Result<()> {
    let expected = F::PREFIX_SIZE + count * F::ENTRY_SIZE;
    if expected > file_len {
        return Err(Error::TruncatedTable {
            format: F::NAME,
            expected,
            available: file_len,
        });
    }
    Ok(())
}

/// Narrow a directory value to the format's field width.
pub(crate) fn narrow<F: ArchiveFormat, T: TryFrom<u64>>(value: u64) -> Result<T> {
    if value > F::MAX_FIELD_VALUE {
        return Err(Error::OffsetOverflow {
            format: F::NAME,
            value,
        });
    }
    T::try_from(value).map_err(|_| Error::OffsetOverflow {
        format: F::NAME,
        value,
    })
}
