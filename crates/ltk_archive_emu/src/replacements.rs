//! Registration of replacement content by slot.

use crate::error::{Error, Result};
use crate::format::ArchiveFormat;
use crate::utils::{file_stamp, resolve_slot};
use camino::{Utf8Path, Utf8PathBuf};
use ltk_vstream::ByteSource;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Content that takes over one slot of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementContent {
    /// A file on disk, sized when the archive is rebuilt and read on demand.
    File(Utf8PathBuf),
    /// Bytes held in memory.
    Bytes(Arc<[u8]>),
}

impl ReplacementContent {
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        ReplacementContent::Bytes(bytes.into())
    }

    /// Resolve into a byte source for the rebuilt stream.
    pub fn to_source(&self) -> io::Result<ByteSource> {
        match self {
            ReplacementContent::File(path) => ByteSource::owned_file(path.clone()),
            ReplacementContent::Bytes(bytes) => Ok(ByteSource::Inline(bytes.clone())),
        }
    }

    /// Hash identifying this content for cache invalidation.
    ///
    /// Files are identified by path, size and modification time so that editing a
    /// replacement on disk invalidates cached builds without rereading it.
    pub fn identity_hash(&self) -> u64 {
        match self {
            ReplacementContent::File(path) => {
                let mut input = path.as_str().as_bytes().to_vec();
                input.extend_from_slice(&file_stamp(path));
                xxh3_64(&input)
            }
            ReplacementContent::Bytes(bytes) => xxh3_64(bytes),
        }
    }
}

/// Replacement content keyed by slot, bounded by the target format's addressable
/// range.
///
/// Registering a slot twice keeps the later content (last-writer-wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSet {
    max_slot: u32,
    slots: BTreeMap<u32, ReplacementContent>,
}

impl ReplacementSet {
    /// Create an empty set accepting slots `0..=max_slot`.
    pub fn new(max_slot: u32) -> Self {
        Self {
            max_slot,
            slots: BTreeMap::new(),
        }
    }

    /// Create an empty set bounded by `F`'s largest slot index.
    pub fn for_format<F: ArchiveFormat>() -> Self {
        Self::new(F::MAX_SLOT_INDEX)
    }

    pub fn max_slot(&self) -> u32 {
        self.max_slot
    }

    /// Register `content` for `slot`.
    ///
    /// Slots past [`max_slot`](Self::max_slot) are rejected with
    /// [`Error::SlotOutOfRange`] and leave the set untouched. Returns the content
    /// previously registered for the slot, if any.
    pub fn insert(
        &mut self,
        slot: u64,
        content: ReplacementContent,
    ) -> Result<Option<ReplacementContent>> {
        let slot = u32::try_from(slot)
            .ok()
            .filter(|&slot| slot <= self.max_slot)
            .ok_or(Error::SlotOutOfRange {
                slot,
                max: self.max_slot,
            })?;
        Ok(self.slots.insert(slot, content))
    }

    /// Register a replacement file, deriving its slot from the file name.
    ///
    /// See [`resolve_slot`] for the accepted naming scheme.
    pub fn insert_path(&mut self, path: &Utf8Path) -> Result<u32> {
        let slot = path
            .file_name()
            .and_then(resolve_slot)
            .ok_or_else(|| Error::InvalidReplacementName(path.to_path_buf()))?;
        self.insert(slot, ReplacementContent::File(path.to_path_buf()))?;
        // `insert` accepted it, so it fits.
        Ok(slot as u32)
    }

    pub fn get(&self, slot: u32) -> Option<&ReplacementContent> {
        self.slots.get(&slot)
    }

    pub fn remove(&mut self, slot: u32) -> Option<ReplacementContent> {
        self.slots.remove(&slot)
    }

    /// Highest registered slot.
    pub fn highest_slot(&self) -> Option<u32> {
        self.slots.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registered slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ReplacementContent)> {
        self.slots.iter().map(|(&slot, content)| (slot, content))
    }

    /// Deterministic fingerprint of the whole set. Returns `0` when empty.
    pub fn fingerprint(&self) -> u64 {
        if self.slots.is_empty() {
            return 0;
        }

        let mut buf = Vec::with_capacity(self.slots.len() * 12);
        for (slot, content) in &self.slots {
            buf.extend_from_slice(&slot.to_le_bytes());
            buf.extend_from_slice(&content.identity_hash().to_le_bytes());
        }
        xxh3_64(&buf)
    }
}
