//! Supported archive formats.

pub mod afs;
pub mod pak16;

pub use afs::{Afs, AfsEntry};
pub use pak16::{Pak16, Pak16Entry};

use crate::error::Result;
use crate::format::ArchiveFormat;
use crate::rebuild::{rebuild, EmulatedArchive, RebuildOptions};
use crate::replacements::ReplacementSet;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};

/// Runtime selector over the formats in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatKind {
    Afs,
    Pak16,
}

impl FormatKind {
    /// Every supported format, in detection order.
    pub const ALL: [FormatKind; 2] = [FormatKind::Afs, FormatKind::Pak16];

    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Afs => Afs::NAME,
            FormatKind::Pak16 => Pak16::NAME,
        }
    }

    pub fn max_slot_index(self) -> u32 {
        match self {
            FormatKind::Afs => Afs::MAX_SLOT_INDEX,
            FormatKind::Pak16 => Pak16::MAX_SLOT_INDEX,
        }
    }

    pub fn default_alignment(self) -> u64 {
        match self {
            FormatKind::Afs => Afs::DEFAULT_ALIGNMENT,
            FormatKind::Pak16 => Pak16::DEFAULT_ALIGNMENT,
        }
    }

    /// Guess the format from an archive file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "afs" => Some(FormatKind::Afs),
            "pk16" => Some(FormatKind::Pak16),
            _ => None,
        }
    }

    /// An empty replacement set bounded by this format's slot range.
    pub fn replacement_set(self) -> ReplacementSet {
        ReplacementSet::new(self.max_slot_index())
    }

    /// Check the signature of `reader` without moving it.
    pub fn is_format<R: Read + Seek>(self, reader: &mut R) -> Result<bool> {
        match self {
            FormatKind::Afs => Afs::is_format(reader),
            FormatKind::Pak16 => Pak16::is_format(reader),
        }
    }

    /// First format in [`FormatKind::ALL`] whose signature matches, if any.
    pub fn detect<R: Read + Seek>(reader: &mut R) -> Result<Option<Self>> {
        for kind in Self::ALL {
            if kind.is_format(reader)? {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    pub fn rebuild<R: Read + Seek>(
        self,
        reader: &mut R,
        original_path: &Utf8Path,
        replacements: &ReplacementSet,
        options: RebuildOptions,
    ) -> Result<EmulatedArchive> {
        match self {
            FormatKind::Afs => rebuild::<Afs, R>(reader, original_path, replacements, options),
            FormatKind::Pak16 => rebuild::<Pak16, R>(reader, original_path, replacements, options),
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
