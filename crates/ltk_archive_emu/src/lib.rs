//! Archive emulation: serve game archives with replaced entries, without ever
//! writing the modified archive to disk.
//!
//! For each supported container the emulator rebuilds the directory in memory and
//! describes the rest of the file as a [`ltk_vstream::CompositeStream`] that reads
//! untouched entries straight from the original and replaced entries from the
//! replacement files. It supports:
//!
//! - **Multiple formats**: AFS and PK16 through the [`ArchiveFormat`] trait
//! - **Appending**: replacements past the last slot extend the archive
//! - **Caching**: rebuilt archives are reused until their inputs change
//! - **Caller-safe probing**: the caller's handle keeps its position
//!
//! # Example
//!
//! ```no_run
//! use ltk_archive_emu::{ArchiveEmulator, EmulatorConfig, FsReplacementDir};
//! use camino::Utf8Path;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmulatorConfig::load(Utf8Path::new("emulator.json"))?.unwrap_or_default();
//! let mut emulator = ArchiveEmulator::new(config)?
//!     .with_provider(FsReplacementDir::new("replacements"));
//! emulator.refresh()?;
//!
//! let path = Utf8Path::new("data/voice.afs");
//! let mut handle = File::open(path)?;
//! if let Some(archive) = emulator.try_emulate(&mut handle, path)? {
//!     let mut buf = vec![0u8; 4096];
//!     let read = archive.read_at(0, &mut buf)?;
//!     println!("{} bytes of {}", read, archive.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod emulator;
pub mod error;
pub mod format;
pub mod formats;
pub mod provider;
pub mod rebuild;
pub mod replacements;
pub mod utils;

pub use cache::EmulatorCache;
pub use config::EmulatorConfig;
pub use emulator::ArchiveEmulator;
pub use error::{Error, Result};
pub use format::{ArchiveFormat, TableEntry};
pub use formats::{Afs, FormatKind, Pak16};
pub use provider::{FsReplacementDir, ReplacementProvider};
pub use rebuild::{rebuild, EmulatedArchive, RebuildOptions, RebuildStats};
pub use replacements::{ReplacementContent, ReplacementSet};
