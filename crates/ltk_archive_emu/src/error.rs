//! Error types for archive emulation.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, `serde_json::Error`,
//! `binrw::Error`, stream layout errors) are converted via `From` impls.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering replacements or rebuilding an archive.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (reading the original table, sizing replacement files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The rebuilt layout could not be turned into a composite stream.
    #[error("Stream error: {0}")]
    Stream(#[from] ltk_vstream::Error),

    /// Encoding or decoding a directory entry failed.
    #[error("Binary codec error: {0}")]
    Binrw(#[from] binrw::Error),

    /// Failed to parse or serialize the emulator configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A replacement targets a slot the format cannot address.
    #[error("Slot index {slot} out of range (maximum {max})")]
    SlotOutOfRange { slot: u64, max: u32 },

    /// The file does not start with the format's signature.
    #[error("Not a {format} archive: signature mismatch")]
    InvalidMagic { format: &'static str },

    /// The directory table runs past the end of the file.
    #[error("Truncated {format} table: need {expected} bytes, file has {available}")]
    TruncatedTable {
        format: &'static str,
        expected: u64,
        available: u64,
    },

    /// A directory entry points outside the original file.
    #[error("Corrupt {format} entry {slot}: {offset}+{length} exceeds file length {file_len}")]
    CorruptEntry {
        format: &'static str,
        slot: usize,
        offset: u64,
        length: u64,
        file_len: u64,
    },

    /// The rebuilt archive needs an offset or length the format cannot store.
    #[error("{format} directory field cannot hold {value}")]
    OffsetOverflow { format: &'static str, value: u64 },

    /// A replacement file name does not encode a slot index.
    #[error("Cannot derive a slot index from file name: {0}")]
    InvalidReplacementName(Utf8PathBuf),

    /// The configuration holds a value the emulator cannot use.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for errors from replacement providers and other sources.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
