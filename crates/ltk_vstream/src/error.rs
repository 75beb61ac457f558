//! Error types for composite stream construction.
//!
//! Serve-time reads return plain [`std::io::Result`] so that backing file failures
//! reach the caller unchanged. [`Error`] covers everything that can go wrong while
//! a stream is being assembled.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a composite stream.
#[derive(Error, Debug)]
pub enum Error {
    /// A backing file could not be inspected or opened.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bindings handed to [`CompositeStream::new`](crate::CompositeStream::new)
    /// leave a gap or overlap. This is a bug in whoever computed the layout.
    #[error("Invalid stream layout: expected a binding at {expected_start}, found one at {found_start}")]
    InvalidLayout { expected_start: u64, found_start: u64 },

    /// The total stream length does not fit in a `u64`.
    #[error("Stream length overflows u64")]
    LengthOverflow,
}
