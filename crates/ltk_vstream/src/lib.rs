//! Virtual composite streams for serving rebuilt files without writing them.
//!
//! A [`CompositeStream`] is a logical file described as an ordered list of
//! [`SourceOffsetBinding`]s, each placing a [`ByteSource`] at a destination range:
//!
//! - **File regions**: windows into an existing file, read on demand
//! - **Inline buffers**: headers, padding and small injected content
//! - **Owned files**: whole replacement files, opened on first read
//!
//! Random-access reads are answered directly from the backing stores. Before a
//! stream is built, [`merge_bindings`] coalesces runs of untouched original data
//! so that serving them costs one read instead of many.
//!
//! Reads through handles owned by another party go through [`probe`] /
//! [`PositionGuard`], which put the cursor back on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use ltk_vstream::{BackingFile, ByteSource, CompositeStream, SourceOffsetBinding, merge_bindings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let original = BackingFile::new("sound.afs");
//! let bindings = merge_bindings(vec![
//!     SourceOffsetBinding::mergeable(ByteSource::file_region(original.clone(), 2048, 2048), 2048),
//!     SourceOffsetBinding::mergeable(ByteSource::file_region(original, 4096, 2048), 4096),
//! ]);
//! let stream = CompositeStream::with_header(vec![0u8; 2048], bindings)?;
//!
//! let mut buf = [0u8; 512];
//! let read = stream.read_at(3000, &mut buf)?;
//! println!("read {} of {} bytes", read, stream.len());
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod error;
pub mod merge;
pub mod probe;
pub mod range;
pub mod reader;
pub mod source;
pub mod stream;

pub use binding::SourceOffsetBinding;
pub use error::{Error, Result};
pub use merge::merge_bindings;
pub use probe::{probe, PositionGuard};
pub use range::{round_up, OffsetRange};
pub use reader::CompositeReader;
pub use source::{BackingFile, ByteSource};
pub use stream::CompositeStream;
