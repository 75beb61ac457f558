//! Backing stores for composite stream bindings.
//!
//! A [`ByteSource`] never copies file data when it is created. File-backed
//! variants share a [`BackingFile`], which opens its handle on first read and
//! closes it when the last source referencing it is dropped.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A file on disk that is opened lazily and read through a single serialized handle.
///
/// Reads from several threads are safe; they take turns on the handle because a
/// seek followed by a read is not atomic.
#[derive(Debug)]
pub struct BackingFile {
    path: Utf8PathBuf,
    handle: Mutex<Option<File>>,
}

impl BackingFile {
    /// Reference a file by path. Nothing is opened until the first read.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            handle: Mutex::new(None),
        })
    }

    /// Reference a file through a handle the caller has already opened.
    ///
    /// The handle is owned from here on; pass a `try_clone` if the caller keeps using
    /// its own cursor.
    pub fn with_handle(path: impl Into<Utf8PathBuf>, file: File) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            handle: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Whether a handle is currently held.
    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Drop the handle. The next read reopens the file.
    pub fn release(&self) {
        self.handle.lock().take();
    }

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Running into end-of-file is an [`io::ErrorKind::UnexpectedEof`] error.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut guard = self.handle.lock();
        let file = match guard.take() {
            Some(file) => file,
            None => {
                tracing::trace!("Opening backing file {}", self.path);
                File::open(self.path.as_std_path())?
            }
        };
        let file = guard.insert(file);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }

    /// Two backing files are the same origin if they share an allocation or a path.
    pub fn same_origin(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b) || a.path == b.path
    }
}

/// Where the bytes of one binding come from.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// A window into a file, read on demand.
    FileRegion {
        origin: Arc<BackingFile>,
        offset: u64,
        length: u64,
    },
    /// Bytes already in memory (headers, padding, small injected content).
    Inline(Arc<[u8]>),
    /// A whole replacement file.
    OwnedFile { file: Arc<BackingFile>, length: u64 },
}

impl ByteSource {
    pub fn file_region(origin: Arc<BackingFile>, offset: u64, length: u64) -> Self {
        ByteSource::FileRegion {
            origin,
            offset,
            length,
        }
    }

    pub fn inline(bytes: impl Into<Arc<[u8]>>) -> Self {
        ByteSource::Inline(bytes.into())
    }

    /// `length` zero bytes.
    pub fn zeroes(length: usize) -> Self {
        ByteSource::Inline(vec![0u8; length].into())
    }

    /// A whole file, sized now and opened on first read.
    pub fn owned_file(path: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let length = std::fs::metadata(path.as_std_path())?.len();
        Ok(ByteSource::OwnedFile {
            file: BackingFile::new(path),
            length,
        })
    }

    pub fn len(&self) -> u64 {
        match self {
            ByteSource::FileRegion { length, .. } => *length,
            ByteSource::Inline(bytes) => bytes.len() as u64,
            ByteSource::OwnedFile { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes starting `offset` bytes into this source.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "read of {} bytes at {} exceeds source length {}",
                        buf.len(),
                        offset,
                        self.len()
                    ),
                )
            })?;

        match self {
            ByteSource::FileRegion {
                origin,
                offset: base,
                ..
            } => origin.read_exact_at(base + offset, buf),
            ByteSource::Inline(bytes) => {
                buf.copy_from_slice(&bytes[offset as usize..end as usize]);
                Ok(())
            }
            ByteSource::OwnedFile { file, .. } => file.read_exact_at(offset, buf),
        }
    }

    /// Grow a file region by `next` if `next` continues it in the same file.
    ///
    /// Only [`ByteSource::FileRegion`] sources ever combine.
    pub fn extend_with(&mut self, next: &ByteSource) -> bool {
        match (self, next) {
            (
                ByteSource::FileRegion {
                    origin,
                    offset,
                    length,
                },
                ByteSource::FileRegion {
                    origin: next_origin,
                    offset: next_offset,
                    length: next_length,
                },
            ) if BackingFile::same_origin(origin, next_origin)
                && *offset + *length == *next_offset =>
            {
                *length += next_length;
                true
            }
            _ => false,
        }
    }
}
