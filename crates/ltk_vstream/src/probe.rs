//! Reads through handles owned by someone else.
//!
//! Format checks and table reads borrow the handle the intercepted process is
//! about to use. Whatever happens during the read, the cursor must be back where
//! it was before control returns.

use std::io::{self, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

/// Restores a reader's position when dropped.
///
/// Prefer [`restore`](Self::restore) on the success path so a failing seek is
/// reported; the drop path covers early returns, errors and panics.
pub struct PositionGuard<'a, R: Seek + ?Sized> {
    inner: &'a mut R,
    origin: u64,
    restored: bool,
}

impl<'a, R: Seek + ?Sized> PositionGuard<'a, R> {
    /// Record the current position of `inner`.
    pub fn new(inner: &'a mut R) -> io::Result<Self> {
        let origin = inner.stream_position()?;
        Ok(Self {
            inner,
            origin,
            restored: false,
        })
    }

    /// Position the reader had when the guard was created.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Seek back to the recorded position and disarm the guard.
    pub fn restore(mut self) -> io::Result<()> {
        self.restored = true;
        self.inner.seek(SeekFrom::Start(self.origin))?;
        Ok(())
    }
}

impl<R: Seek + ?Sized> Deref for PositionGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.inner
    }
}

impl<R: Seek + ?Sized> DerefMut for PositionGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.inner
    }
}

impl<R: Seek + ?Sized> Drop for PositionGuard<'_, R> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.inner.seek(SeekFrom::Start(self.origin)) {
            tracing::warn!("Failed to restore probed handle to {}: {}", self.origin, e);
        }
    }
}

/// Run `f` against `reader` and put the cursor back afterwards, whatever `f` returns.
///
/// ```
/// use ltk_vstream::probe;
/// use std::io::{Cursor, Read, Seek, SeekFrom};
///
/// let mut cursor = Cursor::new(b"AFS\0rest".to_vec());
/// cursor.seek(SeekFrom::Start(5)).unwrap();
///
/// let magic = probe(&mut cursor, |r| -> std::io::Result<[u8; 4]> {
///     r.seek(SeekFrom::Start(0))?;
///     let mut magic = [0u8; 4];
///     r.read_exact(&mut magic)?;
///     Ok(magic)
/// })
/// .unwrap();
///
/// assert_eq!(&magic, b"AFS\0");
/// assert_eq!(cursor.position(), 5);
/// ```
pub fn probe<R, T, E, F>(reader: &mut R, f: F) -> Result<T, E>
where
    R: Seek + ?Sized,
    E: From<io::Error>,
    F: FnOnce(&mut R) -> Result<T, E>,
{
    let mut guard = PositionGuard::new(reader)?;
    let value = f(&mut *guard)?;
    guard.restore()?;
    Ok(value)
}
