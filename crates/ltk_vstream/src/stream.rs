//! The read-only logical file served to the I/O interception layer.

use crate::binding::SourceOffsetBinding;
use crate::error::{Error, Result};
use crate::source::ByteSource;
use std::io;
use std::sync::Arc;

/// A logical file described entirely by bindings.
///
/// The bindings are sorted by destination start and tile `[0, len)` exactly: no
/// gaps, no overlaps. Padding must be supplied as explicit inline bindings. The
/// stream is immutable once built; a changed layout requires a new stream.
///
/// Reads take `&self` and keep no cursor, so several threads may read at once.
/// File-backed bindings serialize on their [`BackingFile`](crate::BackingFile).
#[derive(Debug)]
pub struct CompositeStream {
    bindings: Vec<SourceOffsetBinding>,
    len: u64,
}

impl CompositeStream {
    /// Build a stream from bindings in any order.
    ///
    /// Zero-length bindings are dropped. Any gap or overlap is rejected with
    /// [`Error::InvalidLayout`].
    pub fn new(mut bindings: Vec<SourceOffsetBinding>) -> Result<Self> {
        bindings.retain(|binding| !binding.is_empty());
        bindings.sort_by_key(|binding| binding.dest.start);

        let mut expected_start = 0u64;
        for binding in &bindings {
            if binding.dest.start != expected_start {
                return Err(Error::InvalidLayout {
                    expected_start,
                    found_start: binding.dest.start,
                });
            }
            expected_start = expected_start
                .checked_add(binding.dest.length)
                .ok_or(Error::LengthOverflow)?;
        }

        Ok(Self {
            bindings,
            len: expected_start,
        })
    }

    /// Build a stream whose first bytes are `header`, followed by `bindings`, which
    /// must start at `header.len()`.
    pub fn with_header(
        header: impl Into<Arc<[u8]>>,
        bindings: Vec<SourceOffsetBinding>,
    ) -> Result<Self> {
        let mut all = Vec::with_capacity(bindings.len() + 1);
        all.push(SourceOffsetBinding::new(ByteSource::inline(header), 0));
        all.extend(bindings);
        Self::new(all)
    }

    /// Total length of the logical file, header included.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bindings(&self) -> &[SourceOffsetBinding] {
        &self.bindings
    }

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// The span may cross any number of binding boundaries. Returns the number of
    /// bytes written, which is only short at end of file and `0` once
    /// `offset >= len()`. Backing file errors are returned as-is.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len || buf.is_empty() {
            return Ok(0);
        }

        // Tiling is gap-free, so the first binding ending past `offset` contains it.
        let mut index = self
            .bindings
            .partition_point(|binding| binding.dest.end() <= offset);
        let mut position = offset;
        let mut written = 0usize;

        while written < buf.len() && index < self.bindings.len() {
            let count = self.bindings[index].read_at(position, &mut buf[written..])?;
            written += count;
            position += count as u64;
            index += 1;
        }

        Ok(written)
    }

    /// Materialize the whole logical file. Meant for tests and tooling.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let len = usize::try_from(self.len).map_err(io::Error::other)?;
        let mut out = vec![0u8; len];
        let read = self.read_at(0, &mut out)?;
        out.truncate(read);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_bindings;
    use crate::source::BackingFile;
    use camino::Utf8PathBuf;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &[u8]) -> (NamedTempFile, Utf8PathBuf) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        (file, path)
    }

    fn inline(bytes: &[u8], dest: u64) -> SourceOffsetBinding {
        SourceOffsetBinding::new(ByteSource::inline(bytes.to_vec()), dest)
    }

    #[test]
    fn test_empty_stream() {
        let stream = CompositeStream::new(Vec::new()).unwrap();
        assert!(stream.is_empty());
        let mut buf = [0u8; 4];
        assert_eq!(stream.read_at(0, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_rejects_gap() {
        let err = CompositeStream::new(vec![inline(b"abc", 0), inline(b"def", 4)]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidLayout {
                expected_start: 3,
                found_start: 4
            }
        ));
    }

    #[test]
    fn test_rejects_overlap() {
        let err = CompositeStream::new(vec![inline(b"abc", 0), inline(b"def", 2)]).unwrap_err();
        assert!(matches!(err, Error::InvalidLayout { .. }));
    }

    #[test]
    fn test_rejects_missing_start() {
        let err = CompositeStream::new(vec![inline(b"abc", 1)]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidLayout {
                expected_start: 0,
                found_start: 1
            }
        ));
    }

    #[test]
    fn test_read_across_mixed_boundaries() {
        let (_tmp, path) = temp_file(b"0123456789");
        let origin = BackingFile::new(path);
        let stream = CompositeStream::with_header(
            b"HDR".to_vec(),
            vec![
                SourceOffsetBinding::mergeable(ByteSource::file_region(origin.clone(), 2, 4), 3),
                inline(b"__", 7),
                SourceOffsetBinding::mergeable(ByteSource::file_region(origin, 8, 2), 9),
            ],
        )
        .unwrap();

        assert_eq!(stream.len(), 11);
        assert_eq!(stream.read_all().unwrap(), b"HDR2345__89");

        let mut buf = [0u8; 5];
        assert_eq!(stream.read_at(5, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"45__8");

        // Short read at end of file, then EOF.
        assert_eq!(stream.read_at(9, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(stream.read_at(11, &mut buf).unwrap(), 0);
        assert_eq!(stream.read_at(500, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_deleted_backing_file_fails_read() {
        let (tmp, path) = temp_file(b"0123456789");
        let stream = CompositeStream::new(vec![SourceOffsetBinding::mergeable(
            ByteSource::file_region(BackingFile::new(path), 0, 10),
            0,
        )])
        .unwrap();
        drop(tmp);

        let mut buf = [0u8; 4];
        let err = stream.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_reads() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let (_tmp, path) = temp_file(&data);
        let origin = BackingFile::new(path);
        let bindings = (0..16u64)
            .map(|i| {
                SourceOffsetBinding::mergeable(
                    ByteSource::file_region(origin.clone(), i * 256, 256),
                    i * 256,
                )
            })
            .collect();
        let stream = Arc::new(CompositeStream::new(bindings).unwrap());

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let stream = stream.clone();
                let expected = data.clone();
                std::thread::spawn(move || {
                    for round in 0..32u64 {
                        let offset = (t * 97 + round * 131) % 4000;
                        let mut buf = [0u8; 96];
                        let read = stream.read_at(offset, &mut buf).unwrap();
                        let start = offset as usize;
                        assert_eq!(&buf[..read], &expected[start..start + read]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    proptest! {
        #[test]
        fn test_merged_and_unmerged_read_identically(
            chunk_lens in proptest::collection::vec(1u64..64, 1..24),
            replaced in proptest::collection::vec(any::<bool>(), 24),
            read_offset in 0u64..2048,
            read_len in 1usize..512,
        ) {
            let total: u64 = chunk_lens.iter().sum();
            let data: Vec<u8> = (0..total).map(|i| (i * 7 % 251) as u8).collect();
            let (_tmp, path) = temp_file(&data);
            let origin = BackingFile::new(path);

            let mut bindings = Vec::new();
            let mut expected = Vec::new();
            let mut source_offset = 0u64;
            let mut dest = 0u64;
            for (i, len) in chunk_lens.iter().copied().enumerate() {
                if replaced[i] {
                    let bytes = vec![0xAAu8; len as usize];
                    expected.extend_from_slice(&bytes);
                    bindings.push(SourceOffsetBinding::new(ByteSource::inline(bytes), dest));
                } else {
                    let start = source_offset as usize;
                    expected.extend_from_slice(&data[start..start + len as usize]);
                    bindings.push(SourceOffsetBinding::mergeable(
                        ByteSource::file_region(origin.clone(), source_offset, len),
                        dest,
                    ));
                }
                source_offset += len;
                dest += len;
            }

            let plain = CompositeStream::new(bindings.clone()).unwrap();
            let merged_bindings = merge_bindings(bindings);
            prop_assert!(merged_bindings.len() <= chunk_lens.len());
            let merged = CompositeStream::new(merged_bindings).unwrap();

            prop_assert_eq!(plain.len(), merged.len());
            prop_assert_eq!(&plain.read_all().unwrap(), &expected);
            prop_assert_eq!(&merged.read_all().unwrap(), &expected);

            let mut a = vec![0u8; read_len];
            let mut b = vec![0u8; read_len];
            let read_a = plain.read_at(read_offset, &mut a).unwrap();
            let read_b = merged.read_at(read_offset, &mut b).unwrap();
            prop_assert_eq!(read_a, read_b);
            prop_assert_eq!(&a[..read_a], &b[..read_b]);
        }
    }
}
