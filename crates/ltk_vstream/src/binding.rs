//! Placement of a byte source inside the logical file.

use crate::range::OffsetRange;
use crate::source::ByteSource;
use std::io;

/// A [`ByteSource`] placed at a destination range of a composite stream.
///
/// Bindings are produced while a layout is being computed, merged once, and then
/// frozen inside a [`CompositeStream`](crate::CompositeStream).
#[derive(Debug, Clone)]
pub struct SourceOffsetBinding {
    pub(crate) source: ByteSource,
    pub(crate) dest: OffsetRange,
    pub(crate) mergeable: bool,
}

impl SourceOffsetBinding {
    /// Place `source` at `dest_start`. The binding is never merged.
    pub fn new(source: ByteSource, dest_start: u64) -> Self {
        let dest = OffsetRange::new(dest_start, source.len());
        Self {
            source,
            dest,
            mergeable: false,
        }
    }

    /// Place an untouched region of the original container at `dest_start`.
    ///
    /// Only file regions can be merged; any other source yields a plain binding.
    pub fn mergeable(source: ByteSource, dest_start: u64) -> Self {
        let mergeable = matches!(source, ByteSource::FileRegion { .. });
        Self {
            mergeable,
            ..Self::new(source, dest_start)
        }
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    pub fn dest(&self) -> OffsetRange {
        self.dest
    }

    pub fn is_mergeable(&self) -> bool {
        self.mergeable
    }

    pub fn len(&self) -> u64 {
        self.dest.length
    }

    pub fn is_empty(&self) -> bool {
        self.dest.is_empty()
    }

    /// Read from this binding starting at the absolute destination offset `position`.
    ///
    /// Returns how many bytes were copied, which is short when `buf` runs past the
    /// end of the binding.
    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        if !self.dest.contains(position) {
            return Ok(0);
        }
        let relative = position - self.dest.start;
        let available = self.dest.length - relative;
        let count = available.min(buf.len() as u64) as usize;
        self.source.read_at(relative, &mut buf[..count])?;
        Ok(count)
    }

    /// Swallow `next` into `self` when both are mergeable and continue each other in
    /// the destination and in the same source file.
    pub(crate) fn try_absorb(&mut self, next: &SourceOffsetBinding) -> bool {
        if !self.mergeable || !next.mergeable || !self.dest.is_adjacent_to(&next.dest) {
            return false;
        }
        if !self.source.extend_with(&next.source) {
            return false;
        }
        self.dest.length += next.dest.length;
        true
    }
}
