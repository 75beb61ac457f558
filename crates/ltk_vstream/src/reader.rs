//! `Read + Seek` cursor over a shared composite stream.

use crate::stream::CompositeStream;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A cursor over a [`CompositeStream`].
///
/// Each reader keeps its own position, so any number of readers can share one
/// stream.
#[derive(Debug, Clone)]
pub struct CompositeReader {
    stream: Arc<CompositeStream>,
    position: u64,
}

impl CompositeReader {
    pub fn new(stream: Arc<CompositeStream>) -> Self {
        Self {
            stream,
            position: 0,
        }
    }

    pub fn stream(&self) -> &Arc<CompositeStream> {
        &self.stream
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Read for CompositeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.stream.read_at(self.position, buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for CompositeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.stream.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            ));
        };
        self.position = target;
        Ok(target)
    }
}
