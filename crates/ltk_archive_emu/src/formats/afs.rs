//! AFS archives.
//!
//! ```text
//! 0x00  "AFS\0"
//! 0x04  u32 entry count (LE)
//! 0x08  count x { u32 offset, u32 length } (LE)
//!       one trailing entry (name table pointer in the original; zeroed when rebuilt)
//! ```
//!
//! Contained files start on 2048-byte boundaries. Offsets are 32-bit, so the
//! slot range stops where the directory alone would no longer fit below 4 GiB.

use crate::error::Result;
use crate::format::{ensure_table_fits, expect_magic, narrow, ArchiveFormat, TableEntry};
use binrw::{binrw, BinRead, BinWrite};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Cursor, Read, Seek, Write};

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AfsEntry {
    pub offset: u32,
    pub length: u32,
}

/// AFS format marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Afs;

impl ArchiveFormat for Afs {
    const NAME: &'static str = "AFS";
    const MAGIC: &'static [u8] = b"AFS\0";
    const PREFIX_SIZE: u64 = 8;
    const ENTRY_SIZE: u64 = 8;
    // 8 + (slot + 2) * 8 must fit in a u32 offset: slot + 1 entries plus the reserved one.
    const MAX_SLOT_INDEX: u32 = ((u32::MAX as u64 - 8) / 8 - 2) as u32;
    const MAX_FIELD_VALUE: u64 = u32::MAX as u64;
    const DEFAULT_ALIGNMENT: u64 = 2048;

    fn decode_table<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<Vec<TableEntry>> {
        ensure_table_fits::<Self>(0, file_len)?;
        expect_magic::<Self, _>(reader)?;

        let count = reader.read_u32::<LE>()?;
        ensure_table_fits::<Self>(count as u64, file_len)?;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let entry = AfsEntry::read(reader)?;
            entries.push(TableEntry::new(entry.offset.into(), entry.length.into()));
        }
        Ok(entries)
    }

    fn encode_header(entries: &[TableEntry], header: &mut [u8]) -> Result<()> {
        let mut cursor = Cursor::new(header);
        cursor.write_all(Self::MAGIC)?;
        cursor.write_u32::<LE>(narrow::<Self, u32>(entries.len() as u64)?)?;

        for entry in entries {
            AfsEntry {
                offset: narrow::<Self, u32>(entry.offset)?,
                length: narrow::<Self, u32>(entry.length)?,
            }
            .write(&mut cursor)?;
        }
        Ok(())
    }
}
