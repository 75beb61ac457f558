//! PK16 archives: a compact big-endian container with a 16-bit entry count.
//!
//! ```text
//! 0x00  "PK16"
//! 0x04  u16 entry count (BE)
//! 0x06  u16 reserved
//! 0x08  count x { u32 offset, u32 length } (BE)
//!       one trailing zero entry
//! ```
//!
//! The count field caps the table at 65535 slots, so slot 65534 is the last one a
//! replacement can target.

use crate::error::{Error, Result};
use crate::format::{ensure_table_fits, expect_magic, narrow, ArchiveFormat, TableEntry};
use binrw::{binrw, BinRead, BinWrite};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{Cursor, Read, Seek, Write};

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pak16Entry {
    pub offset: u32,
    pub length: u32,
}

/// PK16 format marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pak16;

impl ArchiveFormat for Pak16 {
    const NAME: &'static str = "PK16";
    const MAGIC: &'static [u8] = b"PK16";
    const PREFIX_SIZE: u64 = 8;
    const ENTRY_SIZE: u64 = 8;
    const MAX_SLOT_INDEX: u32 = u16::MAX as u32 - 1;
    const MAX_FIELD_VALUE: u64 = u32::MAX as u64;
    const DEFAULT_ALIGNMENT: u64 = 16;

    fn decode_table<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<Vec<TableEntry>> {
        ensure_table_fits::<Self>(0, file_len)?;
        expect_magic::<Self, _>(reader)?;

        let count = reader.read_u16::<BE>()?;
        let _reserved = reader.read_u16::<BE>()?;
        ensure_table_fits::<Self>(count as u64, file_len)?;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let entry = Pak16Entry::read(reader)?;
            entries.push(TableEntry::new(entry.offset.into(), entry.length.into()));
        }
        Ok(entries)
    }

    fn encode_header(entries: &[TableEntry], header: &mut [u8]) -> Result<()> {
        let count = u16::try_from(entries.len()).map_err(|_| Error::SlotOutOfRange {
            slot: entries.len().saturating_sub(1) as u64,
            max: Self::MAX_SLOT_INDEX,
        })?;

        let mut cursor = Cursor::new(header);
        cursor.write_all(Self::MAGIC)?;
        cursor.write_u16::<BE>(count)?;
        cursor.write_u16::<BE>(0)?;

        for entry in entries {
            Pak16Entry {
                offset: narrow::<Self, u32>(entry.offset)?,
                length: narrow::<Self, u32>(entry.length)?,
            }
            .write(&mut cursor)?;
        }
        Ok(())
    }
}
