//! MPQ header structure and parsing

use crate::security::SecurityLimits;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

/// MPQ archive header signature ('MPQ\x1A')
pub const MPQ_HEADER_SIGNATURE: u32 = crate::signatures::MPQ_ARCHIVE;

/// Size of the base header layout in bytes
pub const BASE_HEADER_SIZE: u32 = 0x20;

/// MPQ format version
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    /// Version 1 - Original format (32-byte header)
    V1 = 0,
    /// Version 2 - Burning Crusade (44-byte header)
    V2 = 1,
    /// Version 3 - Cataclysm Beta (68-byte header)
    V3 = 2,
    /// Version 4 - Cataclysm+ (208-byte header)
    V4 = 3,
}

impl FormatVersion {
    /// Create from raw version number
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(FormatVersion::V1),
            1 => Some(FormatVersion::V2),
            2 => Some(FormatVersion::V3),
            3 => Some(FormatVersion::V4),
            _ => None,
        }
    }
}

/// The base MPQ header.
///
/// Later format versions append fields after these; only the base layout is
/// read and the extended tables are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpqHeader {
    /// Size of the archive header
    pub header_size: u32,
    /// Size of MPQ archive
    pub archive_size: u32,
    /// Format version
    pub format_version: FormatVersion,
    /// Sector size shift (sector size = 512 << shift)
    pub sector_size_shift: u16,
    /// Offset to the hash table, relative to the archive start
    pub hash_table_pos: u32,
    /// Offset to the block table, relative to the archive start
    pub block_table_pos: u32,
    /// Number of entries in the hash table (power of two)
    pub hash_table_entries: u32,
    /// Number of entries in the block table
    pub block_table_entries: u32,
}

impl MpqHeader {
    /// Read the header at offset 0 with default limits
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Self::read_with_limits(reader, &SecurityLimits::default())
    }

    /// Read the header at offset 0, validating it against `limits`
    pub fn read_with_limits<R: Read + Seek>(
        reader: &mut R,
        limits: &SecurityLimits,
    ) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        Self::parse(reader, limits).map_err(|e| match e {
            Error::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                Error::invalid_header("Archive is shorter than the MPQ header")
            }
            other => other,
        })
    }

    fn parse<R: Read>(reader: &mut R, limits: &SecurityLimits) -> Result<Self> {
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != MPQ_HEADER_SIGNATURE {
            return Err(Error::invalid_header(format!(
                "Invalid MPQ header signature 0x{signature:08X}"
            )));
        }

        let header_size = reader.read_u32::<LittleEndian>()?;
        let archive_size = reader.read_u32::<LittleEndian>()?;
        let format_version_raw = reader.read_u16::<LittleEndian>()?;
        let sector_size_shift = reader.read_u16::<LittleEndian>()?;
        let hash_table_pos = reader.read_u32::<LittleEndian>()?;
        let block_table_pos = reader.read_u32::<LittleEndian>()?;
        let hash_table_entries = reader.read_u32::<LittleEndian>()?;
        let block_table_entries = reader.read_u32::<LittleEndian>()?;

        let format_version = FormatVersion::from_raw(format_version_raw)
            .ok_or(Error::UnsupportedVersion(format_version_raw))?;

        if header_size < BASE_HEADER_SIZE {
            return Err(Error::invalid_header(format!(
                "Header size {header_size} smaller than the base layout"
            )));
        }

        limits.check_tables(hash_table_entries, block_table_entries, sector_size_shift)?;

        if format_version == FormatVersion::V1 && header_size > BASE_HEADER_SIZE {
            log::warn!("Version 1 header declares {header_size} bytes; extra bytes ignored");
        } else if format_version > FormatVersion::V1 {
            log::debug!(
                "Archive is {format_version:?} ({header_size}-byte header); reading base tables only"
            );
        }

        Ok(Self {
            header_size,
            archive_size,
            format_version,
            sector_size_shift,
            hash_table_pos,
            block_table_pos,
            hash_table_entries,
            block_table_entries,
        })
    }

    /// Size of one sector in bytes
    pub fn sector_size(&self) -> usize {
        crate::calculate_sector_size(self.sector_size_shift)
    }

    /// Debug dump the MPQ header
    pub fn debug_dump(&self) -> String {
        let mut output = String::new();
        output.push_str("MPQ Header Debug Dump\n");
        output.push_str("====================\n");
        output.push_str(&format!("Header Size: {}\n", self.header_size));
        output.push_str(&format!("Archive Size: {} bytes\n", self.archive_size));
        output.push_str(&format!(
            "Format Version: {:?} (v{})\n",
            self.format_version,
            self.format_version as u16 + 1
        ));
        output.push_str(&format!(
            "Sector Size Shift: {} (sector size: {} bytes)\n",
            self.sector_size_shift,
            self.sector_size()
        ));
        output.push_str(&format!(
            "Hash Table: offset=0x{:08X}, size={} entries\n",
            self.hash_table_pos, self.hash_table_entries
        ));
        output.push_str(&format!(
            "Block Table: offset=0x{:08X}, size={} entries\n",
            self.block_table_pos, self.block_table_entries
        ));
        output
    }
}
