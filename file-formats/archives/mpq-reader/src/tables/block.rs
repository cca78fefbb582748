//! Block table implementation for MPQ archives

use super::common::{TABLE_ENTRY_SIZE, decrypt_table_data, read_encrypted_table};
use crate::crypto::{BLOCK_TABLE_KEY_NAME, CryptTable};
use crate::{Error, Result};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek};

bitflags! {
    /// Storage flags of a block table entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u32 {
        /// Compressed with the legacy PKWare DCL method, no method byte
        const IMPLODE = 0x0000_0100;
        /// Compressed with one or more methods named by a leading method byte
        const COMPRESS = 0x0000_0200;
        /// Encrypted with the file key
        const ENCRYPTED = 0x0001_0000;
        /// The file key is adjusted by the block position and size
        const FIX_KEY = 0x0002_0000;
        /// The file is a patch against a base archive
        const PATCH_FILE = 0x0010_0000;
        /// Stored as one unit instead of sectors
        const SINGLE_UNIT = 0x0100_0000;
        /// Marks the file as deleted (used by patch archives)
        const DELETE_MARKER = 0x0200_0000;
        /// Sector checksums follow the sector data
        const SECTOR_CRC = 0x0400_0000;
        /// The entry describes an existing file
        const EXISTS = 0x8000_0000;
    }
}

/// Block table entry (16 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the file data, relative to the beginning of the archive
    pub file_pos: u32,
    /// Stored size, including sector offset table and checksums
    pub compressed_size: u32,
    /// Size of the file once extracted
    pub file_size: u32,
    /// Flags for the file
    pub flags: BlockFlags,
}

impl BlockEntry {
    /// An unused entry
    pub fn empty() -> Self {
        Self {
            file_pos: 0,
            compressed_size: 0,
            file_size: 0,
            flags: BlockFlags::empty(),
        }
    }

    /// Check if the file is compressed by either method
    pub fn is_compressed(&self) -> bool {
        self.flags
            .intersects(BlockFlags::IMPLODE | BlockFlags::COMPRESS)
    }

    /// Check if the file uses the legacy implode method only
    pub fn is_imploded(&self) -> bool {
        self.flags.contains(BlockFlags::IMPLODE) && !self.flags.contains(BlockFlags::COMPRESS)
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// Check if the file uses fixed key encryption
    pub fn has_fix_key(&self) -> bool {
        self.flags.contains(BlockFlags::FIX_KEY)
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags.contains(BlockFlags::SINGLE_UNIT)
    }

    /// Check if the file has sector checksums
    pub fn has_sector_crc(&self) -> bool {
        self.flags.contains(BlockFlags::SECTOR_CRC)
    }

    /// Check if the file is a patch file
    pub fn is_patch_file(&self) -> bool {
        self.flags.contains(BlockFlags::PATCH_FILE)
    }

    /// Check if the file exists
    pub fn exists(&self) -> bool {
        self.flags.contains(BlockFlags::EXISTS)
    }

    /// Whether a lookup may hand this entry out for extraction
    pub fn is_live(&self) -> bool {
        self.exists() && !self.flags.contains(BlockFlags::DELETE_MARKER)
    }

    /// Parse a decrypted 16-byte record
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < TABLE_ENTRY_SIZE {
            return Err(Error::block_table("Block entry too small"));
        }

        Ok(Self {
            file_pos: LittleEndian::read_u32(&data[0..4]),
            compressed_size: LittleEndian::read_u32(&data[4..8]),
            file_size: LittleEndian::read_u32(&data[8..12]),
            flags: BlockFlags::from_bits_retain(LittleEndian::read_u32(&data[12..16])),
        })
    }

    /// Serialise to the decrypted 16-byte record
    pub fn to_bytes(&self) -> [u8; TABLE_ENTRY_SIZE] {
        let mut data = [0u8; TABLE_ENTRY_SIZE];
        LittleEndian::write_u32(&mut data[0..4], self.file_pos);
        LittleEndian::write_u32(&mut data[4..8], self.compressed_size);
        LittleEndian::write_u32(&mut data[8..12], self.file_size);
        LittleEndian::write_u32(&mut data[12..16], self.flags.bits());
        data
    }
}

/// Dense array of per-file storage descriptors
#[derive(Debug, Clone)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Build a table from already decoded entries
    pub fn from_entries(entries: Vec<BlockEntry>) -> Self {
        Self { entries }
    }

    /// Read and decrypt a block table from the archive
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        crypt: &CryptTable,
        offset: u64,
        entries: u32,
    ) -> Result<Self> {
        let raw_data = read_encrypted_table(
            reader,
            crypt,
            offset,
            entries,
            BLOCK_TABLE_KEY_NAME,
            Error::BlockTable,
        )?;

        log::debug!("Loaded block table: {entries} entries at 0x{offset:08X}");
        Self::parse(&raw_data)
    }

    /// Decrypt and parse a block table from its on-disk bytes
    pub fn from_bytes(data: &[u8], crypt: &CryptTable, entries: u32) -> Result<Self> {
        let expected_size = entries as usize * TABLE_ENTRY_SIZE;
        if data.len() < expected_size {
            return Err(Error::block_table("Insufficient data for block table"));
        }

        let mut raw_data = data[..expected_size].to_vec();
        decrypt_table_data(crypt, &mut raw_data, BLOCK_TABLE_KEY_NAME);
        Self::parse(&raw_data)
    }

    fn parse(raw_data: &[u8]) -> Result<Self> {
        let entries = raw_data
            .chunks_exact(TABLE_ENTRY_SIZE)
            .map(BlockEntry::from_bytes)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Get all entries
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&BlockEntry> {
        self.entries.get(index)
    }

    /// Get the size of the block table
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}
