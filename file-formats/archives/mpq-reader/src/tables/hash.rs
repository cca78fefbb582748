//! Hash table implementation for MPQ archives

use super::common::{TABLE_ENTRY_SIZE, decrypt_table_data, read_encrypted_table};
use crate::crypto::{CryptTable, HASH_TABLE_KEY_NAME, PathHash};
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek};

/// State of a hash table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashSlot {
    /// The slot has never held an entry; probing stops here
    Empty,
    /// The slot held an entry that was removed; probing continues past it
    Deleted,
    /// The slot points at a block table entry
    Occupied(u32),
}

impl HashSlot {
    /// Raw value marking a slot that has never been used
    pub const RAW_EMPTY: u32 = 0xFFFF_FFFF;
    /// Raw value marking a deleted slot
    pub const RAW_DELETED: u32 = 0xFFFF_FFFE;

    /// Decode the on-disk block index field
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::RAW_EMPTY => HashSlot::Empty,
            Self::RAW_DELETED => HashSlot::Deleted,
            index => HashSlot::Occupied(index),
        }
    }

    /// Encode back to the on-disk block index field
    pub fn to_raw(self) -> u32 {
        match self {
            HashSlot::Empty => Self::RAW_EMPTY,
            HashSlot::Deleted => Self::RAW_DELETED,
            HashSlot::Occupied(index) => index,
        }
    }
}

/// Hash table entry (16 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry {
    /// Verification hash A of the full path
    pub name_a: u32,
    /// Verification hash B of the full path
    pub name_b: u32,
    /// The language of the file (Windows LANGID, 0 = neutral)
    pub locale: u16,
    /// The platform the file is used for (always 0 in practice)
    pub platform: u16,
    /// What the slot holds
    pub slot: HashSlot,
}

impl HashEntry {
    /// An entry that has never been used
    pub fn empty() -> Self {
        Self {
            name_a: 0xFFFF_FFFF,
            name_b: 0xFFFF_FFFF,
            locale: 0xFFFF,
            platform: 0xFFFF,
            slot: HashSlot::Empty,
        }
    }

    /// Block index if the slot is occupied
    pub fn block_index(&self) -> Option<u32> {
        match self.slot {
            HashSlot::Occupied(index) => Some(index),
            HashSlot::Empty | HashSlot::Deleted => None,
        }
    }

    /// Whether this entry was produced by `hash`
    pub fn matches(&self, hash: &PathHash) -> bool {
        self.name_a == hash.name_a && self.name_b == hash.name_b
    }

    /// Parse a decrypted 16-byte record
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < TABLE_ENTRY_SIZE {
            return Err(Error::hash_table("Hash entry too small"));
        }

        Ok(Self {
            name_a: LittleEndian::read_u32(&data[0..4]),
            name_b: LittleEndian::read_u32(&data[4..8]),
            locale: LittleEndian::read_u16(&data[8..10]),
            platform: LittleEndian::read_u16(&data[10..12]),
            slot: HashSlot::from_raw(LittleEndian::read_u32(&data[12..16])),
        })
    }

    /// Serialise to the decrypted 16-byte record
    pub fn to_bytes(&self) -> [u8; TABLE_ENTRY_SIZE] {
        let mut data = [0u8; TABLE_ENTRY_SIZE];
        LittleEndian::write_u32(&mut data[0..4], self.name_a);
        LittleEndian::write_u32(&mut data[4..8], self.name_b);
        LittleEndian::write_u16(&mut data[8..10], self.locale);
        LittleEndian::write_u16(&mut data[10..12], self.platform);
        LittleEndian::write_u32(&mut data[12..16], self.slot.to_raw());
        data
    }
}

/// Open-addressing table mapping path hashes to block indices
#[derive(Debug, Clone)]
pub struct HashTable {
    entries: Vec<HashEntry>,
}

impl HashTable {
    /// Build a table from already decoded entries
    pub fn from_entries(entries: Vec<HashEntry>) -> Result<Self> {
        if !crate::is_power_of_two(entries.len() as u32) {
            return Err(Error::hash_table("Hash table size must be power of 2"));
        }
        Ok(Self { entries })
    }

    /// Read and decrypt a hash table from the archive
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        crypt: &CryptTable,
        offset: u64,
        entries: u32,
    ) -> Result<Self> {
        if !crate::is_power_of_two(entries) {
            return Err(Error::hash_table("Hash table size must be power of 2"));
        }

        let raw_data = read_encrypted_table(
            reader,
            crypt,
            offset,
            entries,
            HASH_TABLE_KEY_NAME,
            Error::HashTable,
        )?;

        log::debug!("Loaded hash table: {entries} entries at 0x{offset:08X}");
        Self::parse(&raw_data)
    }

    /// Decrypt and parse a hash table from its on-disk bytes
    pub fn from_bytes(data: &[u8], crypt: &CryptTable, entries: u32) -> Result<Self> {
        if !crate::is_power_of_two(entries) {
            return Err(Error::hash_table("Hash table size must be power of 2"));
        }

        let expected_size = entries as usize * TABLE_ENTRY_SIZE;
        if data.len() < expected_size {
            return Err(Error::hash_table("Insufficient data for hash table"));
        }

        let mut raw_data = data[..expected_size].to_vec();
        decrypt_table_data(crypt, &mut raw_data, HASH_TABLE_KEY_NAME);
        Self::parse(&raw_data)
    }

    fn parse(raw_data: &[u8]) -> Result<Self> {
        let entries = raw_data
            .chunks_exact(TABLE_ENTRY_SIZE)
            .map(HashEntry::from_bytes)
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Get all entries
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&HashEntry> {
        self.entries.get(index)
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Probe for a path hash.
    ///
    /// Starts at the table-offset slot and walks forward, wrapping around.
    /// A never-used slot ends the search, deleted slots are skipped. At most
    /// `size()` slots are visited. With `locale` set only entries carrying
    /// exactly that locale match.
    ///
    /// Returns the slot index and entry of the first match.
    pub fn find(&self, hash: &PathHash, locale: Option<u16>) -> Option<(usize, &HashEntry)> {
        let size = self.entries.len();
        let mut index = hash.start_index(size);

        for _ in 0..size {
            let entry = &self.entries[index];

            match entry.slot {
                HashSlot::Empty => return None,
                HashSlot::Deleted => {}
                HashSlot::Occupied(_) => {
                    if entry.matches(hash) && locale.is_none_or(|l| l == entry.locale) {
                        return Some((index, entry));
                    }
                }
            }

            index = (index + 1) & (size - 1);
        }

        log::trace!("Hash table probe wrapped without finding a never-used slot");
        None
    }

    /// Iterate over occupied slots as `(slot index, entry, block index)`
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &HashEntry, u32)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.block_index().map(|b| (i, e, b)))
    }
}
