//! Path hashing for hash table lookups and key derivation

use super::table::CryptTable;

/// The hash families derived from the crypt table.
///
/// Each family reads a different 256-entry row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// Selects the initial probe slot in the hash table
    TableOffset,
    /// First verification hash stored in a hash entry
    NameA,
    /// Second verification hash stored in a hash entry
    NameB,
    /// Encryption key derivation
    FileKey,
}

impl HashType {
    /// Offset of this family's row in the crypt table
    pub const fn row(self) -> usize {
        match self {
            HashType::TableOffset => 0x000,
            HashType::NameA => 0x100,
            HashType::NameB => 0x200,
            HashType::FileKey => 0x300,
        }
    }
}

/// Normalise one byte of a logical path: ASCII uppercase, `/` becomes `\`
#[inline]
fn normalize_byte(byte: u8) -> u8 {
    if byte == b'/' {
        b'\\'
    } else {
        byte.to_ascii_uppercase()
    }
}

/// The three hashes that locate and verify a logical path in the hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathHash {
    /// Table-offset hash (reduce modulo the table size for the first slot)
    pub offset: u32,
    /// Verification hash A
    pub name_a: u32,
    /// Verification hash B
    pub name_b: u32,
}

impl PathHash {
    /// Index of the first slot to probe in a table of `table_size` entries.
    ///
    /// # Panics
    ///
    /// Panics if `table_size` is not a power of two (zero included).
    #[inline]
    pub fn start_index(&self, table_size: usize) -> usize {
        assert!(
            table_size.is_power_of_two(),
            "hash table size {table_size} is not a power of two"
        );
        (self.offset as usize) & (table_size - 1)
    }
}

impl CryptTable {
    /// Hash a logical path with one of the hash families.
    ///
    /// Letter case and the slash direction of path separators do not
    /// affect the result.
    pub fn hash_string(&self, input: &str, hash_type: HashType) -> u32 {
        self.hash_bytes(input.as_bytes(), hash_type)
    }

    /// Hash raw path bytes with one of the hash families
    pub fn hash_bytes(&self, input: &[u8], hash_type: HashType) -> u32 {
        let row = hash_type.row();
        let mut seed1: u32 = 0x7FED_7FED;
        let mut seed2: u32 = 0xEEEE_EEEE;

        for &byte in input {
            let ch = normalize_byte(byte);

            seed1 = self.get(row + ch as usize) ^ seed1.wrapping_add(seed2);
            seed2 = (ch as u32)
                .wrapping_add(seed1)
                .wrapping_add(seed2)
                .wrapping_add(seed2 << 5)
                .wrapping_add(3);
        }

        seed1
    }

    /// Compute the lookup triple for a logical path
    pub fn hash_path(&self, path: &str) -> PathHash {
        PathHash {
            offset: self.hash_string(path, HashType::TableOffset),
            name_a: self.hash_string(path, HashType::NameA),
            name_b: self.hash_string(path, HashType::NameB),
        }
    }

    /// Derive the encryption key of a stored file.
    ///
    /// Only the base name takes part. With `fix_key` the key is bound to
    /// the file's position and size: `(key + offset) ^ file_size`.
    pub fn file_key(&self, path: &str, offset: u32, file_size: u32, fix_key: bool) -> u32 {
        let key = self.hash_string(base_name(path), HashType::FileKey);
        if fix_key {
            key.wrapping_add(offset) ^ file_size
        } else {
            key
        }
    }
}

/// Final component of a logical path; either separator is accepted
pub fn base_name(path: &str) -> &str {
    match path.rfind(['\\', '/']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}
