//! Resource limits applied while parsing untrusted archives

use crate::{Error, Result};

/// Upper bounds that keep a corrupted or hostile archive from driving
/// unbounded allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityLimits {
    /// Maximum allowed hash table entries (default: 1M)
    pub max_hash_entries: u32,
    /// Maximum allowed block table entries (default: 1M)
    pub max_block_entries: u32,
    /// Maximum allowed sector size shift (default: 20)
    pub max_sector_shift: u16,
    /// Maximum uncompressed size of a single extracted file (default: 512MB)
    pub max_file_size: u64,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_hash_entries: 1 << 20,
            max_block_entries: 1 << 20,
            max_sector_shift: 20,
            max_file_size: 512 * 1024 * 1024,
        }
    }
}

impl SecurityLimits {
    /// Tighter limits for archives from unknown sources
    pub fn strict() -> Self {
        Self {
            max_hash_entries: 1 << 16,
            max_block_entries: 1 << 16,
            max_sector_shift: 12,
            max_file_size: 64 * 1024 * 1024,
        }
    }

    /// Validate the table geometry recorded in a header
    pub fn check_tables(
        &self,
        hash_table_entries: u32,
        block_table_entries: u32,
        sector_shift: u16,
    ) -> Result<()> {
        if !crate::is_power_of_two(hash_table_entries) {
            return Err(Error::invalid_header(format!(
                "Hash table entry count {hash_table_entries} is not a power of two"
            )));
        }

        if hash_table_entries > self.max_hash_entries {
            return Err(Error::invalid_header(format!(
                "Hash table entry count {hash_table_entries} exceeds limit {}",
                self.max_hash_entries
            )));
        }

        if block_table_entries > self.max_block_entries {
            return Err(Error::invalid_header(format!(
                "Block table entry count {block_table_entries} exceeds limit {}",
                self.max_block_entries
            )));
        }

        if sector_shift > self.max_sector_shift {
            return Err(Error::invalid_header(format!(
                "Sector size shift {sector_shift} exceeds limit {}",
                self.max_sector_shift
            )));
        }

        Ok(())
    }

    /// Validate a file's recorded size before allocating its output buffer
    pub fn check_file_size(&self, name: &str, file_size: u64) -> Result<()> {
        if file_size > self.max_file_size {
            return Err(Error::invalid_format(format!(
                "File {name} declares {file_size} bytes, limit is {}",
                self.max_file_size
            )));
        }
        Ok(())
    }
}
