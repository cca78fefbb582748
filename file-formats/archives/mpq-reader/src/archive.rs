//! MPQ archive handling
//!
//! [`Archive`] owns the file handle, the header and both decrypted tables.
//! Lookups only touch the in-memory tables; extraction locks the file handle
//! for the duration of one file, so an archive can be shared between threads.

use crate::crypto::CryptTable;
use crate::extract::SectorExtractor;
use crate::header::MpqHeader;
use crate::security::SecurityLimits;
use crate::tables::{BlockEntry, BlockTable, HashTable};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for opening MPQ archives
///
/// This struct provides configuration options that control how MPQ archives
/// are opened and how their files are looked up and extracted.
///
/// # Examples
///
/// ```no_run
/// use mpq_reader::{OpenOptions, SecurityLimits};
///
/// # fn main() -> Result<(), mpq_reader::Error> {
/// let archive = OpenOptions::new()
///     .limits(SecurityLimits::strict())
///     .locale(0x0409)
///     .open("patch.mpq")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Resource limits applied to the header and to every extraction
    pub limits: SecurityLimits,

    /// Only match hash entries with this locale tag.
    ///
    /// `None` (default) accepts the first matching entry whatever its locale.
    pub locale: Option<u16>,

    /// Verify per-sector Adler-32 checksums when the file carries them.
    pub verify_checksums: bool,

    crypt_table: Option<Arc<CryptTable>>,
}

impl OpenOptions {
    /// Create new default options
    ///
    /// Returns an `OpenOptions` instance with default settings:
    /// - default [`SecurityLimits`]
    /// - any locale
    /// - `verify_checksums = true`
    pub fn new() -> Self {
        Self {
            limits: SecurityLimits::default(),
            locale: None,
            verify_checksums: true,
            crypt_table: None,
        }
    }

    /// Set the resource limits
    pub fn limits(mut self, limits: SecurityLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Restrict lookups to one locale
    pub fn locale(mut self, locale: u16) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Set whether sector checksums are verified
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Share an existing crypt table instead of building a new one
    pub fn crypt_table(mut self, table: Arc<CryptTable>) -> Self {
        self.crypt_table = Some(table);
        self
    }

    /// Open an existing MPQ archive with these options
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened
    /// - `Error::InvalidHeader` / `Error::UnsupportedVersion` if the header is unusable
    /// - `Error::HashTable` / `Error::BlockTable` if a table is truncated
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Archive> {
        Archive::open_with_options(path, self)
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a file located by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File name as looked up
    pub filename: String,
    /// Index in hash table
    pub hash_index: usize,
    /// Index in block table
    pub block_index: usize,
    /// File locale
    pub locale: u16,
    /// Storage descriptor
    pub block: BlockEntry,
}

impl FileInfo {
    /// Uncompressed size
    pub fn file_size(&self) -> u64 {
        u64::from(self.block.file_size)
    }

    /// Stored size
    pub fn compressed_size(&self) -> u64 {
        u64::from(self.block.compressed_size)
    }

    /// Check if the file is compressed
    pub fn is_compressed(&self) -> bool {
        self.block.is_compressed()
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.block.is_encrypted()
    }
}

/// An occupied hash slot and the block it points at.
///
/// Names are not stored in the archive tables, so entries carry only the
/// verification hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Index in hash table
    pub hash_index: usize,
    /// Index in block table
    pub block_index: usize,
    /// Verification hash A of the path
    pub name_a: u32,
    /// Verification hash B of the path
    pub name_b: u32,
    /// File locale
    pub locale: u16,
    /// File platform
    pub platform: u16,
    /// Storage descriptor, `None` if the index is out of range
    pub block: Option<BlockEntry>,
}

impl FileEntry {
    /// Whether the entry points at a live block
    pub fn is_live(&self) -> bool {
        self.block.is_some_and(|b| b.is_live())
    }
}

/// An MPQ archive
#[derive(Debug)]
pub struct Archive {
    /// Path to the archive file
    path: PathBuf,
    /// Archive file reader, one extraction at a time
    reader: Mutex<BufReader<File>>,
    /// MPQ header
    header: MpqHeader,
    /// Hash table
    hash_table: HashTable,
    /// Block table
    block_table: BlockTable,
    crypt: Arc<CryptTable>,
    limits: SecurityLimits,
    locale: Option<u16>,
    verify_checksums: bool,
}

impl Archive {
    /// Open an existing MPQ archive
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, OpenOptions::default())
    }

    /// Open an archive with specific options.
    ///
    /// The header and both tables are loaded here; any failure aborts the
    /// open and no archive is returned.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        let header = MpqHeader::read_with_limits(&mut reader, &options.limits)?;
        let crypt = options
            .crypt_table
            .unwrap_or_else(|| Arc::new(CryptTable::new()));

        log::debug!(
            "Opening {}: hash table 0x{:08X} ({} entries), block table 0x{:08X} ({} entries)",
            path.display(),
            header.hash_table_pos,
            header.hash_table_entries,
            header.block_table_pos,
            header.block_table_entries
        );

        let hash_table = HashTable::read(
            &mut reader,
            &crypt,
            u64::from(header.hash_table_pos),
            header.hash_table_entries,
        )?;
        let block_table = BlockTable::read(
            &mut reader,
            &crypt,
            u64::from(header.block_table_pos),
            header.block_table_entries,
        )?;

        Ok(Self {
            path,
            reader: Mutex::new(reader),
            header,
            hash_table,
            block_table,
            crypt,
            limits: options.limits,
            locale: options.locale,
            verify_checksums: options.verify_checksums,
        })
    }

    /// Get the archive path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the MPQ header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Get the hash table
    pub fn hash_table(&self) -> &HashTable {
        &self.hash_table
    }

    /// Get the block table
    pub fn block_table(&self) -> &BlockTable {
        &self.block_table
    }

    /// Get the crypt table used by this archive
    pub fn crypt_table(&self) -> &Arc<CryptTable> {
        &self.crypt
    }

    /// Size of one sector in bytes
    pub fn sector_size(&self) -> usize {
        self.header.sector_size()
    }

    /// Find a file in the archive.
    ///
    /// Entries whose block is out of range, lacks the exists flag or is a
    /// delete marker are reported as absent.
    pub fn find_file(&self, name: &str) -> Option<FileInfo> {
        let hash = self.crypt.hash_path(name);
        let (hash_index, entry) = self.hash_table.find(&hash, self.locale)?;
        let block_index = entry.block_index()? as usize;

        let Some(block) = self.block_table.get(block_index) else {
            log::debug!(
                "{name}: hash slot {hash_index} points past the block table ({block_index} >= {})",
                self.block_table.size()
            );
            return None;
        };

        if !block.is_live() {
            log::debug!(
                "{name}: block {block_index} is not live (flags 0x{:08X})",
                block.flags.bits()
            );
            return None;
        }

        Some(FileInfo {
            filename: name.to_string(),
            hash_index,
            block_index,
            locale: entry.locale,
            block: *block,
        })
    }

    /// Check if a file exists
    pub fn contains(&self, name: &str) -> bool {
        self.find_file(name).is_some()
    }

    /// Read a file from the archive
    ///
    /// # Errors
    /// - `Error::FileNotFound` if the name does not resolve to a live file
    /// - `Error::Io` if the stored data cannot be read
    /// - `Error::SizeMismatch` / `Error::ChecksumMismatch` on corrupted data
    /// - `Error::UnsupportedCompression` / `Error::Compression` on undecodable data
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let info = self
            .find_file(name)
            .ok_or_else(|| Error::FileNotFound(name.to_string()))?;
        self.read_file_info(&info)
    }

    /// Read a file already located with [`Archive::find_file`]
    pub fn read_file_info(&self, info: &FileInfo) -> Result<Vec<u8>> {
        let mut reader = self.reader.lock();
        SectorExtractor::new(
            &mut *reader,
            &self.crypt,
            &self.limits,
            self.header.sector_size(),
        )
        .verify_checksums(self.verify_checksums)
        .extract(&info.filename, &info.block)
    }

    /// List every occupied hash slot with its block
    pub fn entries(&self) -> Vec<FileEntry> {
        self.hash_table
            .occupied()
            .map(|(hash_index, entry, block_index)| FileEntry {
                hash_index,
                block_index: block_index as usize,
                name_a: entry.name_a,
                name_b: entry.name_b,
                locale: entry.locale,
                platform: entry.platform,
                block: self.block_table.get(block_index as usize).copied(),
            })
            .collect()
    }

    /// Release the file handle and the tables
    pub fn close(self) {
        log::debug!("Closing {}", self.path.display());
    }
}
