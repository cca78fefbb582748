//! # mpq_reader - MoPaQ archive reader
//!
//! Reads files out of MPQ (Mo'PaQ) archives: a single container file holding
//! many logical files, indexed by two encrypted tables and located by a hash
//! of each file's path.
//!
//! ## Features
//!
//! - Base header layout of every format version (extended tables are ignored)
//! - Encrypted hash and block tables
//! - Single-unit and sectored files, with per-sector encryption
//! - zlib, bzip2, PKWare DCL, LZMA, Huffman, ADPCM and sparse decompression
//! - Sector checksum verification
//! - Thread-safe extraction from one open archive
//!
//! ## Examples
//!
//! ```no_run
//! use mpq_reader::Archive;
//!
//! # fn main() -> Result<(), mpq_reader::Error> {
//! let archive = Archive::open("example.mpq")?;
//!
//! if archive.contains("(listfile)") {
//!     let listfile = archive.read_file("(listfile)")?;
//!     println!("{}", String::from_utf8_lossy(&listfile));
//! }
//!
//! for entry in archive.entries() {
//!     println!("{:08X}:{:08X} live={}", entry.name_a, entry.name_b, entry.is_live());
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod archive;
pub mod compression;
pub mod crypto;
pub mod error;
mod extract;
pub mod header;
pub mod security;
pub mod tables;

// Re-export commonly used types
pub use archive::{Archive, FileEntry, FileInfo, OpenOptions};
pub use crypto::{CryptTable, HashType};
pub use error::{Error, Result};
pub use header::{FormatVersion, MpqHeader};
pub use security::SecurityLimits;
pub use tables::{BlockEntry, BlockFlags, BlockTable, HashEntry, HashSlot, HashTable};

/// MPQ signature constants
pub mod signatures {
    /// Standard MPQ archive signature ('MPQ\x1A')
    pub const MPQ_ARCHIVE: u32 = 0x1A51504D;
}

/// Block size calculation
#[inline]
pub fn calculate_sector_size(block_size_shift: u16) -> usize {
    512 << block_size_shift
}

/// Check if a value is a power of two
#[inline]
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}
