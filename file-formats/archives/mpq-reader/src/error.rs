//! Error types for the MPQ reader

use std::io;
use thiserror::Error;

/// Result type alias for MPQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MPQ operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred (open failure, short read mid-extraction)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive header is missing, malformed or out of bounds
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Unsupported MPQ format version
    #[error("Unsupported MPQ version: {0}")]
    UnsupportedVersion(u16),

    /// Invalid MPQ format or corrupted data structure
    #[error("Invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// Hash table error
    #[error("Hash table error: {0}")]
    HashTable(String),

    /// Block table error
    #[error("Block table error: {0}")]
    BlockTable(String),

    /// File not found in archive (absent, deleted, or a delete marker)
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A compression mask names a method this reader cannot decode
    #[error("Unsupported compression method: 0x{mask:02X} ({method})")]
    UnsupportedCompression {
        /// The offending mask bits
        mask: u8,
        /// Human readable method name, or "unknown"
        method: &'static str,
    },

    /// A decoder failed on the stored bytes
    #[error("Compression error: {0}")]
    Compression(String),

    /// The file exists but is of a kind that cannot be extracted directly
    #[error("Unsupported file {file}: {reason}")]
    UnsupportedFile {
        /// Logical path of the file
        file: String,
        /// Why the file cannot be extracted
        reason: &'static str,
    },

    /// Decoded data does not have the size recorded in the block table
    #[error("Size mismatch for {file}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// File or sector description
        file: String,
        /// Expected size
        expected: u64,
        /// Actual size
        actual: u64,
    },

    /// Sector checksum mismatch
    #[error("Checksum mismatch for {file}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// File or sector description
        file: String,
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new InvalidHeader error
    pub fn invalid_header<S: Into<String>>(msg: S) -> Self {
        Error::InvalidHeader(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Create a new HashTable error
    pub fn hash_table<S: Into<String>>(msg: S) -> Self {
        Error::HashTable(msg.into())
    }

    /// Create a new BlockTable error
    pub fn block_table<S: Into<String>>(msg: S) -> Self {
        Error::BlockTable(msg.into())
    }

    /// Check if this error means the archive could not be opened at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidHeader(_) | Error::UnsupportedVersion(_)
        )
    }

    /// Check if this error indicates the stored data is corrupted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::InvalidHeader(_)
                | Error::HashTable(_)
                | Error::BlockTable(_)
                | Error::Compression(_)
                | Error::SizeMismatch { .. }
                | Error::ChecksumMismatch { .. }
        )
    }

    /// Check if this is the expected "no such file" outcome of a lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound(_))
    }
}
