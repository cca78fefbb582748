//! Cryptographic primitives for MPQ archives
//!
//! Everything here is driven by one [`CryptTable`]: 0x500 constants produced
//! by a fixed linear congruential generator. The same table feeds:
//!
//! - **Path hashing**: four hash families (table offset, verify A, verify B,
//!   file key) selected by the table row.
//! - **The block cipher**: a keyed stream cipher over 32-bit little-endian
//!   words, used for the hash and block tables and for file sectors.
//!
//! The table is an ordinary value. Construct it once and share it by
//! reference (or `Arc`) with every component that hashes or decrypts.
//!
//! ```
//! use mpq_reader::crypto::{CryptTable, HashType};
//!
//! let table = CryptTable::new();
//! let hash = table.hash_path("Units\\Human\\Footman.mdx");
//! assert_eq!(hash.name_a, table.hash_string("units/human/footman.mdx", HashType::NameA));
//!
//! let mut words = [0x1234_5678u32, 0x9ABC_DEF0];
//! table.encrypt_block(&mut words, 0xC1EB_1CEF);
//! table.decrypt_block(&mut words, 0xC1EB_1CEF);
//! assert_eq!(words, [0x1234_5678, 0x9ABC_DEF0]);
//! ```

mod cipher;
mod hash;
mod table;

pub use hash::{HashType, PathHash, base_name};
pub use table::{CRYPT_TABLE_SIZE, CryptTable};

/// Name whose file-key hash encrypts the hash table
pub const HASH_TABLE_KEY_NAME: &str = "(hash table)";

/// Name whose file-key hash encrypts the block table
pub const BLOCK_TABLE_KEY_NAME: &str = "(block table)";
