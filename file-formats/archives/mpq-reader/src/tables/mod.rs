//! MPQ table structures (hash, block)

mod block;
mod common;
mod hash;

pub use block::{BlockEntry, BlockFlags, BlockTable};
pub use hash::{HashEntry, HashSlot, HashTable};

/// Size in bytes of one hash or block table record on disk
pub const TABLE_ENTRY_SIZE: usize = common::TABLE_ENTRY_SIZE;
