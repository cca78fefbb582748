//! The precomputed constant table shared by hashing and the block cipher

/// Number of 32-bit constants in the table (five rows of 256)
pub const CRYPT_TABLE_SIZE: usize = 0x500;

/// Row offset of the constants used by the cipher key schedule
pub(crate) const CIPHER_ROW: usize = 0x400;

const fn generate_crypt_table() -> [u32; CRYPT_TABLE_SIZE] {
    let mut table = [0u32; CRYPT_TABLE_SIZE];
    let mut seed: u32 = 0x0010_0001;

    let mut index_a = 0;
    while index_a < 0x100 {
        let mut index_b = index_a;
        let mut i = 0;
        while i < 5 {
            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let high = (seed & 0xFFFF) << 16;
            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let low = seed & 0xFFFF;

            table[index_b] = high | low;

            i += 1;
            index_b += 0x100;
        }
        index_a += 1;
    }

    table
}

/// Immutable table of pseudo-random constants driving both the path hash and
/// the keyed cipher.
///
/// The table is a pure function of fixed constants. Build it once, keep it in
/// an `Arc` and hand out shared references; nothing mutates it afterwards, so
/// concurrent readers need no synchronisation.
///
/// ```
/// use mpq_reader::crypto::{CryptTable, HashType};
///
/// let table = CryptTable::new();
/// assert_eq!(table.hash_string("(hash table)", HashType::FileKey), 0xC3AF3770);
/// ```
#[derive(Clone)]
pub struct CryptTable {
    entries: [u32; CRYPT_TABLE_SIZE],
}

impl CryptTable {
    /// Build the table from the format's generator seed
    pub const fn new() -> Self {
        Self {
            entries: generate_crypt_table(),
        }
    }

    /// Look up a single constant
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `0x500`.
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        self.entries[index]
    }

    /// All constants, row-major
    pub fn entries(&self) -> &[u32; CRYPT_TABLE_SIZE] {
        &self.entries
    }
}

impl Default for CryptTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CryptTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}
