//! The keyed stream cipher protecting tables and file sectors

use super::table::{CIPHER_ROW, CryptTable};
use byteorder::{ByteOrder, LittleEndian};

/// Running cipher state for one encrypt or decrypt call
#[derive(Debug)]
struct KeyStream<'a> {
    table: &'a CryptTable,
    key: u32,
    seed: u32,
}

impl<'a> KeyStream<'a> {
    fn new(table: &'a CryptTable, key: u32) -> Self {
        Self {
            table,
            key,
            seed: 0xEEEE_EEEE,
        }
    }

    /// Mix the next table constant in and return the XOR mask for this word
    #[inline]
    fn mask(&mut self) -> u32 {
        self.seed = self
            .seed
            .wrapping_add(self.table.get(CIPHER_ROW + (self.key & 0xFF) as usize));
        self.key.wrapping_add(self.seed)
    }

    /// Advance the key schedule using the plaintext word
    #[inline]
    fn advance(&mut self, plain: u32) {
        self.key = (!self.key << 0x15).wrapping_add(0x1111_1111) | (self.key >> 0x0B);
        self.seed = plain
            .wrapping_add(self.seed)
            .wrapping_add(self.seed << 5)
            .wrapping_add(3);
    }

    #[inline]
    fn decrypt(&mut self, value: u32) -> u32 {
        let plain = value ^ self.mask();
        self.advance(plain);
        plain
    }

    #[inline]
    fn encrypt(&mut self, plain: u32) -> u32 {
        let value = plain ^ self.mask();
        self.advance(plain);
        value
    }
}

impl CryptTable {
    /// Decrypt a sequence of words in place
    pub fn decrypt_block(&self, data: &mut [u32], key: u32) {
        let mut stream = KeyStream::new(self, key);
        for value in data.iter_mut() {
            *value = stream.decrypt(*value);
        }
    }

    /// Encrypt a sequence of words in place
    pub fn encrypt_block(&self, data: &mut [u32], key: u32) {
        let mut stream = KeyStream::new(self, key);
        for value in data.iter_mut() {
            *value = stream.encrypt(*value);
        }
    }

    /// Decrypt little-endian bytes in place.
    ///
    /// Only whole words are encrypted on disk; a trailing 1-3 byte tail is
    /// stored in the clear and left untouched.
    pub fn decrypt_bytes(&self, data: &mut [u8], key: u32) {
        let mut stream = KeyStream::new(self, key);
        for chunk in data.chunks_exact_mut(4) {
            let plain = stream.decrypt(LittleEndian::read_u32(chunk));
            LittleEndian::write_u32(chunk, plain);
        }
    }

    /// Encrypt little-endian bytes in place, leaving any partial tail word
    pub fn encrypt_bytes(&self, data: &mut [u8], key: u32) {
        let mut stream = KeyStream::new(self, key);
        for chunk in data.chunks_exact_mut(4) {
            let value = stream.encrypt(LittleEndian::read_u32(chunk));
            LittleEndian::write_u32(chunk, value);
        }
    }
}
