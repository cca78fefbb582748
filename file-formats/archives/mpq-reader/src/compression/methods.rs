//! Compression method flags and decoder chain resolution

use super::decoders::{
    AdpcmMono, AdpcmStereo, BZip2, Decoder, Huffman, Lzma, PKWare, Sparse, Zlib,
};
use crate::{Error, Result};

/// Compression method flags, as found in the method byte
pub mod flags {
    /// Huffman encoding (WAVE files only)
    pub const HUFFMAN: u8 = 0x01;
    /// Deflate/zlib compression
    pub const ZLIB: u8 = 0x02;
    /// PKWare DCL compression
    pub const PKWARE: u8 = 0x08;
    /// BZip2 compression
    pub const BZIP2: u8 = 0x10;
    /// Sparse/RLE compression
    pub const SPARSE: u8 = 0x20;
    /// IMA ADPCM mono
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM stereo
    pub const ADPCM_STEREO: u8 = 0x80;
    /// LZMA compression (a value, not a flag combination)
    pub const LZMA: u8 = 0x12;
}

/// Methods in the order they are undone. ADPCM is applied first when
/// packing audio and sparse last when packing anything else.
static DECODE_ORDER: [(u8, &dyn Decoder); 7] = [
    (flags::BZIP2, &BZip2),
    (flags::PKWARE, &PKWare),
    (flags::ZLIB, &Zlib),
    (flags::HUFFMAN, &Huffman),
    (flags::ADPCM_STEREO, &AdpcmStereo),
    (flags::ADPCM_MONO, &AdpcmMono),
    (flags::SPARSE, &Sparse),
];

/// Ordered list of decoders named by a method byte
pub struct DecoderChain {
    mask: u8,
    steps: Vec<&'static dyn Decoder>,
}

impl DecoderChain {
    /// Resolve the decoders for a method byte.
    ///
    /// Fails on any bit with no known meaning.
    pub fn from_mask(mask: u8) -> Result<Self> {
        if mask == flags::LZMA {
            return Ok(Self {
                mask,
                steps: vec![&Lzma as &dyn Decoder],
            });
        }

        let known = DECODE_ORDER.iter().fold(0u8, |acc, (bit, _)| acc | bit);
        let unknown = mask & !known;
        if unknown != 0 {
            return Err(Error::UnsupportedCompression {
                mask: unknown,
                method: "unknown",
            });
        }

        // Some audio files carry both ADPCM bits; the data is stereo
        let both_adpcm = flags::ADPCM_MONO | flags::ADPCM_STEREO;
        let effective = if mask & both_adpcm == both_adpcm {
            log::debug!("Method 0x{mask:02X} sets both ADPCM bits, decoding as stereo");
            mask & !flags::ADPCM_MONO
        } else {
            mask
        };

        let steps = DECODE_ORDER
            .iter()
            .filter(|(bit, _)| effective & bit != 0)
            .map(|&(_, decoder)| decoder)
            .collect();

        Ok(Self { mask, steps })
    }

    /// The method byte this chain was built from
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Names of the decoders in application order
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|d| d.name()).collect()
    }

    /// Run every step in order
    pub fn run(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut current = data.to_vec();
        for step in &self.steps {
            current = step.decode(&current, expected_len)?;
            log::trace!(
                "Chain 0x{:02X}: {} produced {} bytes",
                self.mask,
                step.name(),
                current.len()
            );
        }

        Ok(current)
    }
}

impl std::fmt::Debug for DecoderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderChain")
            .field("mask", &format_args!("0x{:02X}", self.mask))
            .field("steps", &self.names())
            .finish()
    }
}
