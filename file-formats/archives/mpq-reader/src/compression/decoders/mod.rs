//! Individual decompression algorithms

mod adpcm;
mod bzip2;
mod huffman;
mod lzma;
mod pkware;
mod sparse;
mod zlib;

pub use self::adpcm::{AdpcmMono, AdpcmStereo};
pub use self::bzip2::BZip2;
pub use self::huffman::Huffman;
pub use self::lzma::Lzma;
pub use self::pkware::PKWare;
pub use self::sparse::Sparse;
pub use self::zlib::Zlib;

use crate::Result;

/// A single decompression step.
///
/// `expected_len` is the size the whole chain should produce. Decoders use
/// it to size buffers and to stop early: an oversized stream either fails or
/// is cut off a few bytes past it, and the caller checks the final size.
pub trait Decoder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Decode `data`, producing roughly `expected_len` bytes
    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}
