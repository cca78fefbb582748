//! Decompression for MPQ file data.
//!
//! A compressed unit starts with a method byte naming one or more
//! algorithms. The byte is resolved to a [`DecoderChain`] that undoes them
//! in a fixed order. Files flagged as imploded carry no method byte and are
//! a single PKWare DCL stream.

mod decoders;
mod methods;

pub use decoders::{
    AdpcmMono, AdpcmStereo, BZip2, Decoder, Huffman, Lzma, PKWare, Sparse, Zlib,
};
pub use methods::{DecoderChain, flags};

use crate::{Error, Result};

/// Decompress a unit whose first byte is the compression method mask
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let (&mask, payload) = data
        .split_first()
        .ok_or_else(|| Error::compression("Empty compressed data"))?;

    decompress_with(mask, payload, expected_len)
}

/// Decompress `data` with the methods named by `mask`
pub fn decompress_with(mask: u8, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let chain = DecoderChain::from_mask(mask)?;
    log::trace!(
        "Decompressing {} bytes with {:?} (expecting {expected_len})",
        data.len(),
        chain.names()
    );
    chain.run(data, expected_len)
}

/// Decompress a unit stored with the legacy implode flag
pub fn explode(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    PKWare.decode(data, expected_len)
}
