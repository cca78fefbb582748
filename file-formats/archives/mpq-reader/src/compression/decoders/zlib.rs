//! Deflate decoder (zlib-wrapped streams)

use super::Decoder;
use crate::{Error, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// zlib/deflate, method bit 0x02
#[derive(Debug, Clone, Copy, Default)]
pub struct Zlib;

impl Decoder for Zlib {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut decompressed = Vec::with_capacity(expected_len);

        // One byte past the expected size is enough to report a mismatch
        ZlibDecoder::new(data)
            .take(expected_len as u64 + 1)
            .read_to_end(&mut decompressed)
            .map_err(|e| {
                log::debug!("Zlib decompression failed: {e}");
                log::trace!(
                    "First 16 bytes of data: {:02X?}",
                    &data[..16.min(data.len())]
                );
                Error::compression(format!("Zlib decompression failed: {e}"))
            })?;

        Ok(decompressed)
    }
}
