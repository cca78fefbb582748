//! BZip2 decoder

use super::Decoder;
use crate::{Error, Result};
use bzip2::read::BzDecoder;
use std::io::Read;

/// BZip2, method bit 0x10
#[derive(Debug, Clone, Copy, Default)]
pub struct BZip2;

impl Decoder for BZip2 {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut decompressed = Vec::with_capacity(expected_len);

        BzDecoder::new(data)
            .take(expected_len as u64 + 1)
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::compression(format!("BZip2 decompression failed: {e}")))?;

        Ok(decompressed)
    }
}
