//! PKWare Data Compression Library decoder

use super::Decoder;
use crate::{Error, Result};
use pklib::ExplodeReader;
use std::io::Read;

/// PKWare DCL "explode", method bit 0x08 and the legacy IMPLODE block flag.
///
/// The stream carries its own two-byte header (literal mode and dictionary
/// size), so no parameters are needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PKWare;

impl Decoder for PKWare {
    fn name(&self) -> &'static str {
        "pkware"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let fail = |e: &dyn std::fmt::Display| {
            log::debug!("PKWare decompression failed with input size {}: {e}", data.len());
            Error::compression(format!("PKWare decompression failed: {e}"))
        };

        let reader = ExplodeReader::new(data).map_err(|e| fail(&e))?;
        let mut output = Vec::with_capacity(expected_len);
        reader
            .take(expected_len as u64 + 1)
            .read_to_end(&mut output)
            .map_err(|e| fail(&e))?;

        Ok(output)
    }
}
