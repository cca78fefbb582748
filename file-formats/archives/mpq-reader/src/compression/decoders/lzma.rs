//! LZMA decoder

use super::Decoder;
use crate::{Error, Result};
use lzma_rs::decompress::{Options, UnpackedSize};
use std::io::{self, BufReader, Write};

/// Properties byte plus dictionary size, ahead of the unpacked size
const PROPS_LEN: usize = 5;

/// LZMA, method byte 0x12 (only valid on its own).
///
/// The stored stream starts with a filter byte that must be zero, followed
/// by the usual `.lzma` header (properties and unpacked size).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lzma;

impl Decoder for Lzma {
    fn name(&self) -> &'static str {
        "lzma"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let (&filter, stream) = data
            .split_first()
            .ok_or_else(|| Error::compression("Empty LZMA stream"))?;

        if filter != 0 {
            return Err(Error::compression(format!(
                "Unsupported LZMA filter 0x{filter:02X}"
            )));
        }

        let limit = expected_len.saturating_add(1);
        if let Some(declared) = declared_size(stream) {
            if declared > limit as u64 {
                return Err(Error::compression(format!(
                    "LZMA header declares {declared} bytes, expected {expected_len}"
                )));
            }
        }

        // Streams without a size run to an end marker. The dictionary buffer
        // holds everything until it wraps, so it is capped as well.
        let options = Options {
            unpacked_size: UnpackedSize::ReadFromHeader,
            memlimit: Some(limit),
            allow_incomplete: false,
        };

        let mut input = BufReader::new(stream);
        let mut output = BoundedWriter::new(limit, expected_len);
        lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options)
            .map_err(|e| Error::compression(format!("LZMA decompression failed: {e:?}")))?;

        Ok(output.buf)
    }
}

/// Unpacked size from the header, `None` when the stream has an end marker
fn declared_size(stream: &[u8]) -> Option<u64> {
    let bytes = stream.get(PROPS_LEN..PROPS_LEN + 8)?;
    let mut size = [0u8; 8];
    size.copy_from_slice(bytes);
    match u64::from_le_bytes(size) {
        u64::MAX => None,
        size => Some(size),
    }
}

/// Collects output and fails once `limit` bytes have been written
struct BoundedWriter {
    buf: Vec<u8>,
    limit: usize,
}

impl BoundedWriter {
    fn new(limit: usize, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            limit,
        }
    }
}

impl Write for BoundedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.buf.len();
        if room == 0 && !data.is_empty() {
            return Err(io::Error::other(format!(
                "output exceeds {} bytes",
                self.limit
            )));
        }

        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
