//! Sparse run-length filter

use super::Decoder;
use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Sparse filter, method bit 0x20.
///
/// Layout: a big-endian `u32` output size, then runs. A control byte with
/// the high bit set is followed by `(b & 0x7F) + 1` literal bytes; otherwise
/// it stands for `(b & 0x7F) + 3` zero bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sparse;

impl Decoder for Sparse {
    fn name(&self) -> &'static str {
        "sparse"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        if data.len() < 5 {
            return Err(Error::compression("Sparse stream too short"));
        }

        let out_size = BigEndian::read_u32(&data[0..4]) as usize;
        if out_size > expected_len {
            return Err(Error::compression(format!(
                "Sparse output size {out_size} exceeds the expected {expected_len} bytes"
            )));
        }

        let mut output = Vec::with_capacity(out_size);
        let mut pos = 4;

        while pos < data.len() && output.len() < out_size {
            let control = data[pos];
            pos += 1;

            if control & 0x80 != 0 {
                let run = (control & 0x7F) as usize + 1;
                let literal = data.get(pos..pos + run).ok_or_else(|| {
                    Error::compression(format!("Sparse literal run of {run} bytes truncated"))
                })?;
                output.extend_from_slice(literal);
                pos += run;
            } else {
                let run = (control & 0x7F) as usize + 3;
                output.resize(output.len() + run, 0);
            }
        }

        output.truncate(out_size);
        Ok(output)
    }
}
