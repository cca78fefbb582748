//! IMA ADPCM decoders for 16-bit PCM audio
//!
//! A stream holds a zero byte, the bit shift used when packing, one initial
//! little-endian sample per channel, then one code byte per sample with the
//! channels interleaved.

use super::Decoder;
use crate::{Error, Result};

/// Initial step index for every channel
const INITIAL_ADPCM_STEP_INDEX: usize = 0x2C;

/// Largest usable step index
const MAX_STEP_INDEX: usize = 88;

/// Table for determining the next step index
const NEXT_STEP_TABLE: [i8; 32] = [
    -1, 0, -1, 4, -1, 2, -1, 6, -1, 1, -1, 5, -1, 3, -1, 7, -1, 1, -1, 5, -1, 3, -1, 7, -1, 2, -1,
    4, -1, 6, -1, 8,
];

/// Step size table for ADPCM decoding
const STEP_SIZE_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408, 449,
    494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066, 2272,
    2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630, 9493,
    10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

/// Code byte: repeat the predicted sample and lower the step index
const CODE_STEP_DOWN: u8 = 0x80;

/// Code byte: raise the step index, no sample emitted
const CODE_STEP_UP: u8 = 0x81;

/// IMA ADPCM mono, method bit 0x40
#[derive(Debug, Clone, Copy, Default)]
pub struct AdpcmMono;

/// IMA ADPCM stereo, method bit 0x80
#[derive(Debug, Clone, Copy, Default)]
pub struct AdpcmStereo;

impl Decoder for AdpcmMono {
    fn name(&self) -> &'static str {
        "adpcm-mono"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        decode_channels(data, expected_len, 1)
    }
}

impl Decoder for AdpcmStereo {
    fn name(&self) -> &'static str {
        "adpcm-stereo"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        decode_channels(data, expected_len, 2)
    }
}

fn decode_channels(input: &[u8], expected_len: usize, channel_count: usize) -> Result<Vec<u8>> {
    if input.is_empty() && expected_len == 0 {
        return Ok(Vec::new());
    }

    let header_len = 2 + 2 * channel_count;
    if input.len() < header_len {
        return Err(Error::compression(format!(
            "ADPCM stream of {} bytes is shorter than its {header_len}-byte header",
            input.len()
        )));
    }

    let bit_shift = u32::from(input[1]);
    let mut output = Vec::with_capacity(expected_len);

    let mut predicted = [0i16; 2];
    let mut step_indexes = [INITIAL_ADPCM_STEP_INDEX; 2];
    for (channel, sample) in input[2..header_len].chunks_exact(2).enumerate() {
        predicted[channel] = i16::from_le_bytes([sample[0], sample[1]]);
        write_sample(&mut output, predicted[channel]);
    }

    let mut channel = channel_count - 1;
    for &code in &input[header_len..] {
        if output.len() > expected_len {
            break;
        }

        channel = (channel + 1) % channel_count;

        match code {
            CODE_STEP_DOWN => {
                step_indexes[channel] = step_indexes[channel].saturating_sub(1);
                write_sample(&mut output, predicted[channel]);
            }
            CODE_STEP_UP => {
                step_indexes[channel] = (step_indexes[channel] + 8).min(MAX_STEP_INDEX);
                // The next code belongs to the same channel
                channel = (channel + 1) % channel_count;
            }
            _ => {
                let step_size = STEP_SIZE_TABLE[step_indexes[channel]];
                let base = step_size.checked_shr(bit_shift).unwrap_or(0);
                predicted[channel] =
                    decode_sample(i32::from(predicted[channel]), code, step_size, base);
                write_sample(&mut output, predicted[channel]);
                step_indexes[channel] = next_step_index(step_indexes[channel], code);
            }
        }
    }

    Ok(output)
}

fn write_sample(output: &mut Vec<u8>, sample: i16) {
    output.extend_from_slice(&sample.to_le_bytes());
}

fn next_step_index(step_index: usize, code: u8) -> usize {
    let change = NEXT_STEP_TABLE[usize::from(code & 0x1F)];
    (step_index as i32 + i32::from(change)).clamp(0, MAX_STEP_INDEX as i32) as usize
}

/// Bits 0..=5 add halving fractions of the step, bit 6 is the sign
fn decode_sample(predicted: i32, code: u8, step_size: i32, base: i32) -> i16 {
    let difference = (0..6u32)
        .filter(|&bit| code & (1 << bit) != 0)
        .fold(base, |acc, bit| acc + (step_size >> bit));

    let sample = if code & 0x40 != 0 {
        predicted - difference
    } else {
        predicted + difference
    };

    sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
