//! Reconstruction of a file's bytes from its stored block

use crate::compression;
use crate::crypto::CryptTable;
use crate::security::SecurityLimits;
use crate::tables::BlockEntry;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};

/// Reads the block of one file and undoes encryption and compression.
///
/// Borrowing the reader keeps one extractor per call; the archive hands it
/// the locked file handle.
pub(crate) struct SectorExtractor<'a, R> {
    reader: &'a mut R,
    crypt: &'a CryptTable,
    limits: &'a SecurityLimits,
    sector_size: usize,
    verify_checksums: bool,
}

impl<'a, R: Read + Seek> SectorExtractor<'a, R> {
    pub(crate) fn new(
        reader: &'a mut R,
        crypt: &'a CryptTable,
        limits: &'a SecurityLimits,
        sector_size: usize,
    ) -> Self {
        Self {
            reader,
            crypt,
            limits,
            sector_size,
            verify_checksums: true,
        }
    }

    pub(crate) fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Extract the file described by `block`; `name` derives the file key
    pub(crate) fn extract(&mut self, name: &str, block: &BlockEntry) -> Result<Vec<u8>> {
        if block.is_patch_file() {
            return Err(Error::UnsupportedFile {
                file: name.to_string(),
                reason: "patch files need their base archive",
            });
        }

        self.limits
            .check_file_size(name, u64::from(block.file_size))?;
        self.limits
            .check_file_size(name, u64::from(block.compressed_size))?;

        let key = block.is_encrypted().then(|| {
            self.crypt
                .file_key(name, block.file_pos, block.file_size, block.has_fix_key())
        });

        log::debug!(
            "Extracting {name}: pos=0x{:08X}, stored={}, size={}, flags=0x{:08X}",
            block.file_pos,
            block.compressed_size,
            block.file_size,
            block.flags.bits()
        );

        if block.file_size == 0 {
            return Ok(Vec::new());
        }

        let data = if block.is_single_unit() {
            self.read_single_unit(name, block, key)?
        } else if block.is_compressed() {
            self.read_sectored(name, block, key)?
        } else {
            self.read_uncompressed(block, key)?
        };

        if data.len() != block.file_size as usize {
            return Err(Error::SizeMismatch {
                file: name.to_string(),
                expected: u64::from(block.file_size),
                actual: data.len() as u64,
            });
        }

        Ok(data)
    }

    fn read_at(&mut self, pos: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(pos))?;
        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    fn read_single_unit(
        &mut self,
        name: &str,
        block: &BlockEntry,
        key: Option<u32>,
    ) -> Result<Vec<u8>> {
        let mut data = self.read_at(u64::from(block.file_pos), block.compressed_size as usize)?;

        if let Some(key) = key {
            self.crypt.decrypt_bytes(&mut data, key);
        }

        let expected = block.file_size as usize;
        if block.is_compressed() && data.len() != expected {
            log::trace!("{name}: single unit of {} bytes is compressed", data.len());
            decompress_unit(block, &data, expected)
        } else {
            Ok(data)
        }
    }

    fn read_sectored(
        &mut self,
        name: &str,
        block: &BlockEntry,
        key: Option<u32>,
    ) -> Result<Vec<u8>> {
        let file_size = block.file_size as usize;
        let sector_count = file_size.div_ceil(self.sector_size);
        let table_words = sector_count + 1 + usize::from(block.has_sector_crc());
        let table_size = table_words * 4;

        if (block.compressed_size as usize) < table_size {
            return Err(Error::invalid_format(format!(
                "{name}: stored size {} too small for a {table_words}-entry sector table",
                block.compressed_size
            )));
        }

        let stored = self.read_at(u64::from(block.file_pos), block.compressed_size as usize)?;

        let mut table = stored[..table_size].to_vec();
        if let Some(key) = key {
            self.crypt.decrypt_bytes(&mut table, key.wrapping_sub(1));
        }
        let offsets: Vec<usize> = table
            .chunks_exact(4)
            .map(|word| LittleEndian::read_u32(word) as usize)
            .collect();

        validate_offsets(name, &offsets, stored.len())?;

        log::debug!(
            "{name}: {sector_count} sectors of {} bytes, data at {}..{}",
            self.sector_size,
            offsets[0],
            offsets[sector_count]
        );

        let checksums = if block.has_sector_crc() && self.verify_checksums {
            let region = &stored[offsets[sector_count]..offsets[sector_count + 1]];
            parse_checksums(name, region, sector_count)
        } else {
            None
        };

        let mut output = Vec::with_capacity(file_size);
        for i in 0..sector_count {
            let mut sector = stored[offsets[i]..offsets[i + 1]].to_vec();
            let expected = (file_size - i * self.sector_size).min(self.sector_size);

            if let Some(key) = key {
                self.crypt
                    .decrypt_bytes(&mut sector, key.wrapping_add(i as u32));
            }

            if let Some(expected_sum) = checksums.as_ref().map(|sums| sums[i]) {
                verify_sector_checksum(name, i, &sector, expected_sum)?;
            }

            let decoded = if sector.len() == expected {
                sector
            } else {
                log::trace!(
                    "{name}: sector {i} stored in {} bytes, expands to {expected}",
                    sector.len()
                );
                decompress_unit(block, &sector, expected)?
            };

            if decoded.len() != expected {
                return Err(Error::SizeMismatch {
                    file: format!("{name} (sector {i})"),
                    expected: expected as u64,
                    actual: decoded.len() as u64,
                });
            }

            output.extend_from_slice(&decoded);
        }

        Ok(output)
    }

    fn read_uncompressed(&mut self, block: &BlockEntry, key: Option<u32>) -> Result<Vec<u8>> {
        let mut data = self.read_at(u64::from(block.file_pos), block.file_size as usize)?;

        if let Some(key) = key {
            for (i, sector) in data.chunks_mut(self.sector_size).enumerate() {
                self.crypt
                    .decrypt_bytes(sector, key.wrapping_add(i as u32));
            }
        }

        Ok(data)
    }
}

fn decompress_unit(block: &BlockEntry, data: &[u8], expected: usize) -> Result<Vec<u8>> {
    if block.is_imploded() {
        compression::explode(data, expected)
    } else {
        compression::decompress(data, expected)
    }
}

/// Offsets must be non-decreasing and stay inside the stored block
fn validate_offsets(name: &str, offsets: &[usize], stored_len: usize) -> Result<()> {
    let table_end = offsets.len() * 4;

    if offsets[0] < table_end {
        return Err(Error::invalid_format(format!(
            "{name}: first sector at {} overlaps the {table_end}-byte sector table",
            offsets[0]
        )));
    }

    if let Some(i) = offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(Error::invalid_format(format!(
            "{name}: sector offsets decrease at entry {i} ({} > {})",
            offsets[i],
            offsets[i + 1]
        )));
    }

    if let Some(&last) = offsets.last()
        && last > stored_len
    {
        return Err(Error::invalid_format(format!(
            "{name}: sector data ends at {last}, past the stored size {stored_len}"
        )));
    }

    Ok(())
}

/// Parse the checksum block if it is stored raw
fn parse_checksums(name: &str, region: &[u8], sector_count: usize) -> Option<Vec<u32>> {
    let raw_size = sector_count * 4;

    if region.len() == raw_size {
        Some(
            region
                .chunks_exact(4)
                .map(LittleEndian::read_u32)
                .collect(),
        )
    } else if region.is_empty() {
        log::debug!("{name}: sector checksum flag set but no checksum block stored");
        None
    } else if region.len() < raw_size {
        log::debug!(
            "{name}: checksum block is compressed ({} of {raw_size} bytes), not verifying",
            region.len()
        );
        None
    } else {
        log::warn!(
            "{name}: checksum block of {} bytes is larger than {raw_size}, not verifying",
            region.len()
        );
        None
    }
}

fn verify_sector_checksum(name: &str, index: usize, sector: &[u8], expected: u32) -> Result<()> {
    // Zero means no checksum was recorded for this sector
    if expected == 0 {
        return Ok(());
    }

    let actual = sector_checksum(sector);
    if actual != expected {
        return Err(Error::ChecksumMismatch {
            file: format!("{name} (sector {index})"),
            expected,
            actual,
        });
    }

    Ok(())
}

/// Adler-32 seeded with 0, as stored in sector checksum blocks
pub(crate) fn sector_checksum(data: &[u8]) -> u32 {
    let mut adler = adler2::Adler32::from_checksum(0);
    adler.write_slice(data);
    adler.checksum()
}
