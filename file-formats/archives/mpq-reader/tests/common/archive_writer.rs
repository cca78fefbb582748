//! Assembles small MPQ archives byte by byte for tests

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use mpq_reader::compression::flags;
use mpq_reader::crypto::{BLOCK_TABLE_KEY_NAME, HASH_TABLE_KEY_NAME};
use mpq_reader::header::{BASE_HEADER_SIZE, MPQ_HEADER_SIGNATURE};
use mpq_reader::{BlockEntry, BlockFlags, CryptTable, HashEntry, HashSlot, HashType};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// How a file's payload is compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    Raw,
    Zlib,
    BZip2,
    PKWare,
    /// Legacy implode flag, no method byte
    Implode,
}

/// One file to place in the archive
#[derive(Debug, Clone)]
pub struct TestFile {
    pub name: String,
    pub data: Vec<u8>,
    pub packing: Packing,
    pub single_unit: bool,
    pub encrypted: bool,
    pub fix_key: bool,
    pub sector_crc: bool,
    pub locale: u16,
    pub extra_flags: BlockFlags,
    pub clear_exists: bool,
    pub recorded_size: Option<u32>,
}

impl TestFile {
    pub fn new(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            packing: Packing::Raw,
            single_unit: false,
            encrypted: false,
            fix_key: false,
            sector_crc: false,
            locale: 0,
            extra_flags: BlockFlags::empty(),
            clear_exists: false,
            recorded_size: None,
        }
    }

    pub fn single_unit(mut self) -> Self {
        self.single_unit = true;
        self
    }

    pub fn packed(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn fix_key(mut self) -> Self {
        self.encrypted = true;
        self.fix_key = true;
        self
    }

    pub fn sector_crc(mut self) -> Self {
        self.sector_crc = true;
        self
    }

    pub fn locale(mut self, locale: u16) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_flags(mut self, flags: BlockFlags) -> Self {
        self.extra_flags |= flags;
        self
    }

    pub fn without_exists(mut self) -> Self {
        self.clear_exists = true;
        self
    }

    /// Record a different uncompressed size in the block table
    pub fn recorded_size(mut self, size: u32) -> Self {
        self.recorded_size = Some(size);
        self
    }
}

/// Builds a version 1 archive: header, file data, hash table, block table
#[derive(Debug)]
pub struct ArchiveWriter {
    crypt: CryptTable,
    sector_shift: u16,
    hash_entries: u32,
    files: Vec<TestFile>,
    deleted: Vec<String>,
    unused_slot: HashSlot,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            crypt: CryptTable::new(),
            sector_shift: 3,
            hash_entries: 16,
            files: Vec::new(),
            deleted: Vec::new(),
            unused_slot: HashSlot::Empty,
        }
    }

    pub fn hash_table_size(mut self, entries: u32) -> Self {
        self.hash_entries = entries;
        self
    }

    pub fn sector_shift(mut self, shift: u16) -> Self {
        self.sector_shift = shift;
        self
    }

    pub fn add(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    /// Mark the slot of an added file as deleted after layout
    pub fn delete_slot(mut self, name: &str) -> Self {
        self.deleted.push(name.to_string());
        self
    }

    /// Fill unused hash slots with deleted markers instead of never-used ones
    pub fn fill_deleted(mut self) -> Self {
        self.unused_slot = HashSlot::Deleted;
        self
    }

    fn sector_size(&self) -> usize {
        512 << self.sector_shift
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; BASE_HEADER_SIZE as usize];
        let mut blocks = Vec::with_capacity(self.files.len());

        for file in &self.files {
            let file_pos = data.len() as u32;
            let (stored, flags) = self.store(file, file_pos);

            let mut flags = flags | file.extra_flags | BlockFlags::EXISTS;
            if file.clear_exists {
                flags.remove(BlockFlags::EXISTS);
            }

            blocks.push(BlockEntry {
                file_pos,
                compressed_size: stored.len() as u32,
                file_size: file.recorded_size.unwrap_or(file.data.len() as u32),
                flags,
            });
            data.extend_from_slice(&stored);
        }

        let hash_table = self.hash_entries();

        let hash_table_pos = data.len() as u32;
        let mut raw: Vec<u8> = hash_table.iter().flat_map(|e| e.to_bytes()).collect();
        self.crypt.encrypt_bytes(
            &mut raw,
            self.crypt.hash_string(HASH_TABLE_KEY_NAME, HashType::FileKey),
        );
        data.extend_from_slice(&raw);

        let block_table_pos = data.len() as u32;
        let mut raw: Vec<u8> = blocks.iter().flat_map(|e| e.to_bytes()).collect();
        self.crypt.encrypt_bytes(
            &mut raw,
            self.crypt.hash_string(BLOCK_TABLE_KEY_NAME, HashType::FileKey),
        );
        data.extend_from_slice(&raw);

        let archive_size = data.len() as u32;
        let mut header = Vec::with_capacity(BASE_HEADER_SIZE as usize);
        header.write_u32::<LittleEndian>(MPQ_HEADER_SIGNATURE).unwrap();
        header.write_u32::<LittleEndian>(BASE_HEADER_SIZE).unwrap();
        header.write_u32::<LittleEndian>(archive_size).unwrap();
        header.write_u16::<LittleEndian>(0).unwrap();
        header.write_u16::<LittleEndian>(self.sector_shift).unwrap();
        header.write_u32::<LittleEndian>(hash_table_pos).unwrap();
        header.write_u32::<LittleEndian>(block_table_pos).unwrap();
        header.write_u32::<LittleEndian>(self.hash_entries).unwrap();
        header.write_u32::<LittleEndian>(blocks.len() as u32).unwrap();
        data[..header.len()].copy_from_slice(&header);

        data
    }

    /// Build and write to `dir/name`
    pub fn write_to(&self, dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, self.build()).expect("Failed to write test archive");
        path
    }

    fn hash_entries(&self) -> Vec<HashEntry> {
        let size = self.hash_entries as usize;
        let mut table = vec![
            HashEntry {
                slot: self.unused_slot,
                ..HashEntry::empty()
            };
            size
        ];
        let mut used = vec![false; size];

        for (block_index, file) in self.files.iter().enumerate() {
            let hash = self.crypt.hash_path(&file.name);
            let mut index = hash.start_index(size);
            while used[index] {
                index = (index + 1) % size;
            }
            used[index] = true;

            table[index] = HashEntry {
                name_a: hash.name_a,
                name_b: hash.name_b,
                locale: file.locale,
                platform: 0,
                slot: HashSlot::Occupied(block_index as u32),
            };

            if self.deleted.contains(&file.name) {
                table[index].slot = HashSlot::Deleted;
            }
        }

        table
    }

    fn store(&self, file: &TestFile, file_pos: u32) -> (Vec<u8>, BlockFlags) {
        let mut flags = BlockFlags::empty();
        if file.single_unit {
            flags |= BlockFlags::SINGLE_UNIT;
        }
        if file.encrypted {
            flags |= BlockFlags::ENCRYPTED;
        }
        if file.fix_key {
            flags |= BlockFlags::FIX_KEY;
        }
        match file.packing {
            Packing::Raw => {}
            Packing::Implode => flags |= BlockFlags::IMPLODE,
            _ => flags |= BlockFlags::COMPRESS,
        }

        let key = self.crypt.file_key(
            &file.name,
            file_pos,
            file.recorded_size.unwrap_or(file.data.len() as u32),
            file.fix_key,
        );

        if file.single_unit {
            let mut stored = pack(file.packing, &file.data);
            if file.encrypted {
                self.crypt.encrypt_bytes(&mut stored, key);
            }
            return (stored, flags);
        }

        if file.packing == Packing::Raw {
            let mut stored = file.data.clone();
            if file.encrypted {
                for (i, sector) in stored.chunks_mut(self.sector_size()).enumerate() {
                    self.crypt.encrypt_bytes(sector, key.wrapping_add(i as u32));
                }
            }
            return (stored, flags);
        }

        if file.sector_crc {
            flags |= BlockFlags::SECTOR_CRC;
        }

        let mut sectors: Vec<Vec<u8>> = file
            .data
            .chunks(self.sector_size())
            .map(|chunk| pack(file.packing, chunk))
            .collect();
        let checksums: Vec<u32> = sectors.iter().map(|s| adler_zero(s)).collect();

        if file.encrypted {
            for (i, sector) in sectors.iter_mut().enumerate() {
                self.crypt.encrypt_bytes(sector, key.wrapping_add(i as u32));
            }
        }

        let words = sectors.len() + 1 + usize::from(file.sector_crc);
        let mut offsets = vec![(words * 4) as u32];
        for sector in &sectors {
            offsets.push(offsets[offsets.len() - 1] + sector.len() as u32);
        }
        if file.sector_crc {
            offsets.push(offsets[offsets.len() - 1] + (checksums.len() * 4) as u32);
        }

        let mut table: Vec<u8> = offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        if file.encrypted {
            self.crypt.encrypt_bytes(&mut table, key.wrapping_sub(1));
        }

        let mut stored = table;
        for sector in &sectors {
            stored.extend_from_slice(sector);
        }
        if file.sector_crc {
            stored.extend(checksums.iter().flat_map(|c| c.to_le_bytes()));
        }

        (stored, flags)
    }
}

/// Compress one unit; fall back to raw bytes when packing does not help
pub fn pack(packing: Packing, data: &[u8]) -> Vec<u8> {
    let packed = match packing {
        Packing::Raw => return data.to_vec(),
        Packing::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::best());
            encoder.write_all(data).unwrap();
            with_method(flags::ZLIB, encoder.finish().unwrap())
        }
        Packing::BZip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
            encoder.write_all(data).unwrap();
            with_method(flags::BZIP2, encoder.finish().unwrap())
        }
        Packing::PKWare => with_method(flags::PKWARE, implode(data)),
        Packing::Implode => implode(data),
    };

    if packed.len() < data.len() {
        packed
    } else {
        data.to_vec()
    }
}

fn implode(data: &[u8]) -> Vec<u8> {
    pklib::implode_bytes(
        data,
        pklib::CompressionMode::Binary,
        pklib::DictionarySize::Size4K,
    )
    .unwrap()
}

fn with_method(method: u8, body: Vec<u8>) -> Vec<u8> {
    let mut unit = Vec::with_capacity(body.len() + 1);
    unit.push(method);
    unit.extend(body);
    unit
}

/// Adler-32 seeded with 0, the sector checksum
pub fn adler_zero(data: &[u8]) -> u32 {
    let mut adler = adler2::Adler32::from_checksum(0);
    adler.write_slice(data);
    adler.checksum()
}
