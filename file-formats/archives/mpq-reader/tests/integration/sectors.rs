//! Sectored files: offset tables, per-sector keys and checksums

use crate::common::{
    ArchiveWriter, Packing, TestFile, generate_repetitive_data, generate_test_data, temp_dir,
};
use mpq_reader::{Archive, Error, OpenOptions};
use pretty_assertions::assert_eq;

// Shift 0 gives 512-byte sectors, so small payloads span several
const SHIFT: u16 = 0;
const SECTOR: usize = 512;

#[test]
fn test_compressed_sectors_each_method() {
    let dir = temp_dir();
    let data = generate_repetitive_data(b"sectored payload ", SECTOR * 5 + 77);

    let path = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("zlib.dat", &data).packed(Packing::Zlib))
        .add(TestFile::new("bzip2.dat", &data).packed(Packing::BZip2))
        .add(TestFile::new("pkware.dat", &data).packed(Packing::PKWare))
        .add(TestFile::new("implode.dat", &data).packed(Packing::Implode))
        .write_to(&dir, "sectors.mpq");

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.sector_size(), SECTOR);

    for name in ["zlib.dat", "bzip2.dat", "pkware.dat", "implode.dat"] {
        assert_eq!(archive.read_file(name).unwrap(), data, "{name}");
    }
}

#[test]
fn test_scrambled_sectors() {
    let dir = temp_dir();
    // Scrambled bytes; sectors that do not shrink are stored raw
    let data: Vec<u8> = (0u32..(SECTOR as u32 * 3))
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
        .collect();

    let path = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("noise.bin", &data).packed(Packing::Zlib).encrypted())
        .write_to(&dir, "noise.mpq");

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.read_file("noise.bin").unwrap(), data);
}

#[test]
fn test_encrypted_compressed_sectors() {
    let dir = temp_dir();
    let data = generate_repetitive_data(b"secret sector text ", SECTOR * 4);

    let path = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("maps\\secret.txt", &data).packed(Packing::Zlib).encrypted())
        .add(TestFile::new("maps\\fixed.txt", &data).packed(Packing::BZip2).fix_key())
        .write_to(&dir, "encrypted.mpq");

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.read_file("maps\\secret.txt").unwrap(), data);
    assert_eq!(archive.read_file("maps\\fixed.txt").unwrap(), data);
}

#[test]
fn test_uncompressed_sectors() {
    let dir = temp_dir();
    let data = generate_test_data(SECTOR * 3 + 5);

    let path = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("plain.bin", &data))
        .add(TestFile::new("hidden.bin", &data).encrypted())
        .write_to(&dir, "plain.mpq");

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.read_file("plain.bin").unwrap(), data);
    assert_eq!(archive.read_file("hidden.bin").unwrap(), data);
}

#[test]
fn test_sector_checksums_verified() {
    let dir = temp_dir();
    let data = generate_repetitive_data(b"checked ", SECTOR * 2 + 100);

    let writer = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("crc.dat", &data).packed(Packing::Zlib).sector_crc().encrypted());
    let path = writer.write_to(&dir, "crc.mpq");

    let archive = Archive::open(&path).unwrap();
    assert!(archive.find_file("crc.dat").unwrap().block.has_sector_crc());
    assert_eq!(archive.read_file("crc.dat").unwrap(), data);

    // Flip one byte of the last checksum entry, just before the hash table
    let mut bytes = writer.build();
    let table_pos = archive.header().hash_table_pos as usize;
    bytes[table_pos - 1] ^= 0xFF;
    let corrupt = dir.path().join("crc_bad.mpq");
    std::fs::write(&corrupt, bytes).unwrap();

    let archive = Archive::open(&corrupt).unwrap();
    let err = archive.read_file("crc.dat").unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));

    let lenient = OpenOptions::new().verify_checksums(false).open(&corrupt).unwrap();
    assert_eq!(lenient.read_file("crc.dat").unwrap(), data);
}

#[test]
fn test_corrupt_sector_data() {
    let dir = temp_dir();
    let data = generate_repetitive_data(b"fragile ", SECTOR * 2);

    let writer = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(TestFile::new("fragile.dat", &data).packed(Packing::Zlib))
        .add(TestFile::new("other.txt", b"still here").single_unit());
    let mut bytes = writer.build();

    let archive_path = writer.write_to(&dir, "ok.mpq");
    let block = Archive::open(&archive_path)
        .unwrap()
        .find_file("fragile.dat")
        .unwrap()
        .block;

    // Clobber the first sector's zlib stream after the method byte
    let first_sector = block.file_pos as usize + 3 * 4;
    for byte in &mut bytes[first_sector + 1..first_sector + 6] {
        *byte = 0xFF;
    }
    let path = dir.path().join("bad.mpq");
    std::fs::write(&path, bytes).unwrap();

    let archive = Archive::open(&path).unwrap();
    let err = archive.read_file("fragile.dat").unwrap_err();
    assert!(err.is_corruption(), "unexpected error: {err}");
    assert_eq!(archive.read_file("other.txt").unwrap(), b"still here");
}

#[test]
fn test_short_sector_is_size_mismatch() {
    let dir = temp_dir();
    let data = generate_repetitive_data(b"short ", 500);

    // The block claims one full sector but the stream inflates to 500 bytes
    let path = ArchiveWriter::new()
        .sector_shift(SHIFT)
        .add(
            TestFile::new("short.dat", &data)
                .packed(Packing::Zlib)
                .recorded_size(SECTOR as u32),
        )
        .write_to(&dir, "short.mpq");

    let archive = Archive::open(&path).unwrap();
    let err = archive.read_file("short.dat").unwrap_err();
    assert!(
        matches!(
            err,
            Error::SizeMismatch {
                expected: 512,
                actual: 500,
                ..
            }
        ),
        "unexpected error: {err}"
    );
}
