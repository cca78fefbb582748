//! Decoder chain through the public entry points

use crate::common::generate_repetitive_data;
use mpq_reader::Error;
use mpq_reader::compression::{DecoderChain, decompress, decompress_with, flags};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};

#[test]
fn test_bzip2_method_byte() {
    let original = generate_repetitive_data(b"bzip2 sector ", 4096);
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder.write_all(&original).unwrap();

    let mut unit = vec![flags::BZIP2];
    unit.extend(encoder.finish().unwrap());
    assert_eq!(decompress(&unit, original.len()).unwrap(), original);
}

#[test]
fn test_lzma_method_byte() {
    let original = generate_repetitive_data(b"lzma sector ", 2048);
    let mut unit = vec![flags::LZMA, 0];
    lzma_rs::lzma_compress(&mut Cursor::new(&original), &mut unit).unwrap();

    assert_eq!(decompress(&unit, original.len()).unwrap(), original);
}

#[test]
fn test_pkware_then_zlib() {
    let original = generate_repetitive_data(b"layered ", 1024);

    // Packing applies zlib first and PKWare last, so PKWare is undone first
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&original).unwrap();
    let deflated = encoder.finish().unwrap();
    let packed = pklib::implode_bytes(
        &deflated,
        pklib::CompressionMode::Binary,
        pklib::DictionarySize::Size2K,
    )
    .unwrap();

    let chain = DecoderChain::from_mask(flags::PKWARE | flags::ZLIB).unwrap();
    assert_eq!(chain.names(), ["pkware", "zlib"]);
    assert_eq!(
        decompress_with(flags::PKWARE | flags::ZLIB, &packed, original.len()).unwrap(),
        original
    );
}

#[test]
fn test_unknown_method_is_reported() {
    let err = decompress(&[0x04, 1, 2, 3], 8).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedCompression { mask: 0x04, method: "unknown" }
    ));
}
