//! Shared loading path for the encrypted fixed-size tables

use crate::crypto::{CryptTable, HashType};
use crate::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};

/// Size in bytes of one hash or block table entry
pub(crate) const TABLE_ENTRY_SIZE: usize = 16;

/// Decrypt a raw table buffer with the key derived from `key_name`
pub(crate) fn decrypt_table_data(crypt: &CryptTable, data: &mut [u8], key_name: &str) {
    let key = crypt.hash_string(key_name, HashType::FileKey);
    crypt.decrypt_bytes(data, key);
}

/// Seek to a table, read `entries` fixed-size records and decrypt them.
///
/// A short read means the archive is truncated; `table_error` turns that
/// into the table's own error variant.
pub(crate) fn read_encrypted_table<R, F>(
    reader: &mut R,
    crypt: &CryptTable,
    offset: u64,
    entries: u32,
    key_name: &str,
    table_error: F,
) -> Result<Vec<u8>>
where
    R: Read + Seek,
    F: Fn(String) -> Error,
{
    let byte_size = entries as usize * TABLE_ENTRY_SIZE;

    reader.seek(SeekFrom::Start(offset))?;
    let mut raw_data = vec![0u8; byte_size];
    reader.read_exact(&mut raw_data).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            table_error(format!(
                "Truncated table: expected {byte_size} bytes at offset 0x{offset:08X}"
            ))
        } else {
            Error::Io(e)
        }
    })?;

    decrypt_table_data(crypt, &mut raw_data, key_name);
    Ok(raw_data)
}
