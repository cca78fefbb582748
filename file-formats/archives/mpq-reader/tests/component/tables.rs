//! Hash and block tables through their on-disk encoding

use mpq_reader::crypto::{BLOCK_TABLE_KEY_NAME, HASH_TABLE_KEY_NAME};
use mpq_reader::{
    BlockEntry, BlockFlags, BlockTable, CryptTable, HashEntry, HashSlot, HashTable, HashType,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn encrypt_table(crypt: &CryptTable, records: &[[u8; 16]], key_name: &str) -> Vec<u8> {
    let mut raw: Vec<u8> = records.iter().flatten().copied().collect();
    crypt.encrypt_bytes(&mut raw, crypt.hash_string(key_name, HashType::FileKey));
    raw
}

#[test]
fn test_hash_table_decrypts_and_finds() {
    let crypt = CryptTable::new();
    let hash = crypt.hash_path("war3map.j");
    let mut entries = vec![HashEntry::empty(); 8];
    entries[hash.start_index(8)] = HashEntry {
        name_a: hash.name_a,
        name_b: hash.name_b,
        locale: 0,
        platform: 0,
        slot: HashSlot::Occupied(0),
    };

    let records: Vec<_> = entries.iter().map(HashEntry::to_bytes).collect();
    let on_disk = encrypt_table(&crypt, &records, HASH_TABLE_KEY_NAME);
    let table = HashTable::from_bytes(&on_disk, &crypt, 8).unwrap();

    assert_eq!(table.entries(), entries.as_slice());
    let (index, entry) = table.find(&hash, None).unwrap();
    assert_eq!(index, hash.start_index(8));
    assert_eq!(entry.block_index(), Some(0));
    assert!(table.find(&crypt.hash_path("war3map.w3e"), None).is_none());
}

#[test]
fn test_table_bytes_re_encrypt_to_original() {
    let crypt = CryptTable::new();
    let blocks = [
        BlockEntry {
            file_pos: 0x20,
            compressed_size: 17,
            file_size: 40,
            flags: BlockFlags::EXISTS | BlockFlags::COMPRESS,
        },
        BlockEntry::empty(),
    ];
    let records: Vec<_> = blocks.iter().map(BlockEntry::to_bytes).collect();
    let on_disk = encrypt_table(&crypt, &records, BLOCK_TABLE_KEY_NAME);

    let key = crypt.hash_string(BLOCK_TABLE_KEY_NAME, HashType::FileKey);
    let mut round = on_disk.clone();
    crypt.decrypt_bytes(&mut round, key);
    crypt.encrypt_bytes(&mut round, key);
    assert_eq!(round, on_disk);

    let table = BlockTable::from_bytes(&on_disk, &crypt, 2).unwrap();
    assert_eq!(table.entries(), &blocks);
}

proptest! {
    // Any mix of never-used and deleted slots must end the probe
    #[test]
    fn prop_probe_terminates(slots in prop::collection::vec(any::<bool>(), 1usize..=64), path in "[a-z]{1,12}") {
        let size = slots.len().next_power_of_two();
        let entries: Vec<HashEntry> = (0..size)
            .map(|i| HashEntry {
                slot: if slots.get(i).copied().unwrap_or(false) {
                    HashSlot::Deleted
                } else {
                    HashSlot::Empty
                },
                ..HashEntry::empty()
            })
            .collect();

        let table = HashTable::from_entries(entries).unwrap();
        let crypt = CryptTable::new();
        prop_assert!(table.find(&crypt.hash_path(&path), None).is_none());
    }
}
