//! Hashing and cipher properties

use mpq_reader::crypto::{CryptTable, HashType, base_name};
use proptest::prelude::*;
use std::sync::OnceLock;

fn table() -> &'static CryptTable {
    static TABLE: OnceLock<CryptTable> = OnceLock::new();
    TABLE.get_or_init(CryptTable::new)
}

const HASH_TYPES: [HashType; 4] = [
    HashType::TableOffset,
    HashType::NameA,
    HashType::NameB,
    HashType::FileKey,
];

#[test]
fn test_known_hashes() {
    let t = table();
    assert_eq!(t.hash_string("(listfile)", HashType::TableOffset), 0x5F3DE859);
    assert_eq!(t.hash_string("(hash table)", HashType::FileKey), 0xC3AF3770);
    assert_eq!(t.hash_string("(block table)", HashType::FileKey), 0xEC83B3A3);
}

#[test]
fn test_separator_and_case_invariance() {
    let t = table();
    for hash_type in HASH_TYPES {
        assert_eq!(
            t.hash_string("a\\b", hash_type),
            t.hash_string("A/B", hash_type)
        );
    }
}

#[test]
fn test_shared_table_is_stable() {
    let a = CryptTable::new();
    assert_eq!(a.entries(), table().entries());
}

proptest! {
    #[test]
    fn prop_hash_ignores_case_and_slashes(path in "[a-zA-Z0-9_./\\\\]{0,40}") {
        let t = table();
        let canonical = path.to_ascii_uppercase().replace('/', "\\");
        for hash_type in HASH_TYPES {
            prop_assert_eq!(t.hash_string(&path, hash_type), t.hash_string(&canonical, hash_type));
        }
    }

    #[test]
    fn prop_block_round_trip(words in prop::collection::vec(any::<u32>(), 0..256), key in any::<u32>()) {
        let t = table();
        let mut data = words.clone();
        t.encrypt_block(&mut data, key);
        t.decrypt_block(&mut data, key);
        prop_assert_eq!(data, words);
    }

    #[test]
    fn prop_byte_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..1024), key in any::<u32>()) {
        let t = table();
        let mut data = bytes.clone();
        t.encrypt_bytes(&mut data, key);
        t.decrypt_bytes(&mut data, key);
        prop_assert_eq!(data, bytes);
    }

    #[test]
    fn prop_file_key_uses_base_name(dir in "[a-z]{1,8}", name in "[a-z]{1,8}\\.[a-z]{3}") {
        let t = table();
        let full = format!("{dir}\\{name}");
        prop_assert_eq!(base_name(&full), name.as_str());
        prop_assert_eq!(t.file_key(&full, 0, 0, false), t.file_key(&name, 0, 0, false));
    }
}
