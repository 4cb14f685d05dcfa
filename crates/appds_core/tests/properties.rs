//! Property tests shared by both store implementations.

use appds_core::names::conflicts;
use appds_core::{DataStore, DataStoreExt, MemoryStore, SharedMemStore, StoreError};
use appds_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_keys_never_nest(names in prop::collection::vec(dot_name_strategy(), 1..16)) {
        with_memory_store(|store| {
            for name in &names {
                match store.set(name, name.as_str()) {
                    Ok(()) | Err(StoreError::InvalidName { .. }) => {}
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }

            let keys = store.list("").unwrap();
            for a in &keys {
                for b in &keys {
                    prop_assert!(!conflicts(a, b), "{} vs {}", a, b);
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn json_values_survive_storage(name in key_name_strategy(), value in json_value_strategy()) {
        let store = MemoryStore::new();
        store.set(&name, &value).unwrap();
        prop_assert_eq!(store.get::<Value>(&name).unwrap(), Some(value.clone()));

        let exported = store.export_json().unwrap();
        prop_assert_eq!(exported.get(&name), Some(&value));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn shared_store_matches_memory_store(names in prop::collection::vec(dot_name_strategy(), 1..8)) {
        let shared = TestStore::with_config(|c| c.dot_names(true));
        let memory = MemoryStore::new().with_dot_names(true);

        for (i, name) in names.iter().enumerate() {
            let a = shared.set(name, &i).is_ok();
            let b = memory.set(name, &i).is_ok();
            prop_assert_eq!(a, b, "{}", name);
        }

        let mut shared_keys = shared.list("").unwrap();
        shared_keys.sort();
        prop_assert_eq!(shared_keys, memory.list("").unwrap());
        prop_assert_eq!(shared.export_json().unwrap(), memory.export_json().unwrap());
    }

    #[test]
    fn any_valid_store_name_opens_and_cleans_up(name in store_name_strategy()) {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path()).name(name.clone());
        let index = dir.path().join(format!("{name}I"));
        let expiry = dir.path().join(format!("{name}E"));

        let store = SharedMemStore::open(config.clone()).unwrap();
        prop_assert!(store.is_owner());
        store.set("k", &1u8).unwrap();
        prop_assert!(index.exists() && expiry.exists());

        let peer = SharedMemStore::open(config).unwrap();
        prop_assert!(!peer.is_owner());
        prop_assert_eq!(peer.get::<u8>("k").unwrap(), Some(1));
        drop(peer);

        drop(store);
        prop_assert!(!index.exists() && !expiry.exists());
        prop_assert!(!dir.path().join("k").exists());
    }
}
