// crates/idis-core/tests/canonical.rs
// ============================================================================
// Module: Canonical Hashing Property Tests
// Description: Order-independence and stability of canonical JSON hashing.
// ============================================================================
//! ## Overview
//! Property checks over the canonical hashing contract: hashing is
//! insertion-order independent for maps, stable across repeated calls, and
//! sensitive to any value change.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use idis_core::canonical_json_bytes;
use idis_core::hash_canonical_json;
use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;

proptest! {
    #[test]
    fn map_hash_is_insertion_order_independent(
        entries in proptest::collection::vec(("[a-z]{1,8}", 0_i64..1_000_000), 1..12)
    ) {
        let mut forward = Map::new();
        for (key, value) in &entries {
            forward.insert(key.clone(), Value::from(*value));
        }
        let mut reversed = Map::new();
        for (key, value) in entries.iter().rev() {
            reversed.insert(key.clone(), Value::from(*value));
        }
        let forward_hash = hash_canonical_json(&Value::Object(forward)).unwrap();
        let reversed_hash = hash_canonical_json(&Value::Object(reversed)).unwrap();
        prop_assert_eq!(forward_hash, reversed_hash);
    }

    #[test]
    fn hashing_is_stable_across_calls(
        entries in proptest::collection::btree_map("[a-z]{1,8}", 0_i64..1_000_000, 0..12)
    ) {
        let map: BTreeMap<String, i64> = entries;
        let first = hash_canonical_json(&map).unwrap();
        let second = hash_canonical_json(&map).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn any_value_change_changes_the_bytes(
        key in "[a-z]{1,8}",
        value in 0_i64..1_000_000,
    ) {
        let mut map = BTreeMap::new();
        map.insert(key.clone(), value);
        let original = canonical_json_bytes(&map).unwrap();
        map.insert(key, value + 1);
        let mutated = canonical_json_bytes(&map).unwrap();
        prop_assert_ne!(original, mutated);
    }
}
