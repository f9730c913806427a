//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the correctness properties recorded in the
//! design document.

use proptest::prelude::*;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::Config;

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(60);

fn test_config(max_cost: i64) -> Config {
    Config {
        num_counters: 1024,
        max_cost,
        buffer_items: 64,
        write_buffer_size: 1024,
    }
}

// == Strategies ==
/// Generates cache keys. The alphabet has no spaces, so fixed control keys
/// containing one can never collide with generated keys.
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9:_]{1,64}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

/// Generates tag names
fn tag_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    SetTags { key: String, tag: String },
    InvalidateTags { tag: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (valid_key_strategy(), tag_strategy())
            .prop_map(|(key, tag)| CacheOp::SetTags { key, tag }),
        tag_strategy().prop_map(|tag| CacheOp::InvalidateTags { tag }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Property: Confirmed Set Round-trip**
    // *For any* key and value, a set confirmed by wait under an ample
    // budget SHALL make get return exactly the stored value.
    #[test]
    fn prop_confirmed_set_roundtrip(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            cache.set(&key, value.clone(), TEST_TTL);
            cache.wait().await;

            prop_assert_eq!(cache.get(&key), Some(value));
            prop_assert_eq!(cache.len(), 1);
            Ok(())
        })?;
    }

    // **Property: Overwrite Returns Newest Value**
    // *For any* key, storing V1 and then V2 SHALL leave get returning V2,
    // and the replacement SHALL be visible without waiting.
    #[test]
    fn prop_overwrite_returns_newest(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            cache.set(&key, value1, TEST_TTL);
            cache.wait().await;

            cache.set(&key, value2.clone(), TEST_TTL);

            prop_assert_eq!(cache.get(&key), Some(value2));
            prop_assert_eq!(cache.len(), 1);
            Ok(())
        })?;
    }

    // **Property: Delete Removes Entry**
    // *For any* resident key, after delete a subsequent get SHALL miss and
    // the entry's cost SHALL be released.
    #[test]
    fn prop_delete_removes_entry(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            cache.set(&key, value, TEST_TTL);
            cache.wait().await;
            prop_assert!(cache.get(&key).is_some());

            cache.delete(&key);
            prop_assert_eq!(cache.get(&key), None);

            cache.wait().await;
            prop_assert_eq!(cache.metrics().cost_in_use, 0);
            Ok(())
        })?;
    }

    // **Property: Budget Is Never Exceeded**
    // *For any* sequence of sets, the total cost of resident entries SHALL
    // never exceed max_cost, whatever the policy admits or evicts.
    #[test]
    fn prop_budget_never_exceeded(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..150
        )
    ) {
        let max_cost = 16i64;
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(max_cost)).unwrap();

            for (key, value) in entries {
                cache.set(&key, value, TEST_TTL);
            }
            cache.wait().await;

            prop_assert!(cache.len() as i64 <= max_cost);
            prop_assert!(cache.metrics().cost_in_use <= max_cost);
            Ok(())
        })?;
    }

    // **Property: Tag Fan-out Invalidation**
    // *For any* set of keys sharing a tag, one invalidation of that tag
    // SHALL remove every one of them while untagged keys stay resident.
    #[test]
    fn prop_tagged_keys_invalidated_together(
        keys in prop::collection::hash_set(valid_key_strategy(), 2..8),
        tag in tag_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            // Spaces cannot occur in generated keys.
            let control_key = "control key";
            cache.set(control_key, "control".to_string(), TEST_TTL);

            for key in &keys {
                cache.set(key, format!("value_{key}"), TEST_TTL);
                cache.set_tags(key, &[tag.as_str()]);
            }
            cache.wait().await;
            for key in &keys {
                prop_assert!(cache.get(key).is_some(), "key '{}' missing before invalidation", key);
            }

            cache.invalidate_tags(&[tag.as_str()]);
            for key in &keys {
                prop_assert_eq!(cache.get(key), None, "key '{}' survived invalidation", key);
            }
            prop_assert!(cache.get(control_key).is_some(), "untagged key was invalidated");

            // A second invalidation of the same tag is a no-op.
            cache.invalidate_tags(&[tag.as_str()]);
            prop_assert!(cache.get(control_key).is_some());
            Ok(())
        })?;
    }

    // **Property: Unknown Tags Are Ignored**
    // *For any* tag never associated with a key, invalidating it SHALL
    // change nothing.
    #[test]
    fn prop_unknown_tag_invalidation_is_noop(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..6),
        bogus_tag in tag_strategy()
    ) {
        prop_assume!(bogus_tag != "real");
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            for key in &keys {
                cache.set(key, "v".to_string(), TEST_TTL);
                cache.set_tags(key, &["real"]);
            }
            cache.wait().await;

            cache.invalidate_tags(&[bogus_tag.as_str()]);
            for key in &keys {
                prop_assert!(cache.get(key).is_some(), "key '{}' lost to unknown tag", key);
            }
            Ok(())
        })?;
    }

    // **Property: Operation Sequences Keep Store And Policy Consistent**
    // *For any* sequence of operations, once the worker has drained, the
    // policy's charged cost SHALL equal the resident entry count, and every
    // get SHALL have been counted as exactly one hit or miss.
    #[test]
    fn prop_operation_sequences_converge(
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let max_cost = 32i64;
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(max_cost)).unwrap();
            let mut gets_issued: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => cache.set(&key, value, TEST_TTL),
                    CacheOp::Get { key } => {
                        let _ = cache.get(&key);
                        gets_issued += 1;
                    }
                    CacheOp::Delete { key } => cache.delete(&key),
                    CacheOp::SetTags { key, tag } => cache.set_tags(&key, &[tag.as_str()]),
                    CacheOp::InvalidateTags { tag } => cache.invalidate_tags(&[tag.as_str()]),
                }
            }
            cache.wait().await;

            let metrics = cache.metrics();
            prop_assert!(cache.len() as i64 <= max_cost);
            prop_assert_eq!(metrics.cost_in_use, cache.len() as i64, "policy and table disagree");
            prop_assert_eq!(metrics.hits + metrics.misses, gets_issued);
            prop_assert_eq!(metrics.sets_dropped, 0);
            Ok(())
        })?;
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // **Property: TTL Expiry**
    // *For any* entry stored with a TTL, once the TTL has fully elapsed a
    // get SHALL miss.
    #[test]
    fn prop_ttl_expiry(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = Cache::new(&test_config(10_000)).unwrap();

            cache.set(&key, value.clone(), Duration::from_millis(10));
            cache.wait().await;
            prop_assert_eq!(cache.get(&key), Some(value));

            tokio::time::sleep(Duration::from_millis(20)).await;
            prop_assert_eq!(cache.get(&key), None);
            Ok(())
        })?;
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_empty_tag_slice_is_noop() {
        let cache = Cache::new(&test_config(100)).unwrap();

        cache.set("key", "v".to_string(), TEST_TTL);
        cache.wait().await;

        cache.invalidate_tags(&[]);
        assert!(cache.get("key").is_some());
    }

    #[tokio::test]
    async fn test_tagging_absent_key_is_accepted() {
        let cache: Cache<String> = Cache::new(&test_config(100)).unwrap();

        // Nothing was ever stored under this key.
        cache.set_tags("phantom", &["t"]);
        cache.invalidate_tags(&["t"]);

        assert_eq!(cache.get("phantom"), None);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_stale_tag_reference_after_delete_is_harmless() {
        let cache = Cache::new(&test_config(100)).unwrap();

        cache.set("key", "v".to_string(), TEST_TTL);
        cache.set_tags("key", &["t"]);
        cache.wait().await;

        // The tag index is not told about the delete.
        cache.delete("key");
        cache.invalidate_tags(&["t"]);

        assert_eq!(cache.get("key"), None);
    }
}
