//! Property-based test generators using proptest.
//!
//! Record strategies produce data already in the order a bucket stores it,
//! so results can be passed straight to [`crate::seed`].

use crate::fixtures::{BucketSpec, RawRecord};
use bucketdb_kv::BucketFlags;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Strategy for short byte strings. A small alphabet makes key collisions
/// between two generated sets likely.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..8, 0..4)
}

/// Strategy for values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..16)
}

/// Strategy for valid bucket names.
pub fn bucket_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9]{0,15}").expect("Invalid regex")
}

/// Strategy for plain-bucket contents: unique keys, ascending.
pub fn plain_records_strategy(max_len: usize) -> impl Strategy<Value = Vec<RawRecord>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..max_len)
        .prop_map(|map: BTreeMap<_, _>| map.into_iter().collect())
}

/// Strategy for duplicate-sort contents: unique (key, value) pairs,
/// ascending, with repeated keys.
pub fn dup_records_strategy(max_len: usize) -> impl Strategy<Value = Vec<RawRecord>> {
    prop::collection::btree_set((key_strategy(), value_strategy()), 0..max_len)
        .prop_map(|set: BTreeSet<_>| set.into_iter().collect())
}

/// Strategy for one bucket, plain or duplicate-sort, maybe deprecated.
pub fn bucket_spec_strategy(name: String) -> impl Strategy<Value = BucketSpec> {
    (any::<bool>(), prop::bool::weighted(0.2), 0u64..4).prop_flat_map(
        move |(dup_sort, deprecated, sequence)| {
            let name = name.clone();
            let records = if dup_sort {
                dup_records_strategy(32).boxed()
            } else {
                plain_records_strategy(32).boxed()
            };
            records.prop_map(move |records| {
                let flags = if dup_sort {
                    BucketFlags::DUP_SORT
                } else {
                    BucketFlags::PLAIN
                };
                BucketSpec {
                    name: name.clone(),
                    flags: if deprecated { flags.deprecated() } else { flags },
                    records,
                    sequence,
                }
            })
        },
    )
}

/// Strategy for a whole database: up to `max_buckets` uniquely named
/// buckets in name order.
pub fn database_spec_strategy(max_buckets: usize) -> impl Strategy<Value = Vec<BucketSpec>> {
    prop::collection::btree_set(bucket_name_strategy(), 0..max_buckets).prop_flat_map(|names| {
        names
            .into_iter()
            .map(bucket_spec_strategy)
            .collect::<Vec<_>>()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn plain_records_have_ascending_unique_keys(records in plain_records_strategy(32)) {
            for pair in records.windows(2) {
                prop_assert!(pair[0].0 < pair[1].0);
            }
        }

        #[test]
        fn dup_records_are_ascending_pairs(records in dup_records_strategy(32)) {
            for pair in records.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }

        #[test]
        fn database_spec_names_are_sorted(specs in database_spec_strategy(6)) {
            for pair in specs.windows(2) {
                prop_assert!(pair[0].name < pair[1].name);
            }
        }
    }
}
