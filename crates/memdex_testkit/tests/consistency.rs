//! Property tests: random mutation sequences keep the store and its indexes
//! in agreement with a plain model.

use memdex_codec::Value;
use memdex_core::{FieldIndex, OrderedIndex};
use memdex_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn mutation_sequences_stay_consistent(ops in operation_sequence_strategy(1, 60)) {
        let mut harness = StoreHarness::new();
        for op in &ops {
            harness.apply(op);
        }
        harness.verify();
        prop_assert_eq!(harness.store.len(), harness.expected_len());
    }

    #[test]
    fn ordered_index_matches_btree(
        ops in prop::collection::vec((any::<bool>(), -50_i64..50), 1..200)
    ) {
        let mut index = OrderedIndex::new();
        let mut model = BTreeMap::new();
        for (insert, key) in ops {
            if insert {
                index.set(key, key * 2, true);
                model.insert(key, key * 2);
            } else {
                prop_assert_eq!(index.delete(&key), model.remove(&key));
            }
        }
        assert_tree_invariants(&index);

        let keys: Vec<i64> = index.iter().map(|(k, _)| *k).collect();
        let expected: Vec<i64> = model.keys().copied().collect();
        prop_assert_eq!(keys, expected);
        prop_assert_eq!(index.min(), model.iter().next());
        prop_assert_eq!(index.max(), model.iter().next_back());
    }

    #[test]
    fn index_ranges_match_filtering(
        prices in prop::collection::vec(0_i64..30, 0..80),
        low in 0_i64..30,
        high in 0_i64..30,
    ) {
        let mut index = FieldIndex::new("price", false);
        for (id, price) in prices.iter().enumerate() {
            index.add(Value::from(*price), Value::from(id as i64)).unwrap();
        }

        let (low_v, high_v) = (Value::from(low), Value::from(high));
        let mut inside: Vec<Value> = index.between(&low_v, &high_v);
        let mut outside: Vec<Value> = index.outside(&low_v, &high_v);
        inside.sort();
        outside.sort();

        let select = |keep: &dyn Fn(i64) -> bool| -> Vec<Value> {
            prices
                .iter()
                .enumerate()
                .filter(|(_, p)| keep(**p))
                .map(|(id, _)| Value::from(id as i64))
                .collect()
        };
        prop_assert_eq!(inside, select(&|p| low <= p && p <= high));
        prop_assert_eq!(outside, select(&|p| p < low || p > high));
    }
}
