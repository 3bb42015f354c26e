use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap as ModelMap;

use proptest::prelude::*;

use crate::DeletionPolicy;
use crate::HashMap;
use crate::fnv::FnvBuildHasher;
use crate::str_map::StrMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    Reserve(u16),
    Shrink,
}

fn policy_strategy() -> impl Strategy<Value = DeletionPolicy> {
    prop_oneof![Just(DeletionPolicy::Backshift), Just(DeletionPolicy::Tombstone)]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A narrow key range keeps overwrites and removals of present keys
    // frequent.
    let key = 0u16..512;
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        22 => key.clone().prop_map(Op::Get),
        2 => (0u16..2048).prop_map(Op::Reserve),
        1 => Just(Op::Shrink),
    ];
    prop::collection::vec(op, 0..=1500)
}

fn str_ops_strategy() -> impl Strategy<Value = Vec<(bool, String)>> {
    prop::collection::vec((any::<bool>(), "[a-d]{0,4}"), 0..=600)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_matches_model(policy in policy_strategy(), ops in ops_strategy()) {
        let mut map: HashMap<u16, u32, FnvBuildHasher> =
            HashMap::with_capacity_and_policy(0, policy);
        let mut model: ModelMap<u16, u32> = ModelMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                    prop_assert!(map.len() <= map.max_load());
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(map.get(&key), model.get(&key));
                }
                Op::Reserve(min) => {
                    let before = map.capacity();
                    map.reserve(min as usize);
                    prop_assert!(map.capacity() >= before);
                    prop_assert!(map.capacity() >= min as usize);
                }
                Op::Shrink => {
                    map.shrink_to_fit();
                }
            }

            prop_assert_eq!(map.len(), model.len());
            prop_assert!(map.capacity().is_power_of_two());
            prop_assert!(map.capacity() >= 8);
        }

        map.assert_invariants();
        let mut got: Vec<(u16, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        let mut expected: Vec<(u16, u32)> = model.into_iter().collect();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_str_map_matches_model(policy in policy_strategy(), ops in str_ops_strategy()) {
        let mut map: StrMap<'_, usize> = StrMap::with_capacity_and_policy(8, policy);
        let mut model: ModelMap<String, usize> = ModelMap::new();

        for (step, (insert, key)) in ops.into_iter().enumerate() {
            if insert {
                prop_assert_eq!(map.insert(&key, step), model.insert(key, step));
            } else {
                prop_assert_eq!(map.remove(&key), model.remove(&key));
            }
            prop_assert_eq!(map.len(), model.len());
        }

        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }

        map.assert_invariants();
        let mut visited = 0;
        let mut cursor = -1;
        while let Some((index, key, value)) = map.next_entry(cursor) {
            prop_assert_eq!(model.get(key), Some(value));
            cursor = index;
            visited += 1;
        }
        prop_assert_eq!(visited, model.len());
    }
}
