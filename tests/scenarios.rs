use std::hash::BuildHasher;
use std::hash::Hasher;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use vitl_table::DeletionPolicy;
use vitl_table::HashMap;
use vitl_table::HashTable;
use vitl_table::StrMap;
use vitl_table::TryReserveError;
use vitl_table::fnv::FnvBuildHasher;

/// Sends every key to the same hash.
#[derive(Clone, Copy, Default)]
struct FixedHash(u64);

struct FixedHasher(u64);

impl Hasher for FixedHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for FixedHash {
    type Hasher = FixedHasher;

    fn build_hasher(&self) -> FixedHasher {
        FixedHasher(self.0)
    }
}

fn slots<K: Copy, V: Copy, S>(map: &HashMap<K, V, S>) -> Vec<(isize, K, V)> {
    let mut out = Vec::new();
    let mut cursor = -1;
    while let Some((index, key, value)) = map.next_entry(cursor) {
        out.push((index, *key, *value));
        cursor = index;
    }
    out
}

#[test]
fn tie_goes_to_incumbent_then_backshift() {
    let mut map = HashMap::with_capacity_and_hasher(8, FixedHash(3));
    map.insert('A', 1);
    map.insert('B', 2);
    assert_eq!(slots(&map), [(3, 'A', 1), (4, 'B', 2)]);

    assert_eq!(map.remove(&'A'), Some(1));
    assert_eq!(slots(&map), [(3, 'B', 2)]);
    assert_eq!(map.get(&'B'), Some(&2));
}

#[test]
fn tombstone_keeps_probe_chain_reachable() {
    let mut map = HashMap::with_capacity_policy_and_hasher(8, DeletionPolicy::Tombstone, FixedHash(3));
    map.insert('A', 1);
    map.insert('B', 2);
    map.insert('C', 3);

    assert_eq!(map.remove(&'A'), Some(1));
    assert_eq!(slots(&map), [(4, 'B', 2), (5, 'C', 3)]);
    assert_eq!(map.get(&'C'), Some(&3));
    assert_eq!(map.get(&'A'), None);
}

#[test]
fn round_trip_and_cardinality() {
    let mut rng = SmallRng::seed_from_u64(0x5151);
    let mut map: HashMap<u32, u32, FnvBuildHasher> = HashMap::new();
    let mut model = std::collections::HashMap::new();

    for _ in 0..20_000 {
        let key = rng.random_range(0..2_000u32);
        if rng.random_bool(0.6) {
            let value = rng.random::<u32>();
            assert_eq!(map.insert(key, value), model.insert(key, value));
            assert_eq!(map.get(&key), Some(&value));
        } else {
            assert_eq!(map.remove(&key), model.remove(&key));
            assert_eq!(map.get(&key), None);
        }
        assert_eq!(map.len(), model.len());
    }
}

#[test]
fn capacity_is_power_of_two_and_load_bounded() {
    let mut map: HashMap<u64, (), FnvBuildHasher> = HashMap::new();
    assert_eq!(map.capacity(), 8);

    for key in 0..5_000u64 {
        map.insert(key, ());
        let capacity = map.capacity();
        assert!(capacity.is_power_of_two() && capacity >= 8);
        assert!(map.len() * 100 < capacity * 85);
    }
}

#[test]
fn growth_threshold_is_inclusive() {
    let mut map: HashMap<u8, u8, FnvBuildHasher> = HashMap::new();
    for key in 0..6 {
        map.insert(key, key);
    }
    assert_eq!(map.capacity(), 8);

    // (6 + 1) * 100 >= 8 * 85
    map.insert(6, 6);
    assert_eq!(map.capacity(), 16);
}

#[test]
fn removed_key_is_absent_after_reuse_of_its_slot() {
    for policy in [DeletionPolicy::Backshift, DeletionPolicy::Tombstone] {
        let mut map = HashMap::with_capacity_policy_and_hasher(8, policy, FixedHash(1));
        map.insert("k", 1);
        map.insert("k1", 2);
        assert_eq!(map.remove("k"), Some(1));

        map.insert("k2", 3);
        assert_eq!(map.get("k"), None);
        assert_eq!(map.get("k1"), Some(&2));
        assert_eq!(map.get("k2"), Some(&3));
    }
}

#[test]
fn thousand_string_keys_grow_from_eight_slots() {
    let mut map: StrMap<'_, usize> = StrMap::with_capacity(8);
    assert_eq!(map.capacity(), 8);

    for i in 0..1000 {
        map.insert(&format!("k{i}"), i);
    }
    for i in 0..1000 {
        assert_eq!(map.get(&format!("k{i}")), Some(&i));
    }
    assert_eq!(map.len(), 1000);
    assert_eq!(map.capacity(), 2048);
}

#[test]
fn reserve_rounds_up_and_reports_overflow() {
    let mut table: HashTable<u64> = HashTable::with_capacity(3);
    assert_eq!(table.capacity(), 8);

    table.reserve(9);
    assert_eq!(table.capacity(), 16);
    table.reserve(100);
    assert_eq!(table.capacity(), 128);
    table.reserve(10);
    assert_eq!(table.capacity(), 128);

    assert_eq!(
        table.try_reserve(usize::MAX),
        Err(TryReserveError::CapacityOverflow)
    );
    assert_eq!(table.capacity(), 128);
    assert!(HashTable::<u64>::try_with_capacity(usize::MAX).is_err());
}

#[test]
fn absent_keys_are_not_errors() {
    let mut map: HashMap<&str, i32, FnvBuildHasher> = HashMap::new();
    assert_eq!(map.get("missing"), None);
    assert_eq!(map.remove("missing"), None);
    assert_eq!(map.next_entry(-1), None);
    assert!(map.is_empty());
}
