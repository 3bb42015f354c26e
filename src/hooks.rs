//! Tables whose keys are looked up by one type and stored as another.
//!
//! [`KeyHooks`] bundles the hash, equality and key ownership callbacks of a
//! table into one value. The hooks value is passed to every call, so any
//! state it carries (a hash seed, an arena, counters) plays the role of
//! per-table user data.
//!
//! [`KeyedMap`] calls [`KeyHooks::retain`] once for every key it accepts and
//! [`KeyHooks::release`] for every stored key it gives up: on removal, on
//! [`clear`](KeyedMap::clear), and when the map is dropped. Values are moved
//! in and out and need no hooks; an overwritten value is returned to the
//! caller.

use core::fmt::Debug;

use crate::error::TryReserveError;
use crate::error::infallible;
use crate::hash_table::DeletionPolicy;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;

/// Hash, equality and ownership callbacks for the keys of a [`KeyedMap`].
///
/// `hash` must agree with `eq`: a stored key and a lookup key that compare
/// equal must hash identically. `key` must return a lookup key for which
/// `eq(stored, key(stored))` holds and which hashes like the key `stored`
/// was retained from.
pub trait KeyHooks {
    /// The type keys are looked up by.
    type Key: ?Sized;

    /// The type the table owns for every entry.
    type Stored;

    /// Hashes a lookup key.
    fn hash(&self, key: &Self::Key) -> u64;

    /// Returns `true` if `stored` identifies the same entry as `key`.
    fn eq(&self, stored: &Self::Stored, key: &Self::Key) -> bool;

    /// Produces the owned copy kept by the table for a newly inserted key.
    fn retain(&self, key: &Self::Key) -> Self::Stored;

    /// Disposes of a stored key the table no longer needs.
    fn release(&self, stored: Self::Stored) {
        drop(stored);
    }

    /// Views a stored key as a lookup key.
    fn key<'a>(&self, stored: &'a Self::Stored) -> &'a Self::Key;
}

/// A map whose key handling is driven by a [`KeyHooks`] value.
///
/// # Examples
///
/// ```rust
/// use vitl_table::fnv::fnv1a_64;
/// use vitl_table::hooks::KeyHooks;
/// use vitl_table::hooks::KeyedMap;
///
/// /// Case-insensitive ASCII keys, stored lowercased.
/// #[derive(Default)]
/// struct Folded;
///
/// impl KeyHooks for Folded {
///     type Key = str;
///     type Stored = String;
///
///     fn hash(&self, key: &str) -> u64 {
///         fnv1a_64(key.to_ascii_lowercase().as_bytes())
///     }
///
///     fn eq(&self, stored: &String, key: &str) -> bool {
///         stored.eq_ignore_ascii_case(key)
///     }
///
///     fn retain(&self, key: &str) -> String {
///         key.to_ascii_lowercase()
///     }
///
///     fn key<'a>(&self, stored: &'a String) -> &'a str {
///         stored
///     }
/// }
///
/// let mut headers: KeyedMap<Folded, u32> = KeyedMap::new();
/// headers.insert("Content-Length", 1);
/// assert_eq!(headers.insert("CONTENT-LENGTH", 2), Some(1));
/// assert_eq!(headers.get_key_value("content-length"), Some(("content-length", &2)));
/// ```
pub struct KeyedMap<H: KeyHooks, V> {
    table: HashTable<(H::Stored, V)>,
    hooks: H,
}

impl<H: KeyHooks, V> KeyedMap<H, V> {
    /// Creates an empty map driven by `hooks`.
    pub fn with_hooks(hooks: H) -> Self {
        Self::with_capacity_and_hooks(0, hooks)
    }

    /// Creates an empty map with at least `capacity` slots.
    pub fn with_capacity_and_hooks(capacity: usize, hooks: H) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hooks,
        }
    }

    /// Fallible version of
    /// [`with_capacity_and_hooks`](Self::with_capacity_and_hooks).
    pub fn try_with_capacity_and_hooks(capacity: usize, hooks: H) -> Result<Self, TryReserveError> {
        Ok(Self {
            table: HashTable::try_with_capacity(capacity)?,
            hooks,
        })
    }

    /// Creates an empty map with at least `capacity` slots that removes
    /// entries according to `policy`.
    pub fn with_capacity_policy_and_hooks(
        capacity: usize,
        policy: DeletionPolicy,
        hooks: H,
    ) -> Self {
        Self {
            table: HashTable::with_capacity_and_policy(capacity, policy),
            hooks,
        }
    }

    /// Returns the hooks driving this map.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of entries the map holds before the next insertion
    /// grows it.
    pub fn max_load(&self) -> usize {
        self.table.max_load()
    }

    /// Returns the deletion policy of the underlying table.
    pub fn policy(&self) -> DeletionPolicy {
        self.table.policy()
    }

    /// Ensures the map has at least `min_capacity` slots.
    pub fn reserve(&mut self, min_capacity: usize) {
        self.table.reserve(min_capacity);
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the map is
    /// unchanged.
    pub fn try_reserve(&mut self, min_capacity: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(min_capacity)
    }

    /// Shrinks the slot array as much as the current entries allow.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// was present.
    ///
    /// The key is retained only when it is new. On overwrite the stored key
    /// is kept.
    pub fn insert(&mut self, key: &H::Key, value: V) -> Option<V> {
        infallible(self.try_insert(key, value))
    }

    /// Fallible version of [`insert`](Self::insert). On error the map is
    /// unchanged and nothing is retained.
    pub fn try_insert(&mut self, key: &H::Key, value: V) -> Result<Option<V>, TryReserveError> {
        let hooks = &self.hooks;
        let hash = hooks.hash(key);
        match self.table.try_entry(hash, |(stored, _)| hooks.eq(stored, key))? {
            Entry::Occupied(mut entry) => {
                Ok(Some(core::mem::replace(&mut entry.get_mut().1, value)))
            }
            Entry::Vacant(entry) => {
                entry.insert((hooks.retain(key), value));
                Ok(None)
            }
        }
    }

    /// Inserts an already retained key.
    ///
    /// If an equal key is present, `stored` is released and the existing key
    /// is kept.
    pub fn insert_stored(&mut self, stored: H::Stored, value: V) -> Option<V> {
        infallible(self.try_insert_stored(stored, value))
    }

    /// Fallible version of [`insert_stored`](Self::insert_stored). On error
    /// `stored` is released and the map is unchanged.
    pub fn try_insert_stored(
        &mut self,
        stored: H::Stored,
        value: V,
    ) -> Result<Option<V>, TryReserveError> {
        let hooks = &self.hooks;
        let hash = hooks.hash(hooks.key(&stored));
        let entry = self
            .table
            .try_entry(hash, |(existing, _)| hooks.eq(existing, hooks.key(&stored)));
        match entry {
            Err(err) => {
                hooks.release(stored);
                Err(err)
            }
            Ok(Entry::Occupied(mut entry)) => {
                hooks.release(stored);
                Ok(Some(core::mem::replace(&mut entry.get_mut().1, value)))
            }
            Ok(Entry::Vacant(entry)) => {
                entry.insert((stored, value));
                Ok(None)
            }
        }
    }

    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: &H::Key) -> Option<&V> {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key, viewed as a lookup key, and its value.
    pub fn get_key_value(&self, key: &H::Key) -> Option<(&H::Key, &V)> {
        let hooks = &self.hooks;
        self.table
            .find(hooks.hash(key), |(stored, _)| hooks.eq(stored, key))
            .map(|(stored, value)| (hooks.key(stored), value))
    }

    /// Returns the stored key equal to `key` without viewing it as a lookup
    /// key.
    pub fn get_stored(&self, key: &H::Key) -> Option<&H::Stored> {
        let hooks = &self.hooks;
        self.table
            .find(hooks.hash(key), |(stored, _)| hooks.eq(stored, key))
            .map(|(stored, _)| stored)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &H::Key) -> Option<&mut V> {
        let hooks = &self.hooks;
        self.table
            .find_mut(hooks.hash(key), |(stored, _)| hooks.eq(stored, key))
            .map(|(_, value)| value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &H::Key) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`, releasing its stored key and returning its value.
    ///
    /// Removing an absent key returns `None` and calls no hook.
    pub fn remove(&mut self, key: &H::Key) -> Option<V> {
        let (stored, value) = self.remove_entry(key)?;
        self.hooks.release(stored);
        Some(value)
    }

    /// Removes `key` and hands the stored key back to the caller instead of
    /// releasing it.
    pub fn remove_entry(&mut self, key: &H::Key) -> Option<(H::Stored, V)> {
        let hooks = &self.hooks;
        self.table
            .remove(hooks.hash(key), |(stored, _)| hooks.eq(stored, key))
    }

    /// Returns the first occupied slot after `prev` in slot order.
    ///
    /// Pass a negative `prev` to start from the first slot.
    pub fn next_entry(&self, prev: isize) -> Option<(isize, &H::Key, &V)> {
        self.table
            .next_occupied(prev)
            .map(|(index, (stored, value))| (index, self.hooks.key(stored), value))
    }

    /// Returns an iterator over the entries in slot order.
    pub fn iter(&self) -> Iter<'_, H, V> {
        Iter {
            inner: self.table.iter(),
            hooks: &self.hooks,
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.table.assert_invariants();
    }

    /// Removes every entry, releasing all stored keys. Capacity is kept.
    pub fn clear(&mut self) {
        for (stored, _) in self.table.drain() {
            self.hooks.release(stored);
        }
    }

    /// Destroys the map, releasing every stored key and freeing the slot
    /// array.
    pub fn release(self) {
        drop(self);
    }
}

impl<H: KeyHooks + Default, V> KeyedMap<H, V> {
    /// Creates an empty map with default hooks.
    pub fn new() -> Self {
        Self::with_hooks(H::default())
    }

    /// Creates an empty map with at least `capacity` slots and default
    /// hooks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hooks(capacity, H::default())
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_and_hooks(capacity, H::default())
    }

    /// Creates an empty map with at least `capacity` slots that removes
    /// entries according to `policy`.
    pub fn with_capacity_and_policy(capacity: usize, policy: DeletionPolicy) -> Self {
        Self::with_capacity_policy_and_hooks(capacity, policy, H::default())
    }
}

impl<H: KeyHooks + Default, V> Default for KeyedMap<H, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: KeyHooks, V> Drop for KeyedMap<H, V> {
    fn drop(&mut self) {
        for (stored, _) in self.table.drain() {
            self.hooks.release(stored);
        }
    }
}

impl<H, V> Clone for KeyedMap<H, V>
where
    H: KeyHooks + Clone,
    V: Clone,
{
    /// Retains a fresh copy of every key through the cloned hooks.
    fn clone(&self) -> Self {
        let mut map = Self::with_capacity_policy_and_hooks(
            self.capacity(),
            self.policy(),
            self.hooks.clone(),
        );
        for (key, value) in self.iter() {
            map.insert(key, value.clone());
        }
        map
    }
}

impl<H, V> Debug for KeyedMap<H, V>
where
    H: KeyHooks,
    H::Key: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, H: KeyHooks, V> IntoIterator for &'a KeyedMap<H, V> {
    type Item = (&'a H::Key, &'a V);
    type IntoIter = Iter<'a, H, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`KeyedMap`].
pub struct Iter<'a, H: KeyHooks, V> {
    inner: crate::hash_table::Iter<'a, (H::Stored, V)>,
    hooks: &'a H,
}

impl<'a, H: KeyHooks, V> Iterator for Iter<'a, H, V> {
    type Item = (&'a H::Key, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (stored, value) = self.inner.next()?;
        Some((self.hooks.key(stored), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use super::*;
    use crate::fnv::fnv1a_64;

    #[derive(Default)]
    struct Counters {
        retained: Cell<usize>,
        released: Cell<usize>,
    }

    /// Boxed string keys with a hash seed and shared call counters.
    #[derive(Clone, Default)]
    struct CountingHooks {
        seed: u64,
        counters: Rc<Counters>,
    }

    impl CountingHooks {
        fn retained(&self) -> usize {
            self.counters.retained.get()
        }

        fn released(&self) -> usize {
            self.counters.released.get()
        }

        fn live(&self) -> usize {
            self.retained() - self.released()
        }
    }

    impl KeyHooks for CountingHooks {
        type Key = str;
        type Stored = Box<str>;

        fn hash(&self, key: &str) -> u64 {
            fnv1a_64(key.as_bytes()) ^ self.seed
        }

        fn eq(&self, stored: &Box<str>, key: &str) -> bool {
            &**stored == key
        }

        fn retain(&self, key: &str) -> Box<str> {
            self.counters.retained.set(self.retained() + 1);
            Box::from(key)
        }

        fn release(&self, stored: Box<str>) {
            self.counters.released.set(self.released() + 1);
            drop(stored);
        }

        fn key<'a>(&self, stored: &'a Box<str>) -> &'a str {
            stored
        }
    }

    /// Every key hashes to bucket 3 of an 8-slot table.
    #[derive(Clone, Copy, Default)]
    struct Bucket3;

    impl KeyHooks for Bucket3 {
        type Key = str;
        type Stored = String;

        fn hash(&self, _key: &str) -> u64 {
            3
        }

        fn eq(&self, stored: &String, key: &str) -> bool {
            stored == key
        }

        fn retain(&self, key: &str) -> String {
            key.to_string()
        }

        fn key<'a>(&self, stored: &'a String) -> &'a str {
            stored
        }
    }

    fn counting_map() -> (KeyedMap<CountingHooks, i32>, CountingHooks) {
        let hooks = CountingHooks {
            seed: 0x5eed,
            ..Default::default()
        };
        (KeyedMap::with_hooks(hooks.clone()), hooks)
    }

    #[test]
    fn insert_retains_once_per_new_key() {
        let (mut map, hooks) = counting_map();

        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("b", 2), None);
        assert_eq!(hooks.retained(), 2);

        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(hooks.retained(), 2);
        assert_eq!(hooks.released(), 0);
        assert_eq!(map.get("a"), Some(&10));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn insert_stored_releases_redundant_key() {
        let (mut map, hooks) = counting_map();
        map.insert("k", 1);

        let spare = hooks.retain("k");
        assert_eq!(map.insert_stored(spare, 2), Some(1));
        assert_eq!(hooks.retained(), 2);
        assert_eq!(hooks.released(), 1);

        let fresh = hooks.retain("fresh");
        assert_eq!(map.insert_stored(fresh, 3), None);
        assert_eq!(hooks.released(), 1);
        assert_eq!(hooks.live(), map.len());
    }

    #[test]
    fn remove_releases_key() {
        let (mut map, hooks) = counting_map();
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(hooks.released(), 1);
        assert_eq!(map.remove("a"), None);
        assert_eq!(map.remove("missing"), None);
        assert_eq!(hooks.released(), 1);

        let (stored, value) = map.remove_entry("b").unwrap();
        assert_eq!(&*stored, "b");
        assert_eq!(value, 2);
        assert_eq!(hooks.released(), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn growth_moves_keys_without_hooks() {
        let (mut map, hooks) = counting_map();
        for i in 0..1000 {
            map.insert(&format!("k{i}"), i);
        }
        assert_eq!(map.len(), 1000);
        assert_eq!(map.capacity(), 2048);
        assert_eq!(hooks.retained(), 1000);
        assert_eq!(hooks.released(), 0);

        for i in 0..1000 {
            assert_eq!(map.get(&format!("k{i}")), Some(&i));
        }
        map.table.assert_invariants();
    }

    #[test]
    fn clear_drop_and_release_free_every_key() {
        let (mut map, hooks) = counting_map();
        for i in 0..20 {
            map.insert(&format!("k{i}"), i);
        }
        let capacity = map.capacity();
        map.clear();
        assert_eq!(hooks.released(), 20);
        assert_eq!(map.capacity(), capacity);
        assert!(map.is_empty());

        for i in 0..5 {
            map.insert(&format!("k{i}"), i);
        }
        drop(map);
        assert_eq!(hooks.live(), 0);

        let (mut map, hooks) = counting_map();
        map.insert("x", 1);
        map.release();
        assert_eq!(hooks.retained(), 1);
        assert_eq!(hooks.released(), 1);
    }

    #[test]
    fn clone_retains_fresh_keys() {
        let (mut map, hooks) = counting_map();
        map.insert("a", 1);
        map.insert("b", 2);

        let copy = map.clone();
        assert_eq!(hooks.retained(), 4);
        map.insert("a", 100);
        assert_eq!(copy.get("a"), Some(&1));

        drop(copy);
        assert_eq!(hooks.released(), 2);
    }

    #[test]
    fn hooks_state_is_threaded_through() {
        let mut left = KeyedMap::with_hooks(CountingHooks {
            seed: 1,
            ..Default::default()
        });
        let mut right = KeyedMap::with_hooks(CountingHooks {
            seed: u64::MAX,
            ..Default::default()
        });
        for i in 0..50 {
            left.insert(&format!("{i}"), i);
            right.insert(&format!("{i}"), i);
        }
        for i in 0..50 {
            assert_eq!(left.get(&format!("{i}")), right.get(&format!("{i}")));
        }
        assert_eq!(left.hooks().seed, 1);
    }

    #[test]
    fn tied_keys_backshift_after_removal() {
        let mut map: KeyedMap<Bucket3, &str> = KeyedMap::with_capacity(8);
        map.insert("A", "first");
        map.insert("B", "second");

        assert_eq!(map.next_entry(-1), Some((3, "A", &"first")));
        assert_eq!(map.next_entry(3), Some((4, "B", &"second")));
        assert_eq!(map.table.dib_at(4), Some(1));

        assert_eq!(map.remove("A"), Some("first"));
        assert_eq!(map.next_entry(-1), Some((3, "B", &"second")));
        assert_eq!(map.table.dib_at(3), Some(0));
        assert_eq!(map.next_entry(3), None);
        assert_eq!(map.get("B"), Some(&"second"));
    }

    #[test]
    fn iteration_and_debug() {
        let mut map: KeyedMap<Bucket3, u8> = KeyedMap::new();
        map.insert("only", 7);
        assert_eq!(format!("{map:?}"), "{\"only\": 7}");

        let entries: Vec<(&str, &u8)> = map.iter().collect();
        assert_eq!(entries, [("only", &7)]);
        assert_eq!(map.get_key_value("only"), Some(("only", &7)));
        *map.get_mut("only").unwrap() += 1;
        assert_eq!(map.get("only"), Some(&8));
    }

    #[test]
    fn tombstone_policy_releases_keys() {
        let hooks = CountingHooks::default();
        let mut map =
            KeyedMap::with_capacity_policy_and_hooks(8, DeletionPolicy::Tombstone, hooks.clone());
        for round in 0..10 {
            for i in 0..4 {
                map.insert(&format!("{round}-{i}"), i);
            }
            for i in 0..4 {
                assert_eq!(map.remove(&format!("{round}-{i}")), Some(i));
            }
        }
        assert_eq!(hooks.retained(), 40);
        assert_eq!(hooks.released(), 40);
        assert_eq!(map.capacity(), 8);
        map.table.assert_invariants();
    }
}
