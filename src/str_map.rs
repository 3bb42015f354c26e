//! A map keyed by strings, hashed with 64-bit FNV-1a.
//!
//! Keys inserted through [`KeyedMap::insert`] are copied into an owned
//! buffer. Keys that outlive the map can be stored without copying through
//! [`KeyedMap::insert_borrowed`]. Both forms are held as a [`StrKey`] and
//! compare by content.
//!
//! ```rust
//! use vitl_table::str_map::StrMap;
//!
//! let mut symbols: StrMap<'static, u32> = StrMap::new();
//! symbols.insert_borrowed("main", 0);
//! symbols.insert(&String::from("init"), 1);
//!
//! assert_eq!(symbols.get("main"), Some(&0));
//! assert_eq!(symbols.get("init"), Some(&1));
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;
use core::marker::PhantomData;
use core::ops::Deref;

use crate::error::TryReserveError;
use crate::error::infallible;
use crate::fnv::fnv1a_64;
use crate::hooks::KeyHooks;
use crate::hooks::KeyedMap;

/// A string key that is either owned by the map or borrowed for `'a`.
#[derive(Debug, Clone)]
pub enum StrKey<'a> {
    /// A copy made by the map.
    Owned(Box<str>),
    /// A caller-provided string the map does not free.
    Borrowed(&'a str),
}

impl StrKey<'_> {
    /// Returns the key's contents.
    pub fn as_str(&self) -> &str {
        match self {
            StrKey::Owned(s) => s,
            StrKey::Borrowed(s) => s,
        }
    }

    /// Returns `true` if the map owns the key's buffer.
    pub fn is_owned(&self) -> bool {
        matches!(self, StrKey::Owned(_))
    }
}

impl Deref for StrKey<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for StrKey<'_> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for StrKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StrKey<'_> {}

impl Hash for StrKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for StrKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> From<&'a str> for StrKey<'a> {
    fn from(s: &'a str) -> Self {
        StrKey::Borrowed(s)
    }
}

impl From<String> for StrKey<'_> {
    fn from(s: String) -> Self {
        StrKey::Owned(s.into_boxed_str())
    }
}

/// Key hooks for [`StrMap`]: FNV-1a over the key bytes, byte-wise equality,
/// and copying into an owned buffer on retain.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrHooks<'a> {
    _borrowed: PhantomData<&'a str>,
}

impl<'a> KeyHooks for StrHooks<'a> {
    type Key = str;
    type Stored = StrKey<'a>;

    #[inline]
    fn hash(&self, key: &str) -> u64 {
        fnv1a_64(key.as_bytes())
    }

    #[inline]
    fn eq(&self, stored: &StrKey<'a>, key: &str) -> bool {
        stored.as_str() == key
    }

    fn retain(&self, key: &str) -> StrKey<'a> {
        StrKey::Owned(Box::from(key))
    }

    fn key<'s>(&self, stored: &'s StrKey<'a>) -> &'s str {
        stored.as_str()
    }
}

/// A string-keyed map. See the [module documentation](self).
pub type StrMap<'a, V> = KeyedMap<StrHooks<'a>, V>;

impl<'a, V> KeyedMap<StrHooks<'a>, V> {
    /// Inserts `value` under a borrowed key without copying it.
    ///
    /// If the key is already present the stored key is kept, whether owned
    /// or borrowed, and the previous value is returned.
    pub fn insert_borrowed(&mut self, key: &'a str, value: V) -> Option<V> {
        infallible(self.try_insert_borrowed(key, value))
    }

    /// Fallible version of [`insert_borrowed`](Self::insert_borrowed).
    pub fn try_insert_borrowed(
        &mut self,
        key: &'a str,
        value: V,
    ) -> Result<Option<V>, TryReserveError> {
        self.try_insert_stored(StrKey::Borrowed(key), value)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::*;
    use crate::hash_table::DeletionPolicy;

    #[test]
    fn owned_and_borrowed_keys_compare_by_content() {
        let text = "borrowed".to_string();
        let mut map: StrMap<'_, i32> = StrMap::new();

        assert_eq!(map.insert_borrowed(&text, 1), None);
        assert_eq!(map.insert("owned", 2), None);
        assert_eq!(map.len(), 2);

        assert_eq!(map.insert("borrowed", 10), Some(1));
        assert_eq!(map.insert_borrowed("owned", 20), Some(2));
        assert_eq!(map.len(), 2);

        assert!(!map.get_stored("borrowed").unwrap().is_owned());
        assert!(map.get_stored("owned").unwrap().is_owned());
        assert!(map.get_stored("absent").is_none());
    }

    #[test]
    fn thousand_keys_survive_growth() {
        let mut map: StrMap<'_, usize> = StrMap::with_capacity(8);
        assert_eq!(map.capacity(), 8);

        for i in 0..1000 {
            map.insert(&format!("k{i}"), i);
        }
        assert_eq!(map.len(), 1000);
        for i in 0..1000 {
            assert_eq!(map.get(&format!("k{i}")), Some(&i));
        }
        assert!(map.capacity().is_power_of_two());
        assert!(map.len() <= map.max_load());
    }

    #[test]
    fn removed_key_stays_absent_after_reuse() {
        for policy in [DeletionPolicy::Backshift, DeletionPolicy::Tombstone] {
            let mut map: StrMap<'_, u32> = StrMap::with_capacity_and_policy(8, policy);
            for i in 0..5 {
                map.insert(&format!("key{i}"), i);
            }
            assert_eq!(map.remove("key2"), Some(2));
            map.insert("replacement", 99);

            assert_eq!(map.get("key2"), None);
            assert_eq!(map.get("replacement"), Some(&99));
            for i in [0, 1, 3, 4] {
                assert_eq!(map.get(&format!("key{i}")), Some(&i));
            }
        }
    }

    #[test]
    fn hash_is_fnv1a_over_bytes() {
        let hooks = StrHooks::default();
        assert_eq!(hooks.hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hooks.hash("a"), fnv1a_64(b"a"));
        assert!(hooks.eq(&StrKey::Borrowed("x"), "x"));
        assert!(!hooks.eq(&StrKey::Owned("x".into()), "y"));
    }

    #[test]
    fn embedded_nul_is_part_of_the_key() {
        let mut map: StrMap<'_, u8> = StrMap::new();
        map.insert("a\0b", 1);
        map.insert("a\0c", 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), None);
    }

    #[test]
    fn iteration_yields_str_keys() {
        let mut map: StrMap<'_, u8> = StrMap::new();
        for (i, word) in ["alpha", "beta", "gamma"].into_iter().enumerate() {
            map.insert(word, i as u8);
        }
        let mut keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["alpha", "beta", "gamma"]);

        let mut cursor = -1;
        let mut visited = 0;
        while let Some((index, key, value)) = map.next_entry(cursor) {
            assert_eq!(map.get(key), Some(value));
            cursor = index;
            visited += 1;
        }
        assert_eq!(visited, 3);
    }

    #[test]
    fn str_key_conversions() {
        let owned: StrKey<'_> = String::from("x").into();
        let borrowed: StrKey<'_> = "x".into();
        assert_eq!(owned, borrowed);
        assert_eq!(owned.to_string(), "x");
        assert_eq!(borrowed.len(), 1);
    }
}
