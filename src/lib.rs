#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(all(test, not(feature = "std")))]
extern crate std;

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Errors reported by fallible construction and growth.
pub mod error;

pub mod fnv;

/// A `HashMap` over the Robin Hood table.
///
/// Keys are owned, hashed through a configurable `BuildHasher` and compared
/// with `Eq`.
pub mod hash_map;

/// A hash set over the Robin Hood table.
pub mod hash_set;

pub mod hash_table;

pub mod hooks;

pub mod str_map;

#[cfg(test)]
mod proptests;

pub use error::TryReserveError;
pub use hash_map::DefaultHashBuilder;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::DeletionPolicy;
pub use hash_table::HashTable;
pub use hooks::KeyHooks;
pub use hooks::KeyedMap;
pub use str_map::StrKey;
pub use str_map::StrMap;
