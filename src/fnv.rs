//! Fowler–Noll–Vo (FNV-1a) hashing.
//!
//! One shared implementation used by the string-keyed map and available as a
//! [`BuildHasher`] for [`HashMap`](crate::HashMap) when the `foldhash` feature
//! is disabled.

use core::hash::BuildHasher;
use core::hash::Hasher;

/// 32-bit FNV offset basis.
pub const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// 32-bit FNV prime.
pub const FNV32_PRIME: u32 = 0x0100_0193;
/// 64-bit FNV offset basis.
pub const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
/// 64-bit FNV prime.
pub const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hashes `bytes` with 32-bit FNV-1a.
///
/// ```rust
/// assert_eq!(vitl_table::fnv::fnv1a_32(b""), 0x811c_9dc5);
/// assert_eq!(vitl_table::fnv::fnv1a_32(b"a"), 0xe40c_292c);
/// ```
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV32_PRIME);
        i += 1;
    }
    hash
}

/// Hashes `bytes` with 64-bit FNV-1a.
///
/// ```rust
/// assert_eq!(vitl_table::fnv::fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
/// assert_eq!(vitl_table::fnv::fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
/// ```
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV64_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV64_PRIME);
        i += 1;
    }
    hash
}

/// Streaming 64-bit FNV-1a [`Hasher`].
///
/// Note that `str`'s `Hash` impl writes a trailing `0xff` byte, so hashing a
/// `&str` through this hasher does not equal [`fnv1a_64`] over its bytes.
#[derive(Debug, Clone, Copy)]
pub struct FnvHasher {
    hash: u64,
}

impl FnvHasher {
    /// Creates a hasher seeded with the 64-bit offset basis.
    pub const fn new() -> Self {
        Self {
            hash: FNV64_OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash ^= byte as u64;
            self.hash = self.hash.wrapping_mul(FNV64_PRIME);
        }
    }
}

/// Builder for [`FnvHasher`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FnvBuildHasher;

impl BuildHasher for FnvBuildHasher {
    type Hasher = FnvHasher;

    fn build_hasher(&self) -> Self::Hasher {
        FnvHasher::new()
    }
}
