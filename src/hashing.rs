//! This module provides deterministic `HashMap` and `HashSet` variants. The hashing data
//! structures in the standard library are randomly seeded, which makes iteration order differ
//! from run to run. Iteration order over group tables feeds the order in which contagion is
//! summed, so everything in the kernel uses the `rustc-hash` hasher instead.
//!
//! `HashMap<K, V, S>` does not have a `new` method for non-default hashers. Use
//! `HashMap::default()`, or bring `HashMapExt` / `HashSetExt` into scope to get `new()` and
//! `with_capacity()`.
//!
//! The `hash_str` free function is used to derive per-stream seeds in `crate::random`.

use rustc_hash::FxBuildHasher;
use xxhash_rust::xxh3::xxh3_64;

pub type HashMap<K, V> = std::collections::HashMap<K, V, FxBuildHasher>;
pub type HashSet<T> = std::collections::HashSet<T, FxBuildHasher>;

pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::with_hasher(FxBuildHasher)
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

pub trait HashSetExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        HashSet::with_hasher(FxBuildHasher)
    }

    fn with_capacity(capacity: usize) -> Self {
        HashSet::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

/// A convenience method to compute a stable hash of a `&str`. Unlike the `Fx` hasher this is
/// stable across platforms and releases, which matters because it is mixed into RNG seeds.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
