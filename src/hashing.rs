//! This module provides a deterministic hasher and `HashMap` and `HashSet` variants that use
//! it. The hashing data structures in the standard library are randomly seeded, which would make
//! iteration order (and therefore announcement order) differ between runs with the same seed.
//!
//! `HashMap<K, V, S>` does not have a `new` method for a non-default hasher. Use
//! `HashMap::default()`, or bring `HashMapExt` / `HashSetExt` into scope to keep the familiar
//! constructor.
//!
//! The `hash_str` free function is used in `crate::random` to derive per-stream seeds.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, Default::default())
    }
}

pub trait HashSetExt {
    fn new() -> Self;
}

impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        HashSet::default()
    }
}

/// A convenience method to compute a stable hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("hello");
        let b = hash_str("hello");
        let c = hash_str("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn map_ext_constructors() {
        let mut map: HashMap<u32, &str> = HashMap::new();
        map.insert(1, "one");
        assert_eq!(map.get(&1), Some(&"one"));

        let map: HashMap<u32, u32> = HashMap::with_capacity(8);
        assert!(map.capacity() >= 8);

        let mut set: HashSet<u32> = HashSet::new();
        assert!(set.insert(3));
        assert!(!set.insert(3));
    }
}
