//! Chained hash index
//!
//! A fixed array of buckets, each holding a singly linked chain of entries.
//! New keys are prepended to their chain; existing keys are updated in place.
//! The table doubles when `len > 0.75 * capacity`.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::mem;

use super::errors::{IndexError, IndexResult};

/// Capacity used by [`HashIndex::new`]
pub const DEFAULT_CAPACITY: usize = 16;

/// Deterministic hasher: `DefaultHasher` with fixed keys
pub type DefaultBuildHasher = BuildHasherDefault<DefaultHasher>;

type Chain<K, V> = Option<Box<Entry<K, V>>>;

struct Entry<K, V> {
    key: K,
    value: V,
    next: Chain<K, V>,
}

/// Chained hash table mapping keys to values.
pub struct HashIndex<K, V, S = DefaultBuildHasher> {
    buckets: Vec<Chain<K, V>>,
    len: usize,
    hasher: S,
}

impl<K: Hash + Eq, V> HashIndex<K, V> {
    /// Creates an empty index with [`DEFAULT_CAPACITY`] buckets
    pub fn new() -> Self {
        Self {
            buckets: empty_buckets(DEFAULT_CAPACITY),
            len: 0,
            hasher: DefaultBuildHasher::default(),
        }
    }

    /// Creates an empty index with `capacity` buckets.
    ///
    /// A zero capacity is rejected: the bucket modulus must stay positive.
    pub fn with_capacity(capacity: usize) -> IndexResult<Self> {
        Self::with_capacity_and_hasher(capacity, DefaultBuildHasher::default())
    }
}

impl<K: Hash + Eq, V> Default for HashIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashIndex<K, V, S> {
    /// Creates an empty index with `capacity` buckets and a custom hasher
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> IndexResult<Self> {
        if capacity == 0 {
            return Err(IndexError::invalid_capacity(capacity));
        }
        Ok(Self {
            buckets: empty_buckets(capacity),
            len: 0,
            hasher,
        })
    }

    fn bucket_index<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    /// Insert or update `key`.
    ///
    /// Returns the previous value when the key was already present. An update
    /// keeps the entry's position in its chain; a new key is prepended.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(&key);

        let mut cursor = self.buckets[index].as_deref_mut();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(mem::replace(&mut entry.value, value));
            }
            cursor = entry.next.as_deref_mut();
        }

        let next = self.buckets[index].take();
        self.buckets[index] = Some(Box::new(Entry { key, value, next }));
        self.len += 1;

        if self.exceeds_load_factor() {
            self.resize();
        }
        None
    }

    /// Lookup the value stored for `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cursor = self.buckets[self.bucket_index(key)].as_deref();
        while let Some(entry) = cursor {
            if entry.key.borrow() == key {
                return Some(&entry.value);
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    /// Returns whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Remove `key`, returning its value if it was present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.bucket_index(key);

        let mut link = &mut self.buckets[index];
        while link.as_ref().is_some_and(|entry| entry.key.borrow() != key) {
            link = &mut link.as_mut()?.next;
        }

        let removed = link.take()?;
        let Entry { value, next, .. } = *removed;
        *link = next;
        self.len -= 1;
        Some(value)
    }

    fn exceeds_load_factor(&self) -> bool {
        // len > 0.75 * capacity, without floating point
        self.len.saturating_mul(4) > self.buckets.len().saturating_mul(3)
    }

    /// Double the bucket array and relink every entry under the new modulus.
    ///
    /// The new array is allocated before any entry moves, so the table is
    /// never left half-migrated.
    fn resize(&mut self) {
        let Some(new_capacity) = self.buckets.len().checked_mul(2) else {
            return;
        };

        let old_buckets = mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        for mut chain in old_buckets {
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let index = self.bucket_index(&entry.key);
                entry.next = self.buckets[index].take();
                self.buckets[index] = Some(entry);
            }
        }
    }

    /// Verify the structural invariants of the table.
    ///
    /// Checks that capacity is positive, every entry lives in the bucket its
    /// hash selects, no key appears twice and `len` matches the entry count.
    pub fn check_invariants(&self) -> IndexResult<()> {
        if self.buckets.is_empty() {
            return Err(IndexError::corruption("hash", "capacity reached zero"));
        }

        let mut counted = 0usize;
        for (index, chain) in self.buckets.iter().enumerate() {
            let mut cursor = chain.as_deref();
            while let Some(entry) = cursor {
                counted += 1;
                if self.bucket_index(&entry.key) != index {
                    return Err(IndexError::corruption(
                        "hash",
                        format!("entry found in bucket {} but hashes elsewhere", index),
                    ));
                }

                let mut rest = entry.next.as_deref();
                while let Some(other) = rest {
                    if other.key == entry.key {
                        return Err(IndexError::corruption(
                            "hash",
                            format!("duplicate key in bucket {}", index),
                        ));
                    }
                    rest = other.next.as_deref();
                }
                cursor = entry.next.as_deref();
            }
        }

        if counted != self.len {
            return Err(IndexError::corruption(
                "hash",
                format!("len is {} but {} entries are linked", self.len, counted),
            ));
        }
        Ok(())
    }
}

impl<K, V, S> HashIndex<K, V, S> {
    /// Returns the number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `len / capacity`
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Iterate over all entries in bucket order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            current: None,
        }
    }

    /// Iterate over all values in bucket order.
    ///
    /// The order is unspecified and changes after a resize.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

/// Iterator over the entries of a [`HashIndex`]
pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, Chain<K, V>>,
    current: Option<&'a Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current {
                self.current = entry.next.as_deref();
                return Some((&entry.key, &entry.value));
            }
            self.current = self.buckets.next()?.as_deref();
        }
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Chain<K, V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, || None);
    buckets
}
