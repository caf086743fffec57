//! Indexed-unique-ordered set.
//!
//! Keys are inserted at most once and receive a monotonically increasing
//! index. Every array in the emitted payload refers to items by this index.

use indexmap::IndexSet;
use serde::Serialize;
use std::hash::Hash;

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct IndexedSet<T: Hash + Eq> {
    items: IndexSet<T>,
}

impl<T: Hash + Eq> Default for IndexedSet<T> {
    fn default() -> Self {
        Self {
            items: IndexSet::new(),
        }
    }
}

impl<T: Hash + Eq> IndexedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item` if absent and returns its index either way.
    pub fn insert(&mut self, item: T) -> usize {
        self.items.insert_full(item).0
    }

    pub fn index_of<Q>(&self, item: &Q) -> Option<usize>
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get_index_of(item)
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.contains(item)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get_index(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<'s, T: Hash + Eq> IntoIterator for &'s IndexedSet<T> {
    type Item = &'s T;
    type IntoIter = indexmap::set::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
