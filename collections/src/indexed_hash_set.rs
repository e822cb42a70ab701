use crate::index::Idx;
use crate::segmented::SegmentedVec;
use hashbrown::{DefaultHashBuilder, HashTable};
use std::hash::{BuildHasher, Hash};
use std::ops::Index;

/// Content-addressed deduplicating store.
///
/// Every distinct value is stored exactly once, in insertion order, inside a
/// [`SegmentedVec`] that never moves its elements; a hash table over the
/// stored values maps a prospective value to its dense [`Idx`]. Lookup works
/// directly on the candidate value, no intermediate allocation is needed.
///
/// Iteration order equals index order equals insertion order.
#[derive(Debug)]
pub struct IndexedHashSet<T> {
    storage: SegmentedVec<T>,
    table: HashTable<u32>,
    hasher: DefaultHashBuilder,
}

impl<T: PartialEq> PartialEq for IndexedHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl<T> Default for IndexedHashSet<T> {
    fn default() -> Self {
        IndexedHashSet {
            storage: SegmentedVec::new(),
            table: HashTable::new(),
            hasher: DefaultHashBuilder::default(),
        }
    }
}

impl<T: Hash + Eq> IndexedHashSet<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Looks up an equal element, returning its index if present.
    pub fn find(&self, element: &T) -> Option<Idx<T>> {
        let hash = self.hasher.hash_one(element);
        self.table
            .find(hash, |&i| &self.storage[i as usize] == element)
            .map(|&i| Idx::new(i))
    }

    /// Inserts `element` unless an equal one is already stored.
    ///
    /// Returns the element's index and whether it was newly inserted.
    pub fn insert(&mut self, element: T) -> (Idx<T>, bool) {
        let hash = self.hasher.hash_one(&element);
        if let Some(&i) = self.table.find(hash, |&i| self.storage[i as usize] == element) {
            return (Idx::new(i), false);
        }

        let index = self.storage.len() as u32;
        self.storage.push(element);
        let storage = &self.storage;
        let hasher = &self.hasher;
        self.table
            .insert_unique(hash, index, |&i| hasher.hash_one(&storage[i as usize]));
        (Idx::new(index), true)
    }

    pub fn get(&self, index: Idx<T>) -> &T {
        &self.storage[usize::from(index)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.storage.iter()
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.table.clear();
    }
}

impl<T: Hash + Eq> Index<Idx<T>> for IndexedHashSet<T> {
    type Output = T;

    fn index(&self, index: Idx<T>) -> &T {
        self.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = IndexedHashSet::new();
        let (a, inserted) = set.insert("alpha".to_string());
        assert!(inserted);
        let (b, inserted) = set.insert("alpha".to_string());
        assert!(!inserted);
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
        assert_eq!(set[a], "alpha");
    }

    #[test]
    fn iteration_order_is_index_order() {
        let mut set = IndexedHashSet::new();
        for word in ["c", "a", "b", "a", "c", "d"] {
            set.insert(word.to_string());
        }
        let collected: Vec<_> = set.iter().map(|s| s.as_str()).collect();
        assert_eq!(collected, vec!["c", "a", "b", "d"]);
        assert_eq!(set.find(&"b".to_string()), Some(Idx::new(2)));
        assert_eq!(set.find(&"z".to_string()), None);
    }
}
