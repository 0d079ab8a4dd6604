//! Dense, indexable entity collections
//!
//! Every entity kind is stored in insertion order next to an id → index map
//! and an id list, so iteration is cheap and deterministic while lookups by
//! caller-supplied id stay O(log n). Re-adding an existing id replaces the
//! stored entity in place.

use std::collections::BTreeMap;

/// Entities that expose their own registry key
pub trait Keyed {
    /// The id type
    type Id: Ord + Copy + std::fmt::Debug;

    /// The entity's id
    fn key(&self) -> Self::Id;
}

/// An insertion-ordered collection indexed by entity id
#[derive(Debug, Clone)]
pub struct Registry<T: Keyed> {
    entries: Vec<T>,
    index: BTreeMap<T::Id, usize>,
    ids: Vec<T::Id>,
}

impl<T: Keyed> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
            ids: Vec::new(),
        }
    }
}

impl<T: Keyed> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity; an entity with the same id is replaced in place
    pub fn add(&mut self, entity: T) {
        let id = entity.key();
        match self.index.get(&id) {
            Some(&i) => self.entries[i] = entity,
            None => {
                self.index.insert(id, self.entries.len());
                self.ids.push(id);
                self.entries.push(entity);
            }
        }
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entity with the given id exists
    pub fn contains(&self, id: T::Id) -> bool {
        self.index.contains_key(&id)
    }

    /// Entity by id
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    /// Mutable entity by id
    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[T::Id] {
        &self.ids
    }

    /// Iterate entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Iterate entities mutably in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }
}

impl<'a, T: Keyed> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// Registry keys for the model types

impl Keyed for crate::model::Space {
    type Id = crate::types::SpaceId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::Person {
    type Id = crate::types::PersonId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::Event {
    type Id = crate::types::EventId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::Sensor {
    type Id = crate::types::SensorId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::MetaPerson {
    type Id = crate::types::MetaPersonId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::MetaEvent {
    type Id = crate::types::MetaEventId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

impl Keyed for crate::model::MetaSensor {
    type Id = crate::types::MetaSensorId;
    fn key(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        label: &'static str,
    }

    impl Keyed for Item {
        type Id = i64;
        fn key(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut r = Registry::new();
        r.add(Item { id: 3, label: "c" });
        r.add(Item { id: 1, label: "a" });
        assert_eq!(r.len(), 2);
        assert_eq!(r.get(3).unwrap().label, "c");
        assert_eq!(r.get(1).unwrap().label, "a");
        assert!(r.get(2).is_none());
    }

    #[test]
    fn test_duplicate_replaces() {
        let mut r = Registry::new();
        r.add(Item { id: 1, label: "old" });
        r.add(Item { id: 1, label: "new" });
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(1).unwrap().label, "new");
        assert_eq!(r.ids(), &[1]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut r = Registry::new();
        for id in [5, 2, 9, 1] {
            r.add(Item { id, label: "x" });
        }
        let order: Vec<i64> = r.iter().map(|i| i.id).collect();
        assert_eq!(order, vec![5, 2, 9, 1]);
        assert_eq!(r.ids(), &[5, 2, 9, 1]);
    }

    #[test]
    fn test_every_id_resolves_to_itself() {
        let mut r = Registry::new();
        for id in [4, 7, -1, 0] {
            r.add(Item { id, label: "x" });
        }
        for &id in r.ids() {
            assert_eq!(r.get(id).unwrap().key(), id);
        }
    }
}
