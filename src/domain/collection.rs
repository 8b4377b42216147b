//! Keyed, explicitly-ordered entity collections.
//!
//! Entities live in an id-keyed arena with a separate order sequence, so
//! removal and reordering never shift sibling positions the way array
//! splicing does. Reordering is a whole-sequence re-assignment and only
//! accepts an exact permutation of the present ids.
//!
//! Serialized form is the ordered entity list; the arena is rebuilt on
//! deserialization and duplicate ids are rejected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Entities stored in a [`Collection`] expose their unique key.
pub trait Keyed {
    type Key: Ord + Clone + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// Id-keyed arena with an explicit order sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<E: Keyed> {
    items: BTreeMap<E::Key, E>,
    order: Vec<E::Key>,
}

impl<E: Keyed> Collection<E> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Build from an ordered entity list; `Err` carries the first duplicate key.
    pub fn from_entries(entries: Vec<E>) -> Result<Self, E::Key> {
        let mut collection = Self::new();
        for entity in entries {
            if let Err(rejected) = collection.insert(entity) {
                return Err(rejected.key().clone());
            }
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.items.contains_key(key)
    }

    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: &E::Key) -> Option<&mut E> {
        self.items.get_mut(key)
    }

    /// Append the entity at the end of the order; `Err` gives it back when
    /// the key is already taken.
    pub fn insert(&mut self, entity: E) -> Result<(), E> {
        let key = entity.key().clone();
        if self.items.contains_key(&key) {
            return Err(entity);
        }
        self.order.push(key.clone());
        self.items.insert(key, entity);
        Ok(())
    }

    /// Remove by key, keeping the relative order of the rest.
    pub fn remove(&mut self, key: &E::Key) -> Option<E> {
        let removed = self.items.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Keep only entities satisfying the predicate (order preserved).
    pub fn retain<F>(&mut self, mut pred: F)
    where
        F: FnMut(&E) -> bool,
    {
        self.items.retain(|_, entity| pred(entity));
        let items = &self.items;
        self.order.retain(|key| items.contains_key(key));
    }

    /// Re-assign the whole order from the supplied sequence. Returns `false`
    /// (leaving the order untouched) unless the sequence is an exact
    /// permutation of the present keys.
    pub fn reorder(&mut self, keys: &[E::Key]) -> bool {
        if keys.len() != self.items.len() {
            return false;
        }
        let unique: BTreeSet<&E::Key> = keys.iter().collect();
        if unique.len() != keys.len() {
            return false;
        }
        if !keys.iter().all(|key| self.items.contains_key(key)) {
            return false;
        }
        self.order = keys.to_vec();
        true
    }

    /// Keys in order.
    pub fn order(&self) -> &[E::Key] {
        &self.order
    }

    /// Entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.order.iter().filter_map(|key| self.items.get(key))
    }

    /// Mutable entity access in arena (key) order; used by detach cascades
    /// that touch every entity regardless of display order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut E> + '_ {
        self.items.values_mut()
    }
}

impl<E: Keyed> Default for Collection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Keyed + Serialize> Serialize for Collection<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, E: Keyed + Deserialize<'de>> Deserialize<'de> for Collection<E> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<E>::deserialize(deserializer)?;
        Collection::from_entries(entries)
            .map_err(|_| D::Error::custom("duplicate id in collection"))
    }
}
