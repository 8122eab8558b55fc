// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Keyed dictionary of per-object values
//!
//! Records are keyed by `(owner, key, secondary)` and threaded on two
//! doubly-linked chains: one per key string and one per owner. That makes
//! "every record for this key" and "every record of this object" walks
//! cheap without scanning the whole table.
//!
//! Records are invalidated lazily. A record whose owner, secondary object or
//! referenced value object is no longer alive is dropped the next time a
//! mutable lookup or chain walk touches it.

use crate::scene::ObjectId;
use glam::Vec2;
use std::collections::HashMap;

/// Answers whether an object id still refers to a live object
pub trait Liveness {
    /// True if `id` is registered and not destroyed
    fn is_alive(&self, id: ObjectId) -> bool;
}

/// Values that may reference another object
///
/// A record holding a value whose referenced object died is reaped like a
/// record whose owner died.
pub trait Tracked {
    /// Object referenced by the value, if any
    fn tracked_object(&self) -> Option<ObjectId> {
        None
    }
}

impl Tracked for f32 {}
impl Tracked for f64 {}
impl Tracked for i32 {}
impl Tracked for u32 {}
impl Tracked for bool {}
impl Tracked for String {}
impl Tracked for Vec2 {}

impl Tracked for ObjectId {
    fn tracked_object(&self) -> Option<ObjectId> {
        Some(*self)
    }
}

impl<T: Tracked> Tracked for Option<T> {
    fn tracked_object(&self) -> Option<ObjectId> {
        self.as_ref().and_then(Tracked::tracked_object)
    }
}

type RecordKey = (ObjectId, String, Option<ObjectId>);

#[derive(Debug)]
struct Record<V> {
    owner: ObjectId,
    key: String,
    secondary: Option<ObjectId>,
    value: V,
    key_prev: Option<usize>,
    key_next: Option<usize>,
    owner_prev: Option<usize>,
    owner_next: Option<usize>,
}

/// Dictionary of values keyed by owner, key string and optional secondary
/// object
#[derive(Debug)]
pub struct KeyedDictionary<V> {
    records: Vec<Option<Record<V>>>,
    free: Vec<usize>,
    index: HashMap<RecordKey, usize>,
    key_heads: HashMap<String, usize>,
    owner_heads: HashMap<ObjectId, usize>,
}

impl<V> Default for KeyedDictionary<V> {
    fn default() -> Self {
        KeyedDictionary {
            records: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            key_heads: HashMap::new(),
            owner_heads: HashMap::new(),
        }
    }
}

impl<V: Tracked> KeyedDictionary<V> {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including not yet reaped stale ones
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no records are stored
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert or replace a value
    ///
    /// # Returns
    ///
    /// The previous value stored under the same key triple
    pub fn insert(&mut self, owner: ObjectId, key: &str, secondary: Option<ObjectId>, value: V) -> Option<V> {
        let record_key = (owner, key.to_string(), secondary);
        if let Some(&slot) = self.index.get(&record_key) {
            if let Some(record) = self.records[slot].as_mut() {
                return Some(std::mem::replace(&mut record.value, value));
            }
        }

        let key_next = self.key_heads.get(key).copied();
        let owner_next = self.owner_heads.get(&owner).copied();
        let record = Record {
            owner,
            key: key.to_string(),
            secondary,
            value,
            key_prev: None,
            key_next,
            owner_prev: None,
            owner_next,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.records[slot] = Some(record);
                slot
            }
            None => {
                self.records.push(Some(record));
                self.records.len() - 1
            }
        };

        if let Some(next) = key_next {
            if let Some(r) = self.records[next].as_mut() {
                r.key_prev = Some(slot);
            }
        }
        if let Some(next) = owner_next {
            if let Some(r) = self.records[next].as_mut() {
                r.owner_prev = Some(slot);
            }
        }
        self.key_heads.insert(key.to_string(), slot);
        self.owner_heads.insert(owner, slot);
        self.index.insert(record_key, slot);
        None
    }

    /// Look up a value without reaping
    ///
    /// Stale records read as absent.
    pub fn get(&self, owner: ObjectId, key: &str, secondary: Option<ObjectId>, live: &impl Liveness) -> Option<&V> {
        let slot = *self.index.get(&(owner, key.to_string(), secondary))?;
        let record = self.records[slot].as_ref()?;
        if Self::is_valid(record, live) {
            Some(&record.value)
        } else {
            None
        }
    }

    /// Look up a value mutably, reaping the record if it went stale
    pub fn get_mut(
        &mut self,
        owner: ObjectId,
        key: &str,
        secondary: Option<ObjectId>,
        live: &impl Liveness,
    ) -> Option<&mut V> {
        let slot = *self.index.get(&(owner, key.to_string(), secondary))?;
        let valid = self.records[slot].as_ref().map_or(false, |r| Self::is_valid(r, live));
        if !valid {
            self.unlink(slot);
            return None;
        }
        self.records[slot].as_mut().map(|r| &mut r.value)
    }

    /// Remove a value
    pub fn remove(&mut self, owner: ObjectId, key: &str, secondary: Option<ObjectId>) -> Option<V> {
        let slot = *self.index.get(&(owner, key.to_string(), secondary))?;
        self.unlink(slot).map(|r| r.value)
    }

    /// Remove every record owned by `owner`
    ///
    /// # Returns
    ///
    /// Number of records removed
    pub fn remove_owner(&mut self, owner: ObjectId) -> usize {
        let mut removed = 0;
        while let Some(&slot) = self.owner_heads.get(&owner) {
            if self.unlink(slot).is_none() {
                break;
            }
            removed += 1;
        }
        removed
    }

    /// Walk every live record stored under `key`, newest first
    ///
    /// Stale records on the chain are reaped before the walk starts.
    pub fn iter_key(&mut self, key: &str, live: &impl Liveness) -> KeyIter<'_, V> {
        let mut stale = Vec::new();
        let mut cursor = self.key_heads.get(key).copied();
        while let Some(slot) = cursor {
            let Some(record) = self.records[slot].as_ref() else { break };
            if !Self::is_valid(record, live) {
                stale.push(slot);
            }
            cursor = record.key_next;
        }
        for slot in stale {
            self.unlink(slot);
        }
        KeyIter {
            records: &self.records,
            cursor: self.key_heads.get(key).copied(),
        }
    }

    /// Walk every live record owned by `owner`, newest first
    ///
    /// Stale records on the chain are reaped before the walk starts.
    pub fn iter_owner(&mut self, owner: ObjectId, live: &impl Liveness) -> OwnerIter<'_, V> {
        let mut stale = Vec::new();
        let mut cursor = self.owner_heads.get(&owner).copied();
        while let Some(slot) = cursor {
            let Some(record) = self.records[slot].as_ref() else { break };
            if !Self::is_valid(record, live) {
                stale.push(slot);
            }
            cursor = record.owner_next;
        }
        for slot in stale {
            self.unlink(slot);
        }
        OwnerIter {
            records: &self.records,
            cursor: self.owner_heads.get(&owner).copied(),
        }
    }

    /// Reap every stale record in the dictionary
    ///
    /// # Returns
    ///
    /// Number of records removed
    pub fn reap(&mut self, live: &impl Liveness) -> usize {
        let stale: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| match r {
                Some(record) if !Self::is_valid(record, live) => Some(slot),
                _ => None,
            })
            .collect();
        let count = stale.len();
        for slot in stale {
            self.unlink(slot);
        }
        count
    }

    fn is_valid(record: &Record<V>, live: &impl Liveness) -> bool {
        live.is_alive(record.owner)
            && record.secondary.map_or(true, |id| live.is_alive(id))
            && record.value.tracked_object().map_or(true, |id| live.is_alive(id))
    }

    fn unlink(&mut self, slot: usize) -> Option<Record<V>> {
        let record = self.records.get_mut(slot)?.take()?;

        match record.key_prev {
            Some(prev) => {
                if let Some(r) = self.records[prev].as_mut() {
                    r.key_next = record.key_next;
                }
            }
            None => match record.key_next {
                Some(next) => {
                    self.key_heads.insert(record.key.clone(), next);
                }
                None => {
                    self.key_heads.remove(&record.key);
                }
            },
        }
        if let Some(next) = record.key_next {
            if let Some(r) = self.records[next].as_mut() {
                r.key_prev = record.key_prev;
            }
        }

        match record.owner_prev {
            Some(prev) => {
                if let Some(r) = self.records[prev].as_mut() {
                    r.owner_next = record.owner_next;
                }
            }
            None => match record.owner_next {
                Some(next) => {
                    self.owner_heads.insert(record.owner, next);
                }
                None => {
                    self.owner_heads.remove(&record.owner);
                }
            },
        }
        if let Some(next) = record.owner_next {
            if let Some(r) = self.records[next].as_mut() {
                r.owner_prev = record.owner_prev;
            }
        }

        self.index
            .remove(&(record.owner, record.key.clone(), record.secondary));
        self.free.push(slot);
        Some(record)
    }
}

/// Iterator over the records of one key
pub struct KeyIter<'a, V> {
    records: &'a [Option<Record<V>>],
    cursor: Option<usize>,
}

impl<'a, V> Iterator for KeyIter<'a, V> {
    /// `(owner, secondary, value)`
    type Item = (ObjectId, Option<ObjectId>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records[self.cursor?].as_ref()?;
        self.cursor = record.key_next;
        Some((record.owner, record.secondary, &record.value))
    }
}

/// Iterator over the records of one owner
pub struct OwnerIter<'a, V> {
    records: &'a [Option<Record<V>>],
    cursor: Option<usize>,
}

impl<'a, V> Iterator for OwnerIter<'a, V> {
    /// `(key, secondary, value)`
    type Item = (&'a str, Option<ObjectId>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records[self.cursor?].as_ref()?;
        self.cursor = record.owner_next;
        Some((record.key.as_str(), record.secondary, &record.value))
    }
}

/// Value stored in a scene's per-object field dictionary
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar
    Float(f32),
    /// Integer
    Int(i32),
    /// Flag
    Bool(bool),
    /// Text
    Text(String),
    /// 2D vector
    Vector(Vec2),
    /// Reference to another object
    Object(ObjectId),
}

impl Tracked for FieldValue {
    fn tracked_object(&self) -> Option<ObjectId> {
        match self {
            FieldValue::Object(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Alive(HashSet<ObjectId>);

    impl Liveness for Alive {
        fn is_alive(&self, id: ObjectId) -> bool {
            self.0.contains(&id)
        }
    }

    fn ids(n: u32) -> (Vec<ObjectId>, Alive) {
        let ids: Vec<ObjectId> = (0..n).map(|i| ObjectId::new(i, 0)).collect();
        let alive = Alive(ids.iter().copied().collect());
        (ids, alive)
    }

    #[test]
    fn test_insert_get_replace() {
        let (ids, alive) = ids(1);
        let mut dict = KeyedDictionary::new();
        assert!(dict.insert(ids[0], "health", None, 10.0f32).is_none());
        assert_eq!(dict.insert(ids[0], "health", None, 8.0), Some(10.0));
        assert_eq!(dict.get(ids[0], "health", None, &alive), Some(&8.0));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_secondary_is_part_of_key() {
        let (ids, alive) = ids(3);
        let mut dict = KeyedDictionary::new();
        dict.insert(ids[0], "damage", Some(ids[1]), 1i32);
        dict.insert(ids[0], "damage", Some(ids[2]), 2i32);
        assert_eq!(dict.get(ids[0], "damage", Some(ids[1]), &alive), Some(&1));
        assert_eq!(dict.get(ids[0], "damage", Some(ids[2]), &alive), Some(&2));
        assert_eq!(dict.get(ids[0], "damage", None, &alive), None);
    }

    #[test]
    fn test_key_and_owner_chains() {
        let (ids, alive) = ids(3);
        let mut dict = KeyedDictionary::new();
        dict.insert(ids[0], "score", None, 1i32);
        dict.insert(ids[1], "score", None, 2i32);
        dict.insert(ids[1], "lives", None, 3i32);
        dict.insert(ids[2], "score", None, 4i32);

        let scores: Vec<i32> = dict.iter_key("score", &alive).map(|(_, _, v)| *v).collect();
        assert_eq!(scores, vec![4, 2, 1]);

        let owned: Vec<&str> = dict.iter_owner(ids[1], &alive).map(|(k, _, _)| k).collect();
        assert_eq!(owned, vec!["lives", "score"]);

        assert_eq!(dict.remove(ids[1], "score", None), Some(2));
        let scores: Vec<i32> = dict.iter_key("score", &alive).map(|(_, _, v)| *v).collect();
        assert_eq!(scores, vec![4, 1]);
        let owned: Vec<&str> = dict.iter_owner(ids[1], &alive).map(|(k, _, _)| k).collect();
        assert_eq!(owned, vec!["lives"]);
    }

    #[test]
    fn test_dead_owner_reaped_lazily() {
        let (ids, mut alive) = ids(2);
        let mut dict = KeyedDictionary::new();
        dict.insert(ids[0], "tag", None, true);
        dict.insert(ids[1], "tag", None, false);

        alive.0.remove(&ids[0]);
        assert_eq!(dict.get(ids[0], "tag", None, &alive), None);
        assert_eq!(dict.len(), 2);

        let remaining: Vec<ObjectId> = dict.iter_key("tag", &alive).map(|(owner, _, _)| owner).collect();
        assert_eq!(remaining, vec![ids[1]]);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_dead_secondary_and_value_reaped() {
        let (ids, mut alive) = ids(3);
        let mut dict = KeyedDictionary::new();
        dict.insert(ids[0], "pair", Some(ids[1]), FieldValue::Int(1));
        dict.insert(ids[0], "target", None, FieldValue::Object(ids[2]));
        dict.insert(ids[0], "name", None, FieldValue::Text("hero".to_string()));

        alive.0.remove(&ids[1]);
        alive.0.remove(&ids[2]);
        assert!(dict.get_mut(ids[0], "pair", Some(ids[1]), &alive).is_none());
        assert_eq!(dict.reap(&alive), 1);
        assert_eq!(dict.len(), 1);
        assert!(dict.get(ids[0], "name", None, &alive).is_some());
    }

    #[test]
    fn test_remove_owner_and_slot_reuse() {
        let (ids, alive) = ids(2);
        let mut dict = KeyedDictionary::new();
        dict.insert(ids[0], "a", None, 1u32);
        dict.insert(ids[0], "b", None, 2u32);
        dict.insert(ids[1], "a", None, 3u32);
        assert_eq!(dict.remove_owner(ids[0]), 2);
        assert_eq!(dict.len(), 1);

        dict.insert(ids[1], "c", None, 4u32);
        let values: Vec<u32> = dict.iter_owner(ids[1], &alive).map(|(_, _, v)| *v).collect();
        assert_eq!(values, vec![4, 3]);
        let a_values: Vec<u32> = dict.iter_key("a", &alive).map(|(_, _, v)| *v).collect();
        assert_eq!(a_values, vec![3]);
    }
}
