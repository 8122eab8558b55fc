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
//! Scene arena: object registration, lookup and spatial queries

use crate::error::{Result, SimError};
use crate::math::Bounds;
use crate::scene::dictionary::{FieldValue, KeyedDictionary, Liveness};
use crate::scene::events::EventQueue;
use crate::scene::object::{ObjectId, ObjectTypeMask, SceneObject};
use crate::scene::spatial::SpatialGrid;
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Filter for [`Scene::find_objects`]
#[derive(Debug, Clone)]
pub struct SpatialQuery {
    /// World-space box to search
    pub bounds: Bounds,
    /// Object type bits that qualify
    pub object_types: ObjectTypeMask,
    /// Layer bits that qualify
    pub layer_mask: u32,
    /// Objects to leave out of the results
    pub ignore: SmallVec<[ObjectId; 2]>,
    /// Include objects whose `visible` flag is off
    pub include_invisible: bool,
    /// Only return objects with an enabled collision component
    pub require_collision: bool,
}

impl SpatialQuery {
    /// Query matching every object overlapping `bounds`
    pub fn new(bounds: Bounds) -> Self {
        SpatialQuery {
            bounds,
            object_types: ObjectTypeMask::ALL,
            layer_mask: u32::MAX,
            ignore: SmallVec::new(),
            include_invisible: true,
            require_collision: false,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<SceneObject>,
}

/// Owns every registered object
///
/// Ids are generational: destroying an object bumps its slot generation so
/// stale ids stop resolving even after the slot is reused.
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    alive: usize,
    grid: SpatialGrid,
    pending_deletes: EventQueue<ObjectId>,
    fields: KeyedDictionary<FieldValue>,
}

impl Scene {
    /// Create an empty scene with the given broad-phase cell size
    pub fn new(cell_size: f32) -> Self {
        Scene {
            slots: Vec::new(),
            free: Vec::new(),
            alive: 0,
            grid: SpatialGrid::new(cell_size),
            pending_deletes: EventQueue::new(),
            fields: KeyedDictionary::new(),
        }
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.alive
    }

    /// True if no objects are live
    pub fn is_empty(&self) -> bool {
        self.alive == 0
    }

    /// Register an object and its components
    ///
    /// # Returns
    ///
    /// The new id, or `SimError::RegistrationVetoed` if a component refused
    /// the registration. A vetoed object is dropped.
    pub fn register(&mut self, mut object: SceneObject) -> Result<ObjectId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let id = ObjectId::new(index, self.slots[index as usize].generation);

        if let Err(err) = object.components_mut().register(id) {
            self.free.push(index);
            return Err(err);
        }
        object.set_id(Some(id));
        object.set_marked_for_delete(false);
        let pose = object.pose();
        if let Some(collision) = object.collision_mut() {
            collision.prepare_images(&pose);
        }
        self.grid.update(id, object.world_bounds());
        debug!("Registered '{}' as {}", object.name, id);

        self.slots[index as usize].object = Some(object);
        self.alive += 1;
        Ok(id)
    }

    /// Unregister an object immediately
    ///
    /// Mounted children are detached, or queued for deletion when their
    /// mount deletes with the parent. Field records owned by the object are
    /// dropped.
    ///
    /// # Returns
    ///
    /// The unregistered object, `None` if `id` was not live
    pub fn unregister(&mut self, id: ObjectId) -> Option<SceneObject> {
        let slot = self.slot_mut(id)?;
        let mut object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.alive -= 1;

        object.components_mut().unregister();
        object.set_id(None);
        object.set_marked_for_delete(false);
        self.grid.remove(id);
        self.fields.remove_owner(id);

        let mut orphans = Vec::new();
        for child in self.slots.iter_mut().filter_map(|s| s.object.as_mut()) {
            let Some(mount) = child.mount else { continue };
            if mount.parent != id {
                continue;
            }
            if mount.delete_with_parent {
                if let Some(child_id) = child.id() {
                    orphans.push(child_id);
                }
            } else {
                child.mount = None;
            }
        }
        for child in orphans {
            self.mark_for_delete(child);
        }

        debug!("Unregistered '{}' ({})", object.name, id);
        Some(object)
    }

    /// True if `id` refers to a registered object
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Look up an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    /// Look up an object mutably
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.slot_mut(id)?.object.as_mut()
    }

    /// Look up an object or fail with `SimError::UnknownObject`
    pub fn try_get(&self, id: ObjectId) -> Result<&SceneObject> {
        self.get(id).ok_or(SimError::UnknownObject(id))
    }

    fn slot_mut(&mut self, id: ObjectId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        Some(slot)
    }

    /// Ids of every live object in slot order
    pub fn ids(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .filter_map(|s| s.object.as_ref().and_then(|o| o.id()))
            .collect()
    }

    /// Iterate live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.slots.iter().filter_map(|s| s.object.as_ref())
    }

    /// Queue an object for deletion at the next flush
    ///
    /// # Returns
    ///
    /// `false` if the object is not live or already queued
    pub fn mark_for_delete(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.get_mut(id) else { return false };
        if object.is_marked_for_delete() {
            return false;
        }
        object.set_marked_for_delete(true);
        self.pending_deletes.post(id);
        trace!("Marked {} for delete", id);
        true
    }

    /// Unregister every object queued for deletion
    ///
    /// Deletions triggered while flushing are processed in the same flush.
    /// A flush started from inside another flush does nothing.
    ///
    /// # Returns
    ///
    /// Number of objects removed
    pub fn flush_deletes(&mut self) -> usize {
        if !self.pending_deletes.begin_drain() {
            return 0;
        }
        let mut removed = 0;
        loop {
            let batch = self.pending_deletes.next_batch();
            if batch.is_empty() {
                break;
            }
            for id in batch {
                if self.unregister(id).is_some() {
                    removed += 1;
                }
            }
        }
        self.pending_deletes.end_drain();
        removed
    }

    /// Number of objects waiting for deletion
    pub fn pending_delete_count(&self) -> usize {
        self.pending_deletes.len()
    }

    /// Refresh an object's broad-phase bounds and collision image caches
    ///
    /// Call after changing the transform of a registered object directly.
    pub fn update_bounds(&mut self, id: ObjectId) {
        let Some(object) = self.get_mut(id) else { return };
        let pose = object.pose();
        if let Some(collision) = object.collision_mut() {
            collision.prepare_images(&pose);
        }
        let bounds = object.world_bounds();
        self.grid.update(id, bounds);
    }

    /// Find objects overlapping the query box that pass its filters
    ///
    /// Results come back in broad-phase order without duplicates.
    pub fn find_objects(&self, query: &SpatialQuery, out: &mut Vec<ObjectId>) {
        let mut candidates = Vec::new();
        self.grid.query(&query.bounds, &mut candidates);
        for id in candidates {
            if query.ignore.contains(&id) {
                continue;
            }
            let Some(object) = self.get(id) else { continue };
            if !object.object_type.intersects(query.object_types) {
                continue;
            }
            if object.layer_mask() & query.layer_mask == 0 {
                continue;
            }
            if !object.visible && !query.include_invisible {
                continue;
            }
            if query.require_collision && !object.collision().map_or(false, |c| c.enabled) {
                continue;
            }
            out.push(id);
        }
    }

    /// Tick every object's components in slot order
    pub fn tick_components(&mut self, dt: f32) {
        for object in self.slots.iter_mut().filter_map(|s| s.object.as_mut()) {
            object.components_mut().process_tick(dt);
        }
    }

    /// Per-object field dictionary
    pub fn fields(&self) -> &KeyedDictionary<FieldValue> {
        &self.fields
    }

    /// Set a field on an object, optionally scoped to a secondary object
    ///
    /// # Returns
    ///
    /// `false` if the owner or secondary object is not live
    pub fn set_field(&mut self, owner: ObjectId, key: &str, secondary: Option<ObjectId>, value: FieldValue) -> bool {
        if !self.is_alive(owner) || secondary.map_or(false, |s| !self.is_alive(s)) {
            return false;
        }
        self.fields.insert(owner, key, secondary, value);
        true
    }

    /// Read a field, treating records that reference dead objects as absent
    pub fn field(&self, owner: ObjectId, key: &str, secondary: Option<ObjectId>) -> Option<&FieldValue> {
        self.fields.get(owner, key, secondary, self)
    }

    /// Remove a field
    pub fn remove_field(&mut self, owner: ObjectId, key: &str, secondary: Option<ObjectId>) -> Option<FieldValue> {
        self.fields.remove(owner, key, secondary)
    }

    /// Every live `(owner, secondary, value)` stored under `key`
    pub fn fields_with_key(&mut self, key: &str) -> Vec<(ObjectId, Option<ObjectId>, FieldValue)> {
        let live = LiveSet::capture(self);
        self.fields
            .iter_key(key, &live)
            .map(|(owner, secondary, value)| (owner, secondary, value.clone()))
            .collect()
    }

    /// Every live `(key, secondary, value)` owned by `owner`
    pub fn fields_of(&mut self, owner: ObjectId) -> Vec<(String, Option<ObjectId>, FieldValue)> {
        let live = LiveSet::capture(self);
        self.fields
            .iter_owner(owner, &live)
            .map(|(key, secondary, value)| (key.to_string(), secondary, value.clone()))
            .collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(32.0)
    }
}

impl Liveness for Scene {
    fn is_alive(&self, id: ObjectId) -> bool {
        Scene::is_alive(self, id)
    }
}

/// Snapshot of slot generations, used where the scene itself is borrowed
struct LiveSet(Vec<Option<u32>>);

impl LiveSet {
    fn capture(scene: &Scene) -> Self {
        LiveSet(
            scene
                .slots
                .iter()
                .map(|s| s.object.as_ref().map(|_| s.generation))
                .collect(),
        )
    }
}

impl Liveness for LiveSet {
    fn is_alive(&self, id: ObjectId) -> bool {
        self.0.get(id.index() as usize).copied().flatten() == Some(id.generation())
    }
}
