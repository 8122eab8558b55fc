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
//! Scene objects and their identifiers
//!
//! Objects live in the [`Scene`](crate::scene::Scene) arena and are addressed
//! by generational [`ObjectId`]s. A destroyed object's id stays invalid even
//! after its slot is reused, which is what lets collision callbacks delete
//! objects mid-resolution without leaving dangling references behind.

use crate::collision::{CollisionComponent, ObjectPose, WorldLimitComponent};
use crate::math::Bounds;
use crate::physics::PhysicsComponent;
use crate::scene::component::{Component, ComponentContainer};
use glam::Vec2;
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Generational handle to a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Create an id from a slot index and generation
    pub fn new(index: u32, generation: u32) -> Self {
        ObjectId { index, generation }
    }

    /// Slot index in the scene arena
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation number of the slot when this id was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}, gen: {})", self.index, self.generation)
    }
}

/// Bitmask of object types used by spatial queries and collision filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectTypeMask(pub u64);

impl ObjectTypeMask {
    /// Matches nothing
    pub const NONE: ObjectTypeMask = ObjectTypeMask(0);
    /// Matches every type
    pub const ALL: ObjectTypeMask = ObjectTypeMask(u64::MAX);

    /// Mask with a single type bit set
    ///
    /// # Panics
    ///
    /// Panics if `bit` is 64 or larger
    pub fn bit(bit: u32) -> Self {
        assert!(bit < 64, "Object type bit {} out of range", bit);
        ObjectTypeMask(1 << bit)
    }

    /// True if any type bit is shared
    pub fn intersects(self, other: ObjectTypeMask) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no bit is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ObjectTypeMask {
    type Output = ObjectTypeMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ObjectTypeMask(self.0 | rhs.0)
    }
}

impl BitAnd for ObjectTypeMask {
    type Output = ObjectTypeMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        ObjectTypeMask(self.0 & rhs.0)
    }
}

/// Attachment of an object to a parent object
///
/// Mounted objects do not simulate on their own; each tick their transform
/// and velocity are slaved to the parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mount {
    /// Object this one follows
    pub parent: ObjectId,
    /// Offset from the parent position, in the parent's rotated frame
    pub offset: Vec2,
    /// Whether the mounted object copies the parent rotation
    pub track_rotation: bool,
    /// Whether deleting the parent also deletes this object
    pub delete_with_parent: bool,
}

impl Mount {
    /// Mount at an offset, tracking rotation and owned by the parent
    pub fn new(parent: ObjectId, offset: Vec2) -> Self {
        Mount {
            parent,
            offset,
            track_rotation: true,
            delete_with_parent: true,
        }
    }
}

/// An object in the scene
///
/// Transform fields are public; after changing `position`, `size` or the
/// flips of a registered object call
/// [`Scene::update_bounds`](crate::scene::Scene::update_bounds) so the broad
/// phase sees the change.
pub struct SceneObject {
    /// Human readable name
    pub name: String,
    /// World position of the object center
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Full width and height
    pub size: Vec2,
    /// Mirror horizontally
    pub flip_x: bool,
    /// Mirror vertically
    pub flip_y: bool,
    /// Type bits matched against query masks
    pub object_type: ObjectTypeMask,
    /// Layer index in `0..32`
    pub layer: u32,
    /// Visibility flag honored by spatial queries
    pub visible: bool,
    /// Optional parent attachment
    pub mount: Option<Mount>,
    components: ComponentContainer,
    id: Option<ObjectId>,
    marked_for_delete: bool,
}

impl SceneObject {
    /// Create an unregistered object of unit size at the origin
    pub fn new(name: impl Into<String>) -> Self {
        SceneObject {
            name: name.into(),
            position: Vec2::ZERO,
            rotation: 0.0,
            size: Vec2::ONE,
            flip_x: false,
            flip_y: false,
            object_type: ObjectTypeMask::bit(0),
            layer: 0,
            visible: true,
            mount: None,
            components: ComponentContainer::new(),
            id: None,
            marked_for_delete: false,
        }
    }

    /// Builder: set the position
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Builder: set the size
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Builder: set the object type bits
    pub fn with_object_type(mut self, object_type: ObjectTypeMask) -> Self {
        self.object_type = object_type;
        self
    }

    /// Builder: set the layer index
    pub fn with_layer(mut self, layer: u32) -> Self {
        assert!(layer < 32, "Layer {} out of range", layer);
        self.layer = layer;
        self
    }

    /// Builder: attach a component
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.components.add_component(component);
        self
    }

    /// Attach a component
    ///
    /// # Panics
    ///
    /// Panics if the object is registered
    pub fn add_component(&mut self, component: impl Component) {
        self.components.add_component(component);
    }

    /// Id assigned at registration, `None` while unregistered
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Option<ObjectId>) {
        self.id = id;
    }

    /// Whether the object is waiting for deferred deletion
    pub fn is_marked_for_delete(&self) -> bool {
        self.marked_for_delete
    }

    pub(crate) fn set_marked_for_delete(&mut self, marked: bool) {
        self.marked_for_delete = marked;
    }

    /// Root component container
    pub fn components(&self) -> &ComponentContainer {
        &self.components
    }

    /// Mutable root component container
    pub fn components_mut(&mut self) -> &mut ComponentContainer {
        &mut self.components
    }

    /// Physics component, if attached
    pub fn physics(&self) -> Option<&PhysicsComponent> {
        self.components.find_component::<PhysicsComponent>()
    }

    /// Mutable physics component, if attached
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsComponent> {
        self.components.find_component_mut::<PhysicsComponent>()
    }

    /// Collision component, if attached
    pub fn collision(&self) -> Option<&CollisionComponent> {
        self.components.find_component::<CollisionComponent>()
    }

    /// Mutable collision component, if attached
    pub fn collision_mut(&mut self) -> Option<&mut CollisionComponent> {
        self.components.find_component_mut::<CollisionComponent>()
    }

    /// World limit component, if attached
    pub fn world_limit(&self) -> Option<&WorldLimitComponent> {
        self.components.find_component::<WorldLimitComponent>()
    }

    /// Mutable world limit component, if attached
    pub fn world_limit_mut(&mut self) -> Option<&mut WorldLimitComponent> {
        self.components.find_component_mut::<WorldLimitComponent>()
    }

    /// Current linear velocity, zero without a physics component
    pub fn velocity(&self) -> Vec2 {
        self.physics().map_or(Vec2::ZERO, |p| p.velocity())
    }

    /// Layer as a single-bit mask
    pub fn layer_mask(&self) -> u32 {
        1u32 << self.layer.min(31)
    }

    /// Transform snapshot used by collision images
    pub fn pose(&self) -> ObjectPose {
        ObjectPose {
            position: self.position,
            rotation: self.rotation,
            size: self.size,
            flip_x: self.flip_x,
            flip_y: self.flip_y,
        }
    }

    /// Axis-aligned bounds of the rotated object rectangle
    pub fn world_bounds(&self) -> Bounds {
        let half = self.size.abs() * 0.5;
        let (sin, cos) = self.rotation.sin_cos();
        let extents = Vec2::new(
            cos.abs() * half.x + sin.abs() * half.y,
            sin.abs() * half.x + cos.abs() * half.y,
        );
        Bounds::from_center(self.position, extents)
    }
}

impl fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneObject")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("size", &self.size)
            .field("components", &self.components.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        let id = ObjectId::new(3, 1);
        assert_eq!(id.index(), 3);
        assert_eq!(id.generation(), 1);
        assert_eq!(id.to_string(), "Object(3, gen: 1)");
    }

    #[test]
    fn test_object_id_equality() {
        assert_eq!(ObjectId::new(1, 0), ObjectId::new(1, 0));
        assert_ne!(ObjectId::new(1, 0), ObjectId::new(1, 1));
    }

    #[test]
    fn test_type_mask_ops() {
        let player = ObjectTypeMask::bit(1);
        let enemy = ObjectTypeMask::bit(2);
        let both = player | enemy;
        assert!(both.intersects(player));
        assert!(!player.intersects(enemy));
        assert_eq!(both & enemy, enemy);
        assert!(ObjectTypeMask::NONE.is_empty());
    }

    #[test]
    fn test_world_bounds_rotated() {
        let mut object = SceneObject::new("box").with_size(Vec2::new(4.0, 2.0));
        let bounds = object.world_bounds();
        assert_eq!(bounds.half_extents(), Vec2::new(2.0, 1.0));

        object.rotation = std::f32::consts::FRAC_PI_2;
        let rotated = object.world_bounds().half_extents();
        assert!((rotated.x - 1.0).abs() < 1e-5);
        assert!((rotated.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_accessors_without_components() {
        let object = SceneObject::new("bare");
        assert!(object.physics().is_none());
        assert!(object.collision().is_none());
        assert!(object.world_limit().is_none());
        assert_eq!(object.velocity(), Vec2::ZERO);
        assert!(object.id().is_none());
    }
}
