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
//! Collision component and the swept collision query

use crate::collision::callbacks::{CallbackId, CallbackTable, EarlyOutId};
use crate::collision::image::{effective_velocity, CollisionImage, ObjectPose};
use crate::collision::info::{ContactList, ContactStamp};
use crate::collision::polygon::PolygonImage;
use crate::collision::resolve::ResolveStrategy;
use crate::config::SimulationConfig;
use crate::math::Bounds;
use crate::scene::{Component, ObjectId, ObjectTypeMask, Scene, SpatialQuery};
use glam::Vec2;
use smallvec::smallvec;
use std::any::Any;

/// Optional predicate consulted before testing against certain objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyOut {
    /// Candidates with any of these type bits are offered to the predicate
    pub object_types: ObjectTypeMask,
    /// Predicate returning `true` to skip the candidate
    pub predicate: EarlyOutId,
}

/// Makes an object collide with other collision-enabled objects
pub struct CollisionComponent {
    images: Vec<Box<dyn CollisionImage>>,
    /// Disabled components neither test nor get found by other movers
    pub enabled: bool,
    /// Object types this object collides with
    pub collides_with: ObjectTypeMask,
    /// Layers this object collides with
    pub collides_with_layers: u32,
    /// Response applied when this object is involved in a contact
    pub resolve: ResolveStrategy,
    /// Callback run before the response
    pub on_collision: Option<CallbackId>,
    /// Mover-side early-out
    pub early_out: Option<EarlyOut>,
}

impl CollisionComponent {
    /// Enabled component with no images that bounces off everything
    pub fn new() -> Self {
        CollisionComponent {
            images: Vec::new(),
            enabled: true,
            collides_with: ObjectTypeMask::ALL,
            collides_with_layers: u32::MAX,
            resolve: ResolveStrategy::Bounce,
            on_collision: None,
            early_out: None,
        }
    }

    /// Component with a single image covering the object rectangle
    pub fn boxed() -> Self {
        Self::new().with_image(PolygonImage::square())
    }

    /// Builder: add an image
    pub fn with_image(mut self, image: impl CollisionImage) -> Self {
        self.images.push(Box::new(image));
        self
    }

    /// Builder: set the resolve strategy
    pub fn with_resolve(mut self, resolve: ResolveStrategy) -> Self {
        self.resolve = resolve;
        self
    }

    /// Builder: set the on-collision callback
    pub fn with_callback(mut self, callback: CallbackId) -> Self {
        self.on_collision = Some(callback);
        self
    }

    /// Add an image
    pub fn add_image(&mut self, image: impl CollisionImage) {
        self.images.push(Box::new(image));
    }

    /// Images in index order
    pub fn images(&self) -> &[Box<dyn CollisionImage>] {
        &self.images
    }

    /// Image at `index`
    pub fn image(&self, index: usize) -> Option<&dyn CollisionImage> {
        self.images.get(index).map(|i| i.as_ref())
    }

    /// Mutable image at `index`; call `mark_dirty` after reshaping it
    pub fn image_mut(&mut self, index: usize) -> Option<&mut dyn CollisionImage> {
        match self.images.get_mut(index) {
            Some(image) => Some(image.as_mut()),
            None => None,
        }
    }

    /// Rebuild image caches for the given pose
    pub fn prepare_images(&mut self, pose: &ObjectPose) {
        for image in &mut self.images {
            image.prepare(pose);
        }
    }

    /// Force every image to rebuild at the next prepare
    pub fn mark_images_dirty(&mut self) {
        for image in &mut self.images {
            image.mark_dirty();
        }
    }
}

impl Default for CollisionComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CollisionComponent {
    fn clone(&self) -> Self {
        CollisionComponent {
            images: self.images.iter().map(|i| i.clone_image()).collect(),
            enabled: self.enabled,
            collides_with: self.collides_with,
            collides_with_layers: self.collides_with_layers,
            resolve: self.resolve,
            on_collision: self.on_collision,
            early_out: self.early_out,
        }
    }
}

impl Component for CollisionComponent {
    fn type_name(&self) -> &'static str {
        "CollisionComponent"
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<CollisionComponent>() {
            *target = self.clone();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sweep object `id` along `velocity` for at most `dt` and collect contacts
///
/// The world limit is tested first, then every collision-enabled object in
/// the swept search box. For each image pair the image with the higher
/// priority runs the test; on a tie the mover does. `dt` is lowered to the
/// earliest time of impact found.
pub fn test_move(
    scene: &Scene,
    callbacks: &mut CallbackTable,
    config: &SimulationConfig,
    id: ObjectId,
    dt: &mut f32,
    velocity: Vec2,
    out: &mut ContactList,
) {
    let Some(object) = scene.get(id) else { return };
    let pose = object.pose();
    let search = search_bounds(object.world_bounds(), velocity, *dt, config);
    let collision = object.collision().filter(|c| c.enabled);

    if let Some(limit) = object.world_limit().filter(|l| l.enabled) {
        limit.test_move(collision.map(|c| c.images()), &pose, &search, dt, velocity, out);
    }

    let Some(collision) = collision else { return };
    if collision.images.is_empty() {
        return;
    }

    let query = SpatialQuery {
        bounds: search,
        object_types: collision.collides_with,
        layer_mask: collision.collides_with_layers,
        ignore: smallvec![id],
        include_invisible: true,
        require_collision: true,
    };
    let mut candidates = Vec::new();
    scene.find_objects(&query, &mut candidates);

    for other_id in candidates {
        let Some(other) = scene.get(other_id) else { continue };
        if let Some(early_out) = collision.early_out {
            if other.object_type.intersects(early_out.object_types)
                && callbacks.early_out(early_out.predicate, scene, id, other_id)
            {
                continue;
            }
        }
        let Some(theirs) = other.collision() else { continue };

        let other_pose = other.pose();
        let other_velocity = other.velocity();
        for (our_index, our_image) in collision.images.iter().enumerate() {
            for (their_index, their_image) in theirs.images.iter().enumerate() {
                let passive = their_image.priority() > our_image.priority();
                if passive {
                    // Their image sweeps against ours held still, so contact
                    // positions are carried back along our relative motion
                    let relative = effective_velocity(velocity, &pose, other_velocity, &other_pose);
                    out.set_stamp(ContactStamp {
                        other: Some(other_id),
                        our_image: our_index,
                        their_image: Some(their_index),
                        mirrored: true,
                        drift: relative,
                    });
                    their_image.test_move(
                        dt,
                        -relative,
                        &other_pose,
                        our_image.as_ref(),
                        &pose,
                        Vec2::ZERO,
                        out,
                    );
                } else {
                    out.set_stamp(ContactStamp {
                        other: Some(other_id),
                        our_image: our_index,
                        their_image: Some(their_index),
                        mirrored: false,
                        drift: Vec2::ZERO,
                    });
                    our_image.test_move(
                        dt,
                        velocity,
                        &pose,
                        their_image.as_ref(),
                        &other_pose,
                        other_velocity,
                        out,
                    );
                }
            }
        }
    }
}

/// Object bounds extended along the motion plus the configured border
pub(crate) fn search_bounds(bounds: Bounds, velocity: Vec2, dt: f32, config: &SimulationConfig) -> Bounds {
    bounds
        .sweep(velocity * (dt + config.collision_epsilon))
        .inflate(config.search_border)
}
