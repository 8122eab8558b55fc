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
//! World limit component
//!
//! Confines an object to an axis-aligned rectangle. Boundaries are not
//! scene objects: for each side the swept search box crosses, a large
//! rectangle is synthesized just outside the limit and tested through the
//! ordinary polygon sweep.

use crate::collision::callbacks::CallbackId;
use crate::collision::image::{CollisionImage, ObjectPose};
use crate::collision::info::{ContactList, ContactStamp};
use crate::collision::material::CollisionMaterial;
use crate::collision::polygon::PolygonImage;
use crate::collision::resolve::ResolveStrategy;
use crate::math::Bounds;
use crate::scene::Component;
use glam::Vec2;
use smallvec::SmallVec;
use std::any::Any;

/// Keeps an object inside a rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLimitComponent {
    /// Lower-left corner of the allowed area
    pub min: Vec2,
    /// Upper-right corner of the allowed area
    pub max: Vec2,
    /// Whether the limit is tested
    pub enabled: bool,
    /// Response applied when the object reaches a boundary
    pub resolve: ResolveStrategy,
    /// Callback run before the response
    pub on_collision: Option<CallbackId>,
    /// Boundary material, `None` for the configured default
    pub material: Option<CollisionMaterial>,
}

impl WorldLimitComponent {
    /// Limit to the rectangle spanned by two corners, clamping on contact
    pub fn new(a: Vec2, b: Vec2) -> Self {
        WorldLimitComponent {
            min: a.min(b),
            max: a.max(b),
            enabled: true,
            resolve: ResolveStrategy::Clamp,
            on_collision: None,
            material: None,
        }
    }

    /// Builder: set the resolve strategy
    pub fn with_resolve(mut self, resolve: ResolveStrategy) -> Self {
        self.resolve = resolve;
        self
    }

    /// Boundary rectangles for every side `search` crosses
    ///
    /// # Returns
    ///
    /// Bounds of each synthesized boundary, at most four
    pub fn boundaries(&self, search: &Bounds) -> SmallVec<[Bounds; 4]> {
        let margin = (search.max - search.min).length() + 1.0;
        let mut walls = SmallVec::new();
        if search.min.x < self.min.x {
            walls.push(Bounds::new(
                Vec2::new(self.min.x - margin, search.min.y - margin),
                Vec2::new(self.min.x, search.max.y + margin),
            ));
        }
        if search.max.x > self.max.x {
            walls.push(Bounds::new(
                Vec2::new(self.max.x, search.min.y - margin),
                Vec2::new(self.max.x + margin, search.max.y + margin),
            ));
        }
        if search.min.y < self.min.y {
            walls.push(Bounds::new(
                Vec2::new(search.min.x - margin, self.min.y - margin),
                Vec2::new(search.max.x + margin, self.min.y),
            ));
        }
        if search.max.y > self.max.y {
            walls.push(Bounds::new(
                Vec2::new(search.min.x - margin, self.max.y),
                Vec2::new(search.max.x + margin, self.max.y + margin),
            ));
        }
        walls
    }

    /// Sweep the object's images against the crossed boundaries
    ///
    /// Without collision images the object rectangle is used.
    pub fn test_move(
        &self,
        images: Option<&[Box<dyn CollisionImage>]>,
        pose: &ObjectPose,
        search: &Bounds,
        dt: &mut f32,
        velocity: Vec2,
        out: &mut ContactList,
    ) {
        let walls = self.boundaries(search);
        if walls.is_empty() {
            return;
        }

        let fallback = PolygonImage::square();
        let images: SmallVec<[&dyn CollisionImage; 4]> = match images {
            Some(images) if !images.is_empty() => images.iter().map(|i| i.as_ref()).collect(),
            _ => SmallVec::from_elem(&fallback as &dyn CollisionImage, 1),
        };

        let boundary = PolygonImage::square();
        for (index, image) in images.iter().enumerate() {
            out.set_stamp(ContactStamp {
                other: None,
                our_image: index,
                their_image: None,
                mirrored: false,
                drift: Vec2::ZERO,
            });
            for wall in &walls {
                let wall_pose = ObjectPose::new(wall.center(), wall.half_extents() * 2.0);
                image.test_move(dt, velocity, pose, &boundary, &wall_pose, Vec2::ZERO, out);
            }
        }
    }
}

impl Component for WorldLimitComponent {
    fn type_name(&self) -> &'static str {
        "WorldLimitComponent"
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<WorldLimitComponent>() {
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
