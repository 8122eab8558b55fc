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
//! Collision image abstraction
//!
//! A collision image is one shape attached to a collision component. Images
//! are stored in object-local form and tested against each other with the
//! owning objects' [`ObjectPose`]s.

use crate::collision::info::ContactList;
use crate::collision::material::CollisionMaterial;
use crate::collision::polygon::PolygonImage;
use crate::math::Bounds;
use glam::Vec2;
use std::any::Any;
use std::fmt;

/// Transform snapshot of an object, as seen by its collision images
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPose {
    /// World position of the object center
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Full width and height
    pub size: Vec2,
    /// Mirrored horizontally
    pub flip_x: bool,
    /// Mirrored vertically
    pub flip_y: bool,
}

impl ObjectPose {
    /// Unrotated, unflipped pose
    pub fn new(position: Vec2, size: Vec2) -> Self {
        ObjectPose {
            position,
            rotation: 0.0,
            size,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Map an object-local point into world space
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(local) + self.position
    }
}

/// A shape that can be swept against other shapes
pub trait CollisionImage: Any {
    /// Images with a higher priority run the active test of a pair
    fn priority(&self) -> f32;

    /// Surface material, `None` to use the configured default
    fn material(&self) -> Option<&CollisionMaterial>;

    /// Regenerate cached instance data if the image or the pose changed
    fn prepare(&mut self, pose: &ObjectPose);

    /// Force regeneration at the next `prepare`
    fn mark_dirty(&mut self);

    /// World-space bounds of the image at `pose`
    fn world_bounds(&self, pose: &ObjectPose) -> Bounds;

    /// Sweep this image along `velocity` against `other` for at most `dt`
    ///
    /// Contacts are offered to `out`, which lowers `dt` to the earliest
    /// accepted time of impact. Image kinds that cannot be tested against
    /// each other produce no contact.
    #[allow(clippy::too_many_arguments)]
    fn test_move(
        &self,
        dt: &mut f32,
        velocity: Vec2,
        pose: &ObjectPose,
        other: &dyn CollisionImage,
        other_pose: &ObjectPose,
        other_velocity: Vec2,
        out: &mut ContactList,
    );

    /// Polygon view of the image, if it is one
    fn as_polygon(&self) -> Option<&PolygonImage> {
        None
    }

    /// Clone into a new box
    fn clone_image(&self) -> Box<dyn CollisionImage>;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn CollisionImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionImage")
            .field("priority", &self.priority())
            .finish()
    }
}

/// Velocity of the tester relative to the other object
///
/// The other object's velocity only counts when it is moving away from the
/// tester; an approaching object runs its own test when it moves, and
/// subtracting its velocity here would let the two tests mask each other.
pub fn effective_velocity(velocity: Vec2, pose: &ObjectPose, other_velocity: Vec2, other_pose: &ObjectPose) -> Vec2 {
    let away = other_pose.position - pose.position;
    if other_velocity.dot(away) > 0.0 {
        velocity - other_velocity
    } else {
        velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_to_world() {
        let mut pose = ObjectPose::new(Vec2::new(10.0, 0.0), Vec2::ONE);
        assert_eq!(pose.to_world(Vec2::new(1.0, 0.0)), Vec2::new(11.0, 0.0));

        pose.rotation = std::f32::consts::FRAC_PI_2;
        let p = pose.to_world(Vec2::new(1.0, 0.0));
        assert!((p - Vec2::new(10.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_effective_velocity_ignores_approaching_other() {
        let us = ObjectPose::new(Vec2::ZERO, Vec2::ONE);
        let them = ObjectPose::new(Vec2::new(5.0, 0.0), Vec2::ONE);
        let v = Vec2::new(2.0, 0.0);

        assert_eq!(effective_velocity(v, &us, Vec2::new(-3.0, 0.0), &them), v);
        assert_eq!(effective_velocity(v, &us, Vec2::new(1.0, 0.0), &them), Vec2::new(1.0, 0.0));
    }
}
