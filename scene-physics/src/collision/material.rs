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
//! Collision materials
//!
//! A material carries the surface response parameters for one side of a
//! contact. When both sides define one, the material with the higher
//! `priority` governs the whole interaction.

use serde::{Deserialize, Serialize};

/// Surface response parameters for a collision image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionMaterial {
    /// Tangential friction coefficient in [0, 1]
    pub friction: f32,
    /// Coefficient of restitution in [0, 1]; 0 is fully inelastic
    pub restitution: f32,
    /// Selection priority; unbounded
    pub priority: f32,
}

impl CollisionMaterial {
    /// Create a material
    ///
    /// # Panics
    ///
    /// Panics if friction or restitution fall outside [0, 1]
    pub fn new(friction: f32, restitution: f32, priority: f32) -> Self {
        let material = CollisionMaterial {
            friction,
            restitution,
            priority,
        };
        assert!(
            material.is_valid(),
            "Material friction and restitution must be within [0, 1]"
        );
        material
    }

    /// Check that friction and restitution are within [0, 1]
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.friction)
            && (0.0..=1.0).contains(&self.restitution)
            && !self.priority.is_nan()
    }

    /// Pick the governing material of a contact
    ///
    /// The material with the numerically higher priority wins. On a tie the
    /// first argument (the side initiating the contact) is kept.
    pub fn select<'a>(ours: &'a CollisionMaterial, theirs: &'a CollisionMaterial) -> &'a CollisionMaterial {
        if theirs.priority > ours.priority {
            theirs
        } else {
            ours
        }
    }
}

impl Default for CollisionMaterial {
    fn default() -> Self {
        CollisionMaterial {
            friction: 0.3,
            restitution: 0.5,
            priority: 0.0,
        }
    }
}
