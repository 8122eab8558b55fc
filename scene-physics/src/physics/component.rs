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
//! Physics component: velocity, mass and rotational inertia
//!
//! `inverse_mass` is the stored quantity. Zero means immovable, in which
//! case `mass()` reports the configured immovable mass and the body is never
//! moved by collision responses.
//!
//! Linear and angular velocity live in shared value cells published as
//! interfaces (`"vector2"`/`"velocity"` and `"float"`/`"angularVelocity"`),
//! so sibling components such as animations can drive them.

use crate::config::SimulationConfig;
use crate::scene::{Component, InterfaceRegistrar, ObjectId, ValueInterface, FLOAT_INTERFACE, VECTOR2_INTERFACE};
use glam::Vec2;
use std::any::Any;
use std::rc::Rc;

/// Interface name of the published linear velocity
pub const VELOCITY_INTERFACE_NAME: &str = "velocity";

/// Interface name of the published angular velocity
pub const ANGULAR_VELOCITY_INTERFACE_NAME: &str = "angularVelocity";

/// Limits applied by the mass model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassLimits {
    /// Smallest mass a movable body may have
    pub minimum_mass: f32,
    /// Mass reported for immovable bodies
    pub immovable_mass: f32,
    /// Upper clamp for the inverse rotational inertia
    pub max_inverse_inertia: f32,
}

impl Default for MassLimits {
    fn default() -> Self {
        MassLimits {
            minimum_mass: 0.01,
            immovable_mass: 1.0e10,
            max_inverse_inertia: 1.0e10,
        }
    }
}

impl From<&SimulationConfig> for MassLimits {
    fn from(config: &SimulationConfig) -> Self {
        MassLimits {
            minimum_mass: config.minimum_mass,
            immovable_mass: config.immovable_mass,
            max_inverse_inertia: config.max_inverse_inertia,
        }
    }
}

/// Mutable view handed to force generators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsState {
    /// Linear velocity
    pub velocity: Vec2,
    /// Angular velocity in radians per second
    pub angular_velocity: f32,
    /// Inverse mass; read only for force generators
    pub inverse_mass: f32,
}

impl PhysicsState {
    /// Check that the velocities are finite
    pub fn is_valid(&self) -> bool {
        self.velocity.is_finite() && self.angular_velocity.is_finite()
    }
}

/// Statistics of the most recent physics tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickStats {
    /// Sub-steps run
    pub iterations: u32,
    /// Simulated time consumed, equal to the tick `dt`
    pub consumed: f32,
    /// Contacts resolved
    pub contacts: usize,
    /// The at-rest fast path was taken at least once
    pub at_rest: bool,
}

/// Rigid body state of an object
#[derive(Debug)]
pub struct PhysicsComponent {
    velocity: Rc<ValueInterface<Vec2>>,
    angular_velocity: Rc<ValueInterface<f32>>,
    inverse_mass: f32,
    rotational_scale: f32,
    limits: MassLimits,
    /// Keep testing collisions while the body is at rest
    pub process_collisions_at_rest: bool,
    /// Push out of overlaps found at time of impact 0
    pub solve_overlap: bool,
    last_tick: TickStats,
    owner: Option<ObjectId>,
}

impl PhysicsComponent {
    /// Movable body of mass 1 at rest
    pub fn new() -> Self {
        PhysicsComponent {
            velocity: Rc::new(ValueInterface::new(Vec2::ZERO)),
            angular_velocity: Rc::new(ValueInterface::new(0.0)),
            inverse_mass: 1.0,
            rotational_scale: 1.0,
            limits: MassLimits::default(),
            process_collisions_at_rest: false,
            solve_overlap: true,
            last_tick: TickStats::default(),
            owner: None,
        }
    }

    /// Immovable body
    pub fn immovable() -> Self {
        let mut physics = Self::new();
        physics.set_immovable(true);
        physics
    }

    /// Builder: set the velocity
    pub fn with_velocity(self, velocity: Vec2) -> Self {
        self.set_velocity(velocity);
        self
    }

    /// Builder: set the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.set_mass(mass);
        self
    }

    /// Linear velocity
    pub fn velocity(&self) -> Vec2 {
        self.velocity.get()
    }

    /// Set the linear velocity
    pub fn set_velocity(&self, velocity: Vec2) {
        self.velocity.set(velocity);
    }

    /// Angular velocity in radians per second
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity.get()
    }

    /// Set the angular velocity in radians per second
    pub fn set_angular_velocity(&self, angular_velocity: f32) {
        self.angular_velocity.set(angular_velocity);
    }

    /// Inverse mass, 0 when immovable
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    /// Set the inverse mass directly
    ///
    /// # Panics
    ///
    /// Panics if `inverse_mass` is negative or not finite
    pub fn set_inverse_mass(&mut self, inverse_mass: f32) {
        assert!(
            inverse_mass >= 0.0 && inverse_mass.is_finite(),
            "Inverse mass must be non-negative and finite, got {}",
            inverse_mass
        );
        self.inverse_mass = inverse_mass.min(1.0 / self.limits.minimum_mass);
    }

    /// Mass, the configured immovable mass when immovable
    pub fn mass(&self) -> f32 {
        if self.inverse_mass == 0.0 {
            self.limits.immovable_mass
        } else {
            1.0 / self.inverse_mass
        }
    }

    /// Set the mass, clamped to the minimum mass
    pub fn set_mass(&mut self, mass: f32) {
        self.inverse_mass = 1.0 / mass.max(self.limits.minimum_mass);
    }

    /// True if the inverse mass is zero
    pub fn is_immovable(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Make the body immovable, or movable with mass 1
    pub fn set_immovable(&mut self, immovable: bool) {
        if immovable {
            self.inverse_mass = 0.0;
        } else if self.inverse_mass == 0.0 {
            self.inverse_mass = 1.0;
        }
    }

    /// True if collision responses may change the body's motion
    pub fn can_move(&self) -> bool {
        self.inverse_mass > 0.0
    }

    /// Scale applied to the derived rotational inertia
    pub fn rotational_scale(&self) -> f32 {
        self.rotational_scale
    }

    /// Set the rotational scale; 0 disables rotation from impulses
    pub fn set_rotational_scale(&mut self, scale: f32) {
        assert!(
            scale >= 0.0 && scale.is_finite(),
            "Rotational scale must be non-negative and finite, got {}",
            scale
        );
        self.rotational_scale = scale;
    }

    /// Inverse rotational inertia of a uniform rectangular plate of `size`
    ///
    /// Clamped to the configured maximum when the size is degenerate.
    pub fn inverse_rotational_inertia(&self, size: Vec2) -> f32 {
        let denom = size.x * size.x + size.y * size.y + size.x * size.y;
        if denom.abs() < 1.0e-6 {
            return if self.inverse_mass == 0.0 || self.rotational_scale == 0.0 {
                0.0
            } else {
                self.limits.max_inverse_inertia
            };
        }
        (6.0 * self.rotational_scale * self.inverse_mass / denom).min(self.limits.max_inverse_inertia)
    }

    /// Current mass limits
    pub fn limits(&self) -> MassLimits {
        self.limits
    }

    /// Replace the mass limits, re-clamping the current inverse mass
    pub fn set_limits(&mut self, limits: MassLimits) {
        self.limits = limits;
        if self.inverse_mass > 0.0 {
            self.inverse_mass = self.inverse_mass.min(1.0 / limits.minimum_mass);
        }
    }

    /// Snapshot for force generators
    pub fn state(&self) -> PhysicsState {
        PhysicsState {
            velocity: self.velocity(),
            angular_velocity: self.angular_velocity(),
            inverse_mass: self.inverse_mass,
        }
    }

    /// Write back velocities changed by force generators
    pub fn apply_state(&self, state: &PhysicsState) {
        self.set_velocity(state.velocity);
        self.set_angular_velocity(state.angular_velocity);
    }

    /// Statistics of the most recent tick
    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    pub(crate) fn set_last_tick(&mut self, stats: TickStats) {
        self.last_tick = stats;
    }

    /// Owner while registered
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }
}

impl Default for PhysicsComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PhysicsComponent {
    /// Clones get their own velocity cells
    fn clone(&self) -> Self {
        PhysicsComponent {
            velocity: Rc::new(ValueInterface::new(self.velocity())),
            angular_velocity: Rc::new(ValueInterface::new(self.angular_velocity())),
            inverse_mass: self.inverse_mass,
            rotational_scale: self.rotational_scale,
            limits: self.limits,
            process_collisions_at_rest: self.process_collisions_at_rest,
            solve_overlap: self.solve_overlap,
            last_tick: TickStats::default(),
            owner: None,
        }
    }
}

impl Component for PhysicsComponent {
    fn type_name(&self) -> &'static str {
        "PhysicsComponent"
    }

    fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
        registrar.add_value(VECTOR2_INTERFACE, VELOCITY_INTERFACE_NAME, self.velocity.clone());
        registrar.add_value(FLOAT_INTERFACE, ANGULAR_VELOCITY_INTERFACE_NAME, self.angular_velocity.clone());
    }

    fn on_register(&mut self, owner: ObjectId) -> bool {
        self.owner = Some(owner);
        true
    }

    fn on_unregister(&mut self) {
        self.owner = None;
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<PhysicsComponent>() {
            target.set_velocity(self.velocity());
            target.set_angular_velocity(self.angular_velocity());
            target.inverse_mass = self.inverse_mass;
            target.rotational_scale = self.rotational_scale;
            target.limits = self.limits;
            target.process_collisions_at_rest = self.process_collisions_at_rest;
            target.solve_overlap = self.solve_overlap;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
