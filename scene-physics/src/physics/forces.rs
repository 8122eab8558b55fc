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
//! Force generators
//!
//! A force generator adjusts a body's velocities before and after each
//! sub-step of the physics tick. Generators are published as `"force"`
//! interfaces, usually by a [`ForceComponent`], and the physics tick picks
//! up every such interface on its object.

use crate::physics::component::PhysicsState;
use crate::scene::{Component, InterfaceRegistrar, ObjectId};
use glam::Vec2;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Interface type under which force generators are published
pub const FORCE_INTERFACE: &str = "force";

/// Velocity adjustment applied around each physics sub-step
pub trait ForceGenerator {
    /// Descriptive name, also used as the interface name
    fn name(&self) -> &str;

    /// Adjust the state before the tick moves the body
    fn pre_update_forces(&mut self, state: &mut PhysicsState, dt: f32);

    /// Adjust the state after a sub-step consumed `dt`
    fn post_update_forces(&mut self, _state: &mut PhysicsState, _dt: f32) {}

    /// Clone into a new box
    fn clone_generator(&self) -> Box<dyn ForceGenerator>;
}

/// Shared handle to a force generator, published as an interface
pub struct ForceInterface {
    generator: RefCell<Box<dyn ForceGenerator>>,
}

impl ForceInterface {
    /// Wrap a generator
    pub fn new(generator: impl ForceGenerator + 'static) -> Self {
        ForceInterface {
            generator: RefCell::new(Box::new(generator)),
        }
    }

    /// Generator name
    pub fn name(&self) -> String {
        self.generator.borrow().name().to_string()
    }

    /// Run the pre-update hook, discarding a non-finite result
    ///
    /// # Returns
    ///
    /// `true` if the state was updated
    pub fn pre_update(&self, state: &mut PhysicsState, dt: f32) -> bool {
        let mut next = *state;
        let mut generator = self.generator.borrow_mut();
        generator.pre_update_forces(&mut next, dt);
        accept(generator.name(), state, next)
    }

    /// Run the post-update hook, discarding a non-finite result
    ///
    /// # Returns
    ///
    /// `true` if the state was updated
    pub fn post_update(&self, state: &mut PhysicsState, dt: f32) -> bool {
        let mut next = *state;
        let mut generator = self.generator.borrow_mut();
        generator.post_update_forces(&mut next, dt);
        accept(generator.name(), state, next)
    }

    fn clone_inner(&self) -> ForceInterface {
        ForceInterface {
            generator: RefCell::new(self.generator.borrow().clone_generator()),
        }
    }
}

impl fmt::Debug for ForceInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceInterface").field("name", &self.name()).finish()
    }
}

fn accept(name: &str, state: &mut PhysicsState, next: PhysicsState) -> bool {
    if !next.is_valid() {
        warn!("Force generator '{}' produced a non-finite velocity, ignoring it", name);
        return false;
    }
    state.velocity = next.velocity;
    state.angular_velocity = next.angular_velocity;
    true
}

/// Constant force, or constant acceleration when `mass_independent`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantForce {
    /// Generator name
    pub name: String,
    /// Force in newtons, or acceleration when `mass_independent`
    pub force: Vec2,
    /// Apply `force` as an acceleration regardless of mass
    pub mass_independent: bool,
}

impl ConstantForce {
    /// Constant force scaled by inverse mass
    pub fn new(name: impl Into<String>, force: Vec2) -> Self {
        ConstantForce {
            name: name.into(),
            force,
            mass_independent: false,
        }
    }

    /// Uniform gravity acceleration
    pub fn gravity(acceleration: Vec2) -> Self {
        ConstantForce {
            name: "gravity".to_string(),
            force: acceleration,
            mass_independent: true,
        }
    }
}

impl ForceGenerator for ConstantForce {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_update_forces(&mut self, state: &mut PhysicsState, dt: f32) {
        if state.inverse_mass == 0.0 {
            return;
        }
        let acceleration = if self.mass_independent {
            self.force
        } else {
            self.force * state.inverse_mass
        };
        state.velocity += acceleration * dt;
    }

    fn clone_generator(&self) -> Box<dyn ForceGenerator> {
        Box::new(self.clone())
    }
}

/// Exponential damping of linear and angular velocity
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDrag {
    /// Fraction of velocity removed per second
    pub coefficient: f32,
    /// Fraction of angular velocity removed per second
    pub angular_coefficient: f32,
}

impl LinearDrag {
    /// Drag with the same coefficient for both velocities
    pub fn new(coefficient: f32) -> Self {
        LinearDrag {
            coefficient,
            angular_coefficient: coefficient,
        }
    }
}

impl ForceGenerator for LinearDrag {
    fn name(&self) -> &str {
        "drag"
    }

    fn pre_update_forces(&mut self, _state: &mut PhysicsState, _dt: f32) {}

    fn post_update_forces(&mut self, state: &mut PhysicsState, dt: f32) {
        state.velocity *= (1.0 - self.coefficient * dt).max(0.0);
        state.angular_velocity *= (1.0 - self.angular_coefficient * dt).max(0.0);
    }

    fn clone_generator(&self) -> Box<dyn ForceGenerator> {
        Box::new(self.clone())
    }
}

/// Publishes a list of force generators as `"force"` interfaces
#[derive(Debug, Default)]
pub struct ForceComponent {
    forces: Vec<Rc<ForceInterface>>,
}

impl ForceComponent {
    /// Create an empty force component
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a generator
    pub fn with_force(mut self, generator: impl ForceGenerator + 'static) -> Self {
        self.add_force(generator);
        self
    }

    /// Add a generator
    pub fn add_force(&mut self, generator: impl ForceGenerator + 'static) {
        self.forces.push(Rc::new(ForceInterface::new(generator)));
    }

    /// Number of generators
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    /// True if no generator was added
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }
}

impl Clone for ForceComponent {
    fn clone(&self) -> Self {
        ForceComponent {
            forces: self.forces.iter().map(|f| Rc::new(f.clone_inner())).collect(),
        }
    }
}

impl Component for ForceComponent {
    fn type_name(&self) -> &'static str {
        "ForceComponent"
    }

    fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
        for force in &self.forces {
            registrar.add_value(FORCE_INTERFACE, &force.name(), force.clone());
        }
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<ForceComponent>() {
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
