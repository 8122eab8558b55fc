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
//! Frame driver tying the scene, configuration and callbacks together
//!
//! Each [`Simulation::step`] ticks every component (animations first, so
//! animated velocities are in place), then runs the physics tick for every
//! live object in slot order, and finally flushes deferred deletions.
//!
//! # Examples
//!
//! ```
//! use glam::Vec2;
//! use scene_physics::collision::CollisionComponent;
//! use scene_physics::physics::PhysicsComponent;
//! use scene_physics::scene::SceneObject;
//! use scene_physics::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
//! let ball = sim
//!     .add_object(
//!         SceneObject::new("ball")
//!             .with_component(PhysicsComponent::new().with_velocity(Vec2::new(1.0, 0.0)))
//!             .with_component(CollisionComponent::boxed()),
//!     )
//!     .unwrap();
//!
//! sim.step(0.5);
//! assert_eq!(sim.scene().get(ball).unwrap().position, Vec2::new(0.5, 0.0));
//! ```

use crate::animation::ValueAnimationComponent;
use crate::collision::CallbackTable;
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::physics::{process_tick, MassLimits, TickStats};
use crate::scene::{ObjectId, Scene, SceneObject};
use std::fmt;
use tracing::debug;

/// A scene plus everything needed to step it
pub struct Simulation {
    scene: Scene,
    config: SimulationConfig,
    callbacks: CallbackTable,
    frame: u64,
}

impl Simulation {
    /// Create an empty simulation
    ///
    /// The scene's broad phase uses the configured grid cell size.
    ///
    /// # Returns
    ///
    /// `SimError::Config` if the configuration does not validate
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Simulation {
            scene: Scene::new(config.grid_cell_size),
            config,
            callbacks: CallbackTable::new(),
            frame: 0,
        })
    }

    /// The scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Active configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Callback table for collision callbacks, resolvers and early-outs
    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    /// Frames stepped so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Apply the configured mass limits and animation seed, then register
    ///
    /// # Returns
    ///
    /// The new object id, or the registration error
    pub fn add_object(&mut self, mut object: SceneObject) -> Result<ObjectId> {
        if let Some(physics) = object.physics_mut() {
            physics.set_limits(MassLimits::from(&self.config));
        }
        let seed = self.config.animation_seed;
        if let Some(animation) = object.components_mut().find_component_mut::<ValueAnimationComponent>() {
            if animation.seed().is_none() {
                animation.set_seed(seed);
            }
        }
        self.scene.register(object)
    }

    /// Remove an object immediately
    ///
    /// # Returns
    ///
    /// The object, or `SimError::UnknownObject` if `id` is not live
    pub fn remove_object(&mut self, id: ObjectId) -> Result<SceneObject> {
        self.scene.unregister(id).ok_or(SimError::UnknownObject(id))
    }

    /// Advance the whole scene by `dt`
    ///
    /// # Panics
    ///
    /// Panics if `dt` is negative, NaN, or infinite
    pub fn step(&mut self, dt: f32) {
        assert!(dt >= 0.0 && dt.is_finite(), "Step dt must be non-negative and finite");

        self.scene.tick_components(dt);
        for id in self.scene.ids() {
            if !self.scene.is_alive(id) {
                continue;
            }
            process_tick(&mut self.scene, &mut self.callbacks, &self.config, id, dt);
        }
        let flushed = self.scene.flush_deletes();
        if flushed > 0 {
            debug!("Frame {} removed {} objects", self.frame, flushed);
        }
        self.frame += 1;
    }

    /// Run the physics tick for a single object
    ///
    /// # Returns
    ///
    /// The tick statistics, or `SimError::UnknownObject` if `id` is not live
    pub fn process_object(&mut self, id: ObjectId, dt: f32) -> Result<TickStats> {
        if !self.scene.is_alive(id) {
            return Err(SimError::UnknownObject(id));
        }
        Ok(process_tick(&mut self.scene, &mut self.callbacks, &self.config, id, dt))
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("objects", &self.scene.len())
            .field("frame", &self.frame)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::physics::PhysicsComponent;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig {
            max_iterations: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(Simulation::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_add_object_applies_limits() {
        let config = SimulationConfig {
            minimum_mass: 0.5,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        let id = sim
            .add_object(SceneObject::new("feather").with_component(PhysicsComponent::new().with_mass(0.1)))
            .unwrap();
        let physics = sim.scene().get(id).unwrap().physics().unwrap();
        assert_eq!(physics.limits().minimum_mass, 0.5);
        assert!((physics.mass() - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_add_object_seeds_animations() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let id = sim
            .add_object(
                SceneObject::new("lamp")
                    .with_component(ValueAnimationComponent::new().with_animation(Animation::new("glow", 1.0, 0.0, 1.0))),
            )
            .unwrap();
        let animation = sim
            .scene()
            .get(id)
            .unwrap()
            .components()
            .find_component::<ValueAnimationComponent>()
            .unwrap();
        assert_eq!(animation.seed(), Some(sim.config().animation_seed));
    }

    #[test]
    fn test_unknown_object_errors() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let id = sim.add_object(SceneObject::new("gone")).unwrap();
        sim.remove_object(id).unwrap();
        assert!(matches!(sim.remove_object(id), Err(SimError::UnknownObject(_))));
        assert!(matches!(sim.process_object(id, 0.1), Err(SimError::UnknownObject(_))));
    }

    #[test]
    fn test_step_counts_frames() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.step(0.1);
        sim.step(0.1);
        assert_eq!(sim.frame(), 2);
    }
}
