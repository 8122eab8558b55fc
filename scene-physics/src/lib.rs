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
//! # Scene Physics
//!
//! The simulation core of a 2D game engine: scene objects carry components,
//! components discover each other through named interfaces, and a swept
//! physics tick moves objects, finds collisions between convex polygons and
//! resolves them.
//!
//! ## Features
//!
//! - **Component Framework**: Containers with a three-phase registration
//!   protocol and an interface registry queried with glob patterns
//! - **Swept Collision**: Continuous polygon-vs-polygon tests with priority
//!   tie-breaks, multi-point contacts and world limits
//! - **Collision Response**: Bounce, clamp, rigid-body impulses with
//!   friction, sticky, kill, and custom resolvers
//! - **Physics Tick**: Iterative sub-stepping with overlap solving and force
//!   generators
//! - **Value Animation**: Curve-shaped animations driving other components'
//!   values
//! - **Keyed Dictionary**: Per-object fields with lazy cleanup of stale
//!   records
//!
//! ## Example
//!
//! ```rust
//! use glam::Vec2;
//! use scene_physics::collision::CollisionComponent;
//! use scene_physics::physics::PhysicsComponent;
//! use scene_physics::scene::SceneObject;
//! use scene_physics::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
//! sim.add_object(
//!     SceneObject::new("floor")
//!         .with_size(Vec2::new(20.0, 2.0))
//!         .with_component(PhysicsComponent::immovable())
//!         .with_component(CollisionComponent::boxed()),
//! )
//! .unwrap();
//! let ball = sim
//!     .add_object(
//!         SceneObject::new("ball")
//!             .with_position(Vec2::new(0.0, 5.0))
//!             .with_size(Vec2::splat(2.0))
//!             .with_component(PhysicsComponent::new().with_velocity(Vec2::new(0.0, -10.0)))
//!             .with_component(CollisionComponent::boxed()),
//!     )
//!     .unwrap();
//!
//! sim.step(1.0);
//! assert!(sim.scene().get(ball).unwrap().velocity().y > 0.0);
//! ```

#![warn(missing_docs)]

/// Time-based value animation
pub mod animation;

/// Swept collision detection and response
pub mod collision;

/// Simulation configuration
pub mod config;

/// Error types
pub mod error;

/// Bounds and 2D vector helpers
pub mod math;

/// Glob pattern matching for interface lookups
pub mod pattern;

/// Rigid body state, forces and the physics tick
pub mod physics;

/// Scene objects, components and interfaces
pub mod scene;

/// Frame driver
pub mod simulation;

pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use math::Bounds;
pub use scene::{ObjectId, Scene, SceneObject};
pub use simulation::Simulation;
