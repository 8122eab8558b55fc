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
//! Rigid body physics
//!
//! [`PhysicsComponent`] holds the velocity and mass of an object,
//! [`ForceComponent`] publishes force generators, and [`process_tick`] moves
//! an object through one frame with swept collision detection.

pub mod component;
pub mod forces;
pub mod tick;

pub use component::{
    MassLimits, PhysicsComponent, PhysicsState, TickStats, ANGULAR_VELOCITY_INTERFACE_NAME, VELOCITY_INTERFACE_NAME,
};
pub use forces::{ConstantForce, ForceComponent, ForceGenerator, ForceInterface, LinearDrag, FORCE_INTERFACE};
pub use tick::process_tick;
