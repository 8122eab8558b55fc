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
//! Swept collision detection and response
//!
//! - [`PolygonImage`]: convex shapes tested with a swept separating-axis test
//! - [`CollisionComponent`]: per-object images, filters and response
//! - [`WorldLimitComponent`]: rectangular bounds synthesized on demand
//! - [`resolve_collisions`]: material selection, callbacks and strategies

pub mod callbacks;
pub mod component;
pub mod image;
pub mod info;
pub mod material;
pub mod polygon;
pub mod resolve;
pub mod world_limit;

pub use callbacks::{CallbackId, CallbackTable, CollisionEvent, EarlyOutId, ResolveEvent, ResolverId};
pub use component::{test_move, CollisionComponent, EarlyOut};
pub use image::{effective_velocity, CollisionImage, ObjectPose};
pub use info::{CollisionInfo, ContactList, ContactStamp};
pub use material::CollisionMaterial;
pub use polygon::{sweep_polygons, PolygonImage, SweptHit};
pub use resolve::{resolve_collisions, ResolveStrategy};
pub use world_limit::WorldLimitComponent;
