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
//! Scene objects, components and the object arena

pub mod component;
pub mod dictionary;
pub mod events;
pub mod interface;
pub mod object;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod spatial;

pub use component::{Component, ComponentContainer, ComponentGroup};
pub use dictionary::{FieldValue, KeyedDictionary, Liveness, Tracked};
pub use events::EventQueue;
pub use interface::{Interface, InterfaceCache, InterfaceRegistrar, ValueInterface, FLOAT_INTERFACE, VECTOR2_INTERFACE};
pub use object::{Mount, ObjectId, ObjectTypeMask, SceneObject};
pub use scene::{Scene, SpatialQuery};
pub use spatial::SpatialGrid;
