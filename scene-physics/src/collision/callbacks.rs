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
//! Callback table for collision hooks
//!
//! Collision components refer to callbacks by id instead of holding
//! closures, which keeps components cloneable and lets a callback receive
//! the whole scene mutably while it runs.

use crate::collision::info::CollisionInfo;
use crate::collision::material::CollisionMaterial;
use crate::collision::resolve::ResolveStrategy;
use crate::scene::{ObjectId, Scene};
use tracing::warn;

/// Id of an on-collision callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

/// Id of a custom resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolverId(usize);

/// Id of an early-out predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EarlyOutId(usize);

/// Everything an on-collision callback may inspect or change
///
/// Changing `resolve` or `material` only affects the contact being handled.
pub struct CollisionEvent<'a> {
    /// The scene, for reading or deleting objects
    pub scene: &'a mut Scene,
    /// Object whose callback is running
    pub us: ObjectId,
    /// Contact as seen from `us`
    pub info: &'a mut CollisionInfo,
    /// Strategy that will be applied for `us`
    pub resolve: &'a mut ResolveStrategy,
    /// Material that governs the contact
    pub material: &'a mut CollisionMaterial,
}

/// Arguments to a custom resolver
pub struct ResolveEvent<'a> {
    /// The scene
    pub scene: &'a mut Scene,
    /// Object being resolved
    pub us: ObjectId,
    /// Contact as seen from `us`
    pub info: &'a CollisionInfo,
    /// Material that governs the contact
    pub material: &'a CollisionMaterial,
    /// The other object uses the same resolver and expects this call to
    /// handle it as well
    pub handle_both: bool,
}

type OnCollisionFn = Box<dyn FnMut(&mut CollisionEvent<'_>)>;
type ResolverFn = Box<dyn FnMut(&mut ResolveEvent<'_>)>;
type EarlyOutFn = Box<dyn FnMut(&Scene, ObjectId, ObjectId) -> bool>;

/// Registered collision callbacks, custom resolvers and early-out predicates
#[derive(Default)]
pub struct CallbackTable {
    on_collision: Vec<OnCollisionFn>,
    resolvers: Vec<ResolverFn>,
    early_outs: Vec<EarlyOutFn>,
}

impl CallbackTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an on-collision callback
    pub fn add_on_collision<F>(&mut self, callback: F) -> CallbackId
    where
        F: FnMut(&mut CollisionEvent<'_>) + 'static,
    {
        self.on_collision.push(Box::new(callback));
        CallbackId(self.on_collision.len() - 1)
    }

    /// Register a custom resolver
    pub fn add_resolver<F>(&mut self, resolver: F) -> ResolverId
    where
        F: FnMut(&mut ResolveEvent<'_>) + 'static,
    {
        self.resolvers.push(Box::new(resolver));
        ResolverId(self.resolvers.len() - 1)
    }

    /// Register an early-out predicate
    ///
    /// The predicate receives `(scene, mover, candidate)` and returns `true`
    /// to skip the candidate.
    pub fn add_early_out<F>(&mut self, predicate: F) -> EarlyOutId
    where
        F: FnMut(&Scene, ObjectId, ObjectId) -> bool + 'static,
    {
        self.early_outs.push(Box::new(predicate));
        EarlyOutId(self.early_outs.len() - 1)
    }

    pub(crate) fn on_collision(&mut self, id: CallbackId, event: &mut CollisionEvent<'_>) {
        match self.on_collision.get_mut(id.0) {
            Some(callback) => callback(event),
            None => warn!("Unknown on-collision callback {:?}", id),
        }
    }

    pub(crate) fn resolve(&mut self, id: ResolverId, event: &mut ResolveEvent<'_>) {
        match self.resolvers.get_mut(id.0) {
            Some(resolver) => resolver(event),
            None => warn!("Unknown resolver {:?}", id),
        }
    }

    pub(crate) fn early_out(&mut self, id: EarlyOutId, scene: &Scene, us: ObjectId, other: ObjectId) -> bool {
        match self.early_outs.get_mut(id.0) {
            Some(predicate) => predicate(scene, us, other),
            None => false,
        }
    }
}
