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
//! Swept physics tick
//!
//! Moves one object through a frame in up to `max_iterations` sub-steps.
//! Each sub-step sweeps the object along its velocity for the remaining time,
//! moves it up to just short of the first impact, pushes it out of any
//! overlaps found at time zero, and resolves the contacts before the next
//! sub-step.
//!
//! # Algorithm
//!
//! ```text
//! remaining = dt
//! for i in 0..max_iterations:
//!     toi = remaining
//!     if i is not the last iteration: test_move(velocity, &mut toi, contacts)
//!     step = contacts ? max(toi - backoff, 0) : remaining
//!     position += velocity * step
//!     solve overlaps, post forces, resolve contacts, flush deletions
//!     remaining -= step
//! ```
//!
//! The last iteration never tests, so the whole `dt` is always consumed and
//! a body can never get stuck inside a frame. Minor tunneling is accepted
//! in exchange.

use crate::collision::{self, resolve_collisions, CallbackTable, CollisionInfo, ContactList};
use crate::config::SimulationConfig;
use crate::physics::component::{PhysicsState, TickStats};
use crate::physics::forces::{ForceInterface, FORCE_INTERFACE};
use crate::scene::{Mount, ObjectId, Scene};
use glam::Vec2;
use std::rc::Rc;
use tracing::trace;

/// Advance one object by `dt`
///
/// Objects without a physics component are left alone. The statistics are
/// also stored on the physics component as its last tick.
///
/// # Returns
///
/// Statistics for the tick. If the object was destroyed during the tick,
/// `consumed` is the time simulated before that happened.
pub fn process_tick(
    scene: &mut Scene,
    callbacks: &mut CallbackTable,
    config: &SimulationConfig,
    id: ObjectId,
    dt: f32,
) -> TickStats {
    let mut stats = TickStats::default();
    let Some(object) = scene.get(id) else { return stats };
    let Some(physics) = object.physics() else { return stats };
    let process_at_rest = physics.process_collisions_at_rest;
    let mount = object.mount;
    let forces: Vec<Rc<ForceInterface>> = object.components().get_interfaces(FORCE_INTERFACE, "*");

    // Step 1: mounted objects follow their parent
    if let Some(mount) = mount {
        if follow_parent(scene, id, mount) {
            stats.consumed = dt;
            store(scene, id, stats);
            return stats;
        }
    }

    // Step 2: force generators adjust the velocity for the whole frame
    update_forces(scene, id, &forces, dt, ForcePhase::Pre);

    let mut remaining = dt;
    let mut contacts = ContactList::new(config.collision_epsilon);
    for iteration in 0..config.max_iterations {
        if remaining <= 0.0 {
            break;
        }
        let last = iteration + 1 == config.max_iterations;
        let Some(state) = scene.get(id).and_then(|o| o.physics()).map(|p| p.state()) else { break };

        // Step 3: bodies at rest skip collision testing
        let at_rest = !process_at_rest
            && state.velocity.length() <= config.at_rest_epsilon
            && state.angular_velocity.abs() <= config.at_rest_epsilon;
        let (velocity, angular_velocity) = if at_rest {
            stats.at_rest = true;
            if let Some(physics) = scene.get(id).and_then(|o| o.physics()) {
                physics.set_velocity(Vec2::ZERO);
                physics.set_angular_velocity(0.0);
            }
            (Vec2::ZERO, 0.0)
        } else {
            (state.velocity, state.angular_velocity)
        };

        // Step 4: sweep for the first impact
        contacts.clear();
        let mut impact = remaining;
        if !last && !at_rest {
            collision::test_move(scene, callbacks, config, id, &mut impact, velocity, &mut contacts);
        }
        let step = if contacts.is_empty() {
            remaining
        } else if impact > 0.0 {
            (impact - config.impact_backoff).clamp(0.0, remaining)
        } else {
            0.0
        };
        trace!(
            "{} iteration {}: {} contacts, stepping {} of {}",
            id,
            iteration,
            contacts.len(),
            step,
            remaining
        );

        // Step 5: integrate
        if let Some(object) = scene.get_mut(id) {
            object.position += velocity * step;
            object.rotation += angular_velocity * step;
        }

        // Step 6: push out of overlaps found at time zero
        if contacts.as_slice().iter().any(|c| c.time <= 0.0 && c.is_overlap()) {
            solve_overlaps(scene, id, contacts.as_slice());
        }

        // Step 7: post forces for the consumed interval
        update_forces(scene, id, &forces, step, ForcePhase::Post);

        // Step 8: resolve, then drop anything killed along the way
        if !contacts.is_empty() {
            stats.contacts += contacts.len();
            resolve_collisions(scene, callbacks, config, id, contacts.as_slice());
        }
        scene.flush_deletes();
        stats.iterations += 1;
        if !scene.is_alive(id) {
            trace!("{} was destroyed during its tick", id);
            stats.consumed += step;
            return stats;
        }

        remaining -= step;
        stats.consumed += step;
    }

    // Step 9: refresh the broad phase
    scene.update_bounds(id);
    store(scene, id, stats);
    stats
}

fn store(scene: &mut Scene, id: ObjectId, stats: TickStats) {
    if let Some(physics) = scene.get_mut(id).and_then(|o| o.physics_mut()) {
        physics.set_last_tick(stats);
    }
}

/// Copy the parent's transform and velocity onto a mounted object
///
/// # Returns
///
/// `false` if the parent is gone and the object should simulate on its own
fn follow_parent(scene: &mut Scene, id: ObjectId, mount: Mount) -> bool {
    let Some(parent) = scene.get(mount.parent) else { return false };
    let parent_position = parent.position;
    let parent_rotation = parent.rotation;
    let parent_velocity = parent.velocity();
    let parent_spin = parent.physics().map_or(0.0, |p| p.angular_velocity());

    let Some(object) = scene.get_mut(id) else { return false };
    if mount.track_rotation {
        object.position = parent_position + Vec2::from_angle(parent_rotation).rotate(mount.offset);
        object.rotation = parent_rotation;
    } else {
        object.position = parent_position + mount.offset;
    }
    if let Some(physics) = object.physics() {
        physics.set_velocity(parent_velocity);
        physics.set_angular_velocity(if mount.track_rotation { parent_spin } else { 0.0 });
    }
    scene.update_bounds(id);
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForcePhase {
    Pre,
    Post,
}

fn update_forces(scene: &Scene, id: ObjectId, forces: &[Rc<ForceInterface>], dt: f32, phase: ForcePhase) {
    if forces.is_empty() {
        return;
    }
    let Some(physics) = scene.get(id).and_then(|o| o.physics()) else { return };
    if !physics.can_move() {
        return;
    }
    let mut state: PhysicsState = physics.state();
    for force in forces {
        match phase {
            ForcePhase::Pre => force.pre_update(&mut state, dt),
            ForcePhase::Post => force.post_update(&mut state, dt),
        };
    }
    physics.apply_state(&state);
}

/// Separate `id` from everything it overlaps at time zero
///
/// Push-out vectors are summed, dropping the part of each one that an
/// earlier push already covers along the same direction. The result depends
/// on contact order. An immovable object pushes movable partners instead
/// of moving itself.
fn solve_overlaps(scene: &mut Scene, id: ObjectId, contacts: &[CollisionInfo]) {
    let Some(physics) = scene.get(id).and_then(|o| o.physics()) else { return };
    if !physics.solve_overlap {
        return;
    }
    let immovable = !physics.can_move();

    let mut push = Vec2::ZERO;
    for contact in contacts.iter().filter(|c| c.time <= 0.0 && c.is_overlap()) {
        let other_physics = contact.other.and_then(|other| scene.get(other)).and_then(|o| o.physics());
        if other_physics.map_or(false, |p| !p.solve_overlap) {
            continue;
        }

        if immovable {
            let Some(other) = contact.other else { continue };
            if other_physics.map_or(false, |p| p.can_move()) {
                if let Some(object) = scene.get_mut(other) {
                    object.position -= contact.penetration;
                }
                scene.update_bounds(other);
            }
            continue;
        }

        push += uncovered(push, contact.penetration);
    }

    if push != Vec2::ZERO {
        trace!("{} pushed out of overlap by {}", id, push);
        if let Some(object) = scene.get_mut(id) {
            object.position += push;
        }
    }
}

/// Part of `penetration` not already applied by `push`
fn uncovered(push: Vec2, penetration: Vec2) -> Vec2 {
    let Some(direction) = push.try_normalize() else { return penetration };
    let covered = penetration.dot(direction).clamp(0.0, push.length());
    penetration - direction * covered
}
