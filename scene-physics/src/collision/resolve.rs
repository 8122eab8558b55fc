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
//! Collision response
//!
//! Contacts are resolved in the order they were found. For each contact the
//! governing material is chosen, both objects' callbacks run, and then the
//! resolve strategies are applied. When both sides use the same strategy it
//! runs once and handles both objects, so every interaction is applied
//! exactly once. Callbacks may delete either object; every step re-checks
//! liveness before touching an object again.

use crate::collision::callbacks::{CallbackId, CallbackTable, CollisionEvent, ResolveEvent, ResolverId};
use crate::collision::info::CollisionInfo;
use crate::collision::material::CollisionMaterial;
use crate::config::SimulationConfig;
use crate::math::{cross, cross_scalar};
use crate::scene::{ObjectId, Scene};
use glam::Vec2;
use tracing::trace;

const IMPULSE_EPSILON: f32 = 1.0e-8;

/// Response applied to an object involved in a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveStrategy {
    /// No response
    #[default]
    None,
    /// Reflect the inbound normal velocity scaled by restitution
    Bounce,
    /// Remove the inbound normal velocity
    Clamp,
    /// Rigid-body impulse with friction at the contact point
    Rigid,
    /// Stop all linear and angular motion
    Sticky,
    /// Queue the object for deletion
    Kill,
    /// Run a resolver registered in the callback table
    Custom(ResolverId),
}

/// Resolve every contact found for `us` during one sub-step
pub fn resolve_collisions(
    scene: &mut Scene,
    callbacks: &mut CallbackTable,
    config: &SimulationConfig,
    us: ObjectId,
    contacts: &[CollisionInfo],
) {
    for contact in contacts {
        if !scene.is_alive(us) {
            return;
        }
        if contact.other.map_or(false, |other| !scene.is_alive(other)) {
            continue;
        }

        let mut info = *contact;
        let Some((mut our_resolve, our_callback)) = handlers(scene, us, info.other.is_none()) else {
            continue;
        };
        let mut material = contact_material(scene, config, us, &info);

        if let Some(callback) = our_callback {
            run_callback(scene, callbacks, callback, us, &mut info, &mut our_resolve, &mut material);
            if !scene.is_alive(us) {
                return;
            }
        }

        let Some(other) = info.other else {
            apply_strategy(our_resolve, scene, callbacks, us, &info, &material, false);
            continue;
        };
        if !scene.is_alive(other) {
            apply_strategy(our_resolve, scene, callbacks, us, &info, &material, false);
            continue;
        }

        let mut their_info = info.mirrored(us);
        let mut their_material = material;
        let (mut their_resolve, their_callback) = handlers(scene, other, false).unwrap_or((ResolveStrategy::None, None));
        if let Some(callback) = their_callback {
            run_callback(
                scene,
                callbacks,
                callback,
                other,
                &mut their_info,
                &mut their_resolve,
                &mut their_material,
            );
            if !scene.is_alive(us) {
                return;
            }
        }

        if !scene.is_alive(other) {
            apply_strategy(our_resolve, scene, callbacks, us, &info, &material, false);
        } else if our_resolve == their_resolve && our_resolve != ResolveStrategy::None {
            trace!("Resolving {} and {} together with {:?}", us, other, our_resolve);
            apply_strategy(our_resolve, scene, callbacks, us, &info, &material, true);
        } else {
            apply_strategy(our_resolve, scene, callbacks, us, &info, &material, false);
            if scene.is_alive(other) {
                apply_strategy(their_resolve, scene, callbacks, other, &their_info, &their_material, false);
            }
        }
    }
}

/// Resolve strategy and callback for one side of a contact
fn handlers(scene: &Scene, id: ObjectId, world_limit: bool) -> Option<(ResolveStrategy, Option<CallbackId>)> {
    let object = scene.get(id)?;
    if world_limit {
        object.world_limit().map(|l| (l.resolve, l.on_collision))
    } else {
        object.collision().map(|c| (c.resolve, c.on_collision))
    }
}

/// Material that governs a contact: the higher priority of both sides
pub fn contact_material(scene: &Scene, config: &SimulationConfig, us: ObjectId, info: &CollisionInfo) -> CollisionMaterial {
    let default = config.default_material;
    let ours = scene
        .get(us)
        .and_then(|o| o.collision())
        .and_then(|c| c.image(info.our_image))
        .and_then(|i| i.material().copied())
        .unwrap_or(default);

    let theirs = match info.other {
        Some(other) => scene
            .get(other)
            .and_then(|o| o.collision())
            .and_then(|c| info.their_image.and_then(|index| c.image(index)))
            .and_then(|i| i.material().copied())
            .unwrap_or(default),
        None => scene
            .get(us)
            .and_then(|o| o.world_limit())
            .and_then(|l| l.material)
            .unwrap_or(default),
    };

    *CollisionMaterial::select(&ours, &theirs)
}

fn run_callback(
    scene: &mut Scene,
    callbacks: &mut CallbackTable,
    callback: CallbackId,
    us: ObjectId,
    info: &mut CollisionInfo,
    resolve: &mut ResolveStrategy,
    material: &mut CollisionMaterial,
) {
    let mut event = CollisionEvent {
        scene,
        us,
        info,
        resolve,
        material,
    };
    callbacks.on_collision(callback, &mut event);
}

/// Apply one strategy for `us`, and for the other object when `handle_both`
pub fn apply_strategy(
    strategy: ResolveStrategy,
    scene: &mut Scene,
    callbacks: &mut CallbackTable,
    us: ObjectId,
    info: &CollisionInfo,
    material: &CollisionMaterial,
    handle_both: bool,
) {
    let other = if handle_both { info.other } else { None };
    match strategy {
        ResolveStrategy::None => {}
        ResolveStrategy::Bounce => {
            bounce(scene, us, info.normal, material.restitution);
            if let Some(other) = other {
                bounce(scene, other, -info.normal, material.restitution);
            }
        }
        ResolveStrategy::Clamp => {
            bounce(scene, us, info.normal, 0.0);
            if let Some(other) = other {
                bounce(scene, other, -info.normal, 0.0);
            }
        }
        ResolveStrategy::Rigid => rigid(scene, us, info, material, handle_both),
        ResolveStrategy::Sticky => {
            stick(scene, us);
            if let Some(other) = other {
                stick(scene, other);
            }
        }
        ResolveStrategy::Kill => {
            scene.mark_for_delete(us);
            if let Some(other) = other {
                scene.mark_for_delete(other);
            }
        }
        ResolveStrategy::Custom(resolver) => {
            let mut event = ResolveEvent {
                scene,
                us,
                info,
                material,
                handle_both,
            };
            callbacks.resolve(resolver, &mut event);
        }
    }
}

/// Remove the inbound normal velocity of `id`, reflected by `restitution`
pub fn bounce(scene: &mut Scene, id: ObjectId, normal: Vec2, restitution: f32) {
    let Some(physics) = scene.get_mut(id).and_then(|o| o.physics_mut()) else { return };
    if !physics.can_move() {
        return;
    }
    let velocity = physics.velocity();
    let dot = velocity.dot(normal);
    if dot < 0.0 {
        physics.set_velocity(velocity - normal * dot * (1.0 + restitution));
    }
}

/// Zero the linear and angular velocity of `id`
pub fn stick(scene: &mut Scene, id: ObjectId) {
    if let Some(physics) = scene.get_mut(id).and_then(|o| o.physics_mut()) {
        physics.set_velocity(Vec2::ZERO);
        physics.set_angular_velocity(0.0);
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    angular_velocity: f32,
    inverse_mass: f32,
    inverse_inertia: f32,
}

impl Body {
    fn of(scene: &Scene, id: ObjectId) -> Option<Body> {
        let object = scene.get(id)?;
        let physics = object.physics()?;
        Some(Body {
            position: object.position,
            velocity: physics.velocity(),
            angular_velocity: physics.angular_velocity(),
            inverse_mass: physics.inverse_mass(),
            inverse_inertia: physics.inverse_rotational_inertia(object.size),
        })
    }

    fn fixed(position: Vec2) -> Body {
        Body {
            position,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            inverse_mass: 0.0,
            inverse_inertia: 0.0,
        }
    }

    fn point_velocity(&self, r: Vec2) -> Vec2 {
        self.velocity + cross_scalar(self.angular_velocity, r)
    }
}

/// Rigid-body impulse with Coulomb friction at the contact point
fn rigid(scene: &mut Scene, us: ObjectId, info: &CollisionInfo, material: &CollisionMaterial, handle_both: bool) {
    let Some(a) = Body::of(scene, us) else { return };
    let b = info
        .other
        .and_then(|other| Body::of(scene, other))
        .unwrap_or_else(|| Body::fixed(info.position));

    let n = info.normal;
    let ra = info.position - a.position;
    let rb = info.position - b.position;
    let relative = a.point_velocity(ra) - b.point_velocity(rb);
    let vn = relative.dot(n);
    if vn >= 0.0 {
        return;
    }

    let ra_n = cross(ra, n);
    let rb_n = cross(rb, n);
    let denom = a.inverse_mass + b.inverse_mass + ra_n * ra_n * a.inverse_inertia + rb_n * rb_n * b.inverse_inertia;
    if denom <= IMPULSE_EPSILON {
        return;
    }
    let jn = -(1.0 + material.restitution) * vn / denom;
    let mut impulse = n * jn;

    let tangent_velocity = relative - n * vn;
    if let Some(t) = tangent_velocity.try_normalize() {
        let ra_t = cross(ra, t);
        let rb_t = cross(rb, t);
        let denom_t =
            a.inverse_mass + b.inverse_mass + ra_t * ra_t * a.inverse_inertia + rb_t * rb_t * b.inverse_inertia;
        if denom_t > IMPULSE_EPSILON {
            // Friction never reverses the sliding direction
            let jt = (material.friction * jn).min(tangent_velocity.length() / denom_t);
            impulse -= t * jt;
        }
    }

    if let Some(physics) = scene.get_mut(us).and_then(|o| o.physics_mut()) {
        physics.set_velocity(a.velocity + impulse * a.inverse_mass);
        physics.set_angular_velocity(a.angular_velocity + cross(ra, impulse) * a.inverse_inertia);
    }
    if !handle_both {
        return;
    }
    if let Some(physics) = info
        .other
        .and_then(|other| scene.get_mut(other))
        .and_then(|o| o.physics_mut())
    {
        physics.set_velocity(b.velocity - impulse * b.inverse_mass);
        physics.set_angular_velocity(b.angular_velocity - cross(rb, impulse) * b.inverse_inertia);
    }
}
