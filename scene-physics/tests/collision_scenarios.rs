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
//! Collision scenarios
//!
//! Swept polygon tests and full simulation steps with known outcomes.

use glam::Vec2;
use scene_physics::collision::{
    CollisionComponent, CollisionImage, CollisionMaterial, ContactList, ObjectPose, PolygonImage, ResolveStrategy,
    WorldLimitComponent,
};
use scene_physics::physics::PhysicsComponent;
use scene_physics::scene::{ObjectId, SceneObject};
use scene_physics::{Simulation, SimulationConfig};
use std::cell::RefCell;
use std::rc::Rc;

const EPSILON: f32 = 0.0005;

fn sweep(mover_at: Vec2, velocity: Vec2, other_at: Vec2, other_velocity: Vec2) -> ContactList {
    let mover = PolygonImage::square();
    let other = PolygonImage::square();
    let mut dt = 1.0;
    let mut out = ContactList::new(EPSILON);
    mover.test_move(
        &mut dt,
        velocity,
        &ObjectPose::new(mover_at, Vec2::splat(2.0)),
        &other,
        &ObjectPose::new(other_at, Vec2::splat(2.0)),
        other_velocity,
        &mut out,
    );
    out
}

fn crate_box(name: &str, position: Vec2, physics: PhysicsComponent) -> SceneObject {
    SceneObject::new(name)
        .with_position(position)
        .with_size(Vec2::splat(2.0))
        .with_component(physics)
        .with_component(CollisionComponent::boxed())
}

#[test]
fn test_no_contact_without_relative_motion() {
    assert!(sweep(Vec2::new(0.0, 5.0), Vec2::ZERO, Vec2::ZERO, Vec2::ZERO).is_empty());

    // Both moving right together, the leader ahead
    let out = sweep(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(10.0, 0.0));
    assert!(out.is_empty());
}

#[test]
fn test_time_of_impact_grows_with_distance() {
    let mut previous = -1.0;
    for distance in [3.0, 4.0, 5.0, 6.0] {
        let out = sweep(Vec2::new(0.0, distance), Vec2::new(0.0, -10.0), Vec2::ZERO, Vec2::ZERO);
        let time = out.earliest().expect("falling box should hit");
        assert!(time > previous, "toi {} at distance {} not after {}", time, distance, previous);
        assert!((time - (distance - 2.0) / 10.0).abs() < 1.0e-4);
        let normal = out.as_slice()[0].normal;
        assert!((normal - Vec2::Y).length() < 1.0e-5, "normal {}", normal);
        previous = time;
    }
}

#[test]
fn test_out_of_reach_is_ignored() {
    let out = sweep(Vec2::new(0.0, 20.0), Vec2::new(0.0, -10.0), Vec2::ZERO, Vec2::ZERO);
    assert!(out.is_empty());
}

#[test]
fn test_box_bounces_off_immovable_box() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let hits: Rc<RefCell<Vec<(ObjectId, f32)>>> = Rc::default();
    let recorder = hits.clone();
    let callback = sim
        .callbacks_mut()
        .add_on_collision(move |event| recorder.borrow_mut().push((event.us, event.info.time)));

    let floor = sim
        .add_object(
            SceneObject::new("b")
                .with_size(Vec2::splat(2.0))
                .with_component(PhysicsComponent::immovable())
                .with_component(CollisionComponent::boxed()),
        )
        .unwrap();
    let ball = sim
        .add_object(
            SceneObject::new("a")
                .with_position(Vec2::new(0.0, 5.0))
                .with_size(Vec2::splat(2.0))
                .with_component(PhysicsComponent::new().with_velocity(Vec2::new(0.0, -10.0)))
                .with_component(CollisionComponent::boxed().with_callback(callback)),
        )
        .unwrap();

    sim.step(1.0);

    let hits = hits.borrow();
    let (us, time) = hits[0];
    assert_eq!(us, ball);
    assert!((time - 0.3).abs() < 0.01, "toi {}", time);

    let ball = sim.scene().get(ball).unwrap();
    assert!((ball.velocity().y - 5.0).abs() < 1.0e-3, "velocity {}", ball.velocity());
    assert!(ball.position.y > 2.0);

    let floor = sim.scene().get(floor).unwrap();
    assert_eq!(floor.position, Vec2::ZERO);
    assert_eq!(floor.velocity(), Vec2::ZERO);
}

#[test]
fn test_world_limit_clamps_at_boundary() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let id = sim
        .add_object(
            crate_box("runner", Vec2::ZERO, PhysicsComponent::new().with_velocity(Vec2::new(20.0, 0.0)))
                .with_component(WorldLimitComponent::new(Vec2::splat(-10.0), Vec2::splat(10.0))),
        )
        .unwrap();

    sim.step(1.0);

    let object = sim.scene().get(id).unwrap();
    assert_eq!(object.velocity(), Vec2::ZERO);
    assert!(object.position.x <= 9.0 && object.position.x > 8.9, "position {}", object.position);
}

#[test]
fn test_world_limit_bounce_reflects() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let id = sim
        .add_object(
            crate_box("ball", Vec2::ZERO, PhysicsComponent::new().with_velocity(Vec2::new(0.0, -20.0))).with_component(
                WorldLimitComponent::new(Vec2::splat(-10.0), Vec2::splat(10.0)).with_resolve(ResolveStrategy::Bounce),
            ),
        )
        .unwrap();

    sim.step(1.0);

    let object = sim.scene().get(id).unwrap();
    assert!((object.velocity().y - 10.0).abs() < 1.0e-3, "velocity {}", object.velocity());
    assert!(object.position.y > -9.0);
}

#[test]
fn test_rigid_impulse_conserves_momentum() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let rigid = |name: &str, position: Vec2, velocity: Vec2| {
        SceneObject::new(name)
            .with_position(position)
            .with_size(Vec2::splat(2.0))
            .with_component(PhysicsComponent::new().with_velocity(velocity))
            .with_component(CollisionComponent::boxed().with_resolve(ResolveStrategy::Rigid))
    };
    let a = sim.add_object(rigid("a", Vec2::new(-3.0, 0.0), Vec2::new(10.0, 0.0))).unwrap();
    let b = sim.add_object(rigid("b", Vec2::ZERO, Vec2::ZERO)).unwrap();

    sim.process_object(a, 1.0).unwrap();

    let va = sim.scene().get(a).unwrap().velocity();
    let vb = sim.scene().get(b).unwrap().velocity();
    assert!((va.x + vb.x - 10.0).abs() < 1.0e-3, "momentum {} + {}", va.x, vb.x);
    // Default material restitution is 0.5
    assert!((va.x - 2.5).abs() < 1.0e-3, "a {}", va);
    assert!((vb.x - 7.5).abs() < 1.0e-3, "b {}", vb);
}

#[test]
fn test_rigid_off_centre_hit_spins_body() {
    let mut config = SimulationConfig::default();
    config.max_iterations = 2;
    config.default_material = CollisionMaterial::new(0.0, 0.0, 0.0);
    let mut sim = Simulation::new(config).unwrap();
    let points: Rc<RefCell<Vec<Vec2>>> = Rc::default();
    let recorder = points.clone();
    let callback = sim
        .callbacks_mut()
        .add_on_collision(move |event| recorder.borrow_mut().push(event.info.position));

    // The floor image outranks the box, so the floor side runs the sweep
    sim.add_object(
        SceneObject::new("floor")
            .with_size(Vec2::splat(2.0))
            .with_component(PhysicsComponent::immovable())
            .with_component(
                CollisionComponent::new()
                    .with_image(PolygonImage::square().with_priority(5.0))
                    .with_resolve(ResolveStrategy::Rigid),
            ),
    )
    .unwrap();
    let a = sim
        .add_object(
            SceneObject::new("a")
                .with_position(Vec2::new(1.5, 5.0))
                .with_size(Vec2::splat(2.0))
                .with_component(PhysicsComponent::new().with_velocity(Vec2::new(0.0, -10.0)))
                .with_component(
                    CollisionComponent::boxed()
                        .with_resolve(ResolveStrategy::Rigid)
                        .with_callback(callback),
                ),
        )
        .unwrap();

    sim.process_object(a, 1.0).unwrap();

    // Contact lies in the middle of the shared span of both faces
    let points = points.borrow();
    assert_eq!(points.len(), 1);
    assert!((points[0] - Vec2::new(0.75, 1.0)).length() < 1.0e-3, "contact {}", points[0]);

    // Unit mass, inverse inertia 0.5, lever arm 0.75 left of the centre
    let jn = 10.0 / (1.0 + 0.75 * 0.75 * 0.5);
    let physics = sim.scene().get(a).unwrap().physics().unwrap();
    let spin = physics.angular_velocity();
    assert!(spin < 0.0, "hit left of centre should spin clockwise, got {}", spin);
    assert!((spin + 0.75 * jn * 0.5).abs() < 1.0e-3, "spin {}", spin);
    assert!((physics.velocity() - Vec2::new(0.0, jn - 10.0)).length() < 1.0e-3, "velocity {}", physics.velocity());
}

#[test]
fn test_higher_priority_material_governs() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let bouncy = CollisionMaterial::new(0.0, 1.0, 5.0);
    let dull = CollisionMaterial::new(0.0, 0.0, 1.0);

    sim.add_object(
        SceneObject::new("floor")
            .with_size(Vec2::splat(2.0))
            .with_component(PhysicsComponent::immovable())
            .with_component(CollisionComponent::new().with_image(PolygonImage::square().with_material(bouncy))),
    )
    .unwrap();
    let ball = sim
        .add_object(
            SceneObject::new("ball")
                .with_position(Vec2::new(0.0, 5.0))
                .with_size(Vec2::splat(2.0))
                .with_component(PhysicsComponent::new().with_velocity(Vec2::new(0.0, -10.0)))
                .with_component(CollisionComponent::new().with_image(PolygonImage::square().with_material(dull))),
        )
        .unwrap();

    sim.step(1.0);
    let velocity = sim.scene().get(ball).unwrap().velocity();
    assert!((velocity.y - 10.0).abs() < 1.0e-3, "velocity {}", velocity);
}

#[test]
fn test_disabled_collision_passes_through() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let mut ghost = CollisionComponent::boxed();
    ghost.enabled = false;
    sim.add_object(
        SceneObject::new("ghost")
            .with_size(Vec2::splat(2.0))
            .with_component(PhysicsComponent::immovable())
            .with_component(ghost),
    )
    .unwrap();
    let ball = sim
        .add_object(crate_box("ball", Vec2::new(0.0, 5.0), PhysicsComponent::new().with_velocity(Vec2::new(0.0, -10.0))))
        .unwrap();

    sim.step(1.0);
    let object = sim.scene().get(ball).unwrap();
    assert_eq!(object.velocity(), Vec2::new(0.0, -10.0));
    assert!((object.position.y + 5.0).abs() < 1.0e-4);
}
