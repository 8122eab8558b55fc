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
//! Bouncing boxes demo
//!
//! Drops a few boxes into a walled area, logs their positions once per
//! simulated second and reports bounces through a collision callback.

use glam::Vec2;
use scene_physics::collision::{CollisionComponent, CollisionMaterial, PolygonImage, ResolveStrategy, WorldLimitComponent};
use scene_physics::physics::{ConstantForce, ForceComponent, LinearDrag, PhysicsComponent};
use scene_physics::scene::SceneObject;
use scene_physics::{Simulation, SimulationConfig};
use std::cell::Cell;
use std::rc::Rc;

fn main() {
    println!("Scene Physics - Bouncing Boxes");
    println!("==============================\n");

    let config = SimulationConfig::from_toml_str(
        r#"
        max_iterations = 5
        grid_cell_size = 16.0
        "#,
    )
    .expect("demo configuration is valid");
    let mut sim = Simulation::new(config).expect("demo configuration validates");

    let bounces = Rc::new(Cell::new(0u32));
    let counter = bounces.clone();
    let on_bounce = sim.callbacks_mut().add_on_collision(move |_event| {
        counter.set(counter.get() + 1);
    });

    let limit = WorldLimitComponent::new(Vec2::new(-20.0, -20.0), Vec2::new(20.0, 40.0)).with_resolve(ResolveStrategy::Bounce);

    // Ramp made of a rotated static box
    let mut ramp = SceneObject::new("ramp")
        .with_position(Vec2::new(-5.0, 0.0))
        .with_size(Vec2::new(16.0, 1.0))
        .with_component(PhysicsComponent::immovable())
        .with_component(CollisionComponent::boxed());
    ramp.rotation = -0.3;
    sim.add_object(ramp).expect("ramp registers");

    let rubber = CollisionMaterial::new(0.2, 0.8, 1.0);
    let mut boxes = Vec::new();
    for i in 0..4 {
        let object = SceneObject::new(format!("box{}", i))
            .with_position(Vec2::new(-10.0 + i as f32 * 3.0, 10.0 + i as f32 * 4.0))
            .with_size(Vec2::splat(1.5))
            .with_component(PhysicsComponent::new().with_mass(1.0 + i as f32))
            .with_component(
                CollisionComponent::new()
                    .with_image(PolygonImage::square().with_material(rubber))
                    .with_resolve(ResolveStrategy::Rigid)
                    .with_callback(on_bounce),
            )
            .with_component(limit.clone())
            .with_component(
                ForceComponent::new()
                    .with_force(ConstantForce::gravity(Vec2::new(0.0, -9.8)))
                    .with_force(LinearDrag::new(0.05)),
            );
        boxes.push(sim.add_object(object).expect("box registers"));
    }

    let dt = 1.0 / 60.0;
    for frame in 1..=300 {
        sim.step(dt);
        if frame % 60 == 0 {
            println!("t = {:.1}s", frame as f32 * dt);
            for id in &boxes {
                if let Some(object) = sim.scene().get(*id) {
                    println!(
                        "  {:<5} pos=({:7.3}, {:7.3}) vel=({:7.3}, {:7.3}) rot={:6.3}",
                        object.name,
                        object.position.x,
                        object.position.y,
                        object.velocity().x,
                        object.velocity().y,
                        object.rotation
                    );
                }
            }
        }
    }

    println!("\n{} collision callbacks over {} frames", bounces.get(), sim.frame());
}
