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
//! Value animation component
//!
//! Drives `f32` values over time. Each animation sweeps between a minimum
//! and a maximum along a [`Curve`] and publishes its current value as a
//! `"float"` interface named `"<animation>.value"`. An animation may also
//! name a `"float"` interface published by a sibling component, such as a
//! physics body's `"angularVelocity"`, and writes its value there every
//! update.

use crate::animation::curve::Curve;
use crate::scene::{Component, InterfaceCache, InterfaceRegistrar, ObjectId, ValueInterface, FLOAT_INTERFACE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::rc::Rc;
use tracing::debug;

/// Seed used until one is assigned
pub const DEFAULT_ANIMATION_SEED: u64 = 0x5eed;

/// Description of one animated value
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Name used for the published `"<name>.value"` interface
    pub name: String,
    /// Name of a sibling `"float"` interface to drive, if any
    pub target: Option<String>,
    duration: f32,
    /// Value at the start of the curve
    pub min_value: f32,
    /// Value at the end of the curve
    pub max_value: f32,
    /// Reverse direction at either end instead of stopping or wrapping
    pub ping_pong: bool,
    /// Repeat forever
    pub cyclic: bool,
    /// Start at a random time within the duration
    pub random_start: bool,
    curve: Curve,
}

impl Animation {
    /// Linear animation from `min_value` to `max_value` over `duration`
    ///
    /// # Panics
    ///
    /// Panics if `duration` is not positive and finite
    pub fn new(name: impl Into<String>, duration: f32, min_value: f32, max_value: f32) -> Self {
        validate_duration(duration);
        Animation {
            name: name.into(),
            target: None,
            duration,
            min_value,
            max_value,
            ping_pong: false,
            cyclic: false,
            random_start: false,
            curve: Curve::default(),
        }
    }

    /// Seconds from start to end
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Change the duration
    ///
    /// # Panics
    ///
    /// Panics if `duration` is not positive and finite
    pub fn set_duration(&mut self, duration: f32) {
        validate_duration(duration);
        self.duration = duration;
    }

    /// Builder: drive the named `"float"` interface
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Builder: repeat forever
    pub fn cyclic(mut self) -> Self {
        self.cyclic = true;
        self
    }

    /// Builder: reverse at the ends
    pub fn ping_pong(mut self) -> Self {
        self.ping_pong = true;
        self
    }

    /// Builder: start at a random time
    pub fn random_start(mut self) -> Self {
        self.random_start = true;
        self
    }

    /// Builder: shape the animation with a curve through `(keys, values)`
    ///
    /// Curve values are fractions of the way from `min_value` to `max_value`.
    pub fn with_curve(mut self, keys: Vec<f32>, values: Vec<f32>) -> Self {
        self.set_curve(keys, values);
        self
    }

    /// Replace the curve keyframes
    pub fn set_curve(&mut self, keys: Vec<f32>, values: Vec<f32>) {
        self.curve.set_points(keys, values);
    }

    /// Curve shaping the animation
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// Value at `time` seconds into the animation
    pub fn evaluate(&mut self, time: f32) -> f32 {
        let t = (time / self.duration).clamp(0.0, 1.0);
        let fraction = self.curve.evaluate(t);
        self.min_value + (self.max_value - self.min_value) * fraction
    }
}

fn validate_duration(duration: f32) {
    assert!(
        duration > 0.0 && duration.is_finite(),
        "Animation duration must be positive and finite"
    );
}

/// Runtime state of one animation
#[derive(Debug)]
pub struct AnimationInstance {
    /// Seconds into the animation
    pub time: f32,
    /// 1 when running forward, -1 when running back in ping-pong mode
    pub direction: f32,
    /// Set by the first update after a (re)start
    pub started: bool,
    /// Updates are skipped while paused
    pub paused: bool,
    /// A non-cyclic animation reached its end
    pub finished: bool,
    value: Rc<ValueInterface<f32>>,
    target: Option<Rc<ValueInterface<f32>>>,
}

impl AnimationInstance {
    fn new(initial: f32) -> Self {
        AnimationInstance {
            time: 0.0,
            direction: 1.0,
            started: false,
            paused: false,
            finished: false,
            value: Rc::new(ValueInterface::new(initial)),
            target: None,
        }
    }

    /// Current animated value
    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// True if a target interface was bound at registration
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    fn reset(&mut self) {
        self.time = 0.0;
        self.direction = 1.0;
        self.started = false;
        self.finished = false;
    }
}

/// Component running a list of value animations
#[derive(Debug)]
pub struct ValueAnimationComponent {
    animations: Vec<(Animation, AnimationInstance)>,
    /// Multiplier applied to every update's `dt`
    pub scale: f32,
    seed: Option<u64>,
    rng: StdRng,
    owner: Option<ObjectId>,
}

impl ValueAnimationComponent {
    /// Create a component with no animations
    pub fn new() -> Self {
        ValueAnimationComponent {
            animations: Vec::new(),
            scale: 1.0,
            seed: None,
            rng: StdRng::seed_from_u64(DEFAULT_ANIMATION_SEED),
            owner: None,
        }
    }

    /// Builder: add an animation
    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.add_animation(animation);
        self
    }

    /// Builder: seed the random start times
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.set_seed(seed);
        self
    }

    /// Reseed the random start times
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Seed assigned with [`set_seed`](Self::set_seed), if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Add an animation
    ///
    /// # Returns
    ///
    /// Index of the new animation
    ///
    /// # Panics
    ///
    /// Panics if the component is registered, since its interfaces are
    /// published at registration
    pub fn add_animation(&mut self, animation: Animation) -> usize {
        assert!(
            self.owner.is_none(),
            "Cannot add animation '{}' to a registered component",
            animation.name
        );
        let instance = AnimationInstance::new(animation.min_value);
        self.animations.push((animation, instance));
        self.animations.len() - 1
    }

    /// Remove an animation
    ///
    /// # Panics
    ///
    /// Panics if the component is registered or `index` is out of range
    pub fn remove_animation(&mut self, index: usize) -> Animation {
        assert!(self.owner.is_none(), "Cannot remove animations from a registered component");
        self.check_index(index);
        self.animations.remove(index).0
    }

    /// Number of animations
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    /// True if there are no animations
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Animation description
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range
    pub fn animation(&self, index: usize) -> &Animation {
        self.check_index(index);
        &self.animations[index].0
    }

    /// Mutable animation description
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range
    pub fn animation_mut(&mut self, index: usize) -> &mut Animation {
        self.check_index(index);
        &mut self.animations[index].0
    }

    /// Runtime state of an animation
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range
    pub fn instance(&self, index: usize) -> &AnimationInstance {
        self.check_index(index);
        &self.animations[index].1
    }

    /// Current value of an animation
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range
    pub fn value(&self, index: usize) -> f32 {
        self.instance(index).value()
    }

    /// Resume an animation, restarting it if it had finished
    pub fn play(&mut self, index: usize) {
        self.check_index(index);
        let instance = &mut self.animations[index].1;
        if instance.finished {
            instance.reset();
        }
        instance.paused = false;
    }

    /// Pause an animation in place
    pub fn pause(&mut self, index: usize) {
        self.check_index(index);
        self.animations[index].1.paused = true;
    }

    /// Rewind an animation to its start and pause it
    pub fn stop(&mut self, index: usize) {
        self.check_index(index);
        let (animation, instance) = &mut self.animations[index];
        instance.reset();
        instance.paused = true;
        let value = animation.min_value;
        publish(instance, value);
    }

    /// Advance every running animation by `dt * scale`
    pub fn update_animation(&mut self, dt: f32) {
        let step = dt * self.scale;
        for (animation, instance) in &mut self.animations {
            if instance.paused || instance.finished {
                continue;
            }
            if !instance.started {
                instance.started = true;
                instance.direction = 1.0;
                instance.time = if animation.random_start {
                    self.rng.gen_range(0.0..animation.duration)
                } else {
                    0.0
                };
            }
            advance(animation, instance, step);
            let value = animation.evaluate(instance.time);
            publish(instance, value);
        }
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.animations.len(),
            "Animation index {} out of range for {} animations",
            index,
            self.animations.len()
        );
    }
}

impl Default for ValueAnimationComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ValueAnimationComponent {
    fn clone(&self) -> Self {
        ValueAnimationComponent {
            animations: self
                .animations
                .iter()
                .map(|(animation, _)| (animation.clone(), AnimationInstance::new(animation.min_value)))
                .collect(),
            scale: self.scale,
            seed: self.seed,
            rng: StdRng::seed_from_u64(self.seed.unwrap_or(DEFAULT_ANIMATION_SEED)),
            owner: None,
        }
    }
}

fn advance(animation: &Animation, instance: &mut AnimationInstance, step: f32) {
    let duration = animation.duration;
    instance.time += step * instance.direction;

    if instance.time >= duration {
        if animation.ping_pong {
            instance.time = (2.0 * duration - instance.time).max(0.0);
            instance.direction = -1.0;
        } else if animation.cyclic {
            instance.time = instance.time.rem_euclid(duration);
        } else {
            instance.time = duration;
            instance.finished = true;
        }
    } else if instance.time <= 0.0 && instance.direction < 0.0 {
        if animation.cyclic {
            instance.time = (-instance.time).min(duration);
            instance.direction = 1.0;
        } else {
            instance.time = 0.0;
            instance.finished = true;
        }
    }
}

fn publish(instance: &AnimationInstance, value: f32) {
    instance.value.set(value);
    if let Some(target) = &instance.target {
        target.set(value);
    }
}

impl Component for ValueAnimationComponent {
    fn type_name(&self) -> &'static str {
        "ValueAnimationComponent"
    }

    fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
        for (animation, instance) in &self.animations {
            registrar.add_value(
                FLOAT_INTERFACE,
                &format!("{}.value", animation.name),
                instance.value.clone(),
            );
        }
    }

    fn on_register(&mut self, owner: ObjectId) -> bool {
        self.owner = Some(owner);
        true
    }

    fn post_register(&mut self, interfaces: &InterfaceCache) {
        for (animation, instance) in &mut self.animations {
            let Some(target) = &animation.target else { continue };
            instance.target = interfaces.find::<ValueInterface<f32>>(FLOAT_INTERFACE, target);
            if instance.target.is_none() {
                debug!("Animation '{}' found no float interface named '{}'", animation.name, target);
            }
        }
    }

    fn on_unregister(&mut self) {
        for (_, instance) in &mut self.animations {
            instance.target = None;
        }
        self.owner = None;
    }

    fn process_tick(&mut self, dt: f32) {
        self.update_animation(dt);
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<ValueAnimationComponent>() {
            target.scale = self.scale;
            target.animations = self
                .animations
                .iter()
                .map(|(animation, _)| (animation.clone(), AnimationInstance::new(animation.min_value)))
                .collect();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsComponent;
    use crate::scene::ComponentContainer;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-4
    }

    #[test]
    fn test_cyclic_midpoint() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("pulse", 2.0, 0.0, 10.0).cyclic());
        component.update_animation(1.0);
        assert!(approx(component.value(0), 5.0), "value {}", component.value(0));
    }

    #[test]
    fn test_cyclic_wraps() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("pulse", 2.0, 0.0, 10.0).cyclic());
        component.update_animation(2.5);
        assert!(approx(component.instance(0).time, 0.5));
        assert!(!component.instance(0).finished);
    }

    #[test]
    fn test_one_shot_finishes_at_max() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("fade", 1.0, 1.0, 0.0));
        component.update_animation(3.0);
        assert!(component.instance(0).finished);
        assert!(approx(component.value(0), 0.0));

        component.play(0);
        assert!(!component.instance(0).finished);
        component.update_animation(0.5);
        assert!(approx(component.value(0), 0.5));
    }

    #[test]
    fn test_ping_pong_reverses() {
        let mut component =
            ValueAnimationComponent::new().with_animation(Animation::new("swing", 1.0, 0.0, 1.0).ping_pong().cyclic());
        component.update_animation(1.25);
        assert_eq!(component.instance(0).direction, -1.0);
        assert!(approx(component.value(0), 0.75));
        component.update_animation(1.0);
        assert_eq!(component.instance(0).direction, 1.0);
        assert!(approx(component.value(0), 0.25));
    }

    #[test]
    fn test_pause_and_stop() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("pulse", 2.0, 0.0, 10.0).cyclic());
        component.update_animation(0.5);
        component.pause(0);
        component.update_animation(0.5);
        assert!(approx(component.value(0), 2.5));

        component.stop(0);
        assert!(approx(component.value(0), 0.0));
        component.update_animation(1.0);
        assert!(approx(component.value(0), 0.0));
    }

    #[test]
    fn test_random_start_is_seeded() {
        let make = || {
            ValueAnimationComponent::new()
                .with_seed(7)
                .with_animation(Animation::new("flicker", 4.0, 0.0, 1.0).cyclic().random_start())
        };
        let mut a = make();
        let mut b = make();
        a.update_animation(0.0);
        b.update_animation(0.0);
        assert_eq!(a.instance(0).time, b.instance(0).time);
        assert!(a.instance(0).time < 4.0);
    }

    #[test]
    fn test_drives_sibling_interface() {
        let mut container = ComponentContainer::new();
        container.add_component(PhysicsComponent::new());
        container.add_component(
            ValueAnimationComponent::new().with_animation(
                Animation::new("spin", 1.0, 0.0, 4.0)
                    .cyclic()
                    .with_target("angularVelocity"),
            ),
        );
        container.register(ObjectId::new(0, 0)).unwrap();

        let published = container
            .get_interface::<ValueInterface<f32>>(FLOAT_INTERFACE, "spin.value")
            .unwrap();
        container.process_tick(0.5);

        let physics = container.find_component::<PhysicsComponent>().unwrap();
        assert!(approx(physics.angular_velocity(), 2.0));
        assert!(approx(published.get(), 2.0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        ValueAnimationComponent::new().animation(0);
    }

    #[test]
    #[should_panic(expected = "registered component")]
    fn test_add_while_registered_panics() {
        let mut container = ComponentContainer::new();
        container.add_component(ValueAnimationComponent::new());
        container.register(ObjectId::new(0, 0)).unwrap();
        container
            .find_component_mut::<ValueAnimationComponent>()
            .unwrap()
            .add_animation(Animation::new("late", 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_set_duration_rescales_evaluation() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("pulse", 2.0, 0.0, 10.0).cyclic());
        component.animation_mut(0).set_duration(4.0);
        assert_eq!(component.animation(0).duration(), 4.0);
        component.update_animation(1.0);
        assert!(approx(component.value(0), 2.5), "value {}", component.value(0));
    }

    #[test]
    #[should_panic(expected = "positive and finite")]
    fn test_zero_duration_rejected() {
        let mut component = ValueAnimationComponent::new().with_animation(Animation::new("pulse", 2.0, 0.0, 10.0));
        component.animation_mut(0).set_duration(0.0);
    }
}
