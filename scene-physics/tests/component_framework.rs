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
//! Component framework tests
//!
//! Registration protocol, interface lookups and container copying as seen
//! from outside the crate.

use glam::Vec2;
use scene_physics::physics::{PhysicsComponent, VELOCITY_INTERFACE_NAME};
use scene_physics::scene::{
    Component, ComponentContainer, ComponentGroup, Interface, InterfaceRegistrar, ObjectId, Scene, SceneObject,
    ValueInterface, FLOAT_INTERFACE, VECTOR2_INTERFACE,
};
use scene_physics::SimError;
use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

macro_rules! marker_component {
    ($name:ident) => {
        #[derive(Clone, Default)]
        struct $name {
            value: i32,
        }

        impl Component for $name {
            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn clone_component(&self) -> Box<dyn Component> {
                Box::new(self.clone())
            }

            fn copy_to(&self, target: &mut dyn Component) {
                if let Some(target) = target.as_any_mut().downcast_mut::<$name>() {
                    target.value = self.value;
                }
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

marker_component!(Alpha);
marker_component!(Beta);
marker_component!(Gamma);

/// Records registration calls and optionally refuses to register
#[derive(Clone)]
struct Gate {
    accept: bool,
    registered: Rc<Cell<u32>>,
    unregistered: Rc<Cell<u32>>,
}

impl Gate {
    fn new(accept: bool) -> Self {
        Gate {
            accept,
            registered: Rc::new(Cell::new(0)),
            unregistered: Rc::new(Cell::new(0)),
        }
    }
}

impl Component for Gate {
    fn type_name(&self) -> &'static str {
        "Gate"
    }

    fn on_register(&mut self, _owner: ObjectId) -> bool {
        self.registered.set(self.registered.get() + 1);
        self.accept
    }

    fn on_unregister(&mut self) {
        self.unregistered.set(self.unregistered.get() + 1);
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, _target: &mut dyn Component) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Publishes `"float"` interfaces on demand, one per requested channel
#[derive(Clone)]
struct Channels {
    levels: Vec<Rc<ValueInterface<f32>>>,
}

impl Component for Channels {
    fn type_name(&self) -> &'static str {
        "Channels"
    }

    fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
        registrar.register_dynamic(FLOAT_INTERFACE, "channel*");
    }

    fn get_interfaces(&self, type_pattern: &str, name_pattern: &str, out: &mut Vec<Interface>) {
        for (i, level) in self.levels.iter().enumerate() {
            let interface = Interface::new(FLOAT_INTERFACE, format!("channel{}", i), level.clone());
            if interface.matches(type_pattern, name_pattern) {
                out.push(interface);
            }
        }
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, _target: &mut dyn Component) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Runs a query on another container from inside its own `get_interfaces`
struct Nosy {
    inner: Rc<ComponentContainer>,
}

impl Component for Nosy {
    fn type_name(&self) -> &'static str {
        "Nosy"
    }

    fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
        registrar.register_dynamic(FLOAT_INTERFACE, "*");
    }

    fn get_interfaces(&self, _type_pattern: &str, _name_pattern: &str, _out: &mut Vec<Interface>) {
        self.inner.get_interfaces::<ValueInterface<f32>>(FLOAT_INTERFACE, "*");
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(Nosy {
            inner: self.inner.clone(),
        })
    }

    fn copy_to(&self, _target: &mut dyn Component) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn channels(count: usize) -> Channels {
    Channels {
        levels: (0..count).map(|i| Rc::new(ValueInterface::new(i as f32))).collect(),
    }
}

#[test]
fn test_copy_to_type_mismatch_empties_target() {
    let mut source = ComponentContainer::new();
    source.add_component(Alpha { value: 1 });
    source.add_component(Beta { value: 2 });

    let mut target = ComponentContainer::new();
    target.add_component(Alpha::default());
    target.add_component(Gamma::default());

    let result = catch_unwind(AssertUnwindSafe(|| source.copy_to(&mut target)));
    let message = result.expect_err("copy_to should panic on a type mismatch");
    let text = message
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| message.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default();
    assert!(text.contains("Component type mismatch"), "unexpected panic: {}", text);
    assert!(target.is_empty());
}

#[test]
fn test_copy_to_matching_shapes() {
    let mut source = ComponentContainer::new();
    source.add_component(Alpha { value: 7 });
    source.add_component(Beta { value: 9 });

    let mut target = ComponentContainer::new();
    target.add_component(Alpha::default());
    target.add_component(Beta::default());

    source.copy_to(&mut target);
    assert_eq!(target.find_component::<Alpha>().unwrap().value, 7);
    assert_eq!(target.find_component::<Beta>().unwrap().value, 9);
}

#[test]
fn test_veto_rejects_object_and_unwinds() {
    let accepted = Gate::new(true);
    let registered = accepted.registered.clone();
    let unregistered = accepted.unregistered.clone();

    let mut scene = Scene::default();
    let result = scene.register(
        SceneObject::new("gated")
            .with_component(accepted)
            .with_component(Gate::new(false)),
    );

    assert!(matches!(result, Err(SimError::RegistrationVetoed { component: "Gate" })));
    assert_eq!(registered.get(), 1);
    assert_eq!(unregistered.get(), 1);
    assert!(scene.is_empty());
}

#[test]
fn test_unregister_reaches_nested_groups() {
    let gate = Gate::new(true);
    let unregistered = gate.unregistered.clone();

    let mut scene = Scene::default();
    let id = scene
        .register(SceneObject::new("nested").with_component(ComponentGroup::new("inner").with_component(gate)))
        .unwrap();
    scene.unregister(id).unwrap();
    assert_eq!(unregistered.get(), 1);
}

#[test]
fn test_velocity_interface_drives_physics() {
    let mut scene = Scene::default();
    let id = scene
        .register(SceneObject::new("body").with_component(PhysicsComponent::new()))
        .unwrap();

    let object = scene.get(id).unwrap();
    let velocity = object
        .components()
        .get_interface::<ValueInterface<Vec2>>(VECTOR2_INTERFACE, VELOCITY_INTERFACE_NAME)
        .unwrap();
    velocity.set(Vec2::new(3.0, 4.0));
    assert_eq!(object.velocity(), Vec2::new(3.0, 4.0));

    assert!(object
        .components()
        .get_interface::<ValueInterface<Vec2>>(VECTOR2_INTERFACE, "missing")
        .is_none());
}

#[test]
fn test_wildcard_type_and_name() {
    let mut container = ComponentContainer::new();
    container.add_component(PhysicsComponent::new());
    container.register(ObjectId::new(0, 0)).unwrap();

    let names: Vec<String> = container
        .interface_iter("*", "*Velocity*")
        .map(|i| i.name().to_string())
        .collect();
    assert_eq!(names, vec!["angularVelocity".to_string()]);
    assert_eq!(container.interface_iter("*", "*").count(), 2);
}

#[test]
#[should_panic(expected = "does not hold a")]
fn test_type_mismatched_lookup_panics() {
    let mut container = ComponentContainer::new();
    container.add_component(PhysicsComponent::new());
    container.register(ObjectId::new(0, 0)).unwrap();
    container.get_interface::<ValueInterface<f32>>(VECTOR2_INTERFACE, "*");
}

#[test]
fn test_dynamic_interfaces_follow_cached_ones() {
    let mut container = ComponentContainer::new();
    container.add_component(channels(3));
    container.add_component(PhysicsComponent::new());
    container.register(ObjectId::new(0, 0)).unwrap();

    let names: Vec<String> = container
        .interface_iter(FLOAT_INTERFACE, "*")
        .map(|i| i.name().to_string())
        .collect();
    assert_eq!(names, vec!["angularVelocity", "channel0", "channel1", "channel2"]);

    let second = container
        .get_interface::<ValueInterface<f32>>(FLOAT_INTERFACE, "channel1")
        .unwrap();
    assert_eq!(second.get(), 1.0);
}

#[test]
fn test_interface_iter_restarts() {
    let mut container = ComponentContainer::new();
    container.add_component(channels(2));
    container.register(ObjectId::new(0, 0)).unwrap();

    let mut iter = container.interface_iter(FLOAT_INTERFACE, "channel*");
    assert_eq!(iter.by_ref().count(), 2);
    assert!(iter.next().is_none());
    iter.reset();
    assert_eq!(iter.count(), 2);
}

#[test]
#[should_panic(expected = "cannot be issued from inside get_interfaces")]
fn test_nested_query_is_rejected() {
    let mut inner = ComponentContainer::new();
    inner.add_component(channels(1));
    inner.register(ObjectId::new(1, 0)).unwrap();

    let mut outer = ComponentContainer::new();
    outer.add_component(Nosy { inner: Rc::new(inner) });
    outer.register(ObjectId::new(0, 0)).unwrap();

    outer.interface_iter(FLOAT_INTERFACE, "*").count();
}

#[test]
#[should_panic(expected = "cannot be issued from inside get_interfaces")]
fn test_nested_query_of_cached_interfaces_is_rejected() {
    // The inner container only holds cached interfaces
    let mut inner = ComponentContainer::new();
    inner.add_component(PhysicsComponent::new());
    inner.register(ObjectId::new(1, 0)).unwrap();

    let mut outer = ComponentContainer::new();
    outer.add_component(Nosy { inner: Rc::new(inner) });
    outer.register(ObjectId::new(0, 0)).unwrap();

    outer.interface_iter(FLOAT_INTERFACE, "*").count();
}
