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
//! Components and the container that registers them
//!
//! A [`ComponentContainer`] owns an ordered list of boxed [`Component`]s.
//! Registration runs in three phases over the whole tree, depth first in
//! list order:
//!
//! 1. `register_interfaces` publishes interfaces into the container cache.
//! 2. `on_register` may veto by returning `false`. A veto unwinds the
//!    components that already accepted and aborts the registration.
//! 3. `post_register` sees the completed cache and binds to other
//!    components' interfaces.
//!
//! Component lists may only change while the container is unregistered.

use crate::error::{Result, SimError};
use crate::scene::interface::{ComponentPath, Interface, InterfaceCache, InterfaceIter, InterfaceRegistrar};
use crate::scene::ObjectId;
use std::any::Any;
use std::rc::Rc;
use tracing::{debug, warn};

/// Behavior attached to a scene object
///
/// Only `type_name`, `clone_component`, `copy_to` and the `as_any` pair are
/// required; every lifecycle hook has a no-op default.
pub trait Component: Any {
    /// Human readable component type, used in logs and errors
    fn type_name(&self) -> &'static str;

    /// Publish cached interfaces and dynamic registrations
    fn register_interfaces(&mut self, _owner: ObjectId, _registrar: &mut InterfaceRegistrar<'_>) {}

    /// Called when the owning object registers
    ///
    /// # Returns
    ///
    /// `false` to veto the registration of the whole object
    fn on_register(&mut self, _owner: ObjectId) -> bool {
        true
    }

    /// Called after every component registered, with the finished cache
    fn post_register(&mut self, _interfaces: &InterfaceCache) {}

    /// Called when the owning object unregisters
    fn on_unregister(&mut self) {}

    /// Produce interfaces for a matching dynamic registration
    ///
    /// Implementations append to `out` and must not query interfaces
    /// themselves.
    fn get_interfaces(&self, _type_pattern: &str, _name_pattern: &str, _out: &mut Vec<Interface>) {}

    /// Advance per-frame behavior by `dt` seconds
    fn process_tick(&mut self, _dt: f32) {}

    /// Clone into a new, unregistered component
    fn clone_component(&self) -> Box<dyn Component>;

    /// Copy configuration onto another component of the same concrete type
    ///
    /// Nested containers are copied by the caller.
    fn copy_to(&self, target: &mut dyn Component);

    /// Nested container, for components that group others
    fn components(&self) -> Option<&ComponentContainer> {
        None
    }

    /// Mutable nested container
    fn components_mut(&mut self) -> Option<&mut ComponentContainer> {
        None
    }

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Ordered, registrable list of components
#[derive(Default)]
pub struct ComponentContainer {
    components: Vec<Box<dyn Component>>,
    owner: Option<ObjectId>,
    interfaces: InterfaceCache,
}

impl ComponentContainer {
    /// Create an empty, unregistered container
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component
    ///
    /// # Panics
    ///
    /// Panics if the container is registered
    pub fn add_component(&mut self, component: impl Component) {
        self.add_boxed(Box::new(component));
    }

    /// Append an already boxed component
    ///
    /// # Panics
    ///
    /// Panics if the container is registered
    pub fn add_boxed(&mut self, component: Box<dyn Component>) {
        assert!(
            self.owner.is_none(),
            "Cannot add component '{}' to a registered container",
            component.type_name()
        );
        self.components.push(component);
    }

    /// Remove and return the component at `index`
    ///
    /// # Panics
    ///
    /// Panics if the container is registered or `index` is out of range
    pub fn remove_component(&mut self, index: usize) -> Box<dyn Component> {
        assert!(
            self.owner.is_none(),
            "Cannot remove a component from a registered container"
        );
        assert!(
            index < self.components.len(),
            "Component index {} out of range for {} components",
            index,
            self.components.len()
        );
        self.components.remove(index)
    }

    /// Number of top-level components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if there are no top-level components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Owner id while registered
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// True between `register` and `unregister`
    pub fn is_registered(&self) -> bool {
        self.owner.is_some()
    }

    /// Top-level component at `index`
    pub fn get(&self, index: usize) -> Option<&dyn Component> {
        self.components.get(index).map(|c| c.as_ref())
    }

    /// Mutable top-level component at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut dyn Component> {
        match self.components.get_mut(index) {
            Some(c) => Some(c.as_mut()),
            None => None,
        }
    }

    /// Iterate top-level components in order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(|c| c.as_ref())
    }

    /// First top-level component of type `T`
    pub fn find_component<T: Component>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// First top-level component of type `T`, mutably
    pub fn find_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Every top-level component of type `T`
    pub fn find_components<T: Component>(&self) -> Vec<&T> {
        self.components
            .iter()
            .filter_map(|c| c.as_any().downcast_ref::<T>())
            .collect()
    }

    /// Component reached by following `path` through nested containers
    pub fn component_at(&self, path: &[usize]) -> Option<&dyn Component> {
        let (first, rest) = path.split_first()?;
        let mut current: &dyn Component = self.components.get(*first)?.as_ref();
        for index in rest {
            current = current.components()?.components.get(*index)?.as_ref();
        }
        Some(current)
    }

    fn component_at_mut(&mut self, path: &[usize]) -> Option<&mut dyn Component> {
        let (first, rest) = path.split_first()?;
        let mut current: &mut dyn Component = self.components.get_mut(*first)?.as_mut();
        for index in rest {
            current = current.components_mut()?.components.get_mut(*index)?.as_mut();
        }
        Some(current)
    }

    /// Interfaces published during the current registration
    pub fn interface_cache(&self) -> &InterfaceCache {
        &self.interfaces
    }

    /// Lazily iterate interfaces matching the type and name patterns
    ///
    /// # Panics
    ///
    /// Advancing the iterator from inside a component's `get_interfaces`
    /// panics.
    pub fn interface_iter<'a>(&'a self, type_pattern: &'a str, name_pattern: &'a str) -> InterfaceIter<'a> {
        InterfaceIter::new(self, type_pattern, name_pattern)
    }

    /// First interface matching the patterns, downcast to `T`
    ///
    /// # Panics
    ///
    /// Panics if the first match holds a value of another type
    pub fn get_interface<T: Any>(&self, type_pattern: &str, name_pattern: &str) -> Option<Rc<T>> {
        let interface = self.interface_iter(type_pattern, name_pattern).next()?;
        match interface.downcast::<T>() {
            Some(value) => Some(value),
            None => panic!(
                "Interface '{}' of type '{}' does not hold a {}",
                interface.name(),
                interface.type_name(),
                std::any::type_name::<T>()
            ),
        }
    }

    /// Every interface matching the patterns whose value is a `T`
    pub fn get_interfaces<T: Any>(&self, type_pattern: &str, name_pattern: &str) -> Vec<Rc<T>> {
        self.interface_iter(type_pattern, name_pattern)
            .filter_map(|i| i.downcast::<T>())
            .collect()
    }

    /// Register every component for `owner`
    ///
    /// # Returns
    ///
    /// `Err(SimError::RegistrationVetoed)` if a component's `on_register`
    /// returned `false`; the container is left unregistered.
    ///
    /// # Panics
    ///
    /// Panics if the container is already registered
    pub fn register(&mut self, owner: ObjectId) -> Result<()> {
        assert!(self.owner.is_none(), "Component container is already registered");

        self.interfaces.clear();
        let mut path = ComponentPath::new();
        register_interfaces_recursive(&mut self.components, owner, &mut self.interfaces, &mut path);
        self.owner = Some(owner);

        let mut accepted: Vec<ComponentPath> = Vec::new();
        if let Err(component) = on_register_recursive(&mut self.components, owner, &mut path, &mut accepted) {
            warn!("{} vetoed registration of {}", component, owner);
            for accepted_path in accepted.iter().rev() {
                if let Some(c) = self.component_at_mut(accepted_path) {
                    c.on_unregister();
                }
            }
            self.interfaces.clear();
            set_owner_recursive(&mut self.components, None);
            self.owner = None;
            return Err(SimError::RegistrationVetoed { component });
        }

        post_register_recursive(&mut self.components, &self.interfaces);
        debug!(
            "Registered {} components for {} ({} interfaces)",
            self.components.len(),
            owner,
            self.interfaces.cached().len()
        );
        Ok(())
    }

    /// Unregister every component, depth first in list order
    ///
    /// Does nothing if the container is not registered.
    pub fn unregister(&mut self) {
        if self.owner.is_none() {
            return;
        }
        unregister_recursive(&mut self.components);
        self.interfaces.clear();
        self.owner = None;
    }

    /// Tick every component, depth first in list order
    pub fn process_tick(&mut self, dt: f32) {
        for component in &mut self.components {
            component.process_tick(dt);
            if let Some(nested) = component.components_mut() {
                nested.process_tick(dt);
            }
        }
    }

    /// Copy every component onto the matching component of `target`
    ///
    /// # Panics
    ///
    /// Panics if the containers differ in length or in the concrete type of
    /// any position. `target` is emptied before the panic.
    pub fn copy_to(&self, target: &mut ComponentContainer) {
        if self.components.len() != target.components.len() {
            let target_len = target.components.len();
            target.components.clear();
            panic!(
                "Cannot copy {} components onto a container of {}",
                self.components.len(),
                target_len
            );
        }

        let mismatch = self
            .components
            .iter()
            .zip(target.components.iter())
            .position(|(src, dst)| !same_component_type(src.as_ref(), dst.as_ref()));
        if let Some(index) = mismatch {
            let expected = self.components[index].type_name();
            let found = target.components[index].type_name();
            target.components.clear();
            panic!(
                "Component type mismatch at index {}: expected {}, found {}",
                index, expected, found
            );
        }

        for (src, dst) in self.components.iter().zip(target.components.iter_mut()) {
            src.copy_to(dst.as_mut());
            if let (Some(src_nested), Some(dst_nested)) = (src.components(), dst.components_mut()) {
                src_nested.copy_to(dst_nested);
            }
        }
    }
}

impl Clone for ComponentContainer {
    /// Clone every component into a fresh, unregistered container
    fn clone(&self) -> Self {
        ComponentContainer {
            components: self.components.iter().map(|c| c.clone_component()).collect(),
            owner: None,
            interfaces: InterfaceCache::new(),
        }
    }
}

fn register_interfaces_recursive(
    components: &mut [Box<dyn Component>],
    owner: ObjectId,
    cache: &mut InterfaceCache,
    path: &mut ComponentPath,
) {
    for (index, component) in components.iter_mut().enumerate() {
        path.push(index);
        {
            let mut registrar = InterfaceRegistrar::new(cache, path);
            component.register_interfaces(owner, &mut registrar);
        }
        if let Some(nested) = component.components_mut() {
            nested.owner = Some(owner);
            register_interfaces_recursive(&mut nested.components, owner, cache, path);
        }
        path.pop();
    }
}

fn on_register_recursive(
    components: &mut [Box<dyn Component>],
    owner: ObjectId,
    path: &mut ComponentPath,
    accepted: &mut Vec<ComponentPath>,
) -> std::result::Result<(), &'static str> {
    for (index, component) in components.iter_mut().enumerate() {
        path.push(index);
        if !component.on_register(owner) {
            return Err(component.type_name());
        }
        accepted.push(path.clone());
        if let Some(nested) = component.components_mut() {
            on_register_recursive(&mut nested.components, owner, path, accepted)?;
        }
        path.pop();
    }
    Ok(())
}

fn post_register_recursive(components: &mut [Box<dyn Component>], cache: &InterfaceCache) {
    for component in components.iter_mut() {
        component.post_register(cache);
        if let Some(nested) = component.components_mut() {
            post_register_recursive(&mut nested.components, cache);
        }
    }
}

fn unregister_recursive(components: &mut [Box<dyn Component>]) {
    for component in components.iter_mut() {
        component.on_unregister();
        if let Some(nested) = component.components_mut() {
            unregister_recursive(&mut nested.components);
            nested.owner = None;
        }
    }
}

fn set_owner_recursive(components: &mut [Box<dyn Component>], owner: Option<ObjectId>) {
    for component in components.iter_mut() {
        if let Some(nested) = component.components_mut() {
            nested.owner = owner;
            set_owner_recursive(&mut nested.components, owner);
        }
    }
}

/// Check that two components share a concrete type
pub fn same_component_type(a: &dyn Component, b: &dyn Component) -> bool {
    a.as_any().type_id() == b.as_any().type_id()
}

/// A component that owns a nested container of components
///
/// Groups let a set of components be added, cloned and copied as a unit.
/// Nested components register with the same owner and publish into the
/// root container's interface cache.
#[derive(Clone, Default)]
pub struct ComponentGroup {
    /// Group name
    pub name: String,
    components: ComponentContainer,
}

impl ComponentGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        ComponentGroup {
            name: name.into(),
            components: ComponentContainer::new(),
        }
    }

    /// Builder: append a component to the group
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.components.add_component(component);
        self
    }
}

impl Component for ComponentGroup {
    fn type_name(&self) -> &'static str {
        "ComponentGroup"
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn copy_to(&self, target: &mut dyn Component) {
        if let Some(target) = target.as_any_mut().downcast_mut::<ComponentGroup>() {
            target.name = self.name.clone();
        }
    }

    fn components(&self) -> Option<&ComponentContainer> {
        Some(&self.components)
    }

    fn components_mut(&mut self) -> Option<&mut ComponentContainer> {
        Some(&mut self.components)
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
    use crate::scene::interface::{ValueInterface, FLOAT_INTERFACE};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Clone)]
    struct Probe {
        label: &'static str,
        accept: bool,
        value: f32,
        log: Log,
    }

    impl Probe {
        fn new(label: &'static str, log: &Log) -> Self {
            Probe {
                label,
                accept: true,
                value: 0.0,
                log: log.clone(),
            }
        }
    }

    impl Component for Probe {
        fn type_name(&self) -> &'static str {
            "Probe"
        }

        fn register_interfaces(&mut self, _owner: ObjectId, registrar: &mut InterfaceRegistrar<'_>) {
            self.log.borrow_mut().push(format!("interfaces:{}", self.label));
            registrar.add_value(FLOAT_INTERFACE, self.label, Rc::new(ValueInterface::new(self.value)));
        }

        fn on_register(&mut self, _owner: ObjectId) -> bool {
            self.log.borrow_mut().push(format!("register:{}", self.label));
            self.accept
        }

        fn post_register(&mut self, interfaces: &InterfaceCache) {
            self.log
                .borrow_mut()
                .push(format!("post:{}:{}", self.label, interfaces.cached().len()));
        }

        fn on_unregister(&mut self) {
            self.log.borrow_mut().push(format!("unregister:{}", self.label));
        }

        fn clone_component(&self) -> Box<dyn Component> {
            Box::new(self.clone())
        }

        fn copy_to(&self, target: &mut dyn Component) {
            if let Some(target) = target.as_any_mut().downcast_mut::<Probe>() {
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

    fn owner() -> ObjectId {
        ObjectId::new(0, 0)
    }

    #[test]
    fn test_registration_phases_in_order() {
        let log = Log::default();
        let mut container = ComponentContainer::new();
        container.add_component(Probe::new("a", &log));
        container.add_component(ComponentGroup::new("group").with_component(Probe::new("b", &log)));
        container.add_component(Probe::new("c", &log));

        container.register(owner()).unwrap();
        assert!(container.is_registered());
        assert_eq!(
            *log.borrow(),
            vec![
                "interfaces:a",
                "interfaces:b",
                "interfaces:c",
                "register:a",
                "register:b",
                "register:c",
                "post:a:3",
                "post:b:3",
                "post:c:3",
            ]
        );

        log.borrow_mut().clear();
        container.unregister();
        assert_eq!(*log.borrow(), vec!["unregister:a", "unregister:b", "unregister:c"]);
        assert!(container.interface_cache().cached().is_empty());
    }

    #[test]
    fn test_veto_unwinds_accepted_components() {
        let log = Log::default();
        let mut container = ComponentContainer::new();
        container.add_component(Probe::new("a", &log));
        let mut vetoing = Probe::new("b", &log);
        vetoing.accept = false;
        container.add_component(vetoing);
        container.add_component(Probe::new("c", &log));

        let err = container.register(owner()).unwrap_err();
        assert!(matches!(err, SimError::RegistrationVetoed { component: "Probe" }));
        assert!(!container.is_registered());

        let log = log.borrow();
        assert!(log.contains(&"unregister:a".to_string()));
        assert!(!log.contains(&"register:c".to_string()));
        assert!(!log.iter().any(|entry| entry.starts_with("post:")));

        // The container can still be edited after a veto.
        drop(log);
        container.remove_component(1);
        assert_eq!(container.len(), 2);
    }

    #[test]
    #[should_panic(expected = "registered container")]
    fn test_add_while_registered_panics() {
        let log = Log::default();
        let mut container = ComponentContainer::new();
        container.register(owner()).unwrap();
        container.add_component(Probe::new("late", &log));
    }

    #[test]
    fn test_find_component_top_level_only() {
        let log = Log::default();
        let mut container = ComponentContainer::new();
        container.add_component(ComponentGroup::new("group").with_component(Probe::new("nested", &log)));
        assert!(container.find_component::<Probe>().is_none());
        assert!(container.find_component::<ComponentGroup>().is_some());

        container.add_component(Probe::new("top", &log));
        assert_eq!(container.find_component::<Probe>().unwrap().label, "top");
        assert_eq!(container.find_components::<Probe>().len(), 1);
        assert!(container.component_at(&[0, 0]).is_some());
        assert!(container.component_at(&[0, 1]).is_none());
    }

    #[test]
    fn test_clone_is_unregistered() {
        let log = Log::default();
        let mut container = ComponentContainer::new();
        container.add_component(Probe::new("a", &log));
        container.register(owner()).unwrap();

        let copy = container.clone();
        assert!(!copy.is_registered());
        assert_eq!(copy.len(), 1);
        assert!(copy.interface_cache().cached().is_empty());
    }

    #[test]
    fn test_copy_to_copies_nested_groups() {
        let log = Log::default();
        let mut source = ComponentContainer::new();
        let mut probe = Probe::new("a", &log);
        probe.value = 7.0;
        source.add_component(ComponentGroup::new("src").with_component(probe));

        let mut target = ComponentContainer::new();
        target.add_component(ComponentGroup::new("dst").with_component(Probe::new("b", &log)));

        source.copy_to(&mut target);
        let group = target.find_component::<ComponentGroup>().unwrap();
        assert_eq!(group.name, "src");
        let nested = group.components().unwrap().find_component::<Probe>().unwrap();
        assert_eq!(nested.value, 7.0);
    }

    #[test]
    #[should_panic(expected = "Cannot copy 1 components onto a container of 0")]
    fn test_copy_to_count_mismatch_panics() {
        let log = Log::default();
        let mut source = ComponentContainer::new();
        source.add_component(Probe::new("a", &log));
        let mut target = ComponentContainer::new();
        source.copy_to(&mut target);
    }

    #[test]
    fn test_same_component_type() {
        let log = Log::default();
        let a = Probe::new("a", &log);
        let b = Probe::new("b", &log);
        let group = ComponentGroup::new("g");
        assert!(same_component_type(&a, &b));
        assert!(!same_component_type(&a, &group));
    }
}
