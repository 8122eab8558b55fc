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
//! Named, typed interfaces exposed by components
//!
//! Components publish interfaces in two ways:
//!
//! - **Cached**: a concrete [`Interface`] handed to the
//!   [`InterfaceRegistrar`] during `register_interfaces`. The container keeps
//!   it for the lifetime of the registration.
//! - **Dynamic**: a `(type, name)` pattern registration. When a query matches
//!   the registration, the owning component's `get_interfaces` is called to
//!   produce the interfaces on demand.
//!
//! Interface values are shared through `Rc`, so holding one never borrows the
//! component that produced it.

use crate::pattern;
use crate::scene::component::ComponentContainer;
use smallvec::SmallVec;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Index path from a container root down to a (possibly nested) component
pub type ComponentPath = SmallVec<[usize; 4]>;

/// Interface type used for scalar values
pub const FLOAT_INTERFACE: &str = "float";

/// Interface type used for 2D vector values
pub const VECTOR2_INTERFACE: &str = "vector2";

/// A typed, named handle published by a component
#[derive(Clone)]
pub struct Interface {
    type_name: String,
    name: String,
    value: Rc<dyn Any>,
}

impl Interface {
    /// Wrap a shared value under a type and name
    pub fn new<T: Any>(type_name: impl Into<String>, name: impl Into<String>, value: Rc<T>) -> Self {
        Interface {
            type_name: type_name.into(),
            name: name.into(),
            value,
        }
    }

    /// Interface type string
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Interface name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the value has concrete type `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Downcast the shared value to `T`
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    /// Test the interface against a type pattern and a name pattern
    pub fn matches(&self, type_pattern: &str, name_pattern: &str) -> bool {
        pattern::matches(type_pattern, &self.type_name) && pattern::matches(name_pattern, &self.name)
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}

/// Shared mutable cell for a plain value
///
/// Value interfaces are how one component drives another: an animation
/// writes a `ValueInterface<f32>` that the physics component reads as its
/// angular velocity.
#[derive(Debug, Default)]
pub struct ValueInterface<T: Copy> {
    value: Cell<T>,
}

impl<T: Copy> ValueInterface<T> {
    /// Create a cell holding `value`
    pub fn new(value: T) -> Self {
        ValueInterface {
            value: Cell::new(value),
        }
    }

    /// Read the value
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Overwrite the value
    pub fn set(&self, value: T) {
        self.value.set(value);
    }
}

/// A pattern registration resolved lazily through `get_interfaces`
#[derive(Debug, Clone)]
pub struct DynamicRegistration {
    type_name: String,
    name: String,
    path: ComponentPath,
}

impl DynamicRegistration {
    /// Registered type pattern
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Registered name pattern
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the owning component
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// A query selects this registration when its type pattern matches the
    /// registered type, and its name pattern is `*`, matches the registered
    /// name, or is a concrete name the registered pattern covers.
    pub fn matches(&self, type_pattern: &str, name_pattern: &str) -> bool {
        pattern::matches(type_pattern, &self.type_name)
            && (name_pattern == "*"
                || pattern::matches(name_pattern, &self.name)
                || pattern::matches(&self.name, name_pattern))
    }
}

/// Interfaces collected while a container registers
#[derive(Debug, Default)]
pub struct InterfaceCache {
    cached: Vec<Interface>,
    dynamic: Vec<DynamicRegistration>,
}

impl InterfaceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached interface and dynamic registration
    pub fn clear(&mut self) {
        self.cached.clear();
        self.dynamic.clear();
    }

    /// Cached interfaces in registration order
    pub fn cached(&self) -> &[Interface] {
        &self.cached
    }

    /// Dynamic registrations in registration order
    pub fn dynamic(&self) -> &[DynamicRegistration] {
        &self.dynamic
    }

    /// First cached interface matching the patterns whose value is a `T`
    ///
    /// Only cached interfaces are consulted; dynamic registrations need the
    /// owning container and are resolved by
    /// [`ComponentContainer::interface_iter`].
    pub fn find<T: Any>(&self, type_pattern: &str, name_pattern: &str) -> Option<Rc<T>> {
        self.cached
            .iter()
            .filter(|i| i.matches(type_pattern, name_pattern))
            .find_map(|i| i.downcast::<T>())
    }
}

/// Handed to `Component::register_interfaces` to publish interfaces
pub struct InterfaceRegistrar<'a> {
    cache: &'a mut InterfaceCache,
    path: &'a [usize],
}

impl<'a> InterfaceRegistrar<'a> {
    pub(crate) fn new(cache: &'a mut InterfaceCache, path: &'a [usize]) -> Self {
        InterfaceRegistrar { cache, path }
    }

    /// Publish a cached interface
    pub fn add(&mut self, interface: Interface) {
        self.cache.cached.push(interface);
    }

    /// Publish a shared value as a cached interface
    pub fn add_value<T: Any>(&mut self, type_name: &str, name: &str, value: Rc<T>) {
        self.add(Interface::new(type_name, name, value));
    }

    /// Register a dynamic `(type, name)` pattern for the calling component
    pub fn register_dynamic(&mut self, type_name: &str, name: &str) {
        self.cache.dynamic.push(DynamicRegistration {
            type_name: type_name.to_string(),
            name: name.to_string(),
            path: self.path.iter().copied().collect(),
        });
    }
}

thread_local! {
    static IN_INTERFACE_QUERY: Cell<bool> = const { Cell::new(false) };
}

/// Marks the thread as inside a component's `get_interfaces` call
struct QueryGuard;

impl QueryGuard {
    fn enter() -> Self {
        Self::check();
        IN_INTERFACE_QUERY.with(|flag| flag.set(true));
        QueryGuard
    }

    fn check() {
        IN_INTERFACE_QUERY.with(|flag| {
            assert!(
                !flag.get(),
                "Interface queries cannot be issued from inside get_interfaces"
            );
        });
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        IN_INTERFACE_QUERY.with(|flag| flag.set(false));
    }
}

/// Lazy iterator over the interfaces of a container matching two patterns
///
/// Cached interfaces are yielded first, then each matching dynamic
/// registration is expanded through its component. Call [`reset`] to walk
/// the results again.
///
/// [`reset`]: InterfaceIter::reset
pub struct InterfaceIter<'a> {
    container: &'a ComponentContainer,
    type_pattern: &'a str,
    name_pattern: &'a str,
    cached_pos: usize,
    dynamic_pos: usize,
    pending: Vec<Interface>,
    pending_pos: usize,
}

impl<'a> InterfaceIter<'a> {
    pub(crate) fn new(container: &'a ComponentContainer, type_pattern: &'a str, name_pattern: &'a str) -> Self {
        InterfaceIter {
            container,
            type_pattern,
            name_pattern,
            cached_pos: 0,
            dynamic_pos: 0,
            pending: Vec::new(),
            pending_pos: 0,
        }
    }

    /// Restart the walk from the first interface
    pub fn reset(&mut self) {
        self.cached_pos = 0;
        self.dynamic_pos = 0;
        self.pending.clear();
        self.pending_pos = 0;
    }
}

impl Iterator for InterfaceIter<'_> {
    type Item = Interface;

    fn next(&mut self) -> Option<Interface> {
        QueryGuard::check();
        let cache = self.container.interface_cache();

        while self.cached_pos < cache.cached.len() {
            let interface = &cache.cached[self.cached_pos];
            self.cached_pos += 1;
            if interface.matches(self.type_pattern, self.name_pattern) {
                return Some(interface.clone());
            }
        }

        loop {
            while self.pending_pos < self.pending.len() {
                let interface = &self.pending[self.pending_pos];
                self.pending_pos += 1;
                if interface.matches(self.type_pattern, self.name_pattern) {
                    return Some(interface.clone());
                }
            }

            let registration = cache.dynamic.get(self.dynamic_pos)?;
            self.dynamic_pos += 1;
            if !registration.matches(self.type_pattern, self.name_pattern) {
                continue;
            }
            let Some(component) = self.container.component_at(&registration.path) else {
                continue;
            };

            self.pending.clear();
            self.pending_pos = 0;
            let _guard = QueryGuard::enter();
            component.get_interfaces(self.type_pattern, self.name_pattern, &mut self.pending);
        }
    }
}
