// Copyright 2025 eraflo
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

//! A type-keyed map of shared services carried by the [`AdaptorContext`](crate::AdaptorContext).
//!
//! Subsystems fetch the optional collaborators they need (completion triggers,
//! platform providers) from here instead of reaching for process-wide singletons.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A service registry keyed by [`TypeId`].
///
/// Services are boxed as `dyn Any + Send + Sync` and can be retrieved
/// by their concrete type via [`get`](ServiceRegistry::get).
///
/// # Example
///
/// ```rust
/// use strata_core::service_registry::ServiceRegistry;
///
/// struct DisplayName(&'static str);
///
/// let mut registry = ServiceRegistry::new();
/// registry.insert(DisplayName(":0"));
///
/// assert_eq!(registry.get::<DisplayName>().unwrap().0, ":0");
/// assert!(registry.remove::<DisplayName>().is_some());
/// assert!(registry.is_empty());
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Inserts a service into the registry, keyed by `T`'s [`TypeId`].
    ///
    /// If a service of the same type was already registered, it is replaced.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.services.insert(TypeId::of::<T>(), Box::new(service));
    }

    /// Retrieves a shared reference to a previously registered service.
    ///
    /// Returns `None` if no service of type `T` has been registered.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Removes and returns the service of type `T`, if any.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.services
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
