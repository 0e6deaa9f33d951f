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

//! The process-wide context handed to adaptor subsystems at construction.

use crate::config::AdaptorOptions;
use crate::service_registry::ServiceRegistry;

/// Options and shared services for one running adaptor.
///
/// Built once at application start and passed explicitly to the subsystems that
/// need it. Its lifetime is the application's.
#[derive(Default)]
pub struct AdaptorContext {
    /// The adaptor-wide options.
    pub options: AdaptorOptions,

    /// Optional shared collaborators, looked up by type.
    pub services: ServiceRegistry,
}

impl AdaptorContext {
    /// Creates a context with the given options and no services.
    pub fn new(options: AdaptorOptions) -> Self {
        Self {
            options,
            services: ServiceRegistry::new(),
        }
    }

    /// Registers a service, builder-style.
    pub fn with_service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }
}
