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

//! # Strata Core
//!
//! Foundational crate containing the types, traits and cross-thread primitives
//! that connect an event thread to a render thread: frame pacing, surface
//! replacement, request queueing, trigger events and the graphics context contract.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod graphics;
pub mod render;
pub mod request;
pub mod service_registry;
pub mod surface;
pub mod trigger;

pub use context::AdaptorContext;
pub use error::{ContextError, OptionsError, VSyncError};
