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

//! Defines the error types shared by the render-thread subsystems.

use thiserror::Error;

/// An error raised while creating, binding or presenting a native graphics context.
///
/// Context errors are not retried by the render thread: they are surfaced to the
/// hosting application, which decides whether to shut down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The requested color depth / MSAA / depth / stencil combination is not available.
    #[error("Unsupported context configuration: {0}")]
    UnsupportedConfig(String),
    /// An opaque failure reported by the native graphics API.
    #[error("Graphics driver failure: {0}")]
    DriverFailure(String),
    /// An operation needed a bound surface but none was bound to the context.
    #[error("No surface is bound to the graphics context")]
    SurfaceNotBound,
    /// The native context was lost and must be recreated.
    #[error("The graphics context was lost")]
    ContextLost,
}

/// An error reported by a hardware vertical-sync source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VSyncError {
    /// The platform side of the vsync stream went away.
    #[error("Hardware VSync source disconnected")]
    Disconnected,
    /// The device reported an error while waiting for the next vblank.
    #[error("Hardware VSync device error: {0}")]
    Device(String),
}

/// An error raised while loading [`AdaptorOptions`](crate::config::AdaptorOptions).
#[derive(Debug, Error)]
pub enum OptionsError {
    /// A value could not be parsed for the given key.
    #[error("Invalid value '{value}' for option '{key}'")]
    InvalidValue {
        /// The option key (environment variable or JSON field).
        key: String,
        /// The raw value that failed to parse.
        value: String,
    },
    /// The options file could not be read.
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    /// The options file is not valid JSON for the options schema.
    #[error("Failed to parse options file: {0}")]
    Json(#[from] serde_json::Error),
}
