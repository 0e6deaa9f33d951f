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

//! The contract for the native graphics context owned by the render thread.

use crate::error::ContextError;
use crate::surface::NativeSurfaceHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Framebuffer configuration requested when creating a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Bits per pixel of the color buffer (16, 24 or 32).
    pub color_depth: u8,
    /// Whether a depth buffer is required.
    pub depth_buffer: bool,
    /// Whether a stencil buffer is required.
    pub stencil_buffer: bool,
    /// MSAA sample count, 0 for none.
    pub msaa_samples: u8,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            color_depth: 32,
            depth_buffer: true,
            stencil_buffer: true,
            msaa_samples: 0,
        }
    }
}

impl fmt::Display for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}bpp, depth={}, stencil={}, msaa=x{}",
            self.color_depth, self.depth_buffer, self.stencil_buffer, self.msaa_samples
        )
    }
}

/// A created native graphics context.
///
/// The handle is neither `Clone` nor `Copy`. [`GraphicsContextLifecycle::destroy_context`]
/// consumes it, so a context is destroyed at most once by its owner.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// Wraps a backend-assigned identifier. Only backends should call this.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the backend-assigned identifier.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Creation, surface binding and destruction of a native graphics context.
///
/// Every method is called from the render thread only. The context is created before the
/// first frame and destroyed before the owning window is released.
pub trait GraphicsContextLifecycle: Send {
    /// Creates a context with the requested framebuffer configuration.
    ///
    /// Fails with [`ContextError::UnsupportedConfig`] if the combination is not available,
    /// or [`ContextError::DriverFailure`] for opaque native failures.
    fn create_context(&mut self, config: &ContextConfig) -> Result<ContextHandle, ContextError>;

    /// Binds `surface` as the context's draw target.
    ///
    /// Called once at start-up and again for every surface replacement.
    fn bind_surface(
        &mut self,
        context: &ContextHandle,
        surface: &NativeSurfaceHandle,
    ) -> Result<(), ContextError>;

    /// Releases the binding to the current surface, if any.
    fn release_surface(&mut self, context: &ContextHandle);

    /// Notifies the context that the bound surface changed size.
    fn resize_surface(
        &mut self,
        _context: &ContextHandle,
        _width: u32,
        _height: u32,
    ) -> Result<(), ContextError> {
        Ok(())
    }

    /// Presents the frame rendered into the bound surface.
    fn present(&mut self, context: &ContextHandle) -> Result<(), ContextError>;

    /// Returns `true` if the native context was lost and must be recreated.
    fn is_context_lost(&self, _context: &ContextHandle) -> bool {
        false
    }

    /// Releases every native resource of the context.
    ///
    /// # Panics
    ///
    /// Implementations panic if the context was already destroyed.
    fn destroy_context(&mut self, context: ContextHandle);
}
