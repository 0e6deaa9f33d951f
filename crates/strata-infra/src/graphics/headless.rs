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

use std::collections::HashMap;
use strata_core::graphics::{ContextConfig, ContextHandle};
use strata_core::surface::NativeSurfaceHandle;
use strata_core::ContextError;

/// An offscreen drawable for the headless backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessSurface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[derive(Debug, Default)]
struct HeadlessContext {
    surface: Option<NativeSurfaceHandle>,
    frames_presented: u64,
}

/// A backend with no window system, for servers, CI and tests.
///
/// Any surface handle can be bound. Sizes are taken from a [`HeadlessSurface`]
/// payload when there is one.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    contexts: HashMap<u64, HeadlessContext>,
    next_id: u64,
    total_presented: u64,
}

impl HeadlessDisplay {
    /// Creates an empty headless display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented across every context of this display.
    pub fn total_presented(&self) -> u64 {
        self.total_presented
    }

    /// The surface currently bound to `context`.
    pub fn bound_surface(&self, context: &ContextHandle) -> Option<&NativeSurfaceHandle> {
        self.contexts.get(&context.raw())?.surface.as_ref()
    }

    pub(crate) fn create_context(
        &mut self,
        config: &ContextConfig,
    ) -> Result<ContextHandle, ContextError> {
        if config.msaa_samples > 16 {
            return Err(ContextError::UnsupportedConfig(format!(
                "headless contexts support at most x16 MSAA, requested x{}",
                config.msaa_samples
            )));
        }
        self.next_id += 1;
        self.contexts.insert(self.next_id, HeadlessContext::default());
        log::info!("Headless graphics context {} created ({config}).", self.next_id);
        Ok(ContextHandle::from_raw(self.next_id))
    }

    pub(crate) fn bind_surface(
        &mut self,
        context: &ContextHandle,
        surface: &NativeSurfaceHandle,
    ) -> Result<(), ContextError> {
        let record = self.contexts.get_mut(&context.raw()).ok_or_else(|| {
            ContextError::DriverFailure(format!("unknown graphics context {}", context.raw()))
        })?;
        if let Some(size) = surface.downcast_ref::<HeadlessSurface>() {
            log::debug!(
                "Headless context {} bound to {} ({}x{}).",
                context.raw(),
                surface.id(),
                size.width,
                size.height
            );
        }
        record.surface = Some(surface.clone());
        Ok(())
    }

    pub(crate) fn release_surface(&mut self, context: &ContextHandle) {
        if let Some(record) = self.contexts.get_mut(&context.raw()) {
            record.surface = None;
        }
    }

    pub(crate) fn present(&mut self, context: &ContextHandle) -> Result<(), ContextError> {
        let record = self
            .contexts
            .get_mut(&context.raw())
            .ok_or(ContextError::ContextLost)?;
        if record.surface.is_none() {
            return Err(ContextError::SurfaceNotBound);
        }
        record.frames_presented += 1;
        self.total_presented += 1;
        Ok(())
    }

    pub(crate) fn destroy_context(&mut self, context: ContextHandle) {
        let record = self.contexts.remove(&context.raw());
        assert!(
            record.is_some(),
            "headless graphics context {} destroyed twice or never created",
            context.raw()
        );
        log::info!("Headless graphics context {} destroyed.", context.raw());
    }
}
