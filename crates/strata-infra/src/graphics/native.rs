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

//! Context bookkeeping shared by the window-system backends.
//!
//! A [`NativeDisplay`] validates configurations against its platform's
//! capabilities, accepts only surfaces of its own window-system kind, and tracks
//! which surface each context is bound to.

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::collections::HashMap;
use std::fmt;
use strata_core::graphics::{ContextConfig, ContextHandle};
use strata_core::surface::NativeSurfaceHandle;
use strata_core::ContextError;

/// A native window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// X11 (Xlib or XCB windows) through EGL.
    X11,
    /// Wayland through EGL.
    Wayland,
    /// Win32 through WGL.
    Win32,
    /// Android NDK windows through EGL.
    Android,
    /// macOS AppKit views through CGL.
    Macos,
}

impl Platform {
    /// The platform this binary targets, if it has a native window system.
    ///
    /// On Linux and the BSDs this checks `WAYLAND_DISPLAY` before `DISPLAY`.
    pub fn detect() -> Option<Platform> {
        if cfg!(target_os = "android") {
            Some(Platform::Android)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Win32)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Macos)
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Some(Platform::Wayland)
        } else if std::env::var_os("DISPLAY").is_some() {
            Some(Platform::X11)
        } else {
            None
        }
    }

    /// Highest MSAA sample count the platform's context API exposes.
    pub fn max_msaa_samples(self) -> u8 {
        match self {
            Platform::Win32 => 16,
            Platform::X11 | Platform::Wayland | Platform::Macos => 8,
            Platform::Android => 4,
        }
    }

    /// Whether a color buffer of `bits` per pixel can be created.
    pub fn supports_color_depth(self, bits: u8) -> bool {
        match self {
            Platform::Android => matches!(bits, 16 | 24 | 32),
            _ => matches!(bits, 24 | 32),
        }
    }

    /// Whether `raw` is a window of this platform's kind.
    pub fn accepts(self, raw: &RawWindowHandle) -> bool {
        matches!(
            (self, raw),
            (Platform::X11, RawWindowHandle::Xlib(_))
                | (Platform::X11, RawWindowHandle::Xcb(_))
                | (Platform::Wayland, RawWindowHandle::Wayland(_))
                | (Platform::Win32, RawWindowHandle::Win32(_))
                | (Platform::Android, RawWindowHandle::AndroidNdk(_))
                | (Platform::Macos, RawWindowHandle::AppKit(_))
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::X11 => "X11",
            Platform::Wayland => "Wayland",
            Platform::Win32 => "Win32",
            Platform::Android => "Android",
            Platform::Macos => "macOS",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct ContextRecord {
    config: ContextConfig,
    surface: Option<NativeSurfaceHandle>,
    lost: bool,
    size: Option<(u32, u32)>,
    frames_presented: u64,
}

/// A connection to one native display and the contexts created on it.
#[derive(Debug)]
pub struct NativeDisplay {
    platform: Platform,
    contexts: HashMap<u64, ContextRecord>,
    next_id: u64,
}

impl NativeDisplay {
    /// Opens the display connection for `platform`.
    pub fn new(platform: Platform) -> Self {
        log::debug!("{platform} display connection opened.");
        Self {
            platform,
            contexts: HashMap::new(),
            next_id: 1,
        }
    }

    /// The window system this display belongs to.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Number of live contexts.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// The surface currently bound to `context`.
    pub fn bound_surface(&self, context: &ContextHandle) -> Option<&NativeSurfaceHandle> {
        self.contexts.get(&context.raw())?.surface.as_ref()
    }

    /// The configuration `context` was created with.
    pub fn config(&self, context: &ContextHandle) -> Option<ContextConfig> {
        self.contexts.get(&context.raw()).map(|record| record.config)
    }

    /// The last size reported for the bound surface, if any.
    pub fn surface_size(&self, context: &ContextHandle) -> Option<(u32, u32)> {
        self.contexts.get(&context.raw())?.size
    }

    /// Frames presented on `context` so far.
    pub fn frames_presented(&self, context: &ContextHandle) -> u64 {
        self.contexts
            .get(&context.raw())
            .map_or(0, |record| record.frames_presented)
    }

    /// Records that the driver reported the context as lost.
    pub fn mark_context_lost(&mut self, context: &ContextHandle) {
        if let Some(record) = self.contexts.get_mut(&context.raw()) {
            log::warn!("{} context {} lost.", self.platform, context.raw());
            record.lost = true;
        }
    }

    pub(crate) fn create_context(
        &mut self,
        config: &ContextConfig,
    ) -> Result<ContextHandle, ContextError> {
        if !self.platform.supports_color_depth(config.color_depth) {
            return Err(ContextError::UnsupportedConfig(format!(
                "{} does not support {}bpp color buffers",
                self.platform, config.color_depth
            )));
        }
        if config.msaa_samples > self.platform.max_msaa_samples() {
            return Err(ContextError::UnsupportedConfig(format!(
                "{} supports at most x{} MSAA, requested x{}",
                self.platform,
                self.platform.max_msaa_samples(),
                config.msaa_samples
            )));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.contexts.insert(
            id,
            ContextRecord {
                config: *config,
                surface: None,
                lost: false,
                size: None,
                frames_presented: 0,
            },
        );
        log::info!("{} graphics context {id} created ({config}).", self.platform);
        Ok(ContextHandle::from_raw(id))
    }

    pub(crate) fn bind_surface(
        &mut self,
        context: &ContextHandle,
        surface: &NativeSurfaceHandle,
    ) -> Result<(), ContextError> {
        let platform = self.platform;
        let record = self.record_mut(context)?;
        if record.lost {
            return Err(ContextError::ContextLost);
        }

        let window = surface.as_window().ok_or_else(|| {
            ContextError::DriverFailure(format!(
                "{} is not a native window and cannot be bound on {platform}",
                surface.id()
            ))
        })?;
        let handle = window.window_handle().map_err(|err| {
            ContextError::DriverFailure(format!("window handle unavailable: {err}"))
        })?;
        if !platform.accepts(&handle.as_raw()) {
            return Err(ContextError::DriverFailure(format!(
                "{} is not a {platform} window",
                surface.id()
            )));
        }

        record.surface = Some(surface.clone());
        record.size = None;
        log::debug!("{platform} context {} bound to {}.", context.raw(), surface.id());
        Ok(())
    }

    pub(crate) fn release_surface(&mut self, context: &ContextHandle) {
        if let Some(record) = self.contexts.get_mut(&context.raw()) {
            if let Some(surface) = record.surface.take() {
                log::debug!(
                    "{} context {} released {}.",
                    self.platform,
                    context.raw(),
                    surface.id()
                );
            }
        }
    }

    pub(crate) fn resize_surface(
        &mut self,
        context: &ContextHandle,
        width: u32,
        height: u32,
    ) -> Result<(), ContextError> {
        let record = self.record_mut(context)?;
        if record.surface.is_none() {
            return Err(ContextError::SurfaceNotBound);
        }
        record.size = Some((width, height));
        Ok(())
    }

    pub(crate) fn present(&mut self, context: &ContextHandle) -> Result<(), ContextError> {
        let record = self.record_mut(context)?;
        if record.lost {
            return Err(ContextError::ContextLost);
        }
        if record.surface.is_none() {
            return Err(ContextError::SurfaceNotBound);
        }
        record.frames_presented += 1;
        Ok(())
    }

    pub(crate) fn is_context_lost(&self, context: &ContextHandle) -> bool {
        self.contexts
            .get(&context.raw())
            .is_some_and(|record| record.lost)
    }

    pub(crate) fn destroy_context(&mut self, context: ContextHandle) {
        let record = self.contexts.remove(&context.raw());
        assert!(
            record.is_some(),
            "{} graphics context {} destroyed twice or never created",
            self.platform,
            context.raw()
        );
        log::info!("{} graphics context {} destroyed.", self.platform, context.raw());
    }

    fn record_mut(&mut self, context: &ContextHandle) -> Result<&mut ContextRecord, ContextError> {
        self.contexts.get_mut(&context.raw()).ok_or_else(|| {
            ContextError::DriverFailure(format!("unknown graphics context {}", context.raw()))
        })
    }
}
