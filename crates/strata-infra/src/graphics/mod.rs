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

//! Graphics context backends, selected once at start-up.

mod headless;
mod native;

pub use self::headless::{HeadlessDisplay, HeadlessSurface};
pub use self::native::{NativeDisplay, Platform};

use anyhow::{bail, Result};
use strata_core::config::{AdaptorOptions, BackendKind};
use strata_core::graphics::{ContextConfig, ContextHandle, GraphicsContextLifecycle};
use strata_core::surface::NativeSurfaceHandle;
use strata_core::ContextError;

/// The closed set of graphics backends.
///
/// The render thread is generic over [`GraphicsContextLifecycle`], so dispatch
/// through this enum is a `match`, not a virtual call.
#[derive(Debug)]
pub enum GraphicsBackend {
    /// X11 through EGL.
    X11(NativeDisplay),
    /// Wayland through EGL.
    Wayland(NativeDisplay),
    /// Win32 through WGL.
    Win32(NativeDisplay),
    /// Android through EGL.
    Android(NativeDisplay),
    /// macOS through CGL.
    Macos(NativeDisplay),
    /// Offscreen, no window system.
    Headless(HeadlessDisplay),
}

macro_rules! dispatch {
    ($self:expr, $display:ident => $body:expr) => {
        match $self {
            GraphicsBackend::X11($display)
            | GraphicsBackend::Wayland($display)
            | GraphicsBackend::Win32($display)
            | GraphicsBackend::Android($display)
            | GraphicsBackend::Macos($display) => $body,
            GraphicsBackend::Headless($display) => $body,
        }
    };
}

impl GraphicsBackend {
    /// Opens the backend for a native platform.
    pub fn for_platform(platform: Platform) -> Self {
        let display = NativeDisplay::new(platform);
        match platform {
            Platform::X11 => GraphicsBackend::X11(display),
            Platform::Wayland => GraphicsBackend::Wayland(display),
            Platform::Win32 => GraphicsBackend::Win32(display),
            Platform::Android => GraphicsBackend::Android(display),
            Platform::Macos => GraphicsBackend::Macos(display),
        }
    }

    /// Opens a headless backend.
    pub fn headless() -> Self {
        GraphicsBackend::Headless(HeadlessDisplay::new())
    }

    /// Opens the backend selected by `options.backend`.
    ///
    /// `Auto` detects the window system of the running target and fails if there is none.
    pub fn from_options(options: &AdaptorOptions) -> Result<Self> {
        let platform = match options.backend {
            BackendKind::Headless => return Ok(Self::headless()),
            BackendKind::Auto => match Platform::detect() {
                Some(platform) => platform,
                None => bail!(
                    "No window system detected; set STRATA_BACKEND=headless to run offscreen"
                ),
            },
            BackendKind::X11 => Platform::X11,
            BackendKind::Wayland => Platform::Wayland,
            BackendKind::Win32 => Platform::Win32,
            BackendKind::Android => Platform::Android,
            BackendKind::Macos => Platform::Macos,
        };
        log::info!("Using the {platform} graphics backend.");
        Ok(Self::for_platform(platform))
    }

    /// The native platform, `None` for the headless backend.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            GraphicsBackend::Headless(_) => None,
            GraphicsBackend::X11(display)
            | GraphicsBackend::Wayland(display)
            | GraphicsBackend::Win32(display)
            | GraphicsBackend::Android(display)
            | GraphicsBackend::Macos(display) => Some(display.platform()),
        }
    }

    /// The surface currently bound to `context`.
    pub fn bound_surface(&self, context: &ContextHandle) -> Option<&NativeSurfaceHandle> {
        dispatch!(self, display => display.bound_surface(context))
    }

    /// Records a driver-reported context loss. No-op on the headless backend.
    pub fn mark_context_lost(&mut self, context: &ContextHandle) {
        if let Some(display) = self.native_mut() {
            display.mark_context_lost(context);
        }
    }

    fn native_mut(&mut self) -> Option<&mut NativeDisplay> {
        match self {
            GraphicsBackend::Headless(_) => None,
            GraphicsBackend::X11(display)
            | GraphicsBackend::Wayland(display)
            | GraphicsBackend::Win32(display)
            | GraphicsBackend::Android(display)
            | GraphicsBackend::Macos(display) => Some(display),
        }
    }
}

impl GraphicsContextLifecycle for GraphicsBackend {
    fn create_context(&mut self, config: &ContextConfig) -> Result<ContextHandle, ContextError> {
        dispatch!(self, display => display.create_context(config))
    }

    fn bind_surface(
        &mut self,
        context: &ContextHandle,
        surface: &NativeSurfaceHandle,
    ) -> Result<(), ContextError> {
        dispatch!(self, display => display.bind_surface(context, surface))
    }

    fn release_surface(&mut self, context: &ContextHandle) {
        dispatch!(self, display => display.release_surface(context))
    }

    fn resize_surface(
        &mut self,
        context: &ContextHandle,
        width: u32,
        height: u32,
    ) -> Result<(), ContextError> {
        match self.native_mut() {
            Some(display) => display.resize_surface(context, width, height),
            None => Ok(()),
        }
    }

    fn present(&mut self, context: &ContextHandle) -> Result<(), ContextError> {
        dispatch!(self, display => display.present(context))
    }

    fn is_context_lost(&self, context: &ContextHandle) -> bool {
        match self {
            GraphicsBackend::Headless(_) => false,
            GraphicsBackend::X11(display)
            | GraphicsBackend::Wayland(display)
            | GraphicsBackend::Win32(display)
            | GraphicsBackend::Android(display)
            | GraphicsBackend::Macos(display) => display.is_context_lost(context),
        }
    }

    fn destroy_context(&mut self, context: ContextHandle) {
        dispatch!(self, display => display.destroy_context(context))
    }
}
