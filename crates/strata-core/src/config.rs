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

//! Adaptor-wide options, loaded from JSON and overridden by `STRATA_*` environment variables.

use crate::error::OptionsError;
use crate::frame::{ClockConfig, DEFAULT_FRAME_INTERVAL};
use crate::graphics::ContextConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Which native graphics backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick the platform the binary was built for.
    #[default]
    Auto,
    /// X11 through EGL.
    X11,
    /// Wayland through EGL.
    Wayland,
    /// Win32 through WGL.
    Win32,
    /// Android through EGL.
    Android,
    /// macOS through CGL.
    Macos,
    /// No native window system.
    Headless,
}

impl FromStr for BackendKind {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "x11" => Ok(Self::X11),
            "wayland" => Ok(Self::Wayland),
            "win32" | "windows" => Ok(Self::Win32),
            "android" => Ok(Self::Android),
            "macos" => Ok(Self::Macos),
            "headless" => Ok(Self::Headless),
            _ => Err(OptionsError::InvalidValue {
                key: "backend".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Options controlling the render thread and the graphics context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptorOptions {
    /// Number of display refreshes per rendered frame.
    pub render_refresh_rate: u32,
    /// Interval in seconds between FPS log lines, 0 to disable.
    pub fps_tracking_seconds: u32,
    /// Render-to-framebuffer interval. Non-zero disables frame pacing.
    pub render_to_fbo_interval: u32,
    /// Pace frames on the hardware vsync signal when available.
    pub use_hardware_vsync: bool,
    /// MSAA sample count.
    pub multi_sampling_level: u8,
    /// Request a depth buffer.
    pub depth_buffer: bool,
    /// Request a stencil buffer.
    pub stencil_buffer: bool,
    /// Bits per pixel of the color buffer.
    pub color_depth: u8,
    /// Number of update/render buffer slots.
    pub buffer_count: usize,
    /// The graphics backend.
    pub backend: BackendKind,
}

impl Default for AdaptorOptions {
    fn default() -> Self {
        Self {
            render_refresh_rate: 1,
            fps_tracking_seconds: 0,
            render_to_fbo_interval: 0,
            use_hardware_vsync: true,
            multi_sampling_level: 0,
            depth_buffer: true,
            stencil_buffer: true,
            color_depth: 32,
            buffer_count: 2,
            backend: BackendKind::Auto,
        }
    }
}

impl AdaptorOptions {
    /// Environment variable for [`render_refresh_rate`](Self::render_refresh_rate).
    pub const ENV_REFRESH_RATE: &'static str = "STRATA_REFRESH_RATE";
    /// Environment variable for [`fps_tracking_seconds`](Self::fps_tracking_seconds).
    pub const ENV_FPS_TRACKING: &'static str = "STRATA_FPS_TRACKING";
    /// Environment variable for [`render_to_fbo_interval`](Self::render_to_fbo_interval).
    pub const ENV_RENDER_TO_FBO: &'static str = "STRATA_RENDER_TO_FBO";
    /// Environment variable for [`use_hardware_vsync`](Self::use_hardware_vsync).
    pub const ENV_HARDWARE_VSYNC: &'static str = "STRATA_HARDWARE_VSYNC";
    /// Environment variable for [`multi_sampling_level`](Self::multi_sampling_level).
    pub const ENV_MULTI_SAMPLING_LEVEL: &'static str = "STRATA_MULTI_SAMPLING_LEVEL";
    /// Non-zero disables both the depth and the stencil buffer.
    pub const ENV_DISABLE_DEPTH_BUFFER: &'static str = "STRATA_DISABLE_DEPTH_BUFFER";
    /// Non-zero disables the stencil buffer.
    pub const ENV_DISABLE_STENCIL_BUFFER: &'static str = "STRATA_DISABLE_STENCIL_BUFFER";
    /// Environment variable for [`color_depth`](Self::color_depth).
    pub const ENV_COLOR_DEPTH: &'static str = "STRATA_COLOR_DEPTH";
    /// Environment variable for [`buffer_count`](Self::buffer_count).
    pub const ENV_BUFFER_COUNT: &'static str = "STRATA_BUFFER_COUNT";
    /// Environment variable for [`backend`](Self::backend).
    pub const ENV_BACKEND: &'static str = "STRATA_BACKEND";

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        options.apply_overrides(|key| std::env::var(key).ok());
        options
    }

    /// Parses options from a JSON string. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Applies overrides from `lookup`, typically the process environment.
    ///
    /// A malformed value leaves the field unchanged. It is logged and returned.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<OptionsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        if let Some(rate) = parse::<u32>(&lookup, Self::ENV_REFRESH_RATE, &mut errors) {
            if rate >= 1 {
                self.render_refresh_rate = rate;
            }
        }
        if let Some(seconds) = parse(&lookup, Self::ENV_FPS_TRACKING, &mut errors) {
            self.fps_tracking_seconds = seconds;
        }
        if let Some(interval) = parse(&lookup, Self::ENV_RENDER_TO_FBO, &mut errors) {
            self.render_to_fbo_interval = interval;
        }
        if let Some(enabled) = parse_flag(&lookup, Self::ENV_HARDWARE_VSYNC, &mut errors) {
            self.use_hardware_vsync = enabled;
        }
        if let Some(level) = parse(&lookup, Self::ENV_MULTI_SAMPLING_LEVEL, &mut errors) {
            self.multi_sampling_level = level;
        }
        if let Some(true) = parse_flag(&lookup, Self::ENV_DISABLE_DEPTH_BUFFER, &mut errors) {
            self.depth_buffer = false;
            self.stencil_buffer = false;
        }
        if let Some(true) = parse_flag(&lookup, Self::ENV_DISABLE_STENCIL_BUFFER, &mut errors) {
            self.stencil_buffer = false;
        }
        if let Some(depth) = parse(&lookup, Self::ENV_COLOR_DEPTH, &mut errors) {
            self.color_depth = depth;
        }
        if let Some(count) = parse(&lookup, Self::ENV_BUFFER_COUNT, &mut errors) {
            self.buffer_count = count;
        }
        if let Some(backend) = parse(&lookup, Self::ENV_BACKEND, &mut errors) {
            self.backend = backend;
        }

        for error in &errors {
            log::warn!("{error}; keeping the previous value.");
        }
        errors
    }

    /// The framebuffer configuration passed to
    /// [`create_context`](crate::graphics::GraphicsContextLifecycle::create_context).
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            color_depth: self.color_depth,
            depth_buffer: self.depth_buffer,
            stencil_buffer: self.stencil_buffer,
            msaa_samples: self.multi_sampling_level,
        }
    }

    /// The pacing configuration for the [`FrameClock`](crate::frame::FrameClock).
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            use_hardware_vsync: self.use_hardware_vsync,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frames_per_render: self.render_refresh_rate.max(1),
            buffer_count: (self.buffer_count > 0).then_some(self.buffer_count),
            throttle: self.render_to_fbo_interval == 0,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    errors: &mut Vec<OptionsError>,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(OptionsError::InvalidValue {
                key: key.to_string(),
                value: raw,
            });
            None
        }
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    errors: &mut Vec<OptionsError>,
) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            errors.push(OptionsError::InvalidValue {
                key: key.to_string(),
                value: raw,
            });
            None
        }
    }
}
