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

//! Periodic frames-per-second reporting.

use std::time::Duration;

/// Counts rendered frames and logs the average frame rate every tracking window.
///
/// A tracker built with a zero-second window is disabled and costs one branch per frame.
#[derive(Debug, Clone)]
pub struct FpsTracker {
    window: Duration,
    elapsed: Duration,
    frames: u32,
    last_fps: Option<f32>,
}

impl FpsTracker {
    /// Creates a tracker reporting every `tracking_seconds`. Zero disables it.
    pub fn new(tracking_seconds: u32) -> Self {
        Self {
            window: Duration::from_secs(u64::from(tracking_seconds)),
            elapsed: Duration::ZERO,
            frames: 0,
            last_fps: None,
        }
    }

    /// Returns `true` if the tracker reports anything.
    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Records one rendered frame that took `frame_delta` since the previous one.
    ///
    /// Returns the average frame rate when a tracking window closes.
    pub fn track(&mut self, frame_delta: Duration) -> Option<f32> {
        if !self.is_enabled() {
            return None;
        }

        self.elapsed += frame_delta;
        self.frames += 1;
        if self.elapsed < self.window {
            return None;
        }

        let fps = self.frames as f32 / self.elapsed.as_secs_f32();
        log::info!(
            "Frame rate: {fps:.1} FPS over the last {:.1}s ({} frames).",
            self.elapsed.as_secs_f32(),
            self.frames
        );
        self.last_fps = Some(fps);
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(fps)
    }

    /// The frame rate reported at the end of the last window.
    pub fn last_fps(&self) -> Option<f32> {
        self.last_fps
    }
}
