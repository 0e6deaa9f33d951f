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

//! A scene that animates for a burst of frames whenever its surface changes.

use strata_core::frame::FrameTimeStamp;
use strata_core::render::{FrameOutcome, FrameRenderer};
use strata_core::surface::NativeSurfaceHandle;

pub struct BurstRenderer {
    burst: u32,
    remaining: u32,
}

impl BurstRenderer {
    pub fn new(burst: u32) -> Self {
        Self {
            burst,
            remaining: burst,
        }
    }

    fn restart(&mut self) {
        self.remaining = self.burst;
    }
}

impl FrameRenderer for BurstRenderer {
    fn context_created(&mut self) {
        log::debug!("Scene resources uploaded.");
        self.restart();
    }

    fn context_destroyed(&mut self) {
        log::debug!("Scene resources released.");
    }

    fn surface_replaced(&mut self, surface: &NativeSurfaceHandle) {
        log::debug!("Scene now drawing into {}.", surface.id());
        self.restart();
    }

    fn surface_resized(&mut self, width: u32, height: u32) {
        log::debug!("Scene viewport is now {width}x{height}.");
        self.restart();
    }

    fn render_frame(&mut self, stamp: &FrameTimeStamp) -> FrameOutcome {
        log::trace!(
            "Drawing frame {:?} into buffer {:?}.",
            stamp.frame_number,
            stamp.buffer_index
        );
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            FrameOutcome::ANIMATING
        } else {
            FrameOutcome::SETTLED
        }
    }
}
