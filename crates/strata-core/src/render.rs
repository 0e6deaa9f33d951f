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

//! The interface to the scene renderer driven by the render thread.

use crate::frame::FrameTimeStamp;
use crate::surface::NativeSurfaceHandle;

/// What the renderer reports after producing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Something was drawn and should be presented.
    pub rendered: bool,
    /// The scene is still animating and wants another frame.
    pub keep_updating: bool,
}

impl FrameOutcome {
    /// A drawn frame that wants more frames.
    pub const ANIMATING: FrameOutcome = FrameOutcome {
        rendered: true,
        keep_updating: true,
    };

    /// A drawn frame after which the scene is idle.
    pub const SETTLED: FrameOutcome = FrameOutcome {
        rendered: true,
        keep_updating: false,
    };
}

/// The scene renderer the render thread drives, once per tick.
///
/// Implementations live outside this crate. The render thread calls them with the
/// graphics context current and never concurrently.
pub trait FrameRenderer: Send {
    /// The graphics context was created, or recreated after a loss.
    fn context_created(&mut self) {}

    /// The graphics context is about to be destroyed.
    fn context_destroyed(&mut self) {}

    /// A new surface has been bound.
    fn surface_replaced(&mut self, _surface: &NativeSurfaceHandle) {}

    /// The bound surface changed size.
    fn surface_resized(&mut self, _width: u32, _height: u32) {}

    /// Updates and renders one frame.
    fn render_frame(&mut self, stamp: &FrameTimeStamp) -> FrameOutcome;
}
