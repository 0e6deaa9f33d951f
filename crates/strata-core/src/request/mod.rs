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

//! Requests carried from the event thread to the render thread.

mod queue;

pub use self::queue::{RenderRequestConsumer, RenderRequestProducer, RenderRequestQueue};

use crate::surface::ReplaceSurfaceRequest;

/// A cross-thread request, actioned by the render thread at the next frame boundary.
#[derive(Debug)]
pub enum RenderRequest {
    /// Bind a new native surface in place of the current one.
    ReplaceSurface(ReplaceSurfaceRequest),
    /// The current surface changed size.
    ResizeSurface {
        /// New width in physical pixels.
        width: u32,
        /// New height in physical pixels.
        height: u32,
    },
}

impl RenderRequest {
    /// A short name for log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RenderRequest::ReplaceSurface(_) => "ReplaceSurface",
            RenderRequest::ResizeSurface { .. } => "ResizeSurface",
        }
    }
}
