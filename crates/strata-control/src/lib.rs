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

//! The render thread and the event-thread controller that drives it.
//!
//! The [`RenderThreadController`] lives on the event thread. It owns the request
//! producer and the surface replacement bookkeeping, and starts a render thread that
//! owns the graphics context, paces frames with a
//! [`FrameClock`](strata_core::frame::FrameClock) and drains requests between frames.

#![warn(missing_docs)]

mod render_loop;
pub mod render_thread;
pub mod services;

pub use render_thread::{RenderThreadController, RenderThreadReport};
pub use services::{RenderIdleTrigger, SurfaceReplacedTrigger};
