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

//! The contract between the [`FrameClock`](super::FrameClock) and a hardware
//! vertical-sync source.

use crate::error::VSyncError;
use crossbeam_channel::Receiver;
use std::time::Instant;

/// A single vblank notification from the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VSyncSample {
    /// The display's vblank sequence counter.
    pub sequence: u64,
    /// When the vblank happened, if the platform reports it.
    /// The clock uses its own receive time otherwise.
    pub timestamp: Option<Instant>,
}

/// The stream of vblank notifications delivered to the render thread.
///
/// A received `Err` or a disconnected channel means the hardware source is gone.
pub type VSyncStream = Receiver<Result<VSyncSample, VSyncError>>;

/// A source of hardware vertical-sync notifications.
///
/// Implementations are platform adapters (display links, DRM vblank waits,
/// choreographer callbacks). Opening must never block.
pub trait VSyncProvider: Send {
    /// A short name used in log output.
    fn name(&self) -> &str;

    /// Opens the vblank stream.
    ///
    /// Returns `None` when the hardware signal is not available on this display.
    fn open(&mut self) -> Option<VSyncStream>;
}
