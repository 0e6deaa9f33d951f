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

/// One instant in the render timeline, produced once per tick by the
/// [`FrameClock`](super::FrameClock).
///
/// Unavailable values are represented by `None` rather than magic sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTimeStamp {
    /// Monotonically increasing frame counter, `None` if the source does not provide one.
    pub frame_number: Option<u64>,
    /// Nanoseconds since the clock's epoch, taken from a monotonic clock.
    pub monotonic_time_nanos: u64,
    /// The update/render buffer slot this frame maps to, `None` when buffering is not used.
    pub buffer_index: Option<usize>,
}

impl FrameTimeStamp {
    /// Creates a timestamp with a valid frame number and no buffer slot.
    pub fn new(frame_number: u64, monotonic_time_nanos: u64) -> Self {
        Self {
            frame_number: Some(frame_number),
            monotonic_time_nanos,
            buffer_index: None,
        }
    }

    /// Returns a copy of this timestamp tagged with a buffer slot.
    pub fn with_buffer_index(mut self, buffer_index: usize) -> Self {
        self.buffer_index = Some(buffer_index);
        self
    }

    /// Number of frames elapsed since `earlier`.
    ///
    /// Returns `None` if either frame number is unavailable or `earlier` is not
    /// actually earlier. A value greater than one means frames were missed.
    pub fn frames_since(&self, earlier: &FrameTimeStamp) -> Option<u64> {
        match (self.frame_number, earlier.frame_number) {
            (Some(now), Some(then)) if now >= then => Some(now - then),
            _ => None,
        }
    }

    /// Nanoseconds elapsed since `earlier`, saturating at zero.
    pub fn nanos_since(&self, earlier: &FrameTimeStamp) -> u64 {
        self.monotonic_time_nanos
            .saturating_sub(earlier.monotonic_time_nanos)
    }
}
