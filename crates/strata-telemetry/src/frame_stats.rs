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

//! Aggregate statistics over the frames produced by the render thread.

use serde::Serialize;
use strata_core::frame::FrameTimeStamp;

/// A snapshot of [`FrameStatistics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSummary {
    /// Frames rendered.
    pub frames_rendered: u64,
    /// Frames skipped, as seen in frame-number deltas greater than one.
    pub missed_frames: u64,
    /// Shortest interval between two rendered frames, in milliseconds.
    pub min_interval_ms: Option<f64>,
    /// Mean interval between two rendered frames, in milliseconds.
    pub avg_interval_ms: Option<f64>,
    /// Longest interval between two rendered frames, in milliseconds.
    pub max_interval_ms: Option<f64>,
}

/// Accumulates frame counts and inter-frame intervals.
///
/// Only consecutive stamps are compared; no frame history is kept.
#[derive(Debug, Default, Clone)]
pub struct FrameStatistics {
    previous: Option<FrameTimeStamp>,
    frames_rendered: u64,
    missed_frames: u64,
    intervals: u64,
    total_nanos: u128,
    min_nanos: Option<u64>,
    max_nanos: Option<u64>,
}

impl FrameStatistics {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rendered frame.
    pub fn record(&mut self, stamp: &FrameTimeStamp) {
        self.frames_rendered += 1;

        if let Some(previous) = self.previous.replace(*stamp) {
            if let Some(delta) = stamp.frames_since(&previous) {
                self.missed_frames += delta.saturating_sub(1);
            }
            let nanos = stamp.nanos_since(&previous);
            self.intervals += 1;
            self.total_nanos += u128::from(nanos);
            self.min_nanos = Some(self.min_nanos.map_or(nanos, |min| min.min(nanos)));
            self.max_nanos = Some(self.max_nanos.map_or(nanos, |max| max.max(nanos)));
        }
    }

    /// Forgets the previous stamp so an idle period is not counted as an interval.
    pub fn break_sequence(&mut self) {
        self.previous = None;
    }

    /// Frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Frames missed so far.
    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    /// Returns the current totals.
    pub fn summary(&self) -> FrameSummary {
        let to_ms = |nanos: u64| nanos as f64 / 1_000_000.0;
        FrameSummary {
            frames_rendered: self.frames_rendered,
            missed_frames: self.missed_frames,
            min_interval_ms: self.min_nanos.map(to_ms),
            avg_interval_ms: (self.intervals > 0)
                .then(|| self.total_nanos as f64 / self.intervals as f64 / 1_000_000.0),
            max_interval_ms: self.max_nanos.map(to_ms),
        }
    }

    /// Logs the current totals at `info`.
    pub fn log_summary(&self) {
        let summary = self.summary();
        log::info!(
            "Frames rendered: {}, missed: {}, interval min/avg/max: {}/{}/{} ms.",
            summary.frames_rendered,
            summary.missed_frames,
            format_ms(summary.min_interval_ms),
            format_ms(summary.avg_interval_ms),
            format_ms(summary.max_interval_ms)
        );
    }
}

fn format_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |ms| format!("{ms:.2}"))
}
