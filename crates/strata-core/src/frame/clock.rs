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

//! The render thread's pacing source.
//!
//! A [`FrameClock`] ticks on hardware vertical sync when the policy allows it and
//! the display provides it, and on a software deadline timer otherwise. Losing the
//! hardware signal mid-stream is never fatal: the clock keeps ticking in software.

use super::timestamp::FrameTimeStamp;
use super::vsync::{VSyncProvider, VSyncSample, VSyncStream};
use crate::error::VSyncError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Duration of one frame at 60Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Configuration for a [`FrameClock`].
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Use the hardware vsync signal when it is available.
    pub use_hardware_vsync: bool,
    /// The duration of one display refresh.
    pub frame_interval: Duration,
    /// Number of display refreshes per rendered frame.
    pub frames_per_render: u32,
    /// Number of update/render buffer slots, used to fill `buffer_index`.
    pub buffer_count: Option<usize>,
    /// When `false`, software pacing never sleeps and ticks as fast as it is polled.
    pub throttle: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            use_hardware_vsync: true,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frames_per_render: 1,
            buffer_count: Some(2),
            throttle: true,
        }
    }
}

/// Where the clock's ticks currently come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Ticks follow the hardware vblank stream.
    Hardware,
    /// Ticks follow a software deadline timer.
    Software,
}

struct TerminateSignal {
    terminated: AtomicBool,
    // Dropping the sender disconnects every receiver, which wakes all waiters.
    sender: Mutex<Option<Sender<()>>>,
}

/// A cloneable, thread-safe handle that terminates a [`FrameClock`].
#[derive(Clone)]
pub struct ClockTerminator {
    signal: Arc<TerminateSignal>,
}

impl ClockTerminator {
    /// Terminates the clock. Idempotent.
    ///
    /// Any thread blocked in [`FrameClock::wait_for_tick`] returns `None` promptly,
    /// and every later call returns `None` immediately.
    pub fn terminate(&self) {
        if self.signal.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.signal
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        log::debug!("Frame clock terminated.");
    }

    /// Returns `true` once [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.signal.terminated.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ClockTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockTerminator")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Produces one [`FrameTimeStamp`] per rendered frame.
///
/// The clock is owned and polled by the render thread. Other threads stop it through
/// a [`ClockTerminator`].
pub struct FrameClock {
    config: ClockConfig,
    provider: Option<Box<dyn VSyncProvider>>,
    hardware: Option<VSyncStream>,
    mode: PacingMode,
    initialized: bool,
    terminator: ClockTerminator,
    shutdown_rx: Receiver<()>,
    epoch: Instant,
    next_deadline: Option<Instant>,
    last_sequence: Option<u64>,
    frame_number: u64,
    last_time_nanos: u64,
    missed_frames: u64,
}

impl FrameClock {
    /// Creates a clock. `provider` is the platform's hardware vsync source, if any.
    pub fn new(config: ClockConfig, provider: Option<Box<dyn VSyncProvider>>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        Self {
            config,
            provider,
            hardware: None,
            mode: PacingMode::Software,
            initialized: false,
            terminator: ClockTerminator {
                signal: Arc::new(TerminateSignal {
                    terminated: AtomicBool::new(false),
                    sender: Mutex::new(Some(shutdown_tx)),
                }),
            },
            shutdown_rx,
            epoch: Instant::now(),
            next_deadline: None,
            last_sequence: None,
            frame_number: 0,
            last_time_nanos: 0,
            missed_frames: 0,
        }
    }

    /// Creates a software-paced clock with the given frame interval.
    pub fn software(frame_interval: Duration) -> Self {
        Self::new(
            ClockConfig {
                use_hardware_vsync: false,
                frame_interval,
                ..Default::default()
            },
            None,
        )
    }

    /// Selects the pacing source. Never blocks.
    ///
    /// Opens the hardware vsync stream if the policy allows it and the provider
    /// reports one; otherwise the clock is software-paced. Calling it again has no effect.
    pub fn initialize(&mut self) -> PacingMode {
        if self.initialized {
            return self.mode;
        }
        self.initialized = true;
        self.mode = PacingMode::Software;

        if !self.config.use_hardware_vsync {
            log::debug!("Hardware VSync disabled by policy; using software pacing.");
            return self.mode;
        }

        match self.provider.as_mut() {
            Some(provider) => {
                let name = provider.name().to_owned();
                match provider.open() {
                    Some(stream) => {
                        log::info!("Frame clock paced by hardware VSync ({name}).");
                        self.hardware = Some(stream);
                        self.mode = PacingMode::Hardware;
                    }
                    None => {
                        log::info!(
                            "Hardware VSync unavailable on '{name}'; using software pacing."
                        );
                    }
                }
            }
            None => log::debug!("No hardware VSync provider; using software pacing."),
        }
        self.mode
    }

    /// Blocks until the next tick.
    ///
    /// Returns `None` once the clock has been terminated, including when
    /// termination happens while this call is blocked.
    pub fn wait_for_tick(&mut self) -> Option<FrameTimeStamp> {
        if self.terminator.is_terminated() {
            return None;
        }
        if !self.initialized {
            self.initialize();
        }

        let (advance, vblank_time) = match self.hardware.clone() {
            Some(stream) => match self.wait_hardware(&stream) {
                Ok(Some(tick)) => tick,
                Ok(None) => return None,
                Err(err) => {
                    self.fall_back_to_software(&err);
                    (self.wait_software()?, None)
                }
            },
            None => (self.wait_software()?, None),
        };

        Some(self.stamp(advance, vblank_time))
    }

    /// Terminates the clock. See [`ClockTerminator::terminate`].
    pub fn terminate(&self) {
        self.terminator.terminate();
    }

    /// Returns `true` once the clock has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_terminated()
    }

    /// Returns a handle other threads can use to terminate this clock.
    pub fn terminator(&self) -> ClockTerminator {
        self.terminator.clone()
    }

    /// Returns the current pacing source.
    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Changes how many display refreshes make up one rendered frame. Values below 1 are clamped.
    pub fn set_frames_per_render(&mut self, frames_per_render: u32) {
        let frames_per_render = frames_per_render.max(1);
        if frames_per_render != self.config.frames_per_render {
            log::debug!("Frame clock now renders every {frames_per_render} refresh(es).");
            self.config.frames_per_render = frames_per_render;
        }
    }

    /// Returns the duration of one rendered frame.
    pub fn frame_duration(&self) -> Duration {
        self.config.frame_interval * self.config.frames_per_render.max(1)
    }

    /// Enables or disables software throttling.
    pub fn set_throttle(&mut self, throttle: bool) {
        self.config.throttle = throttle;
    }

    /// Total number of frames skipped so far, as reflected in frame-number deltas.
    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    /// Forgets the pacing history.
    ///
    /// Called after the render thread has been asleep or paused, so the idle time is
    /// not reported as missed frames.
    pub fn reset_pacing(&mut self) {
        self.next_deadline = None;
        self.last_sequence = None;

        let mut lost = None;
        if let Some(stream) = &self.hardware {
            while let Ok(pending) = stream.try_recv() {
                if let Err(err) = pending {
                    lost = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = lost {
            self.fall_back_to_software(&err);
        }
    }

    fn wait_hardware(
        &mut self,
        stream: &VSyncStream,
    ) -> Result<Option<(u64, Option<Instant>)>, VSyncError> {
        let needed = u64::from(self.config.frames_per_render.max(1));
        let mut refreshes = 0u64;

        loop {
            let message = crossbeam_channel::select! {
                recv(self.shutdown_rx) -> _ => return Ok(None),
                recv(stream) -> message => message,
            };
            let VSyncSample {
                sequence,
                timestamp,
            } = match message {
                Ok(Ok(sample)) => sample,
                Ok(Err(err)) => return Err(err),
                Err(_) => return Err(VSyncError::Disconnected),
            };

            let delta = match self.last_sequence {
                Some(previous) if sequence > previous => sequence - previous,
                _ => 1,
            };
            self.last_sequence = Some(sequence);
            refreshes += delta;

            if refreshes >= needed {
                return Ok(Some(((refreshes / needed).max(1), timestamp)));
            }
        }
    }

    fn wait_software(&mut self) -> Option<u64> {
        if !self.config.throttle {
            return match self.shutdown_rx.try_recv() {
                Err(crossbeam_channel::TryRecvError::Empty) => Some(1),
                _ => None,
            };
        }

        let frame = self.frame_duration();
        let now = Instant::now();
        let mut deadline = match self.next_deadline {
            Some(previous) => previous + frame,
            None => now + frame,
        };
        let mut dropped = 0u64;
        while now > deadline + frame {
            deadline += frame;
            dropped += 1;
        }
        if dropped > 0 {
            log::trace!("Frame clock catching up: {dropped} frame(s) dropped.");
        }
        self.next_deadline = Some(deadline);

        match self.shutdown_rx.recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) => Some(1 + dropped),
            Err(RecvTimeoutError::Disconnected) | Ok(()) => None,
        }
    }

    fn fall_back_to_software(&mut self, err: &VSyncError) {
        log::warn!("{err}; falling back to software frame pacing.");
        self.hardware = None;
        self.mode = PacingMode::Software;
        self.next_deadline = None;
        self.last_sequence = None;
    }

    fn stamp(&mut self, advance: u64, vblank_time: Option<Instant>) -> FrameTimeStamp {
        let advance = advance.max(1);
        self.frame_number += advance;
        self.missed_frames += advance - 1;

        let at = vblank_time.unwrap_or_else(Instant::now);
        let nanos = u64::try_from(at.saturating_duration_since(self.epoch).as_nanos())
            .unwrap_or(u64::MAX);
        self.last_time_nanos = self.last_time_nanos.max(nanos);

        let stamp = FrameTimeStamp::new(self.frame_number, self.last_time_nanos);
        match self.config.buffer_count {
            Some(count) if count > 0 => {
                stamp.with_buffer_index((self.frame_number % count as u64) as usize)
            }
            _ => stamp,
        }
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("mode", &self.mode)
            .field("frame_number", &self.frame_number)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
