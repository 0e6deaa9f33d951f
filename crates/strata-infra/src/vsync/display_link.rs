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

//! Adapts callback-style platform vblank notifications to a [`VSyncProvider`].

use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use strata_core::frame::{VSyncProvider, VSyncSample, VSyncStream};
use strata_core::VSyncError;

/// Pending vblanks buffered for a render thread that is still busy.
const STREAM_CAPACITY: usize = 4;

/// The platform side of a [`DisplayLinkVSync`].
///
/// Hand it to the platform's vblank callback (display link, choreographer, DRM
/// event handler). Dropping it disconnects the stream, which the frame clock treats
/// as the hardware source going away. None of its methods block.
#[derive(Debug, Clone)]
pub struct VSyncNotifier {
    tx: Sender<Result<VSyncSample, VSyncError>>,
    /// A device error that did not fit in the stream yet.
    pending_error: Arc<Mutex<Option<VSyncError>>>,
}

impl VSyncNotifier {
    /// Reports a vblank.
    ///
    /// When the render thread is behind, the notification is dropped. The gap in
    /// `sequence` then shows up as a missed frame. Returns `false` once the render
    /// side is gone.
    pub fn notify(&self, sequence: u64, timestamp: Option<Instant>) -> bool {
        if !self.flush_error() {
            return false;
        }
        self.offer(Ok(VSyncSample {
            sequence,
            timestamp,
        }))
    }

    /// Reports a device error. The frame clock switches to software pacing when it reads it.
    ///
    /// If the stream is full, the error is kept and delivered ahead of the next
    /// vblank. Returns `false` once the render side is gone.
    pub fn report_error(&self, message: impl Into<String>) -> bool {
        let error = VSyncError::Device(message.into());
        match self.tx.try_send(Err(error)) {
            Ok(()) => true,
            Err(TrySendError::Full(Err(error))) => {
                log::debug!("VSync stream full; holding back '{error}'.");
                *self.lock_pending() = Some(error);
                true
            }
            Err(TrySendError::Full(Ok(_))) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn flush_error(&self) -> bool {
        let mut pending = self.lock_pending();
        let Some(error) = pending.take() else {
            return true;
        };
        match self.tx.try_send(Err(error)) {
            Ok(()) => true,
            Err(TrySendError::Full(Err(error))) => {
                *pending = Some(error);
                true
            }
            Err(TrySendError::Full(Ok(_))) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn offer(&self, message: Result<VSyncSample, VSyncError>) -> bool {
        match self.tx.try_send(message) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<VSyncError>> {
        self.pending_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A hardware vsync source fed by a [`VSyncNotifier`].
#[derive(Debug)]
pub struct DisplayLinkVSync {
    name: String,
    stream: Option<VSyncStream>,
}

impl DisplayLinkVSync {
    /// Creates the source and the notifier the platform callback will drive.
    pub fn new(name: impl Into<String>) -> (Self, VSyncNotifier) {
        let (tx, rx) = crossbeam_channel::bounded(STREAM_CAPACITY);
        (
            Self {
                name: name.into(),
                stream: Some(rx),
            },
            VSyncNotifier {
                tx,
                pending_error: Arc::new(Mutex::new(None)),
            },
        )
    }

    /// Creates a source driven by a background thread that emits a vblank every `interval`.
    ///
    /// Stands in for a display link on targets without one.
    pub fn spawn_simulated(interval: Duration) -> (Self, SimulatedDisplayLink) {
        let (source, notifier) = Self::new("simulated-display-link");
        (source, SimulatedDisplayLink::start(notifier, interval))
    }
}

impl VSyncProvider for DisplayLinkVSync {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Option<VSyncStream> {
        self.stream.take()
    }
}

/// A thread emitting vblanks at a fixed interval through a [`VSyncNotifier`].
#[derive(Debug)]
pub struct SimulatedDisplayLink {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SimulatedDisplayLink {
    fn start(notifier: VSyncNotifier, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            log::debug!("Simulated display link started ({interval:?}).");
            let mut sequence = 0u64;
            let mut next = Instant::now() + interval;

            while thread_running.load(Ordering::Relaxed) {
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                }
                next += interval;
                sequence += 1;
                if !notifier.notify(sequence, Some(Instant::now())) {
                    break;
                }
            }
            log::debug!("Simulated display link stopped.");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stops emitting vblanks and joins the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimulatedDisplayLink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_feeds_stream() {
        let (mut source, notifier) = DisplayLinkVSync::new("test");
        assert_eq!(source.name(), "test");

        let stream = source.open().unwrap();
        assert!(source.open().is_none());

        assert!(notifier.notify(1, None));
        let sample = stream.recv().unwrap().unwrap();
        assert_eq!(sample.sequence, 1);
    }

    #[test]
    fn test_full_stream_drops_notifications() {
        let (mut source, notifier) = DisplayLinkVSync::new("test");
        let stream = source.open().unwrap();

        for sequence in 1..=10 {
            assert!(notifier.notify(sequence, None));
        }
        assert_eq!(stream.len(), STREAM_CAPACITY);
    }

    #[test]
    fn test_notify_after_render_side_dropped() {
        let (mut source, notifier) = DisplayLinkVSync::new("test");
        drop(source.open());
        drop(source);
        assert!(!notifier.notify(1, None));
    }

    #[test]
    fn test_simulated_link_ticks_and_stops() {
        let (mut source, mut link) = DisplayLinkVSync::spawn_simulated(Duration::from_millis(2));
        let stream = source.open().unwrap();

        let first = stream.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        let second = stream.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert!(second.sequence > first.sequence);

        link.stop();
        while stream.try_recv().is_ok() {}
        assert!(stream.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_report_error_on_full_stream_does_not_block() {
        let (mut source, notifier) = DisplayLinkVSync::new("test");
        let stream = source.open().unwrap();
        for sequence in 1..=10 {
            notifier.notify(sequence, None);
        }

        let platform = notifier.clone();
        let reporter = thread::spawn(move || platform.report_error("device reset"));
        let started = Instant::now();
        while !reporter.is_finished() {
            assert!(
                started.elapsed() < Duration::from_millis(500),
                "report_error blocked on a full stream"
            );
            thread::sleep(Duration::from_millis(1));
        }
        assert!(reporter.join().unwrap());

        // The held-back error goes out ahead of the next vblank.
        while stream.try_recv().is_ok() {}
        assert!(notifier.notify(11, None));
        assert_eq!(
            stream.try_recv().unwrap(),
            Err(VSyncError::Device("device reset".to_string()))
        );
        assert_eq!(stream.try_recv().unwrap().unwrap().sequence, 11);
    }

    #[test]
    fn test_report_error_after_render_side_dropped() {
        let (source, notifier) = DisplayLinkVSync::new("test");
        drop(source);
        assert!(!notifier.report_error("gone"));
    }
}
