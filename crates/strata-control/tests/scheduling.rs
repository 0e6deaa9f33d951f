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

//! Update scheduling, pause/resume, pacing and shutdown of the render thread.

mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strata_control::{RenderIdleTrigger, RenderThreadController};
use strata_core::frame::FrameClock;
use strata_core::trigger::{TriggerEventManager, TriggerOptions};
use strata_core::{AdaptorContext, ContextError};

const TIMEOUT: Duration = Duration::from_secs(5);
/// Long enough for a misbehaving thread to render a few more frames.
const SETTLE: Duration = Duration::from_millis(40);

type Controller = RenderThreadController<ScriptedGraphics, ScriptedRenderer>;

struct Harness {
    controller: Controller,
    log: EventLog,
    animating: Arc<std::sync::atomic::AtomicBool>,
    script: Arc<GraphicsScript>,
}

fn harness(context: &AdaptorContext, clock: FrameClock, animating: bool) -> Harness {
    let log = EventLog::default();
    let (graphics, script) = ScriptedGraphics::new(log.clone());
    let (renderer, animating) = ScriptedRenderer::new(log.clone(), animating);
    let controller =
        RenderThreadController::new(context, graphics, renderer, clock, Some(surface("main")));
    Harness {
        controller,
        log,
        animating,
        script,
    }
}

fn asleep_after(controller: &Controller, frames: u64) -> bool {
    wait_for(TIMEOUT, || {
        controller.frames_rendered() >= frames && controller.is_sleeping()
    })
}

#[test]
fn settled_scene_renders_once_then_sleeps() {
    init_logging();

    // ARRANGE
    let mut manager = TriggerEventManager::new();
    let idle = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&idle);
    let trigger = manager.create_trigger(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        TriggerOptions::KeepAlive,
    );
    let context = AdaptorContext::default().with_service(RenderIdleTrigger(trigger.handle()));
    let mut h = harness(&context, test_clock(), false);

    // ACT
    h.controller.start().unwrap();
    let woke = manager.run_until(|| idle.load(Ordering::SeqCst) > 0, TIMEOUT);

    // ASSERT
    assert!(woke, "idle trigger never ran");
    assert!(asleep_after(&h.controller, 1));
    thread::sleep(SETTLE);
    assert_eq!(h.controller.frames_rendered(), 1);
    assert_eq!(h.log.renders().len(), 1);
}

#[test]
fn request_update_wakes_a_sleeping_thread() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), false);
    h.controller.start().unwrap();
    assert!(asleep_after(&h.controller, 1));

    // ACT
    h.controller.request_update();

    // ASSERT
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 2));
    assert!(asleep_after(&h.controller, 2));
}

#[test]
fn update_requests_are_capped_at_two() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), false);
    h.controller.start().unwrap();
    assert!(asleep_after(&h.controller, 1));
    h.controller.pause();

    // ACT
    for _ in 0..5 {
        h.controller.request_update();
    }
    thread::sleep(SETTLE);
    let while_paused = h.controller.frames_rendered();
    h.controller.resume();

    // ASSERT
    assert_eq!(while_paused, 1);
    assert!(asleep_after(&h.controller, 3));
    thread::sleep(SETTLE);
    assert_eq!(h.controller.frames_rendered(), 3);
}

#[test]
fn request_update_once_renders_a_single_frame_while_paused() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 3));
    h.controller.pause();
    assert!(wait_for(TIMEOUT, || h.controller.is_sleeping()));
    let paused_at = h.controller.frames_rendered();

    // ACT
    h.controller.request_update_once();

    // ASSERT
    assert!(wait_for(TIMEOUT, || {
        h.controller.frames_rendered() == paused_at + 1 && h.controller.is_sleeping()
    }));
    thread::sleep(SETTLE);
    assert_eq!(h.controller.frames_rendered(), paused_at + 1);
}

#[test]
fn pause_stops_ticking_and_resume_restarts_it() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 3));

    // ACT
    h.controller.pause();
    assert!(wait_for(TIMEOUT, || h.controller.is_sleeping()));
    let paused_at = h.controller.frames_rendered();
    thread::sleep(SETTLE);
    let after_settle = h.controller.frames_rendered();
    h.controller.resume();

    // ASSERT
    assert_eq!(after_settle, paused_at);
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= paused_at + 3));

    let report = h.controller.stop().unwrap();
    assert_eq!(report.statistics.frames_rendered, h.log.renders().len() as u64);
}

#[test]
fn animation_ending_puts_the_thread_to_sleep() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 5));
    assert!(!h.controller.is_sleeping());

    // ACT
    h.animating.store(false, Ordering::SeqCst);

    // ASSERT
    assert!(wait_for(TIMEOUT, || h.controller.is_sleeping()));
    let asleep_at = h.controller.frames_rendered();
    thread::sleep(SETTLE);
    assert_eq!(h.controller.frames_rendered(), asleep_at);
}

#[test]
fn frame_stamps_are_monotonic() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.controller.start().unwrap();

    // ACT
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 10));
    h.controller.pause();
    assert!(wait_for(TIMEOUT, || h.controller.is_sleeping()));
    h.controller.resume();
    let resumed_at = h.controller.frames_rendered();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= resumed_at + 10));
    h.controller.stop();

    // ASSERT
    let stamps = h.log.renders();
    for pair in stamps.windows(2) {
        assert!(pair[1].monotonic_time_nanos >= pair[0].monotonic_time_nanos);
        let delta = pair[1].frames_since(&pair[0]).unwrap();
        assert!(delta >= 1, "frame number did not advance: {pair:?}");
    }
    assert!(stamps.iter().all(|stamp| stamp.buffer_index.is_some()));
}

#[test]
fn refresh_rate_change_slows_frames() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, FrameClock::software(Duration::from_millis(5)), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 3));

    // ACT
    h.controller.set_render_refresh_rate(4);
    let changed_at = h.log.renders().len() + 1;
    assert!(wait_for(TIMEOUT, || {
        h.log.renders().len() >= changed_at + 10
    }));
    h.controller.stop();

    // ASSERT
    let stamps = h.log.renders();
    let window = &stamps[changed_at..changed_at + 10];
    let span = window[9].nanos_since(&window[0]);
    let average = Duration::from_nanos(span / 9);
    assert!(
        average >= Duration::from_millis(15),
        "average interval {average:?} after slowing to every 4th refresh"
    );
}

#[test]
fn stop_unblocks_a_thread_waiting_for_a_tick() {
    init_logging();

    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, FrameClock::software(Duration::from_secs(60)), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h
        .log
        .position(&Event::ContextCreated)
        .is_some()));
    thread::sleep(Duration::from_millis(20));

    // ACT
    let started = Instant::now();
    let report = h.controller.stop().unwrap();

    // ASSERT
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.error.is_none());
    assert_eq!(report.statistics.frames_rendered, 0);
    assert!(!h.controller.is_running());
    assert!(h.controller.stop().is_none());
}

#[test]
fn shutdown_releases_in_order() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || h.controller.frames_rendered() >= 2));

    // ACT
    let report = h.controller.stop().unwrap();

    // ASSERT
    let events = h.log.snapshot();
    assert_eq!(
        &events[events.len() - 3..],
        &[Event::ContextDestroyed, Event::Release, Event::DestroyContext(1)]
    );
    let last = report.last_surface.unwrap();
    assert_eq!(last.strong_count(), 1);
}

#[test]
fn context_creation_failure_is_fatal() {
    // ARRANGE
    let context = AdaptorContext::default();
    let mut h = harness(&context, test_clock(), true);
    h.script.fail_create.store(true, Ordering::SeqCst);

    // ACT
    h.controller.start().unwrap();

    // ASSERT
    assert!(wait_for(TIMEOUT, || !h.controller.is_running()));
    assert!(matches!(
        h.controller.fatal_error(),
        Some(ContextError::UnsupportedConfig(_))
    ));
    let report = h.controller.stop().unwrap();
    assert!(report.last_surface.is_some());
    assert!(h.log.snapshot().is_empty());
}
