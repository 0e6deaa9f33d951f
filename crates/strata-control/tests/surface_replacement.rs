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

//! Surface replacement driven through a running render thread.

mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_control::{RenderThreadController, SurfaceReplacedTrigger};
use strata_core::surface::ReplacementState;
use strata_core::trigger::{TriggerEventManager, TriggerOptions};
use strata_core::{AdaptorContext, ContextError};

const TIMEOUT: Duration = Duration::from_secs(5);

type Controller = RenderThreadController<ScriptedGraphics, ScriptedRenderer>;

fn running_controller(
    context: &AdaptorContext,
    log: &EventLog,
    initial: &strata_core::surface::NativeSurfaceHandle,
) -> (Controller, Arc<GraphicsScript>) {
    let (graphics, script) = ScriptedGraphics::new(log.clone());
    let (renderer, _) = ScriptedRenderer::new(log.clone(), true);
    let mut controller = RenderThreadController::new(
        context,
        graphics,
        renderer,
        test_clock(),
        Some(initial.clone()),
    );
    controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || controller.frames_rendered() >= 2));
    (controller, script)
}

#[test]
fn replacement_completes_and_wakes_the_event_thread() {
    init_logging();

    // ARRANGE
    let mut manager = TriggerEventManager::new();
    let replaced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&replaced);
    let trigger = manager.create_trigger(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        TriggerOptions::KeepAlive,
    );
    let context = AdaptorContext::default().with_service(SurfaceReplacedTrigger(trigger.handle()));
    let log = EventLog::default();
    let h1 = surface("h1");
    let h2 = surface("h2");
    let (mut controller, _script) = running_controller(&context, &log, &h1);

    // ACT
    let ticket = controller.replace_surface(h2.clone());
    let woke = manager.run_until(|| replaced.load(Ordering::SeqCst) > 0, TIMEOUT);

    // ASSERT
    assert!(woke, "completion trigger never ran on the event thread");
    assert!(ticket.is_completed());
    assert_eq!(controller.replacement_state(), ReplacementState::Completed);

    let outcomes = controller.take_completed_replacements();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[0].previous_surface.as_ref(), Some(&h1));
    assert_eq!(controller.replacement_state(), ReplacementState::Idle);

    let bind = log.position(&Event::Bind(h2.id())).unwrap();
    assert_eq!(log.snapshot()[bind - 1], Event::Release);
    assert!(log.position(&Event::SurfaceReplaced(h2.id())).unwrap() > bind);

    // The old surface is referenced by nobody but the event thread.
    drop(outcomes);
    assert_eq!(h1.strong_count(), 1);

    let report = controller.stop().unwrap();
    assert_eq!(report.last_surface.as_ref(), Some(&h2));
    assert!(report.error.is_none());
}

#[test]
fn failed_bind_still_completes_and_fires_the_trigger() {
    init_logging();

    // ARRANGE
    let mut manager = TriggerEventManager::new();
    let replaced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&replaced);
    let trigger = manager.create_trigger(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        TriggerOptions::KeepAlive,
    );
    let context = AdaptorContext::default().with_service(SurfaceReplacedTrigger(trigger.handle()));
    let log = EventLog::default();
    let h1 = surface("h1");
    let h2 = surface("h2");
    let (mut controller, script) = running_controller(&context, &log, &h1);
    script.failing_surfaces.lock().unwrap().insert(h2.id());

    // ACT
    let ticket = controller.replace_surface(h2.clone());
    let woke = manager.run_until(|| replaced.load(Ordering::SeqCst) > 0, TIMEOUT);

    // ASSERT
    assert!(woke);
    let outcome = ticket.wait_timeout(TIMEOUT).unwrap();
    assert!(matches!(outcome.error, Some(ContextError::DriverFailure(_))));
    assert_eq!(outcome.previous_surface.as_ref(), Some(&h1));

    // A failed bind is fatal for the render thread.
    assert!(wait_for(TIMEOUT, || !controller.is_running()));
    assert!(matches!(
        controller.fatal_error(),
        Some(ContextError::DriverFailure(_))
    ));

    // Later requests complete at once instead of hanging.
    let late = controller.replace_surface(surface("h3"));
    let late_outcome = late.wait_timeout(TIMEOUT).unwrap();
    assert!(matches!(
        late_outcome.error,
        Some(ContextError::DriverFailure(_))
    ));

    let report = controller.stop().unwrap();
    assert!(report.last_surface.is_none());
    assert!(matches!(report.error, Some(ContextError::DriverFailure(_))));
    assert!(log.position(&Event::DestroyContext(1)).is_some());
}

#[test]
fn replacements_are_applied_in_push_order_before_the_next_frame() {
    init_logging();

    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let initial = surface("initial");
    let (mut controller, _script) = running_controller(&context, &log, &initial);
    let surfaces: Vec<_> = (0..5).map(|_| surface("next")).collect();

    // ACT
    let mut pushed_at = Vec::new();
    let mut tickets = Vec::new();
    for next in &surfaces {
        pushed_at.push(log.len());
        tickets.push(controller.replace_surface(next.clone()));
        let frames = controller.frames_rendered();
        assert!(wait_for(TIMEOUT, || controller.frames_rendered() >= frames + 2));
    }
    for ticket in &tickets {
        assert!(ticket.wait_timeout(TIMEOUT).unwrap().is_ok());
    }

    // ASSERT
    let events = log.snapshot();
    let mut previous_bind = 0;
    for (next, pushed) in surfaces.iter().zip(pushed_at) {
        let bind = events
            .iter()
            .position(|event| *event == Event::Bind(next.id()))
            .unwrap();
        assert!(bind > previous_bind, "binds out of push order");
        previous_bind = bind;

        // At most the frame already past its drain point renders before the bind.
        let frames_in_between = events[pushed..bind]
            .iter()
            .filter(|event| matches!(event, Event::Render(_)))
            .count();
        assert!(frames_in_between <= 1, "{frames_in_between} frames before the bind");
    }

    controller.stop();
}

#[test]
fn completion_is_never_observed_to_revert() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (mut controller, _script) = running_controller(&context, &log, &surface("h1"));
    let ticket = controller.replace_surface(surface("h2"));

    // ACT
    assert!(wait_for(TIMEOUT, || ticket.is_completed()));
    let mut observations = Vec::new();
    for _ in 0..50 {
        observations.push(ticket.is_completed());
        controller.request_update();
    }

    // ASSERT
    assert!(observations.iter().all(|completed| *completed));
    assert!(ticket.outcome().is_some());
    controller.stop();
}

#[test]
fn second_request_queues_behind_the_first() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let h1 = surface("h1");
    let h2 = surface("h2");
    let h3 = surface("h3");
    let (mut controller, _script) = running_controller(&context, &log, &h1);
    controller.pause();
    assert!(wait_for(TIMEOUT, || controller.is_sleeping()));

    // ACT
    let first = controller.replace_surface(h2.clone());
    let second = controller.replace_surface(h3.clone());
    let first_outcome = controller.wait_until_surface_replaced().unwrap();
    let second_outcome = controller.wait_until_surface_replaced().unwrap();

    // ASSERT
    assert!(first.is_completed() && second.is_completed());
    assert_eq!(first_outcome.previous_surface.as_ref(), Some(&h1));
    assert_eq!(second_outcome.previous_surface.as_ref(), Some(&h2));
    assert!(log.position(&Event::Bind(h2.id())) < log.position(&Event::Bind(h3.id())));
    assert!(controller.wait_until_surface_replaced().is_none());

    let report = controller.stop().unwrap();
    assert_eq!(report.last_surface.as_ref(), Some(&h3));
}

#[test]
fn replacing_with_the_bound_surface_is_a_no_op() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let h1 = surface("h1");
    let (mut controller, _script) = running_controller(&context, &log, &h1);

    // ACT
    let ticket = controller.replace_surface(h1.clone());
    let outcome = ticket.wait_timeout(TIMEOUT).unwrap();

    // ASSERT
    assert!(outcome.is_ok());
    assert!(outcome.previous_surface.is_none());
    assert_eq!(log.position(&Event::Release), None);
    assert!(controller.is_running());
    controller.stop();
}

#[test]
fn lost_context_is_recreated_before_binding() {
    init_logging();

    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let h2 = surface("h2");
    let (mut controller, script) = running_controller(&context, &log, &surface("h1"));
    script
        .context_lost
        .store(true, std::sync::atomic::Ordering::SeqCst);

    // ACT
    let outcome = controller
        .replace_surface(h2.clone())
        .wait_timeout(TIMEOUT)
        .unwrap();

    // ASSERT
    assert!(outcome.is_ok());
    let destroyed = log.position(&Event::DestroyContext(1)).unwrap();
    let created = log.position(&Event::CreateContext(2)).unwrap();
    let bind = log.position(&Event::Bind(h2.id())).unwrap();
    let events = log.snapshot();
    assert_eq!(events[destroyed - 1], Event::ContextDestroyed);
    assert_eq!(events[created + 1], Event::ContextCreated);
    assert!(destroyed < created && created < bind);

    controller.stop();
    assert!(log.position(&Event::DestroyContext(2)).is_some());
}

#[test]
fn resize_reaches_context_and_renderer_at_a_frame_boundary() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (controller, _script) = running_controller(&context, &log, &surface("h1"));

    // ACT
    controller.resize_surface(640, 480);

    // ASSERT
    assert!(wait_for(TIMEOUT, || {
        log.position(&Event::SurfaceResized(640, 480)).is_some()
    }));
    let resize = log.position(&Event::Resize(640, 480)).unwrap();
    assert_eq!(
        log.snapshot()[resize + 1],
        Event::SurfaceResized(640, 480)
    );
}

#[test]
fn requests_queued_before_start_are_processed_first() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (graphics, _script) = ScriptedGraphics::new(log.clone());
    let (renderer, _) = ScriptedRenderer::new(log.clone(), true);
    let h1 = surface("h1");
    let h2 = surface("h2");
    let mut controller =
        RenderThreadController::new(&context, graphics, renderer, test_clock(), Some(h1.clone()));
    let ticket = controller.replace_surface(h2.clone());

    // ACT
    controller.start().unwrap();
    let outcome = ticket.wait_timeout(TIMEOUT).unwrap();

    // ASSERT
    assert!(outcome.is_ok());
    let bind = log.position(&Event::Bind(h2.id())).unwrap();
    let first_render = log
        .snapshot()
        .iter()
        .position(|event| matches!(event, Event::Render(_)))
        .unwrap();
    assert!(bind < first_render);
    controller.stop();
}

#[test]
fn stopping_before_start_fails_queued_replacements() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (graphics, _script) = ScriptedGraphics::new(log.clone());
    let (renderer, _) = ScriptedRenderer::new(log.clone(), true);
    let h1 = surface("h1");
    let mut controller =
        RenderThreadController::new(&context, graphics, renderer, test_clock(), Some(h1.clone()));
    let ticket = controller.replace_surface(surface("h2"));

    // ACT
    let report = controller.stop().unwrap();

    // ASSERT
    assert_eq!(report.last_surface.as_ref(), Some(&h1));
    assert_eq!(report.statistics.frames_rendered, 0);
    let outcome = ticket.wait_timeout(TIMEOUT).unwrap();
    assert_eq!(outcome.error, Some(ContextError::ContextLost));
    assert!(log.snapshot().is_empty());
}

#[test]
fn failed_initial_bind_still_destroys_the_context() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (graphics, script) = ScriptedGraphics::new(log.clone());
    let (renderer, _) = ScriptedRenderer::new(log.clone(), true);
    let h1 = surface("h1");
    script.failing_surfaces.lock().unwrap().insert(h1.id());
    let mut controller =
        RenderThreadController::new(&context, graphics, renderer, test_clock(), Some(h1.clone()));

    // ACT
    controller.start().unwrap();
    assert!(wait_for(TIMEOUT, || !controller.is_running()));
    let report = controller.stop().unwrap();

    // ASSERT
    assert!(matches!(report.error, Some(ContextError::DriverFailure(_))));
    assert_eq!(report.statistics.frames_rendered, 0);
    assert_eq!(
        log.snapshot(),
        vec![
            Event::CreateContext(1),
            Event::ContextCreated,
            Event::ContextDestroyed,
            Event::Release,
            Event::DestroyContext(1),
        ]
    );
}

#[test]
fn replacement_while_paused_draws_one_frame_into_the_new_surface() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let h1 = surface("h1");
    let h2 = surface("h2");
    let (mut controller, _script) = running_controller(&context, &log, &h1);
    controller.pause();
    assert!(wait_for(TIMEOUT, || controller.is_sleeping()));
    let paused_at = controller.frames_rendered();

    // ACT
    let outcome = controller
        .replace_surface(h2.clone())
        .wait_timeout(TIMEOUT)
        .unwrap();
    assert!(wait_for(TIMEOUT, || {
        controller.frames_rendered() == paused_at + 1 && controller.is_sleeping()
    }));
    std::thread::sleep(Duration::from_millis(50));

    // ASSERT
    assert!(outcome.is_ok());
    assert_eq!(controller.frames_rendered(), paused_at + 1);
    let bind = log.position(&Event::Bind(h2.id())).unwrap();
    let events = log.snapshot();
    assert!(matches!(events.last(), Some(Event::Present)));
    assert!(events[bind..].iter().any(|event| matches!(event, Event::Render(_))));
    controller.stop();
}

struct PanickingRenderer;

impl strata_core::render::FrameRenderer for PanickingRenderer {
    fn render_frame(
        &mut self,
        _stamp: &strata_core::frame::FrameTimeStamp,
    ) -> strata_core::render::FrameOutcome {
        panic!("renderer bug");
    }
}

#[test]
fn requests_complete_after_the_render_thread_panics() {
    // ARRANGE
    let context = AdaptorContext::default();
    let log = EventLog::default();
    let (graphics, _script) = ScriptedGraphics::new(log.clone());
    let mut controller = RenderThreadController::new(
        &context,
        graphics,
        PanickingRenderer,
        test_clock(),
        Some(surface("h1")),
    );
    controller.start().unwrap();

    // ACT
    assert!(wait_for(TIMEOUT, || !controller.is_running()));
    let ticket = controller.replace_surface(surface("h2"));

    // ASSERT
    let outcome = ticket.wait_timeout(TIMEOUT).unwrap();
    assert_eq!(outcome.error, Some(ContextError::ContextLost));
    assert!(controller.stop().is_none());
}
