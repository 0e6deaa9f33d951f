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

//! Scripted graphics and renderer doubles that record every call into one shared log.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use strata_core::frame::{FrameClock, FrameTimeStamp};
use strata_core::graphics::{ContextConfig, ContextHandle, GraphicsContextLifecycle};
use strata_core::render::{FrameOutcome, FrameRenderer};
use strata_core::surface::{NativeSurfaceHandle, SurfaceId};
use strata_core::ContextError;

/// A software clock fast enough for tests.
pub const TICK: Duration = Duration::from_millis(2);

/// One recorded call, in the order it happened on the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateContext(u64),
    Bind(SurfaceId),
    Release,
    Resize(u32, u32),
    Present,
    DestroyContext(u64),
    ContextCreated,
    ContextDestroyed,
    SurfaceReplaced(SurfaceId),
    SurfaceResized(u32, u32),
    Render(FrameTimeStamp),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.snapshot().iter().position(|e| e == event)
    }

    pub fn renders(&self) -> Vec<FrameTimeStamp> {
        self.snapshot()
            .into_iter()
            .filter_map(|event| match event {
                Event::Render(stamp) => Some(stamp),
                _ => None,
            })
            .collect()
    }
}

/// Failure injection shared with the test thread.
#[derive(Debug, Default)]
pub struct GraphicsScript {
    pub failing_surfaces: Mutex<HashSet<SurfaceId>>,
    pub context_lost: AtomicBool,
    pub fail_create: AtomicBool,
}

pub struct ScriptedGraphics {
    log: EventLog,
    script: Arc<GraphicsScript>,
    next_context: u64,
    live: HashSet<u64>,
    bound: Option<NativeSurfaceHandle>,
}

impl ScriptedGraphics {
    pub fn new(log: EventLog) -> (Self, Arc<GraphicsScript>) {
        let script = Arc::new(GraphicsScript::default());
        (
            Self {
                log,
                script: Arc::clone(&script),
                next_context: 0,
                live: HashSet::new(),
                bound: None,
            },
            script,
        )
    }
}

impl GraphicsContextLifecycle for ScriptedGraphics {
    fn create_context(&mut self, _config: &ContextConfig) -> Result<ContextHandle, ContextError> {
        if self.script.fail_create.load(Ordering::SeqCst) {
            return Err(ContextError::UnsupportedConfig("scripted".into()));
        }
        self.next_context += 1;
        self.live.insert(self.next_context);
        self.script.context_lost.store(false, Ordering::SeqCst);
        self.log.push(Event::CreateContext(self.next_context));
        Ok(ContextHandle::from_raw(self.next_context))
    }

    fn bind_surface(
        &mut self,
        _context: &ContextHandle,
        surface: &NativeSurfaceHandle,
    ) -> Result<(), ContextError> {
        if self.script.failing_surfaces.lock().unwrap().contains(&surface.id()) {
            return Err(ContextError::DriverFailure("scripted bind failure".into()));
        }
        self.bound = Some(surface.clone());
        self.log.push(Event::Bind(surface.id()));
        Ok(())
    }

    fn release_surface(&mut self, _context: &ContextHandle) {
        self.bound = None;
        self.log.push(Event::Release);
    }

    fn resize_surface(
        &mut self,
        _context: &ContextHandle,
        width: u32,
        height: u32,
    ) -> Result<(), ContextError> {
        self.log.push(Event::Resize(width, height));
        Ok(())
    }

    fn present(&mut self, _context: &ContextHandle) -> Result<(), ContextError> {
        if self.bound.is_none() {
            return Err(ContextError::SurfaceNotBound);
        }
        self.log.push(Event::Present);
        Ok(())
    }

    fn is_context_lost(&self, _context: &ContextHandle) -> bool {
        self.script.context_lost.load(Ordering::SeqCst)
    }

    fn destroy_context(&mut self, context: ContextHandle) {
        assert!(self.live.remove(&context.raw()), "context destroyed twice");
        self.log.push(Event::DestroyContext(context.raw()));
    }
}

pub struct ScriptedRenderer {
    log: EventLog,
    keep_updating: Arc<AtomicBool>,
}

impl ScriptedRenderer {
    /// A renderer that keeps animating while the returned flag is set.
    pub fn new(log: EventLog, animating: bool) -> (Self, Arc<AtomicBool>) {
        let keep_updating = Arc::new(AtomicBool::new(animating));
        (
            Self {
                log,
                keep_updating: Arc::clone(&keep_updating),
            },
            keep_updating,
        )
    }
}

impl FrameRenderer for ScriptedRenderer {
    fn context_created(&mut self) {
        self.log.push(Event::ContextCreated);
    }

    fn context_destroyed(&mut self) {
        self.log.push(Event::ContextDestroyed);
    }

    fn surface_replaced(&mut self, surface: &NativeSurfaceHandle) {
        self.log.push(Event::SurfaceReplaced(surface.id()));
    }

    fn surface_resized(&mut self, width: u32, height: u32) {
        self.log.push(Event::SurfaceResized(width, height));
    }

    fn render_frame(&mut self, stamp: &FrameTimeStamp) -> FrameOutcome {
        self.log.push(Event::Render(*stamp));
        if self.keep_updating.load(Ordering::SeqCst) {
            FrameOutcome::ANIMATING
        } else {
            FrameOutcome::SETTLED
        }
    }
}

pub fn test_clock() -> FrameClock {
    FrameClock::software(TICK)
}

pub fn surface(name: &'static str) -> NativeSurfaceHandle {
    NativeSurfaceHandle::new(name)
}

/// Polls `condition` until it holds or `timeout` expires.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

pub fn init_logging() {
    strata_telemetry::init_logging("debug");
}
