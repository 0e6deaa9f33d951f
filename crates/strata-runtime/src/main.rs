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

//! Runs the render thread offscreen: loads options, starts rendering on a simulated
//! display link, swaps the surface a few times from the event loop, then shuts down.

mod scene;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_control::{RenderIdleTrigger, RenderThreadController, SurfaceReplacedTrigger};
use strata_core::config::{AdaptorOptions, BackendKind};
use strata_core::frame::{FrameClock, VSyncProvider};
use strata_core::surface::NativeSurfaceHandle;
use strata_core::trigger::{TriggerEventManager, TriggerOptions};
use strata_core::AdaptorContext;
use strata_infra::graphics::HeadlessSurface;
use strata_infra::{DisplayLinkVSync, GraphicsBackend};

use crate::scene::BurstRenderer;

#[derive(Parser, Debug)]
#[command(name = "strata-runtime", version, about)]
struct Cli {
    /// JSON options file. STRATA_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to run before shutting down, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    run_ms: u64,

    /// Surface replacements performed while running.
    #[arg(long, default_value_t = 3)]
    replacements: u32,

    /// Simulated vblank interval in microseconds.
    #[arg(long, default_value_t = 16_667)]
    vblank_us: u64,

    /// Frames animated after each surface change.
    #[arg(long, default_value_t = 30)]
    burst: u32,

    /// Print the frame statistics as JSON on exit.
    #[arg(long)]
    json: bool,
}

fn load_options(cli: &Cli) -> Result<AdaptorOptions> {
    let mut options = match &cli.config {
        Some(path) => AdaptorOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => AdaptorOptions::default(),
    };
    options.apply_overrides(|key| std::env::var(key).ok());

    match options.backend {
        BackendKind::Auto => {
            log::info!("No backend requested; rendering offscreen.");
            options.backend = BackendKind::Headless;
        }
        BackendKind::Headless => {}
        other => bail!(
            "The runtime only drives offscreen surfaces; {other:?} needs a native window"
        ),
    }
    Ok(options)
}

fn offscreen(step: u32) -> NativeSurfaceHandle {
    NativeSurfaceHandle::new(HeadlessSurface {
        width: 640 + 160 * step,
        height: 360 + 90 * step,
    })
}

/// Spaces `replacements` evenly over `run_for`, leaving a final stretch after the last one.
fn replacement_interval(run_for: Duration, replacements: u32) -> Duration {
    run_for / replacements.saturating_add(1)
}

fn main() -> Result<()> {
    strata_telemetry::init_logging("info");
    let cli = Cli::parse();
    let options = load_options(&cli)?;
    log::debug!("Options: {options:?}");

    // Completion callbacks run on this thread.
    let mut events = TriggerEventManager::new();
    let replaced = Arc::new(AtomicBool::new(false));
    let replaced_flag = Arc::clone(&replaced);
    let replaced_trigger = events.create_trigger(
        move || replaced_flag.store(true, Ordering::SeqCst),
        TriggerOptions::KeepAlive,
    );
    let idle_trigger = events.create_trigger(
        || log::debug!("Render thread is idle."),
        TriggerOptions::KeepAlive,
    );

    let context = AdaptorContext::new(options)
        .with_service(SurfaceReplacedTrigger(replaced_trigger.handle()))
        .with_service(RenderIdleTrigger(idle_trigger.handle()));

    let graphics = GraphicsBackend::from_options(&context.options)?;

    let mut display_link = None;
    let provider: Option<Box<dyn VSyncProvider>> =
        if context.options.use_hardware_vsync && cli.vblank_us > 0 {
            let (source, link) =
                DisplayLinkVSync::spawn_simulated(Duration::from_micros(cli.vblank_us));
            display_link = Some(link);
            Some(Box::new(source))
        } else {
            None
        };
    let clock = FrameClock::new(context.options.clock_config(), provider);

    let mut controller = RenderThreadController::new(
        &context,
        graphics,
        BurstRenderer::new(cli.burst),
        clock,
        Some(offscreen(0)),
    );
    controller
        .start()
        .context("Failed to spawn the render thread")?;

    let run_for = Duration::from_millis(cli.run_ms);
    let replace_every = replacement_interval(run_for, cli.replacements);
    let deadline = Instant::now() + run_for;
    let mut next_replacement = Instant::now() + replace_every;
    let mut step = 0;

    while Instant::now() < deadline {
        events.wait_and_dispatch(Duration::from_millis(5));

        if replaced.swap(false, Ordering::SeqCst) {
            for outcome in controller.take_completed_replacements() {
                match (&outcome.error, &outcome.previous_surface) {
                    (Some(err), _) => log::error!("Surface replacement failed: {err}"),
                    (None, Some(previous)) => log::info!("Releasing {}.", previous.id()),
                    (None, None) => {}
                }
            }
        }

        if step < cli.replacements && Instant::now() >= next_replacement {
            step += 1;
            next_replacement += replace_every;
            let ticket = controller.replace_surface(offscreen(step));
            log::info!("Requested replacement with {}.", ticket.new_surface().id());
        } else if step > 0 && step == cli.replacements {
            // Nudge the scene once more after the last swap.
            controller.resize_surface(1920, 1080);
            controller.request_update();
            step += 1;
        }

        if let Some(err) = controller.fatal_error() {
            log::error!("Render thread failed: {err}");
            break;
        }
    }

    let report = controller
        .stop()
        .context("The render thread panicked")?;
    if let Some(mut link) = display_link {
        link.stop();
    }

    if let Some(surface) = &report.last_surface {
        log::info!("Releasing {} after shutdown.", surface.id());
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.statistics)?);
    }
    if let Some(err) = report.error {
        return Err(err).context("Rendering stopped on a graphics context error");
    }
    Ok(())
}
