//! # Frame Loop Demo
//!
//! Runs a headless shell on the fallback vsync source and prints what the
//! animator and rasterizer did.
//!
//! ```bash
//! frame_loop_demo                      # defaults, 2 seconds
//! frame_loop_demo --seconds 5
//! frame_loop_demo --config shutter.toml --slow-raster
//! ```

use shutter::frame::{FallbackVsyncSource, FramePayload, FrameSize, VsyncSource};
use shutter::core::TimePoint;
use shutter::{FrameBuilder, FrameSink, Settings, Shell};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A fake scene: just enough to flow through the pipeline.
struct DemoFrame {
    size: FrameSize,
    number: u64,
    target: TimePoint,
}

impl FramePayload for DemoFrame {
    fn frame_size(&self) -> FrameSize {
        self.size
    }
}

struct DemoBuilder {
    built: u64,
    idle_hints: Arc<AtomicU64>,
}

impl FrameBuilder<DemoFrame> for DemoBuilder {
    fn build_frame(&mut self, target: TimePoint, size: FrameSize) -> Option<DemoFrame> {
        self.built += 1;
        Some(DemoFrame {
            size,
            number: self.built,
            target,
        })
    }

    fn notify_idle(&mut self, _deadline: TimePoint) {
        self.idle_hints.fetch_add(1, Ordering::Relaxed);
    }
}

struct DemoSink {
    raster_cost: Duration,
    late_frames: Arc<AtomicU64>,
    last_number: Arc<AtomicU64>,
}

impl FrameSink<DemoFrame> for DemoSink {
    fn draw(&mut self, frame: &DemoFrame) -> bool {
        if !self.raster_cost.is_zero() {
            std::thread::sleep(self.raster_cost);
        }
        if TimePoint::now() > frame.target {
            self.late_frames.fetch_add(1, Ordering::Relaxed);
        }
        self.last_number.store(frame.number, Ordering::Relaxed);
        true
    }
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    SHUTTER FRAME LOOP DEMO");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let seconds: u64 = args
        .iter()
        .position(|a| a == "--seconds")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);
    let slow_raster = args.iter().any(|a| a == "--slow-raster");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));

    let settings = match config_path {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("   ✗ FATAL: {e}");
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let refresh_rate = settings.frame.refresh_rate_hz;
    let depth = settings.frame.pipeline_depth;
    let interval = settings.frame.refresh_interval();
    println!("  Refresh:  {refresh_rate} Hz");
    println!("  Depth:    {depth}");
    println!("  Raster:   {}", if slow_raster { "slow (2.5 frames)" } else { "fast" });
    println!();

    let idle_hints = Arc::new(AtomicU64::new(0));
    let late_frames = Arc::new(AtomicU64::new(0));
    let last_number = Arc::new(AtomicU64::new(0));

    let builder = DemoBuilder {
        built: 0,
        idle_hints: Arc::clone(&idle_hints),
    };
    let sink = DemoSink {
        raster_cost: if slow_raster { interval * 5 / 2 } else { Duration::ZERO },
        late_frames: Arc::clone(&late_frames),
        last_number: Arc::clone(&last_number),
    };

    let vsync = |runners: &shutter::runtime::TaskRunners| -> Arc<dyn VsyncSource> {
        Arc::new(FallbackVsyncSource::with_refresh_rate(
            runners.platform().clone(),
            refresh_rate,
        ))
    };

    let shell = match Shell::create(settings, vsync, builder, sink) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("   ✗ FATAL: {e}");
            std::process::exit(1);
        }
    };
    println!("  ✓ Shell up ({} threads)", shell.task_runners().unique_runner_count());

    if let Err(e) = shell.set_viewport_size(FrameSize::new(1280, 720)) {
        eprintln!("   ✗ FATAL: {e}");
        std::process::exit(1);
    }

    // An app that animates asks for a frame every vsync, usually more often.
    let started = Instant::now();
    let run_for = Duration::from_secs(seconds);
    while started.elapsed() < run_for {
        shell.request_frame(true);
        std::thread::sleep(interval / 3);
    }

    // Let the idle hint come through.
    std::thread::sleep(Duration::from_millis(200));

    let animator = shell.animator_stats();
    let raster = shell.rasterizer_stats();
    let elapsed = started.elapsed().as_secs_f64();

    println!();
    println!("┌─ ANIMATOR ───────────────────────────────────────────────────────┐");
    println!("│ Frames begun:        {}", animator.frames_begun);
    println!("│ Frames rendered:     {}", animator.frames_rendered);
    println!("│ Requests coalesced:  {}", animator.requests_coalesced);
    println!("│ Pipeline full:       {}", animator.pipeline_full_retries);
    println!("│ Idle hints:          {}", idle_hints.load(Ordering::Relaxed));
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!("┌─ RASTERIZER ─────────────────────────────────────────────────────┐");
    println!("│ Frames drawn:        {}", raster.frames_drawn);
    println!("│ Late frames:         {}", late_frames.load(Ordering::Relaxed));
    println!("│ Last frame:          #{}", last_number.load(Ordering::Relaxed));
    println!("│ Effective rate:      {:.1} fps", raster.frames_drawn as f64 / elapsed);
    println!("└──────────────────────────────────────────────────────────────────┘");
}
