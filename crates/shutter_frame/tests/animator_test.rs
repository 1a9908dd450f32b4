//! Animator state machine tests, driven by a manual vsync source.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use shutter_core::{Pipeline, TimePoint};
use shutter_frame::{
    Animator, AnimatorDelegate, AnimatorPhase, FrameConfig, FramePayload, FrameSize,
    ManualVsyncSource,
};
use shutter_runtime::{run_sync, ShutdownPolicy, TaskRunners, ThreadHost, ThreadRoles};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);
const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Debug)]
struct Frame {
    size: FrameSize,
}

impl FramePayload for Frame {
    fn frame_size(&self) -> FrameSize {
        self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Begin(TimePoint),
    Idle(TimePoint),
    Draw,
    DrawLast,
}

struct RecordingDelegate {
    animator: OnceLock<Weak<Animator<Frame>>>,
    events: Sender<Event>,
    size: Mutex<FrameSize>,
    render_on_begin: AtomicBool,
    request_on_begin: AtomicBool,
    consume_on_draw: AtomicBool,
}

impl RecordingDelegate {
    fn animator(&self) -> Arc<Animator<Frame>> {
        self.animator.get().and_then(Weak::upgrade).unwrap()
    }
}

impl AnimatorDelegate<Frame> for RecordingDelegate {
    fn on_animator_begin_frame(&self, frame_target_time: TimePoint) {
        self.events.send(Event::Begin(frame_target_time)).unwrap();
        let animator = self.animator();
        if self.request_on_begin.load(Ordering::SeqCst) {
            animator.request_frame(true);
        }
        if self.render_on_begin.load(Ordering::SeqCst) {
            animator.render(Frame {
                size: *self.size.lock(),
            });
        }
    }

    fn on_animator_notify_idle(&self, deadline: TimePoint) {
        self.events.send(Event::Idle(deadline)).unwrap();
    }

    fn on_animator_draw(&self, pipeline: Arc<Pipeline<Frame>>) {
        self.events.send(Event::Draw).unwrap();
        if self.consume_on_draw.load(Ordering::SeqCst) {
            pipeline.consume(|_| {});
        }
    }

    fn on_animator_draw_last_layer_tree(&self) {
        self.events.send(Event::DrawLast).unwrap();
    }
}

struct Harness {
    animator: Arc<Animator<Frame>>,
    delegate: Arc<RecordingDelegate>,
    vsync: Arc<ManualVsyncSource>,
    runners: TaskRunners,
    events: Receiver<Event>,
    _host: ThreadHost,
}

impl Harness {
    /// Idle hints are pushed far out so they never interleave with the
    /// events a test asserts on.
    fn new() -> Self {
        Self::with_config(FrameConfig {
            gate_acquire_timeout_ms: 5,
            idle_notify_wait_ms: 10_000,
            ..FrameConfig::default()
        })
    }

    fn with_config(config: FrameConfig) -> Self {
        let host = ThreadHost::new("animator", ThreadRoles::ALL, ShutdownPolicy::Discard).unwrap();
        let runners = host.task_runners().clone();
        let (sender, events) = unbounded();
        let delegate = Arc::new(RecordingDelegate {
            animator: OnceLock::new(),
            events: sender,
            size: Mutex::new(FrameSize::new(800, 600)),
            render_on_begin: AtomicBool::new(true),
            request_on_begin: AtomicBool::new(false),
            consume_on_draw: AtomicBool::new(true),
        });
        let vsync = Arc::new(ManualVsyncSource::new());
        let animator = Animator::new(delegate.clone(), runners.clone(), vsync.clone(), config);
        delegate.animator.set(Arc::downgrade(&animator)).unwrap();

        Self {
            animator,
            delegate,
            vsync,
            runners,
            events,
            _host: host,
        }
    }

    fn on_ui<R: Send + 'static>(&self, task: impl FnOnce(&Animator<Frame>) -> R + Send + 'static) -> R {
        let animator = Arc::clone(&self.animator);
        run_sync(self.runners.ui(), move || task(&animator)).unwrap()
    }

    /// Waits until everything already posted to the UI runner has run.
    fn flush_ui(&self) {
        run_sync(self.runners.ui(), || ()).unwrap();
    }

    /// Waits for a vsync request, fires it, and lets the callback run.
    fn tick(&self) -> TimePoint {
        assert!(self.vsync.wait_for_request(WAIT), "animator never asked for a vsync");
        let start = TimePoint::now();
        let target = start + FRAME;
        assert!(self.vsync.tick(start, target));
        self.flush_ui();
        target
    }

    fn drain(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    fn begins(events: &[Event]) -> usize {
        events.iter().filter(|e| matches!(e, Event::Begin(_))).count()
    }
}

#[test]
fn test_requests_before_vsync_are_coalesced() {
    let harness = Harness::new();

    for _ in 0..10 {
        harness.animator.request_frame(true);
    }
    harness.tick();

    let events = harness.drain();
    assert_eq!(Harness::begins(&events), 1);
    assert_eq!(harness.vsync.request_count(), 1);
    assert_eq!(harness.animator.stats().requests_coalesced, 9);
    assert!(!harness.vsync.has_pending());
}

#[test]
fn test_one_begin_frame_per_tick() {
    let harness = Harness::new();

    let mut targets = Vec::new();
    for _ in 0..3 {
        harness.animator.request_frame(true);
        targets.push(harness.tick());
    }

    let begins: Vec<TimePoint> = harness
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            Event::Begin(target) => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(begins, targets);
    assert_eq!(harness.animator.frame_number(), 3);
    assert_eq!(harness.animator.last_frame_target_time(), targets[2]);
    assert_eq!(harness.animator.frame_deadline(), targets[2]);
    assert_eq!(harness.animator.stats().frames_rendered, 3);
}

#[test]
fn test_frame_is_rendered_then_drawn() {
    let harness = Harness::new();
    harness.animator.request_frame(true);
    let target = harness.tick();

    assert_eq!(harness.drain(), vec![Event::Begin(target), Event::Draw]);
    assert_eq!(harness.animator.phase(), AnimatorPhase::Idle);
    assert_eq!(harness.animator.pipeline().reserved(), 0);
}

#[test]
fn test_concurrent_requests_never_exceed_one_build_per_tick() {
    let harness = Harness::new();
    let stop = Arc::new(AtomicBool::new(false));

    let requesters: Vec<_> = (0..4)
        .map(|_| {
            let animator = Arc::clone(&harness.animator);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    animator.request_frame(true);
                    std::thread::sleep(Duration::from_micros(200));
                }
            })
        })
        .collect();

    let mut fired = 0;
    for _ in 0..20 {
        if harness.vsync.wait_for_request(Duration::from_millis(200)) {
            let start = TimePoint::now();
            if harness.vsync.tick(start, start + FRAME) {
                fired += 1;
            }
        }
        harness.flush_ui();
    }
    stop.store(true, Ordering::SeqCst);
    for requester in requesters {
        requester.join().unwrap();
    }
    harness.flush_ui();

    // A requester that was waiting on the gate may land after `begin_frame`
    // cleared the regenerate flag, so its tick redraws instead of building.
    let begins = Harness::begins(&harness.drain());
    let stats = harness.animator.stats();
    assert!(fired > 0);
    assert!(begins <= fired);
    assert_eq!(begins + stats.frames_reused as usize, fired);
}

#[test]
fn test_stop_blocks_frames_until_start() {
    let harness = Harness::new();
    harness.on_ui(|animator| animator.stop());
    assert_eq!(harness.animator.phase(), AnimatorPhase::Paused);

    harness.animator.request_frame(true);
    assert!(!harness.vsync.wait_for_request(Duration::from_millis(50)));
    assert!(harness.drain().is_empty());

    harness.on_ui(|animator| animator.start());
    harness.tick();
    assert_eq!(Harness::begins(&harness.drain()), 1);
    assert!(!harness.animator.is_paused());
}

#[test]
fn test_vsync_after_stop_does_not_build() {
    let harness = Harness::new();
    harness.animator.request_frame(true);
    assert!(harness.vsync.wait_for_request(WAIT));

    harness.on_ui(|animator| animator.stop());
    harness.tick();
    assert!(harness.drain().is_empty());

    // The gate was released, so start() gets a frame through.
    harness.on_ui(|animator| animator.start());
    harness.tick();
    assert_eq!(Harness::begins(&harness.drain()), 1);
}

#[test]
fn test_pending_resize_overrides_pause() {
    let harness = Harness::new();
    harness.on_ui(|animator| {
        animator.stop();
        animator.set_dimension_change_pending(FrameSize::new(800, 600));
    });

    // Even a non-regenerating request must build while a resize is pending.
    harness.animator.request_frame(false);
    let target = harness.tick();

    assert_eq!(harness.drain(), vec![Event::Begin(target), Event::Draw]);
    assert!(!harness.animator.dimension_change_pending());
    assert!(harness.animator.is_paused());

    harness.animator.request_frame(true);
    assert!(!harness.vsync.wait_for_request(Duration::from_millis(50)));
}

#[test]
fn test_resize_clears_when_target_size_renders() {
    let harness = Harness::new();
    let target_size = FrameSize::new(1024, 768);
    harness.on_ui(move |animator| animator.set_dimension_change_pending(target_size));
    assert_eq!(harness.animator.pending_dimension(), Some(target_size));

    // A frame built at the old size does not satisfy the resize.
    harness.animator.request_frame(false);
    harness.tick();
    assert!(harness.animator.dimension_change_pending());

    *harness.delegate.size.lock() = target_size;
    harness.animator.request_frame(false);
    harness.tick();
    assert!(!harness.animator.dimension_change_pending());
    assert_eq!(Harness::begins(&harness.drain()), 2);
}

#[test]
fn test_resize_back_to_previous_size_lets_stop_take_effect() {
    let harness = Harness::new();
    let original = FrameSize::new(800, 600);
    harness.animator.request_frame(true);
    harness.tick();

    // 800x600 -> 1024x768 -> 800x600 before the next vsync.
    harness.on_ui(|animator| {
        animator.set_dimension_change_pending(FrameSize::new(1024, 768));
        animator.set_dimension_change_pending(FrameSize::new(800, 600));
    });
    harness.animator.request_frame(true);
    harness.tick();
    assert_eq!(harness.animator.pending_dimension(), None);
    assert_eq!(harness.animator.stats().frames_begun, 2);
    assert_eq!(*harness.delegate.size.lock(), original);

    harness.on_ui(|animator| animator.stop());
    harness.animator.request_frame(false);
    assert!(!harness.vsync.wait_for_request(Duration::from_millis(50)));
    assert_eq!(harness.animator.stats().frames_begun, 2);
}

#[test]
fn test_unchanged_frame_reuses_last_layer_tree() {
    let harness = Harness::new();
    harness.animator.request_frame(true);
    harness.tick();
    harness.drain();

    harness.animator.request_frame(false);
    harness.tick();

    assert_eq!(harness.drain(), vec![Event::DrawLast]);
    let stats = harness.animator.stats();
    assert_eq!(stats.frames_reused, 1);
    assert_eq!(stats.frames_begun, 1);
}

#[test]
fn test_regenerate_wins_over_reuse_within_one_cycle() {
    let harness = Harness::new();
    harness.animator.request_frame(false);
    harness.animator.request_frame(true);
    let target = harness.tick();
    assert_eq!(harness.drain(), vec![Event::Begin(target), Event::Draw]);
}

#[test]
fn test_request_from_begin_frame_schedules_next_vsync() {
    let harness = Harness::with_config(FrameConfig {
        idle_notify_wait_ms: 20,
        gate_acquire_timeout_ms: 5,
        ..FrameConfig::default()
    });
    harness.delegate.request_on_begin.store(true, Ordering::SeqCst);

    harness.animator.request_frame(true);
    harness.tick();
    assert!(harness.vsync.wait_for_request(WAIT));
    assert_eq!(harness.animator.phase(), AnimatorPhase::AwaitingVsync);

    harness.delegate.request_on_begin.store(false, Ordering::SeqCst);
    harness.tick();
    assert_eq!(harness.animator.frame_number(), 2);

    // Only the last frame was followed by a quiet period.
    std::thread::sleep(Duration::from_millis(150));
    harness.flush_ui();
    let idles = harness
        .drain()
        .iter()
        .filter(|e| matches!(e, Event::Idle(_)))
        .count();
    assert_eq!(idles, 1);
}

#[test]
fn test_full_pipeline_defers_build_to_next_vsync() {
    let harness = Harness::new();
    harness.delegate.consume_on_draw.store(false, Ordering::SeqCst);

    for _ in 0..2 {
        harness.animator.request_frame(true);
        harness.tick();
    }
    assert_eq!(harness.animator.pipeline().reserved(), 2);

    harness.animator.request_frame(true);
    harness.tick();
    let stats = harness.animator.stats();
    assert_eq!(stats.frames_begun, 2);
    assert_eq!(stats.pipeline_full_retries, 1);

    // The retry is already waiting for the next vsync.
    assert!(harness.vsync.wait_for_request(WAIT));
    harness.animator.pipeline().consume(|_| {});
    harness.tick();
    assert_eq!(harness.animator.stats().frames_begun, 3);
    assert_eq!(Harness::begins(&harness.drain()), 3);
}

#[test]
fn test_unrendered_frame_keeps_its_slot_for_next_tick() {
    let harness = Harness::new();
    harness.delegate.render_on_begin.store(false, Ordering::SeqCst);

    harness.animator.request_frame(true);
    harness.tick();
    harness.animator.request_frame(true);
    harness.tick();

    assert_eq!(harness.animator.stats().frames_begun, 2);
    assert_eq!(harness.animator.pipeline().reserved(), 1);
    assert!(!harness.drain().contains(&Event::Draw));
}

#[test]
fn test_idle_notification_after_quiet_period() {
    let harness = Harness::with_config(FrameConfig {
        idle_notify_wait_ms: 20,
        idle_deadline_ms: 100,
        gate_acquire_timeout_ms: 5,
        ..FrameConfig::default()
    });

    harness.animator.request_frame(true);
    harness.tick();
    let before_idle = TimePoint::now();

    let idle = loop {
        if let Event::Idle(deadline) = harness.events.recv_timeout(WAIT).unwrap() {
            break deadline;
        }
    };
    assert!(idle >= before_idle + Duration::from_millis(100));

    std::thread::sleep(Duration::from_millis(100));
    harness.flush_ui();
    assert!(harness.drain().is_empty());
    assert_eq!(harness.animator.stats().idle_notifications, 1);
}

#[test]
fn test_new_frame_within_debounce_suppresses_stale_idle() {
    let harness = Harness::with_config(FrameConfig {
        idle_notify_wait_ms: 300,
        gate_acquire_timeout_ms: 5,
        ..FrameConfig::default()
    });

    harness.animator.request_frame(true);
    harness.tick();
    harness.animator.request_frame(true);
    harness.tick();

    std::thread::sleep(Duration::from_millis(700));
    harness.flush_ui();

    let events = harness.drain();
    let idles = events.iter().filter(|e| matches!(e, Event::Idle(_))).count();
    assert_eq!(Harness::begins(&events), 2);
    assert_eq!(idles, 1);
    // The surviving hint belongs to the second frame.
    assert!(matches!(events.last(), Some(Event::Idle(_))));
}

#[test]
fn test_render_without_slot_is_dropped() {
    let harness = Harness::new();
    harness.on_ui(|animator| {
        animator.render(Frame {
            size: FrameSize::new(1, 1),
        });
    });
    assert!(harness.drain().is_empty());
    assert_eq!(harness.animator.stats().frames_rendered, 0);
}

#[test]
fn test_vsync_after_animator_dropped_is_ignored() {
    let Harness {
        animator,
        vsync,
        runners,
        events,
        delegate,
        _host,
    } = Harness::new();

    animator.request_frame(true);
    assert!(vsync.wait_for_request(WAIT));
    drop(animator);

    assert!(vsync.tick_now(FRAME));
    run_sync(runners.ui(), || ()).unwrap();
    assert!(events.try_iter().next().is_none());
    assert!(delegate.animator.get().and_then(Weak::upgrade).is_none());
}
