//! The dispatch loop.
//!
//! One background worker owns the whole consuming side of the engine: it reads
//! the playback clock, drains due items from the pool, places them into lanes,
//! and forwards placements to the renderer. Control operations (pause, resume,
//! seek, quit) flip condvar-guarded state and wake the worker instead of
//! blocking it, so the loop never busy-spins and never starves a state change.
//!
//! The worker is also the only writer of lane state, which is why the lane
//! table needs no lock at all.

use crate::clock::PlaybackClock;
use crate::config::ConfigHandle;
use crate::lane::{LaneTable, Placement};
use crate::pool::DanmakuPool;
use crate::renderer::{DanmakuRenderer, ReadyGate};
use crate::stats::{DispatchCounters, DispatchSnapshot};
use crate::threading::promote_dispatch_thread;
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Scheduling tick, one display frame at 60 Hz.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How often the worker pushes a snapshot into the stats feed.
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle of the dispatch loop.
///
/// `Stopped → Running` on `start`, `Running ↔ Paused` on `pause`/`resume`,
/// anything `→ Stopped` on `quit`. `Stopped` after a quit is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Stopped,
    Running,
    Paused,
}

struct Control {
    state: DispatchState,
    /// Seek target queued by the control thread, consumed by the worker at
    /// the top of its next iteration.
    pending_seek: Option<Duration>,
}

struct Shared {
    control: Mutex<Control>,
    cond: Condvar,
}

/// Owner of the dispatch worker thread and its state machine.
pub struct DanmakuDispatcher {
    shared: Arc<Shared>,
    pool: Arc<DanmakuPool>,
    clock: PlaybackClock,
    config: ConfigHandle,
    renderer: Arc<dyn DanmakuRenderer>,
    gate: Arc<ReadyGate>,
    counters: Arc<DispatchCounters>,
    stats_tx: Sender<DispatchSnapshot>,
    /// Set once by the first `start`; a second `start` must never spawn a
    /// second worker, not even after `quit`.
    started: AtomicBool,
    terminated: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DanmakuDispatcher {
    pub fn new(
        pool: Arc<DanmakuPool>,
        clock: PlaybackClock,
        config: ConfigHandle,
        renderer: Arc<dyn DanmakuRenderer>,
        gate: Arc<ReadyGate>,
        stats_tx: Sender<DispatchSnapshot>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: DispatchState::Stopped,
                    pending_seek: None,
                }),
                cond: Condvar::new(),
            }),
            pool,
            clock,
            config,
            renderer,
            gate,
            counters: Arc::new(DispatchCounters::new()),
            stats_tx,
            started: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker. Returns whether this call actually started it:
    /// `false` when already started or already quit.
    ///
    /// The worker first parks on the renderer readiness gate, so calling
    /// `start` before the renderer is up is safe; dispatching simply begins
    /// once the gate fires.
    pub fn start(&self) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.shared.control.lock().state = DispatchState::Running;

        let worker = Worker {
            shared: self.shared.clone(),
            pool: self.pool.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
            renderer: self.renderer.clone(),
            gate: self.gate.clone(),
            counters: self.counters.clone(),
            stats_tx: self.stats_tx.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name("danmaku-dispatch".to_string())
            .spawn(move || {
                promote_dispatch_thread();
                worker.run();
            });
        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                true
            }
            Err(e) => {
                error!("failed to spawn dispatch worker: {e}");
                self.shared.control.lock().state = DispatchState::Stopped;
                self.terminated.store(true, Ordering::Release);
                false
            }
        }
    }

    /// Suspend dispatching. No-op unless currently running.
    pub fn pause(&self) {
        let mut control = self.shared.control.lock();
        if control.state == DispatchState::Running {
            control.state = DispatchState::Paused;
            self.shared.cond.notify_all();
        }
    }

    /// Resume a paused loop. No-op unless currently paused.
    pub fn resume(&self) {
        let mut control = self.shared.control.lock();
        if control.state == DispatchState::Paused {
            control.state = DispatchState::Running;
            self.shared.cond.notify_all();
        }
    }

    /// Jump the playback position.
    ///
    /// Order matters here. The pool is pruned of items due at or before the
    /// target *before* the clock is re-anchored: a forward seek must not let
    /// the worker drain the skipped window as "due" in the instant between
    /// resync and prune, which would flood the screen in a single frame. The
    /// prune and the worker's drains serialize on the pool lock, so every
    /// skipped item is either discarded here or was already dispatched under
    /// the old timeline, never both. The lane reset is queued for the
    /// worker's next iteration since the worker owns lane state exclusively.
    pub fn seek(&self, position: Duration) {
        let skipped = self.pool.drain_due(position).len();
        if skipped > 0 {
            self.counters.record_seek_skipped(skipped as u64);
        }
        self.clock.sync(position);

        let mut control = self.shared.control.lock();
        if control.state == DispatchState::Stopped {
            return;
        }
        control.pending_seek = Some(position);
        self.shared.cond.notify_all();
        debug!(
            position_ms = position.as_millis() as u64,
            skipped, "seek: pool pruned, clock resynced, lane reset queued"
        );
    }

    /// Stop the loop and join the worker. Idempotent; after the first call
    /// the dispatcher is permanently unusable.
    pub fn quit(&self) {
        self.terminated.store(true, Ordering::Release);
        self.shared.control.lock().state = DispatchState::Stopped;
        // A worker still parked on renderer readiness must be released too.
        self.gate.cancel();
        self.shared.cond.notify_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("dispatch worker panicked");
            }
        }
    }

    /// Started and not yet quit (running or paused, possibly still waiting
    /// on the renderer gate).
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.terminated.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.state() == DispatchState::Paused
    }

    pub fn state(&self) -> DispatchState {
        self.shared.control.lock().state
    }

    /// Current counters folded with pool depth and clock position.
    pub fn snapshot(&self) -> DispatchSnapshot {
        self.counters.snapshot(self.pool.len(), self.clock.now())
    }
}

/// Everything the worker thread needs, cloned out of the dispatcher so the
/// thread owns its handles outright.
struct Worker {
    shared: Arc<Shared>,
    pool: Arc<DanmakuPool>,
    clock: PlaybackClock,
    config: ConfigHandle,
    renderer: Arc<dyn DanmakuRenderer>,
    gate: Arc<ReadyGate>,
    counters: Arc<DispatchCounters>,
    stats_tx: Sender<DispatchSnapshot>,
}

impl Worker {
    fn run(self) {
        // Consume the one-shot readiness signal before touching the renderer.
        if !self.gate.wait() {
            info!("dispatch worker quit before renderer became ready");
            return;
        }
        info!("dispatch worker online");

        let mut generation = self.config.generation();
        let mut config = self.config.get();
        let mut lanes = LaneTable::new(config.lane_count);
        let mut last_stats = Instant::now();

        loop {
            // State gate: park while paused, exit when stopped, and pick up
            // any seek queued since the last iteration.
            let seek = {
                let mut control = self.shared.control.lock();
                loop {
                    match control.state {
                        DispatchState::Stopped => {
                            info!("dispatch worker exiting");
                            return;
                        }
                        DispatchState::Paused => self.shared.cond.wait(&mut control),
                        DispatchState::Running => break,
                    }
                }
                control.pending_seek.take()
            };

            if let Some(position) = seek {
                lanes.reset();
                debug!(
                    position_ms = position.as_millis() as u64,
                    "seek applied, lanes reset"
                );
            }

            let current_generation = self.config.generation();
            if current_generation != generation {
                generation = current_generation;
                config = self.config.get();
                lanes.rebuild(config.lane_count);
                debug!(lanes = config.lane_count, "geometry changed, lane table rebuilt");
            }

            let now = self.clock.now();
            let due = self.pool.drain_due(now);
            if !due.is_empty() {
                self.counters.record_drained(due.len() as u64);
                for item in due {
                    match lanes.place(&item, &config) {
                        Placement::Placed { lane, geometry } => {
                            self.counters.record_dispatched();
                            self.renderer.submit(item, lane, geometry);
                        }
                        Placement::Rejected => {
                            self.counters.record_collision();
                            debug!(id = item.id, "no free lane, item dropped");
                        }
                    }
                }
            }

            if last_stats.elapsed() >= STATS_INTERVAL {
                last_stats = Instant::now();
                let _ = self
                    .stats_tx
                    .send(self.counters.snapshot(self.pool.len(), now));
            }

            // Pace to the frame cadence. Any control signal (pause, quit,
            // seek, resume) cuts the wait short via the condvar.
            let mut control = self.shared.control.lock();
            if control.state == DispatchState::Running && control.pending_seek.is_none() {
                let _ = self.shared.cond.wait_for(&mut control, FRAME_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DanmakuConfig;
    use crate::renderer::RecordingRenderer;
    use crossbeam_channel::unbounded;

    fn dispatcher_with(
        renderer: Arc<RecordingRenderer>,
    ) -> (DanmakuDispatcher, Arc<DanmakuPool>, PlaybackClock) {
        let pool = Arc::new(DanmakuPool::new());
        let clock = PlaybackClock::new();
        let config = ConfigHandle::new(DanmakuConfig::default()).unwrap();
        let gate = Arc::new(ReadyGate::new());
        renderer.subscribe_ready(gate.clone());
        let (stats_tx, _stats_rx) = unbounded();
        let dispatcher = DanmakuDispatcher::new(
            pool.clone(),
            clock.clone(),
            config,
            renderer,
            gate,
            stats_tx,
        );
        (dispatcher, pool, clock)
    }

    #[test]
    fn start_is_one_shot() {
        let renderer = Arc::new(RecordingRenderer::ready());
        let (dispatcher, _, _) = dispatcher_with(renderer);
        assert!(dispatcher.start());
        assert!(!dispatcher.start());
        dispatcher.quit();
    }

    #[test]
    fn quit_is_idempotent_and_terminal() {
        let renderer = Arc::new(RecordingRenderer::ready());
        let (dispatcher, _, _) = dispatcher_with(renderer);
        assert!(dispatcher.start());
        dispatcher.quit();
        dispatcher.quit();
        assert_eq!(dispatcher.state(), DispatchState::Stopped);
        assert!(!dispatcher.is_started());
        // No second worker after quit.
        assert!(!dispatcher.start());
    }

    #[test]
    fn quit_releases_a_worker_parked_on_the_gate() {
        // Renderer never becomes ready; quit must still join promptly.
        let renderer = Arc::new(RecordingRenderer::new());
        let (dispatcher, _, _) = dispatcher_with(renderer);
        assert!(dispatcher.start());
        dispatcher.quit();
        assert_eq!(dispatcher.state(), DispatchState::Stopped);
    }

    #[test]
    fn pause_and_resume_require_matching_state() {
        let renderer = Arc::new(RecordingRenderer::ready());
        let (dispatcher, _, _) = dispatcher_with(renderer);

        // Not started: both are no-ops.
        dispatcher.pause();
        assert_eq!(dispatcher.state(), DispatchState::Stopped);
        dispatcher.resume();
        assert_eq!(dispatcher.state(), DispatchState::Stopped);

        assert!(dispatcher.start());
        dispatcher.resume(); // running, not paused: no-op
        assert_eq!(dispatcher.state(), DispatchState::Running);
        dispatcher.pause();
        assert!(dispatcher.is_paused());
        dispatcher.pause(); // already paused: no-op
        assert!(dispatcher.is_paused());
        dispatcher.resume();
        assert_eq!(dispatcher.state(), DispatchState::Running);
        dispatcher.quit();
    }

    #[test]
    fn seek_after_quit_is_ignored() {
        let renderer = Arc::new(RecordingRenderer::ready());
        let (dispatcher, _, _) = dispatcher_with(renderer);
        dispatcher.start();
        dispatcher.quit();
        dispatcher.seek(Duration::from_secs(10));
        assert_eq!(dispatcher.state(), DispatchState::Stopped);
    }
}
