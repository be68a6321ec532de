//! Controller facade.
//!
//! Wires the clock, pool, and dispatcher together and translates application
//! calls into operations on them. This is the only piece that knows about
//! renderer readiness sequencing: construction registers the one-shot gate
//! with the renderer, and the dispatch worker consumes it, so `start` can be
//! called before or after the renderer comes up without racing.
//!
//! All control methods assume a single control thread; producers may call the
//! enqueue methods from any number of threads.

use crate::clock::PlaybackClock;
use crate::config::{ConfigError, ConfigHandle, DanmakuConfig};
use crate::dispatcher::DanmakuDispatcher;
use crate::item::DanmakuItem;
use crate::lane::CollisionPolicy;
use crate::pool::DanmakuPool;
use crate::renderer::{DanmakuRenderer, ReadyGate};
use crate::stats::DispatchSnapshot;
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Public entry point for one playback session.
pub struct DanmakuController {
    clock: PlaybackClock,
    pool: Arc<DanmakuPool>,
    config: ConfigHandle,
    dispatcher: DanmakuDispatcher,
    renderer: Arc<dyn DanmakuRenderer>,
    stats_rx: Receiver<DispatchSnapshot>,
}

impl DanmakuController {
    /// Build a session around an external renderer.
    ///
    /// Validates the configuration up front and registers the readiness gate
    /// with the renderer; no thread is spawned until [`start`].
    ///
    /// [`start`]: DanmakuController::start
    pub fn new(
        renderer: Arc<dyn DanmakuRenderer>,
        config: DanmakuConfig,
    ) -> Result<Self, ConfigError> {
        let config = ConfigHandle::new(config)?;
        let clock = PlaybackClock::new();
        let pool = Arc::new(DanmakuPool::new());

        let gate = Arc::new(ReadyGate::new());
        renderer.subscribe_ready(gate.clone());

        let (stats_tx, stats_rx) = unbounded();
        let dispatcher = DanmakuDispatcher::new(
            pool.clone(),
            clock.clone(),
            config.clone(),
            renderer.clone(),
            gate,
            stats_tx,
        );

        Ok(Self {
            clock,
            pool,
            config,
            dispatcher,
            renderer,
            stats_rx,
        })
    }

    /// Start dispatching. If the renderer is not ready yet the worker waits
    /// on the gate and dispatching begins the moment it fires.
    pub fn start(&self) {
        if self.dispatcher.start() {
            info!("danmaku controller started");
        }
    }

    /// Terminal stop: unwind a pause, quit the dispatcher (joining its
    /// worker), and drop everything still pooled.
    pub fn stop(&self) {
        info!("danmaku controller stopping");
        self.resume();
        self.dispatcher.quit();
        self.pool.clear();
    }

    /// Freeze the clock, the loop, and the scroll animation.
    pub fn pause(&self) {
        if self.is_started() && !self.is_paused() {
            info!("danmaku controller paused");
            self.clock.pause();
            self.dispatcher.pause();
            self.renderer.set_paused_visual(true);
        }
    }

    /// Undo [`pause`]. No-op unless started.
    ///
    /// [`pause`]: DanmakuController::pause
    pub fn resume(&self) {
        if self.is_started() && self.is_paused() {
            info!("danmaku controller resumed");
            self.renderer.resume_visual();
            self.clock.resume();
            self.dispatcher.resume();
        }
    }

    pub fn is_started(&self) -> bool {
        self.dispatcher.is_started()
    }

    pub fn is_paused(&self) -> bool {
        self.dispatcher.is_paused()
    }

    pub fn hide(&self) {
        self.renderer.set_hidden(true);
    }

    pub fn show(&self) {
        self.renderer.set_hidden(false);
    }

    pub fn is_hidden(&self) -> bool {
        self.renderer.is_hidden()
    }

    /// Jump the playback position: the clock resyncs, the dispatcher resets
    /// its lanes and discards items whose due time now lies in the past.
    pub fn seek(&self, position: Duration) {
        info!(position_ms = position.as_millis() as u64, "seek");
        self.dispatcher.seek(position);
    }

    /// Resync the clock against the player without disturbing lane state.
    /// For drift correction; use [`seek`] for actual jumps.
    ///
    /// [`seek`]: DanmakuController::seek
    pub fn sync_time(&self, position: Duration) {
        self.clock.sync(position);
    }

    pub fn set_lane_count(&self, lanes: usize) -> Result<(), ConfigError> {
        self.config.set_lane_count(lanes)
    }

    pub fn set_lane_height(&self, height: f32) -> Result<(), ConfigError> {
        self.config.set_lane_height(height)
    }

    pub fn set_lane_spacing(&self, spacing: f32) -> Result<(), ConfigError> {
        self.config.set_lane_spacing(spacing)
    }

    pub fn set_speed(&self, pixels_per_second: f32) -> Result<(), ConfigError> {
        self.config.set_scroll_speed(pixels_per_second)
    }

    pub fn set_viewport_width(&self, width: f32) -> Result<(), ConfigError> {
        self.config.set_viewport_width(width)
    }

    pub fn set_collision_policy(&self, policy: CollisionPolicy) -> Result<(), ConfigError> {
        self.config.set_collision_policy(policy)
    }

    /// Enqueue one item. Accepted only while started; otherwise silently
    /// ignored so producer threads never block or fail.
    pub fn add_danmaku(&self, item: DanmakuItem) {
        if self.is_started() {
            debug!(id = item.id, offset_ms = item.offset.as_millis() as u64, "item queued");
            self.pool.offer(item);
        }
    }

    /// Bulk enqueue with the same started-only guard.
    pub fn add_danmakus(&self, items: Vec<DanmakuItem>) {
        if self.is_started() {
            debug!(count = items.len(), "items queued");
            self.pool.offer_all(items);
        }
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> DispatchSnapshot {
        self.dispatcher.snapshot()
    }

    /// Receiver of the periodic snapshots the worker publishes while running.
    pub fn stats_feed(&self) -> Receiver<DispatchSnapshot> {
        self.stats_rx.clone()
    }
}

impl Drop for DanmakuController {
    fn drop(&mut self) {
        // Dropping without an explicit stop must still join the worker.
        self.dispatcher.quit();
    }
}
