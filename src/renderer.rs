//! Renderer boundary.
//!
//! The engine does not draw. It forwards placed items across this trait and
//! otherwise only needs to know one thing about the renderer: whether it has
//! finished initializing. That startup handshake goes through [`ReadyGate`], a
//! one-shot signal the dispatch worker consumes exactly once before entering
//! its loop, so a renderer that becomes ready concurrently with `start()` can
//! neither be missed nor observed twice.

use crate::item::DanmakuItem;
use crate::lane::ScrollGeometry;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// External rendering backend consumed by the engine.
pub trait DanmakuRenderer: Send + Sync {
    /// Whether the backend can accept submissions right now.
    fn is_ready(&self) -> bool;

    /// Register the one-shot readiness gate.
    ///
    /// Implementations must call [`ReadyGate::signal`] once initialization
    /// completes, or immediately if they are already ready. Called once, at
    /// controller construction.
    fn subscribe_ready(&self, gate: Arc<ReadyGate>);

    /// Accept a placed item for display.
    fn submit(&self, item: DanmakuItem, lane: usize, geometry: ScrollGeometry);

    fn set_hidden(&self, hidden: bool);

    fn is_hidden(&self) -> bool;

    /// Freeze the scroll animation (the clock is paused separately).
    fn set_paused_visual(&self, paused: bool);

    /// Unfreeze the scroll animation.
    fn resume_visual(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending,
    Ready,
    Cancelled,
}

/// One-shot readiness signal.
///
/// Starts `Pending`; moves exactly once to `Ready` (via [`signal`]) or
/// `Cancelled` (via [`cancel`], used when the engine quits before the
/// renderer ever came up). Later transitions are no-ops, so a renderer
/// double-firing its init callback is harmless.
///
/// [`signal`]: ReadyGate::signal
/// [`cancel`]: ReadyGate::cancel
pub struct ReadyGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Pending),
            cond: Condvar::new(),
        }
    }

    /// Mark the renderer ready. First call wins; never un-cancels.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        if *state == GateState::Pending {
            *state = GateState::Ready;
            self.cond.notify_all();
        }
    }

    /// Abandon the gate, unblocking waiters with `false`.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if *state == GateState::Pending {
            *state = GateState::Cancelled;
            self.cond.notify_all();
        }
    }

    /// Block until the gate resolves. Returns `true` if the renderer became
    /// ready, `false` if the gate was cancelled.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while *state == GateState::Pending {
            self.cond.wait(&mut state);
        }
        *state == GateState::Ready
    }

    pub fn is_ready(&self) -> bool {
        *self.state.lock() == GateState::Ready
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory renderer capturing every submission.
///
/// Reference backend for tests and headless runs; readiness is driven
/// manually through [`RecordingRenderer::mark_ready`].
pub struct RecordingRenderer {
    inner: Mutex<RecordingState>,
}

struct RecordingState {
    ready: bool,
    hidden: bool,
    paused: bool,
    gate: Option<Arc<ReadyGate>>,
    submissions: Vec<(DanmakuItem, usize, ScrollGeometry)>,
}

impl RecordingRenderer {
    /// A renderer that is not ready yet.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RecordingState {
                ready: false,
                hidden: false,
                paused: false,
                gate: None,
                submissions: Vec::new(),
            }),
        }
    }

    /// A renderer that reports ready from the start.
    pub fn ready() -> Self {
        let renderer = Self::new();
        renderer.inner.lock().ready = true;
        renderer
    }

    /// Flip to ready and fire the subscribed gate, as a real backend would
    /// from its init callback.
    pub fn mark_ready(&self) {
        let gate = {
            let mut state = self.inner.lock();
            state.ready = true;
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.signal();
        }
    }

    /// Copy of everything submitted so far.
    pub fn submissions(&self) -> Vec<(DanmakuItem, usize, ScrollGeometry)> {
        self.inner.lock().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.inner.lock().submissions.len()
    }

    pub fn is_paused_visual(&self) -> bool {
        self.inner.lock().paused
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DanmakuRenderer for RecordingRenderer {
    fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    fn subscribe_ready(&self, gate: Arc<ReadyGate>) {
        let mut state = self.inner.lock();
        if state.ready {
            gate.signal();
        }
        state.gate = Some(gate);
    }

    fn submit(&self, item: DanmakuItem, lane: usize, geometry: ScrollGeometry) {
        self.inner.lock().submissions.push((item, lane, geometry));
    }

    fn set_hidden(&self, hidden: bool) {
        self.inner.lock().hidden = hidden;
    }

    fn is_hidden(&self) -> bool {
        self.inner.lock().hidden
    }

    fn set_paused_visual(&self, paused: bool) {
        self.inner.lock().paused = paused;
    }

    fn resume_visual(&self) {
        self.inner.lock().paused = false;
    }
}
