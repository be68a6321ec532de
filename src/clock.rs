//! Playback clock shared between the facade and the dispatch worker.
//!
//! The clock tracks playback position, not wall time: `sync` re-anchors it to
//! the player's position (initial sync and seeks both go through it), `pause`
//! freezes it, and while running it advances at real-time rate from the last
//! anchor. One instance exists per playback session and is passed around by
//! cloning the handle.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct ClockState {
    /// Playback position at the last sync/pause.
    base: Duration,
    /// Wall-clock anchor the running clock advances from.
    anchor: Instant,
    paused: bool,
}

/// Seekable, pausable source of "current playback time".
///
/// Cloning yields another handle onto the same clock. All methods are safe
/// from any thread; readers can never observe a torn update because position
/// and anchor live under one lock.
#[derive(Clone)]
pub struct PlaybackClock {
    state: Arc<Mutex<ClockState>>,
}

impl PlaybackClock {
    /// A clock positioned at zero and running.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                base: Duration::ZERO,
                anchor: Instant::now(),
                paused: false,
            })),
        }
    }

    /// Current playback position.
    pub fn now(&self) -> Duration {
        let state = self.state.lock();
        if state.paused {
            state.base
        } else {
            state.base + state.anchor.elapsed()
        }
    }

    /// Re-anchor so that `now()` returns `position` immediately after.
    ///
    /// Used both for the initial sync against the player and for seeks.
    /// Concurrent syncs resolve last-writer-wins.
    pub fn sync(&self, position: Duration) {
        let mut state = self.state.lock();
        state.base = position;
        state.anchor = Instant::now();
    }

    /// Freeze the clock at its current position. Idempotent.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if !state.paused {
            let elapsed = state.anchor.elapsed();
            state.base += elapsed;
            state.paused = true;
        }
    }

    /// Resume advancing from the frozen position. Idempotent.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if state.paused {
            state.anchor = Instant::now();
            state.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sync_takes_effect_immediately() {
        let clock = PlaybackClock::new();
        clock.sync(Duration::from_secs(90));
        let now = clock.now();
        assert!(now >= Duration::from_secs(90));
        assert!(now < Duration::from_secs(91));
    }

    #[test]
    fn clock_advances_while_running() {
        let clock = PlaybackClock::new();
        clock.sync(Duration::from_millis(100));
        thread::sleep(Duration::from_millis(20));
        assert!(clock.now() >= Duration::from_millis(120));
    }

    #[test]
    fn pause_freezes_position() {
        let clock = PlaybackClock::new();
        clock.sync(Duration::from_secs(5));
        clock.pause();
        let frozen = clock.now();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.now(), frozen);

        clock.resume();
        thread::sleep(Duration::from_millis(20));
        assert!(clock.now() > frozen);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let clock = PlaybackClock::new();
        clock.pause();
        let frozen = clock.now();
        clock.pause();
        assert_eq!(clock.now(), frozen);
        clock.resume();
        clock.resume();
        assert!(!clock.is_paused());
    }

    #[test]
    fn handles_share_one_clock() {
        let clock = PlaybackClock::new();
        let other = clock.clone();
        clock.sync(Duration::from_secs(30));
        assert!(other.now() >= Duration::from_secs(30));
    }

    #[test]
    fn backward_sync_moves_the_clock_back() {
        let clock = PlaybackClock::new();
        clock.sync(Duration::from_secs(60));
        clock.sync(Duration::from_secs(10));
        let now = clock.now();
        assert!(now >= Duration::from_secs(10));
        assert!(now < Duration::from_secs(11));
    }
}
