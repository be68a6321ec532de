//! Lane geometry and scroll configuration.
//!
//! Configuration is validated at this boundary so the dispatch loop never has
//! to reason about degenerate values. A shared [`ConfigHandle`] carries a
//! generation counter: the dispatch worker compares generations each iteration
//! and rebuilds its lane table whenever the geometry changed.

use crate::lane::CollisionPolicy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("lane count must be at least 1, got {0}")]
    LaneCount(usize),
    #[error("lane height must be positive, got {0}")]
    LaneHeight(f32),
    #[error("lane spacing must not be negative, got {0}")]
    LaneSpacing(f32),
    #[error("scroll speed must be positive, got {0}")]
    ScrollSpeed(f32),
    #[error("viewport width must be positive, got {0}")]
    ViewportWidth(f32),
}

/// Geometry and pacing knobs for the dispatch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanmakuConfig {
    /// Number of horizontal lanes available for placement.
    pub lane_count: usize,
    /// Height of one lane in pixels.
    pub lane_height: f32,
    /// Vertical gap between adjacent lanes in pixels.
    pub lane_spacing: f32,
    /// Horizontal scroll speed in pixels per second.
    pub scroll_speed: f32,
    /// Width of the playback surface in pixels.
    pub viewport_width: f32,
    /// What to do with a due item when no lane is free.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

impl Default for DanmakuConfig {
    fn default() -> Self {
        Self {
            lane_count: 8,
            lane_height: 28.0,
            lane_spacing: 8.0,
            scroll_speed: 120.0,
            viewport_width: 1280.0,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl DanmakuConfig {
    /// Check every field against its documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::LaneCount(self.lane_count));
        }
        if !(self.lane_height > 0.0) {
            return Err(ConfigError::LaneHeight(self.lane_height));
        }
        if !(self.lane_spacing >= 0.0) {
            return Err(ConfigError::LaneSpacing(self.lane_spacing));
        }
        if !(self.scroll_speed > 0.0) {
            return Err(ConfigError::ScrollSpeed(self.scroll_speed));
        }
        if !(self.viewport_width > 0.0) {
            return Err(ConfigError::ViewportWidth(self.viewport_width));
        }
        Ok(())
    }
}

/// Shared, mutation-tracked configuration.
///
/// Control-side setters validate before committing and bump the generation;
/// the worker treats any generation change as "geometry changed, reset lanes".
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ConfigInner>,
}

struct ConfigInner {
    config: Mutex<DanmakuConfig>,
    generation: AtomicU64,
}

impl ConfigHandle {
    pub fn new(config: DanmakuConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ConfigInner {
                config: Mutex::new(config),
                generation: AtomicU64::new(0),
            }),
        })
    }

    /// Snapshot the current configuration.
    pub fn get(&self) -> DanmakuConfig {
        self.inner.config.lock().clone()
    }

    /// Generation counter, bumped on every committed change.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn set_lane_count(&self, lane_count: usize) -> Result<(), ConfigError> {
        self.update(|config| config.lane_count = lane_count)
    }

    pub fn set_lane_height(&self, lane_height: f32) -> Result<(), ConfigError> {
        self.update(|config| config.lane_height = lane_height)
    }

    pub fn set_lane_spacing(&self, lane_spacing: f32) -> Result<(), ConfigError> {
        self.update(|config| config.lane_spacing = lane_spacing)
    }

    pub fn set_scroll_speed(&self, scroll_speed: f32) -> Result<(), ConfigError> {
        self.update(|config| config.scroll_speed = scroll_speed)
    }

    pub fn set_viewport_width(&self, viewport_width: f32) -> Result<(), ConfigError> {
        self.update(|config| config.viewport_width = viewport_width)
    }

    pub fn set_collision_policy(&self, policy: CollisionPolicy) -> Result<(), ConfigError> {
        self.update(|config| config.collision_policy = policy)
    }

    /// Apply a mutation, committing it only if the result validates.
    fn update(&self, mutate: impl FnOnce(&mut DanmakuConfig)) -> Result<(), ConfigError> {
        let mut guard = self.inner.config.lock();
        let mut candidate = guard.clone();
        mutate(&mut candidate);
        candidate.validate()?;
        *guard = candidate;
        self.inner.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DanmakuConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_lane_count() {
        let handle = ConfigHandle::new(DanmakuConfig::default()).unwrap();
        assert_eq!(handle.set_lane_count(0), Err(ConfigError::LaneCount(0)));
        // Rejected change must not be visible.
        assert_eq!(handle.get().lane_count, DanmakuConfig::default().lane_count);
    }

    #[test]
    fn rejects_non_positive_height_and_speed() {
        let handle = ConfigHandle::new(DanmakuConfig::default()).unwrap();
        assert!(handle.set_lane_height(0.0).is_err());
        assert!(handle.set_lane_height(-3.0).is_err());
        assert!(handle.set_scroll_speed(0.0).is_err());
    }

    #[test]
    fn generation_moves_only_on_committed_changes() {
        let handle = ConfigHandle::new(DanmakuConfig::default()).unwrap();
        let before = handle.generation();
        handle.set_lane_count(4).unwrap();
        assert_eq!(handle.generation(), before + 1);
        let _ = handle.set_lane_count(0);
        assert_eq!(handle.generation(), before + 1);
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = DanmakuConfig {
            viewport_width: 0.0,
            ..DanmakuConfig::default()
        };
        assert!(ConfigHandle::new(config).is_err());
    }
}
