//! Lane occupancy tracking and the placement algorithm.
//!
//! A lane is one horizontal track holding at most one visible item at a time.
//! The table records, per lane, the earliest playback time at which the next
//! item may enter without overlapping the current occupant. Placement is a
//! pure scan over that table, which keeps the whole algorithm testable without
//! threads, clocks, or a renderer.
//!
//! The table is owned exclusively by the dispatch worker; nothing here locks.

use crate::config::DanmakuConfig;
use crate::item::DanmakuItem;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with a due item when no lane is free at its due time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Drop the item. Observable through counters only.
    #[default]
    Discard,
    /// Place into the lane that frees up soonest, accepting a brief overlap.
    ForceEarliest,
}

/// Screen-space placement handed to the renderer together with the item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollGeometry {
    /// Entry x position: the right edge of the viewport.
    pub x: f32,
    /// Top y position derived from the assigned lane.
    pub y: f32,
    /// Horizontal scroll speed in pixels per second.
    pub speed: f32,
    /// Time from entry until the item has fully scrolled off-screen.
    pub exit_after: Duration,
}

/// Outcome of a placement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Placed { lane: usize, geometry: ScrollGeometry },
    /// No lane was free and the policy says drop.
    Rejected,
}

/// Per-lane free-at times.
pub struct LaneTable {
    free_at: Vec<Duration>,
}

impl LaneTable {
    pub fn new(lane_count: usize) -> Self {
        Self {
            free_at: vec![Duration::ZERO; lane_count],
        }
    }

    pub fn lane_count(&self) -> usize {
        self.free_at.len()
    }

    /// Mark every lane free. Used on seeks and geometry changes, where stale
    /// free-at times would either block all lanes (backward seek) or mean
    /// nothing (new geometry).
    pub fn reset(&mut self) {
        self.free_at.fill(Duration::ZERO);
    }

    /// Resize to a new lane count, freeing every lane.
    pub fn rebuild(&mut self, lane_count: usize) {
        self.free_at.clear();
        self.free_at.resize(lane_count, Duration::ZERO);
    }

    /// Try to place a due item.
    ///
    /// Scans lanes in ascending index order and takes the first one whose
    /// free-at time is not after the item's due time, so layout is
    /// deterministic for a given input sequence. On a collision the configured
    /// policy decides between dropping and forcing into the soonest-free lane.
    /// The chosen lane is reserved until `offset + occupancy`, where occupancy
    /// is the time the item needs to clear the viewport.
    pub fn place(&mut self, item: &DanmakuItem, config: &DanmakuConfig) -> Placement {
        let occupancy = occupancy_duration(item.width, config);

        let lane = self
            .free_at
            .iter()
            .position(|&free_at| free_at <= item.offset)
            .or_else(|| match config.collision_policy {
                CollisionPolicy::Discard => None,
                CollisionPolicy::ForceEarliest => self
                    .free_at
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, &free_at)| free_at)
                    .map(|(index, _)| index),
            });

        match lane {
            Some(lane) => {
                self.free_at[lane] = item.offset + occupancy;
                Placement::Placed {
                    lane,
                    geometry: geometry_for(lane, occupancy, config),
                }
            }
            None => Placement::Rejected,
        }
    }
}

/// Time a lane must stay reserved so the following item cannot overlap:
/// the item has to travel the full viewport plus its own width.
pub fn occupancy_duration(item_width: f32, config: &DanmakuConfig) -> Duration {
    let distance = config.viewport_width + item_width;
    Duration::from_secs_f64(f64::from(distance) / f64::from(config.scroll_speed))
}

fn geometry_for(lane: usize, occupancy: Duration, config: &DanmakuConfig) -> ScrollGeometry {
    ScrollGeometry {
        x: config.viewport_width,
        y: lane as f32 * (config.lane_height + config.lane_spacing),
        speed: config.scroll_speed,
        exit_after: occupancy,
    }
}
