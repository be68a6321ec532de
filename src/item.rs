//! Danmaku item representation shared by the pool, dispatcher, and renderer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static ITEM_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A single timed scrolling text overlay unit.
///
/// Each [`DanmakuItem`] captures its display payload, the playback-clock time at
/// which it becomes due, and its measured pixel extents. Items are immutable
/// once created; lane assignment and scroll geometry are computed at dispatch
/// time and travel alongside the item to the renderer rather than mutating it.
#[derive(Debug, Clone)]
pub struct DanmakuItem {
    pub id: u64,
    pub text: String,
    /// Due time relative to the playback clock's zero point.
    pub offset: Duration,
    pub width: f32,
    pub height: f32,
}

impl DanmakuItem {
    /// Create an item with externally measured extents.
    ///
    /// Text measurement belongs to the rendering side; callers that have a
    /// real font stack pass the measured width and height here.
    pub fn new(text: impl Into<String>, offset: Duration, width: f32, height: f32) -> Self {
        DanmakuItem {
            id: ITEM_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            text: text.into(),
            offset,
            width,
            height,
        }
    }

    /// Create an item estimating width from glyph count and line height.
    ///
    /// Good enough for tests and headless runs where no measurer is wired up.
    pub fn with_estimated_width(text: impl Into<String>, offset: Duration, line_height: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * line_height * 0.6;
        DanmakuItem {
            id: ITEM_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            text,
            offset,
            width,
            height: line_height,
        }
    }
}
