pub mod clock;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod item;
pub mod lane;
pub mod pool;
pub mod renderer;
pub mod stats;
pub mod threading;

// Re-export the surface most callers need.
pub use clock::PlaybackClock;
pub use config::{ConfigError, ConfigHandle, DanmakuConfig};
pub use controller::DanmakuController;
pub use dispatcher::{DanmakuDispatcher, DispatchState};
pub use item::DanmakuItem;
pub use lane::{CollisionPolicy, LaneTable, Placement, ScrollGeometry};
pub use pool::DanmakuPool;
pub use renderer::{DanmakuRenderer, ReadyGate, RecordingRenderer};
pub use stats::DispatchSnapshot;
