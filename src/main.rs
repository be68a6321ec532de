// Headless demo binary.
//
// Drives the engine end-to-end without a GPU: a console renderer logs every
// submission, a producer thread feeds scripted items against a running clock,
// and the stats feed is printed as JSON lines until Ctrl+C.

use danmaku_engine::{
    CollisionPolicy, DanmakuConfig, DanmakuController, DanmakuItem, DanmakuRenderer, ReadyGate,
    ScrollGeometry,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Renderer that prints submissions instead of drawing them. Reports ready
/// shortly after startup from a background thread, which exercises the
/// deferred-start path the same way a GPU backend would.
struct ConsoleRenderer {
    ready: AtomicBool,
    hidden: AtomicBool,
    paused: AtomicBool,
    gate: Mutex<Option<Arc<ReadyGate>>>,
}

impl ConsoleRenderer {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        if let Some(gate) = self.gate.lock().clone() {
            gate.signal();
        }
    }
}

impl DanmakuRenderer for ConsoleRenderer {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn subscribe_ready(&self, gate: Arc<ReadyGate>) {
        if self.is_ready() {
            gate.signal();
        }
        *self.gate.lock() = Some(gate);
    }

    fn submit(&self, item: DanmakuItem, lane: usize, geometry: ScrollGeometry) {
        if !self.hidden.load(Ordering::Acquire) {
            info!(
                lane,
                y = geometry.y,
                offset_ms = item.offset.as_millis() as u64,
                "display {:?}",
                item.text
            );
        }
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::Release);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::Acquire)
    }

    fn set_paused_visual(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    fn resume_visual(&self) {
        self.paused.store(false, Ordering::Release);
    }
}

struct CliOptions {
    lanes: usize,
    speed: f32,
    policy: CollisionPolicy,
}

fn parse_cli_options() -> CliOptions {
    let mut options = CliOptions {
        lanes: 6,
        speed: 160.0,
        policy: CollisionPolicy::Discard,
    };
    for arg in std::env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            match key {
                "--lanes" => {
                    if let Ok(lanes) = value.parse() {
                        options.lanes = lanes;
                    }
                }
                "--speed" => {
                    if let Ok(speed) = value.parse() {
                        options.speed = speed;
                    }
                }
                "--policy" => {
                    options.policy = match value {
                        "force" | "force-earliest" => CollisionPolicy::ForceEarliest,
                        _ => CollisionPolicy::Discard,
                    };
                }
                _ => {}
            }
        }
    }
    options
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let options = parse_cli_options();

    let renderer = Arc::new(ConsoleRenderer::new());
    let config = DanmakuConfig {
        lane_count: options.lanes,
        scroll_speed: options.speed,
        collision_policy: options.policy,
        ..DanmakuConfig::default()
    };
    let controller = Arc::new(DanmakuController::new(renderer.clone(), config)?);

    // Start first, then bring the renderer up: dispatching begins when the
    // gate fires.
    controller.start();
    controller.sync_time(Duration::ZERO);
    let renderer_init = renderer.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        renderer_init.mark_ready();
    });

    // Scripted producer: a burst every 200 ms, items due slightly ahead of
    // the clock so they dispatch on arrival.
    let running = Arc::new(AtomicBool::new(true));
    let producer_running = running.clone();
    let producer_controller = controller.clone();
    let producer = std::thread::spawn(move || {
        let mut tick = 0u64;
        while producer_running.load(Ordering::Relaxed) {
            let offset = Duration::from_millis(tick * 200);
            producer_controller.add_danmakus(vec![
                DanmakuItem::with_estimated_width(format!("comment #{tick}"), offset, 24.0),
                DanmakuItem::with_estimated_width(format!("reply to #{tick}"), offset, 24.0),
            ]);
            tick += 1;
            std::thread::sleep(Duration::from_millis(200));
        }
    });

    let shutdown = running.clone();
    ctrlc::set_handler(move || {
        shutdown.store(false, Ordering::Relaxed);
    })?;

    // Print the worker's periodic snapshots until Ctrl+C.
    let stats = controller.stats_feed();
    while running.load(Ordering::Relaxed) {
        match stats.recv_timeout(Duration::from_millis(200)) {
            Ok(snapshot) => println!("{}", serde_json::to_string(&snapshot)?),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    producer.join().ok();
    controller.stop();
    println!("{}", serde_json::to_string(&controller.stats())?);

    Ok(())
}
