use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use danmaku_engine::{CollisionPolicy, DanmakuConfig, DanmakuItem, DanmakuPool, LaneTable};

fn bench_config() -> DanmakuConfig {
    DanmakuConfig {
        lane_count: 16,
        lane_height: 24.0,
        lane_spacing: 6.0,
        scroll_speed: 400.0,
        viewport_width: 1920.0,
        collision_policy: CollisionPolicy::Discard,
    }
}

fn bench_lane_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("lane_table");

    group.bench_function("place_free_lane", |b| {
        let config = bench_config();
        let item = DanmakuItem::new("bench", Duration::from_millis(0), 200.0, 24.0);
        b.iter(|| {
            let mut lanes = LaneTable::new(config.lane_count);
            black_box(lanes.place(black_box(&item), &config));
        });
    });

    group.bench_function("place_burst_of_64", |b| {
        let config = bench_config();
        let items: Vec<DanmakuItem> = (0..64)
            .map(|i| DanmakuItem::new("bench", Duration::from_millis(i * 30), 200.0, 24.0))
            .collect();
        b.iter(|| {
            let mut lanes = LaneTable::new(config.lane_count);
            for item in &items {
                black_box(lanes.place(black_box(item), &config));
            }
        });
    });
}

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");

    group.bench_function("offer", |b| {
        let pool = DanmakuPool::new();
        b.iter(|| {
            pool.offer(black_box(DanmakuItem::new(
                "bench",
                Duration::from_millis(10),
                100.0,
                24.0,
            )));
        });
        pool.clear();
    });

    group.bench_function("offer_then_drain_1000", |b| {
        b.iter(|| {
            let pool = DanmakuPool::new();
            for i in 0..1000u64 {
                pool.offer(DanmakuItem::new(
                    "bench",
                    Duration::from_millis(i % 500),
                    100.0,
                    24.0,
                ));
            }
            black_box(pool.drain_due(Duration::from_millis(250)));
            black_box(pool.drain_due(Duration::from_millis(500)));
        });
    });
}

criterion_group!(benches, bench_lane_placement, bench_pool);
criterion_main!(benches);
