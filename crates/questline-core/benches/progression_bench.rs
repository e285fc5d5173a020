//! # Progression Benchmarks
//!
//! Performance benchmarks for questline-core rule evaluation.
//!
//! Run with: `cargo bench -p questline-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use questline_core::{
    ActionParams, BadgeEngine, LevelSystem, ManualClock, MetricKey, ProgressionStore,
    UnlockedBadges, UserMetrics, XpSource, snapshot_from_bytes, snapshot_to_bytes,
};
use std::hint::black_box;
use std::sync::Arc;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(2026, 1, 5, 10).expect("valid date"))
}

/// A store with `days` of daily activity behind it.
fn seasoned_store(days: usize) -> ProgressionStore {
    let clock = clock();
    let mut store = ProgressionStore::new(clock.clone());
    for _ in 0..days {
        let _ = store.record_daily_login();
        let _ = store.record_action(XpSource::Lesson, ActionParams::with_score(95));
        let _ = store.record_action(XpSource::Quiz, ActionParams::with_score(80));
        clock.advance_days(1);
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_level_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_for");

    for total in [0u64, 10_000, 1_000_000, u64::MAX].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(total), total, |b, &total| {
            b.iter(|| black_box(LevelSystem::level_for(black_box(total))));
        });
    }

    group.finish();
}

fn bench_badge_scan(c: &mut Criterion) {
    let engine = BadgeEngine::new();
    let now = chrono::Utc::now();
    let mut metrics = UserMetrics::new();
    for key in MetricKey::ALL {
        metrics.set(key, 12);
    }
    let unlocked = UnlockedBadges::new();

    c.bench_function("badge_full_scan", |b| {
        b.iter(|| black_box(engine.check_all_unlocks(&metrics, &unlocked, now)));
    });
}

fn bench_record_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_action");

    for days in [0usize, 30, 120].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(days), days, |b, &days| {
            let mut store = seasoned_store(days);
            b.iter(|| {
                black_box(store.record_action(XpSource::Lesson, ActionParams::with_score(100)))
            });
        });
    }

    group.finish();
}

fn bench_snapshot_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_codec");
    let snapshot = seasoned_store(60).snapshot();
    let bytes = snapshot_to_bytes(&snapshot).expect("encode");

    group.bench_function("encode", |b| {
        b.iter(|| black_box(snapshot_to_bytes(&snapshot)));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(snapshot_from_bytes(&bytes)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_level_for,
    bench_badge_scan,
    bench_record_action,
    bench_snapshot_codec,
);

criterion_main!(benches);
