//! Benchmarks for a full CPU solver frame.
//!
//! Run with: `cargo bench`

use bodyflow::prelude::*;
use bodyflow::SourceAggregator;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

fn pointer_source(frame: u32) -> Source {
    let a = frame as f32 * 0.1;
    Source {
        coords: Vec2::new(0.4 * a.cos(), 0.4 * a.sin()),
        diff: Vec2::new(-0.04 * a.sin(), 0.04 * a.cos()),
        moved: true,
    }
}

fn bench_pointer_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("pointer_frame");
    group.sample_size(20);

    for width in [160u32, 320, 640] {
        let viewport = UVec2::new(width, width * 9 / 16);
        group.bench_with_input(BenchmarkId::new("viewport", width), &viewport, |b, &viewport| {
            let options = SimulationOptions::default().with_resolution(1.0);
            let mut sim = Simulation::new(CpuBackend::new(), options);
            sim.resize(viewport).unwrap();
            let mut frame = 0u32;
            b.iter(|| {
                frame += 1;
                let inputs = FrameInputs::pointer(pointer_source(frame));
                black_box(sim.update(frame as f32 * 0.016, &inputs).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_body_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_frame");
    group.sample_size(20);

    for people in [1usize, 4] {
        group.bench_with_input(BenchmarkId::new("people", people), &people, |b, &people| {
            let options = SimulationOptions::default()
                .with_resolution(1.0)
                .with_input_mode(InputMode::Body)
                .with_swirl(true, 0.5)
                .with_viscous(true, 30.0, 8);
            let mut sim = Simulation::new(CpuBackend::new(), options);
            sim.resize(UVec2::new(320, 180)).unwrap();

            let tracker = SharedTracker::new();
            let dancer = DemoDancer::new(people).with_hands(true);
            let mut frame = 0u32;
            b.iter(|| {
                frame += 1;
                let now = frame as f32 * 0.016;
                dancer.publish(&tracker, now);
                let inputs = FrameInputs::tracking(tracker.snapshot_at(now));
                black_box(sim.update(now, &inputs).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let tracker = SharedTracker::new();
    DemoDancer::new(4).with_hands(true).publish(&tracker, 0.5);
    let inputs = FrameInputs::tracking(tracker.snapshot_at(0.5));
    let options = SimulationOptions::default().with_input_mode(InputMode::Body);
    let grid = bodyflow::GridSize::new(320, 180);

    // A fresh aggregator per batch so every run injects the tracked displacement.
    c.bench_function("aggregate_four_people", |b| {
        b.iter_batched(
            SourceAggregator::new,
            |mut aggregator| black_box(aggregator.collect(&options, grid, &inputs).lines.len()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_pointer_frame, bench_body_frame, bench_aggregation);
criterion_main!(benches);
