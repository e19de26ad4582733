use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use timeline_core::{build_generation_app, run_generation, GeoPoint, InputBundle};

fn bench_cone_query(c: &mut Criterion) {
    let context = InputBundle::builtin()
        .build_context()
        .expect("builtin inputs build");
    let index = Arc::clone(&context.index);
    let mut group = c.benchmark_group("cone_query");

    for degrees in [5.0f64, 15.0, 30.0, 60.0] {
        group.bench_with_input(BenchmarkId::new("radius_deg", degrees), &degrees, |b, &degrees| {
            let center = GeoPoint::from_degrees(62.0, 179.0);
            b.iter(|| index.regions_in_cone(center, degrees.to_radians(), true));
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");

    for steps in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::new("time_steps", steps), &steps, |b, &steps| {
            b.iter_batched(
                || {
                    let mut bundle = InputBundle::builtin();
                    bundle.scenario.time_steps = steps;
                    let context = bundle.build_context().expect("builtin inputs build");
                    build_generation_app(Arc::new(context))
                },
                |mut app| run_generation(&mut app).expect("generation succeeds"),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(generation_benches, bench_cone_query, bench_generation);
criterion_main!(generation_benches);
