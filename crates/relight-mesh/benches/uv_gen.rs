use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use relight_mesh::{AngleChartBuilder, ChartBuilder, UvGenParams, generate, primitives};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("uv_generate");
    let params = UvGenParams::default();
    let cube = primitives::cube(1.0);
    group.bench_function("cube", |b| {
        b.iter(|| black_box(generate(&cube, &params).unwrap()))
    });
    let cyl = primitives::cylinder(1.0, 2.0, 64);
    group.bench_function("cylinder_64", |b| {
        b.iter(|| black_box(generate(&cyl, &params).unwrap()))
    });
    let plane = primitives::plane(8.0, 32);
    group.bench_function("plane_32x32", |b| {
        b.iter(|| black_box(generate(&plane, &params).unwrap()))
    });
    group.finish();
}

fn bench_angle_charts(c: &mut Criterion) {
    let mut group = c.benchmark_group("angle_charts");
    let cyl = primitives::cylinder(1.0, 2.0, 256);
    group.bench_function("cylinder_256", |b| {
        b.iter(|| black_box(AngleChartBuilder::default().build(&cyl)))
    });
    group.finish();
}

fn config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(5))
}

criterion_group! {
    name = benches;
    config = config();
    targets = bench_generate, bench_angle_charts
}
criterion_main!(benches);
