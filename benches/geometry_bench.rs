use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mmdc::rendering::geometry::resolve;
use mmdc::NaturalBox;

fn bench_resolve(c: &mut Criterion) {
    let natural = NaturalBox { width: 1234.0, height: 567.0, x: -8.0, y: -8.0 };

    c.bench_function("resolve_natural_96dpi", |b| {
        b.iter(|| resolve(black_box(&natural), None, None, black_box(96)).unwrap())
    });

    c.bench_function("resolve_width_only_300dpi", |b| {
        b.iter(|| resolve(black_box(&natural), Some(black_box(800)), None, black_box(300)).unwrap())
    });
}

fn bench_route(c: &mut Criterion) {
    c.bench_function("route_file_descriptor", |b| {
        b.iter(|| mmdc::output::route(black_box("out/diagram.PNG"), None).unwrap())
    });
}

criterion_group!(benches, bench_resolve, bench_route);
criterion_main!(benches);
