use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use refract::{reflect_class, Instance, Registration, Registry, Variant};

#[derive(Clone, Default)]
struct Point {
    x: f64,
    y: f64,
}

reflect_class!(Point);

fn registry_with_point() -> &'static Registry {
    let registry = Registry::isolated();
    Registration::class_in::<Point>(registry)
        .default_constructor()
        .property("x", |p: &Point| p.x, |p: &mut Point, x| p.x = x)
        .property("y", |p: &Point| p.y, |p: &mut Point, y| p.y = y)
        .method("length", |p: &Point| (p.x * p.x + p.y * p.y).sqrt());
    registry
}

fn bench_type_lookup(c: &mut Criterion) {
    let registry = registry_with_point();
    let name = registry.type_of::<Point>().name();
    let signature = format!("  {} ", registry.type_of::<Point>().signature());

    c.bench_function("type_of_registered", |b| {
        b.iter(|| registry.type_of::<Point>());
    });

    c.bench_function("get_by_name", |b| {
        b.iter(|| registry.get_by_name(black_box(&name)));
    });

    c.bench_function("get_by_signature_spaced", |b| {
        b.iter(|| registry.get_by_signature(black_box(&signature)));
    });
}

fn bench_members(c: &mut Criterion) {
    let registry = registry_with_point();
    let ty = registry.type_of::<Point>();
    let point = Point { x: 3.0, y: 4.0 };

    c.bench_function("property_get", |b| {
        let x = ty.property("x").unwrap();
        b.iter(|| x.get_value(&Instance::from_ref(black_box(&point))));
    });

    c.bench_function("method_invoke", |b| {
        let length = ty.method("length").unwrap();
        b.iter(|| length.invoke(&mut Instance::from_ref(black_box(&point)), &[]));
    });

    c.bench_function("create_default", |b| {
        b.iter(|| ty.create(&[]));
    });
}

fn bench_conversions(c: &mut Criterion) {
    let registry = Registry::isolated();
    let mut group = c.benchmark_group("convert");

    let integer = Variant::new_in(registry, 30_000_i32);
    group.bench_with_input(BenchmarkId::new("i32", "i16"), &integer, |b, value| {
        b.iter(|| value.to_i16());
    });

    let text = Variant::new_in(registry, "12345".to_string());
    group.bench_with_input(BenchmarkId::new("string", "u32"), &text, |b, value| {
        b.iter(|| value.to_u32());
    });

    let float = Variant::new_in(registry, 1.0_f64 / 3.0);
    group.bench_with_input(BenchmarkId::new("f64", "string"), &float, |b, value| {
        b.iter(|| value.to_string());
    });

    group.finish();
}

criterion_group!(benches, bench_type_lookup, bench_members, bench_conversions);
criterion_main!(benches);
