//! Write-to-render propagation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vbind_core::dom::Node;
use vbind_core::reactive::Object;
use vbind_core::{Options, ViewModel};

/// A template with `rows` text nodes all interpolating the same property.
fn fan_out(rows: usize) -> ViewModel<Node> {
    let app = Node::element("ul").with_children(
        (0..rows).map(|_| Node::element("li").with_child(Node::text("{{ user.name }} #{{ count }}"))),
    );
    let data = Object::parse_json(r#"{"user":{"name":"Ann"},"count":0}"#).expect("valid json");
    ViewModel::new(Options::new(app, data)).expect("template compiles")
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    for rows in [1usize, 10, 100] {
        let vm = fan_out(rows);
        let mut count = 0i64;
        group.bench_with_input(BenchmarkId::new("write_fan_out", rows), &rows, |b, _| {
            b.iter(|| {
                count += 1;
                vm.set("count", black_box(count)).expect("write succeeds");
            })
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_100_rows", |b| b.iter(|| black_box(fan_out(100))));
}

criterion_group!(benches, bench_propagation, bench_compile);
criterion_main!(benches);
