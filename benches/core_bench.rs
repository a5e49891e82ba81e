//! Benchmarks for trellis core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis::core::parser::{parse_devfile, YamlSchema};
use trellis::core::resolver::Resolver;
use trellis::core::source::MemorySource;
use trellis::core::types::CommandGroupKind;
use trellis::engine::{select_default_command, CommandModel};

/// A devfile with `n` containers and an exec command per container.
fn devfile_yaml(n: usize, parent: Option<&str>) -> String {
    let mut yaml = String::from("schemaVersion: 2.2.0\nmetadata:\n  name: bench\n");
    if let Some(uri) = parent {
        yaml.push_str(&format!("parent:\n  uri: {}\n", uri));
    }
    yaml.push_str("components:\n");
    for i in 0..n {
        yaml.push_str(&format!(
            "  - name: c{i}\n    container:\n      image: alpine\n      endpoints:\n        - {{name: http-{i}, targetPort: {port}}}\n",
            port = 3000 + i
        ));
    }
    yaml.push_str("commands:\n");
    for i in 0..n {
        yaml.push_str(&format!(
            "  - id: cmd{i}\n    exec:\n      component: c{i}\n      commandLine: make {i}\n      group: {{kind: build, isDefault: {}}}\n",
            i == n - 1
        ));
    }
    yaml
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_devfile");
    for size in [4, 32, 128] {
        let yaml = devfile_yaml(size, None);
        group.bench_with_input(BenchmarkId::from_parameter(size), &yaml, |b, yaml| {
            b.iter(|| {
                let d = parse_devfile(black_box(yaml.as_bytes())).unwrap();
                black_box(d);
            });
        });
    }
    group.finish();
}

fn bench_resolve_parent(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_parent");
    for size in [4, 32, 128] {
        let parent = devfile_yaml(size, None);
        let child = "schemaVersion: 2.2.0\nmetadata:\n  name: child\nparent:\n  uri: parent.yaml\ncomponents:\n  - name: extra\n    container: {image: busybox}\n";
        let source = MemorySource::new().with("parent.yaml", parent);
        group.bench_with_input(BenchmarkId::from_parameter(size), &child, |b, child| {
            let resolver = Resolver::new(&source, &YamlSchema);
            b.iter(|| {
                let d = resolver
                    .resolve_raw(black_box(child.as_bytes()), "devfile.yaml")
                    .unwrap();
                black_box(d);
            });
        });
    }
    group.finish();
}

fn bench_select_and_model(c: &mut Criterion) {
    let d = parse_devfile(devfile_yaml(64, None).as_bytes()).unwrap();
    c.bench_function("select_default_build", |b| {
        b.iter(|| {
            let cmd = select_default_command(black_box(&d), CommandGroupKind::Build).unwrap();
            black_box(CommandModel::new(&d, cmd).unwrap());
        });
    });
}

fn bench_chain_hash(c: &mut Criterion) {
    let raw = devfile_yaml(128, None);
    c.bench_function("blake3_document", |b| {
        b.iter(|| black_box(blake3::hash(black_box(raw.as_bytes()))));
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_resolve_parent,
    bench_select_and_model,
    bench_chain_hash,
);
criterion_main!(benches);
