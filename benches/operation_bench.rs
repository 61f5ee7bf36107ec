use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use simplex_forge::prelude::*;

fn grid(n: i64) -> Mesh {
    let mut cells = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let v = i * (n + 1) + j;
            cells.push([v, v + 1, v + n + 2]);
            cells.push([v, v + n + 2, v + n + 1]);
        }
    }
    Mesh::tri_mesh(&cells).expect("grid cells form a valid mesh")
}

fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation");
    for &n in &[16i64, 32] {
        let m = grid(n);
        let faces = m.simplices(PrimitiveType::Face);
        group.bench_with_input(BenchmarkId::new("switch_walk", n), &n, |b, _| {
            b.iter(|| {
                let mut hops = 0usize;
                for t in &faces {
                    let mut s = m.switch_edge(t);
                    if let Some(across) = m.try_switch_tuple(&s, PrimitiveType::Face) {
                        s = across;
                        hops += 1;
                    }
                    black_box(m.vertex_id(&s));
                }
                black_box(hops);
            });
        });
        group.bench_with_input(BenchmarkId::new("vertex_star", n), &n, |b, _| {
            b.iter(|| {
                for v in 0..(n + 1) * (n + 1) {
                    black_box(m.vertex_star(v));
                }
            });
        });
    }
    group.finish();
}

fn bench_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("operations");
    group.sample_size(20);
    for &n in &[8i64, 16] {
        group.bench_with_input(BenchmarkId::new("split_sweep", n), &n, |b, &n| {
            b.iter_batched(
                || grid(n),
                |m| {
                    let stats = Scheduler::default()
                        .run(&m, &EdgeSplit::with_defaults())
                        .expect("split sweep");
                    black_box(stats);
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("collapse_sweep", n), &n, |b, &n| {
            b.iter_batched(
                || grid(n),
                |m| {
                    let stats = Scheduler::default()
                        .run(&m, &EdgeCollapse::with_defaults())
                        .expect("collapse sweep");
                    black_box(stats);
                },
                BatchSize::SmallInput,
            );
        });
        #[cfg(feature = "rayon")]
        group.bench_with_input(BenchmarkId::new("parallel_split_sweep", n), &n, |b, &n| {
            b.iter_batched(
                || grid(n),
                |m| {
                    let stats = Scheduler::default()
                        .run_parallel(&m, &EdgeSplit::with_defaults())
                        .expect("parallel split sweep");
                    black_box(stats);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_navigation, bench_operations);
criterion_main!(benches);
