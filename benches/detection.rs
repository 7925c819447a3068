//! Deadlock detection benchmark.
//!
//! Measures `detect_deadlock` on chain-shaped graphs, where the reduction
//! needs one pass per process, and on a ring that never reduces.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rag_engine::{ProcessId, ResourceAllocationGraph, ResourceId};

/// P_i holds R_i and waits for R_{i+1}; the last process waits for nothing
/// (chain) or for R_0 (ring).
fn build(n: usize, ring: bool) -> ResourceAllocationGraph {
    let mut g = ResourceAllocationGraph::new();
    let pids: Vec<ProcessId> = (0..n).map(|_| g.register_process(None).unwrap()).collect();
    let rids: Vec<ResourceId> = (0..n)
        .map(|_| g.register_resource(None, Some(1)).unwrap())
        .collect();
    for i in 0..n {
        g.allocate(&pids[i], &rids[i], 1).unwrap();
        if i + 1 < n {
            g.request(&pids[i], &rids[i + 1], 1).unwrap();
        } else if ring {
            g.request(&pids[i], &rids[0], 1).unwrap();
        }
    }
    g
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_chain");
    for &n in &[8usize, 64, 256] {
        let graph = build(n, false);
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, g| {
            b.iter(|| black_box(g).detect_deadlock());
        });
    }
    group.finish();
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_ring");
    for &n in &[8usize, 64, 256] {
        let graph = build(n, true);
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, g| {
            b.iter(|| black_box(g).detect_deadlock());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_ring);
criterion_main!(benches);
