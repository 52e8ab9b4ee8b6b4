use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use sirenia_dot::dot_layout;
use sirenia_dot::network_simplex::{self, NsOptions};
use sirenia_graph::{FNode, FastGraph, Graph, NodeKind};
use std::hint::black_box;
use std::time::Duration;

#[derive(Debug, Clone)]
struct DagSpec {
    nodes: usize,
    /// `(tail, head, minlen, weight)`.
    edges: Vec<(usize, usize, i32, i32)>,
}

impl DagSpec {
    fn fast(&self) -> FastGraph<(), ()> {
        let mut g = FastGraph::with_capacity(self.nodes, self.edges.len());
        for _ in 0..self.nodes {
            g.add_node(NodeKind::Normal, ());
        }
        for &(t, h, minlen, weight) in &self.edges {
            g.add_edge(FNode(t), FNode(h), weight, minlen, ());
        }
        g
    }

    fn graph(&self) -> Graph {
        let mut g = Graph::new("bench", true);
        let ids: Vec<_> = (0..self.nodes).map(|i| g.add_node(format!("n{i}"))).collect();
        for &(t, h, minlen, weight) in &self.edges {
            let e = g.add_edge(ids[t], ids[h]);
            g.set_edge_attr(e, "minlen", &minlen.to_string());
            g.set_edge_attr(e, "weight", &weight.to_string());
        }
        g
    }
}

fn build_dag_spec(nodes: usize, fanout: usize) -> DagSpec {
    let mut edges = Vec::new();
    // A spine to guarantee connectivity.
    for i in 0..nodes.saturating_sub(1) {
        edges.push((i, i + 1, 1, 2));
    }
    for i in 0..nodes {
        for k in 2..=(fanout + 1) {
            let to = i + k;
            if to >= nodes {
                break;
            }
            edges.push((i, to, 1, 1));
        }
        let to = i + 10;
        if to < nodes {
            edges.push((i, to, 2, 1));
        }
    }
    DagSpec { nodes, edges }
}

fn bench_network_simplex(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_simplex");
    group.measurement_time(Duration::from_secs(10));

    let cases = [("dag_50_f3", 50usize, 3usize), ("dag_200_f4", 200, 4), ("dag_400_f4", 400, 4)];
    for (name, nodes, fanout) in cases {
        let spec = build_dag_spec(nodes, fanout);
        group.bench_with_input(BenchmarkId::new("rank", name), &spec, |b, spec| {
            b.iter_batched(
                || spec.fast(),
                |mut g| {
                    let stats = network_simplex::rank(black_box(&mut g), &NsOptions::default());
                    black_box(stats.is_ok());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_dot_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_layout");
    group.measurement_time(Duration::from_secs(10));

    for (name, nodes, fanout) in [("dag_50_f2", 50usize, 2usize), ("dag_120_f2", 120, 2)] {
        let spec = build_dag_spec(nodes, fanout);
        group.bench_with_input(BenchmarkId::new("layout", name), &spec, |b, spec| {
            b.iter_batched(
                || spec.graph(),
                |mut g| {
                    black_box(dot_layout(black_box(&mut g)).is_ok());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_network_simplex, bench_dot_layout);
criterion_main!(benches);
