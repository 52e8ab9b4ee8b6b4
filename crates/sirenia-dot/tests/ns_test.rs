use sirenia_dot::network_simplex::{self, Balance, NsOptions};
use sirenia_graph::{Error, FNode, FastGraph, NodeKind};

fn new_graph(n: usize) -> FastGraph<(), ()> {
    let mut g: FastGraph<(), ()> = FastGraph::new();
    for _ in 0..n {
        g.add_node(NodeKind::Normal, ());
    }
    g
}

fn ranks(g: &FastGraph<(), ()>) -> Vec<i32> {
    g.nodes().map(|n| g.rank(n)).collect()
}

fn assert_feasible(g: &FastGraph<(), ()>) {
    for e in g.edges() {
        let edge = g.edge(e);
        assert!(
            g.rank(edge.head) - g.rank(edge.tail) >= edge.minlen,
            "edge {:?} -> {:?} is too short",
            edge.tail,
            edge.head
        );
    }
    assert_eq!(g.nodes().map(|n| g.rank(n)).min(), Some(0));
}

#[test]
fn chain_gets_consecutive_ranks() {
    let mut g = new_graph(5);
    for i in 0..4 {
        g.add_edge(FNode(i), FNode(i + 1), 1, 1, ());
    }
    let stats = network_simplex::rank(&mut g, &NsOptions::default()).unwrap();
    assert_eq!(ranks(&g), vec![0, 1, 2, 3, 4]);
    assert_eq!(stats.tree_edges, 4);
}

#[test]
fn pivots_pull_a_source_down_to_its_head() {
    // a -> b -> c and d -> c: the initial ranking puts d on rank 0, the optimum on rank 1.
    let mut g = new_graph(4);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(1), FNode(2), 1, 1, ());
    g.add_edge(FNode(3), FNode(2), 1, 1, ());
    network_simplex::rank(&mut g, &NsOptions::default()).unwrap();
    assert_eq!(ranks(&g), vec![0, 1, 2, 1]);
}

#[test]
fn iteration_cap_of_zero_keeps_the_initial_ranking() {
    let mut g = new_graph(4);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(1), FNode(2), 1, 1, ());
    g.add_edge(FNode(3), FNode(2), 1, 1, ());
    let opts = NsOptions {
        max_iter: 0,
        ..NsOptions::default()
    };
    let stats = network_simplex::rank(&mut g, &opts).unwrap();
    assert_eq!(stats.iterations, 0);
    assert_eq!(ranks(&g), vec![0, 1, 2, 0]);
}

#[test]
fn heavy_edges_are_kept_short() {
    // a -> b -> c -> d plus a -> e -> d: e may sit on rank 1, 2 or 3. A heavy e -> d edge
    // pulls e down next to d.
    let mut g = new_graph(5);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(1), FNode(2), 1, 1, ());
    g.add_edge(FNode(2), FNode(3), 1, 1, ());
    g.add_edge(FNode(0), FNode(4), 1, 1, ());
    g.add_edge(FNode(4), FNode(3), 10, 1, ());
    network_simplex::rank(&mut g, &NsOptions::default()).unwrap();
    assert_eq!(g.rank(FNode(4)), 2);
    assert_feasible(&g);
}

#[test]
fn zero_minlen_allows_shared_ranks() {
    let mut g = new_graph(2);
    g.add_edge(FNode(0), FNode(1), 1, 0, ());
    network_simplex::rank(&mut g, &NsOptions::default()).unwrap();
    assert_eq!(ranks(&g), vec![0, 0]);
}

#[test]
fn cycles_are_reported() {
    let mut g = new_graph(3);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(1), FNode(2), 1, 1, ());
    g.add_edge(FNode(2), FNode(0), 1, 1, ());
    let err = network_simplex::rank(&mut g, &NsOptions::default()).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
}

#[test]
fn disconnected_input_is_rejected() {
    let mut g = new_graph(4);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(2), FNode(3), 1, 1, ());
    let err = network_simplex::rank(&mut g, &NsOptions::default()).unwrap_err();
    assert_eq!(err, Error::NotConnected);
}

#[test]
fn layered_dag_ranking_is_feasible_for_every_balance_mode() {
    for balance in [Balance::Normalize, Balance::TopBottom(Default::default())] {
        let mut g = layered_dag(6, 5, 0x9e37_79b9);
        let opts = NsOptions {
            balance,
            ..NsOptions::default()
        };
        network_simplex::rank(&mut g, &opts).unwrap();
        assert_feasible(&g);
    }
}

#[test]
fn tree_edges_span_the_graph() {
    let mut g = layered_dag(4, 4, 7);
    let n = g.node_count();
    let stats = network_simplex::rank(&mut g, &NsOptions::default()).unwrap();
    assert_eq!(stats.tree_edges, n - 1);
}

/// `layers` rows of `width` nodes. Each node links to the node below it, to the first node of
/// the next row and to one pseudo-random node of the next row.
fn layered_dag(layers: usize, width: usize, seed: u64) -> FastGraph<(), ()> {
    let mut g = new_graph(layers * width);
    let mut s = seed;
    for l in 0..layers - 1 {
        for i in 0..width {
            let v = FNode(l * width + i);
            let below = (l + 1) * width;
            g.add_edge(v, FNode(below), 1, 1, ());
            if i != 0 {
                g.add_edge(v, FNode(below + i), 1, 1, ());
            }
            s = s
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let j = ((s >> 33) as usize) % width;
            if j != 0 && j != i {
                g.add_edge(v, FNode(below + j), 1 + (s % 3) as i32, 1, ());
            }
        }
    }
    g
}
