use sirenia_graph::alg;
use sirenia_graph::{FEdge, FNode, FastGraph, NodeKind};

fn new_graph(n: usize) -> FastGraph<(), ()> {
    let mut g: FastGraph<(), ()> = FastGraph::new();
    for _ in 0..n {
        g.add_node(NodeKind::Normal, ());
    }
    g
}

#[test]
fn add_edge_links_both_lists() {
    let mut g = new_graph(2);
    let e = g.add_edge(FNode(0), FNode(1), 3, 2, ());
    assert_eq!(g.out_edges(FNode(0)), &[e]);
    assert_eq!(g.in_edges(FNode(1)), &[e]);
    assert!(g.out_edges(FNode(1)).is_empty());
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn reverse_edge_moves_between_lists() {
    let mut g = new_graph(3);
    let e = g.add_edge(FNode(0), FNode(1), 1, 1, ());
    let f = g.add_edge(FNode(0), FNode(2), 1, 1, ());
    g.reverse_edge(e);
    assert_eq!(g.tail(e), FNode(1));
    assert_eq!(g.head(e), FNode(0));
    assert!(g.edge(e).reversed);
    assert_eq!(g.out_edges(FNode(0)), &[f]);
    assert_eq!(g.in_edges(FNode(0)), &[e]);
    assert_eq!(g.out_edges(FNode(1)), &[e]);
    assert!(g.in_edges(FNode(1)).is_empty());

    g.reverse_edge(e);
    assert!(!g.edge(e).reversed);
    assert_eq!(g.tail(e), FNode(0));
}

#[test]
fn delete_fast_edge_leaves_tombstone() {
    let mut g = new_graph(2);
    let e = g.add_edge(FNode(0), FNode(1), 1, 1, ());
    let f = g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.delete_fast_edge(e);
    g.delete_fast_edge(e);
    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.edge_capacity(), 2);
    assert_eq!(g.edges().collect::<Vec<FEdge>>(), vec![f]);
    assert_eq!(g.find_edge(FNode(0), FNode(1)), Some(f));
}

#[test]
fn merge_edges_sums_weight_and_takes_max_minlen() {
    let mut g = new_graph(2);
    let e = g.add_edge(FNode(0), FNode(1), 2, 1, ());
    let f = g.add_edge(FNode(0), FNode(1), 5, 3, ());
    g.merge_edges(e, f);
    assert_eq!(g.edge(e).weight, 7);
    assert_eq!(g.edge(e).minlen, 3);
    assert!(!g.edge(f).alive);
    assert_eq!(g.out_edges(FNode(0)), &[e]);
}

#[test]
fn components_and_topological_order() {
    let mut g = new_graph(5);
    g.add_edge(FNode(0), FNode(1), 1, 1, ());
    g.add_edge(FNode(1), FNode(2), 1, 1, ());
    g.add_edge(FNode(4), FNode(3), 1, 1, ());
    let comps = alg::components(&g);
    assert_eq!(comps.len(), 2);
    assert_eq!(comps[0], vec![FNode(0), FNode(1), FNode(2)]);
    assert_eq!(comps[1], vec![FNode(3), FNode(4)]);

    let order = alg::topological_order(&g).unwrap();
    let pos = |n: usize| order.iter().position(|x| *x == FNode(n)).unwrap();
    assert!(pos(0) < pos(1) && pos(1) < pos(2));
    assert!(pos(4) < pos(3));

    g.add_edge(FNode(2), FNode(0), 1, 1, ());
    assert!(alg::topological_order(&g).is_err());
}
