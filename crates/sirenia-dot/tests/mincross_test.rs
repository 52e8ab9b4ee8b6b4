use sirenia_dot::mincross::dot_mincross;
use sirenia_dot::rank::dot_rank;
use sirenia_dot::{DotGraph, Layered, class2};
use sirenia_graph::Graph;

fn new_graph(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new("G", true);
    for (t, h) in edges {
        g.add_edge_by_name(t, h);
    }
    g
}

fn cluster(g: &mut Graph, name: &str, members: &[&str]) {
    let sg = g.add_subgraph(name, None);
    for m in members {
        let n = g.add_node(*m);
        g.add_to_subgraph(sg, n);
    }
}

fn ordered(g: &mut Graph) -> (DotGraph, Layered, i64) {
    let dg = DotGraph::from_graph(g);
    let ranking = dot_rank(&dg).unwrap();
    let mut lg = class2::build(&dg, &ranking);
    let crossings = dot_mincross(&dg, &mut lg).unwrap();
    (dg, lg, crossings)
}

fn order_of(g: &Graph, lg: &Layered, name: &str) -> i32 {
    let n = g.node_id(name).unwrap();
    lg.order(lg.node_of[n.0])
}

/// Real nodes outside cluster `c` never sit between two of its members on a rank.
fn assert_contiguous(dg: &DotGraph, lg: &Layered, c: usize) {
    let members = &dg.clusters[c].members;
    for rank in &lg.ranks {
        let at: Vec<usize> = rank
            .iter()
            .enumerate()
            .filter(|(_, v)| lg.g.node(**v).data.real.is_some_and(|r| members.contains(&r)))
            .map(|(i, _)| i)
            .collect();
        let (Some(&lo), Some(&hi)) = (at.first(), at.last()) else {
            continue;
        };
        for v in &rank[lo..=hi] {
            if let Some(r) = lg.g.node(*v).data.real {
                assert!(members.contains(&r), "node {r} splits cluster {c}");
            }
        }
    }
}

#[test]
fn triangle_with_back_edge_has_no_crossings() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
    let (_, _, crossings) = ordered(&mut g);
    assert_eq!(crossings, 0);
}

#[test]
fn complete_bipartite_three_by_three_has_nine_crossings() {
    let mut g = Graph::new("G", true);
    for t in ["a", "b", "c"] {
        for h in ["d", "e", "f"] {
            g.add_edge_by_name(t, h);
        }
    }
    let (_, lg, crossings) = ordered(&mut g);
    assert_eq!(lg.ranks.len(), 2);
    assert_eq!(lg.ranks[0].len(), 3);
    assert_eq!(crossings, 9);
}

#[test]
fn crossed_matching_is_untangled() {
    // Heads are created in the opposite order of their tails.
    let mut g = Graph::new("G", true);
    for h in ["w", "x", "y", "z"] {
        g.add_node(h);
    }
    for (t, h) in [("a", "z"), ("b", "y"), ("c", "x"), ("d", "w")] {
        g.add_edge_by_name(t, h);
    }
    let (_, lg, crossings) = ordered(&mut g);
    assert_eq!(crossings, 0);
    let tails: Vec<i32> = ["a", "b", "c", "d"].iter().map(|n| order_of(&g, &lg, n)).collect();
    let heads: Vec<i32> = ["z", "y", "x", "w"].iter().map(|n| order_of(&g, &lg, n)).collect();
    assert_eq!(tails, heads);
}

#[test]
fn chain_of_five_has_no_crossings() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
    let (_, lg, crossings) = ordered(&mut g);
    assert_eq!(crossings, 0);
    assert!(lg.ranks.iter().all(|r| r.len() == 1));
}

#[test]
fn clusters_stay_contiguous() {
    let mut g = new_graph(&[("a", "b"), ("c", "d")]);
    cluster(&mut g, "cluster_1", &["a", "c"]);
    cluster(&mut g, "cluster_2", &["b", "d"]);
    let (dg, lg, crossings) = ordered(&mut g);
    assert_eq!(crossings, 0);
    assert_eq!((order_of(&g, &lg, "a") - order_of(&g, &lg, "c")).abs(), 1);
    assert_eq!((order_of(&g, &lg, "b") - order_of(&g, &lg, "d")).abs(), 1);
    assert_contiguous(&dg, &lg, 0);
    assert_contiguous(&dg, &lg, 1);
}

#[test]
fn outside_nodes_route_around_clusters() {
    // `e` is pulled towards the middle of the cluster's heads but must stay outside.
    let mut g = new_graph(&[("a", "b"), ("c", "d"), ("e", "b"), ("e", "d"), ("e", "f")]);
    cluster(&mut g, "cluster_top", &["a", "c"]);
    cluster(&mut g, "cluster_bottom", &["b", "d"]);
    let (dg, lg, _) = ordered(&mut g);
    assert_contiguous(&dg, &lg, 0);
    assert_contiguous(&dg, &lg, 1);
}

#[test]
fn nested_clusters_stay_contiguous() {
    let mut g = new_graph(&[
        ("a", "b"),
        ("c", "d"),
        ("x", "b"),
        ("x", "y"),
        ("a", "y"),
        ("c", "z"),
    ]);
    let outer = g.add_subgraph("cluster_outer", None);
    let inner = g.add_subgraph("cluster_inner", Some(outer));
    for n in ["a", "b", "c", "d"] {
        let id = g.add_node(n);
        g.add_to_subgraph(outer, id);
    }
    for n in ["a", "b"] {
        let id = g.add_node(n);
        g.add_to_subgraph(inner, id);
    }
    let (dg, lg, _) = ordered(&mut g);
    for c in 0..dg.clusters.len() {
        assert_contiguous(&dg, &lg, c);
    }
}

#[test]
fn ordering_out_keeps_edge_order() {
    let mut g = new_graph(&[("a", "b"), ("a", "c"), ("a", "d"), ("e", "b")]);
    g.set_graph_attr("ordering", "out");
    let (_, lg, _) = ordered(&mut g);
    let (b, c, d) = (
        order_of(&g, &lg, "b"),
        order_of(&g, &lg, "c"),
        order_of(&g, &lg, "d"),
    );
    assert!(b < c && c < d, "got b={b} c={c} d={d}");
}

#[test]
fn long_edges_get_one_virtual_node_per_rank() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
    let (_, lg, crossings) = ordered(&mut g);
    assert_eq!(crossings, 0);
    assert_eq!(lg.ranks[1].len(), 2);
    for e in lg.g.edges() {
        assert_eq!(lg.g.rank(lg.g.head(e)) - lg.g.rank(lg.g.tail(e)), 1);
    }
}
