use sirenia_dot::DotGraph;
use sirenia_dot::rank::dot_rank;
use sirenia_graph::{Graph, Label, Point};
use std::collections::HashMap;

fn new_graph(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new("G", true);
    for (t, h) in edges {
        g.add_edge_by_name(t, h);
    }
    g
}

fn rank_of(g: &mut Graph) -> HashMap<String, i32> {
    let dg = DotGraph::from_graph(g);
    let ranking = dot_rank(&dg).unwrap();
    g.iter_nodes()
        .map(|n| (g.node(n).name.clone(), ranking.rank[n.0]))
        .collect()
}

fn rank_set(g: &mut Graph, name: &str, kind: &str, members: &[&str]) {
    let sg = g.add_subgraph(name, None);
    g.set_subgraph_attr(sg, "rank", kind);
    for m in members {
        let n = g.add_node(*m);
        g.add_to_subgraph(sg, n);
    }
}

#[test]
fn chain_ranks_follow_the_edges() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
    let rank = rank_of(&mut g);
    let got: Vec<i32> = ["a", "b", "c", "d", "e"].iter().map(|n| rank[*n]).collect();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
}

#[test]
fn back_edges_do_not_break_ranking() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
    let rank = rank_of(&mut g);
    let mut got = vec![rank["a"], rank["b"], rank["c"]];
    got.sort();
    assert_eq!(got, vec![0, 1, 2]);
}

#[test]
fn minlen_stretches_edges() {
    let mut g = new_graph(&[("a", "b")]);
    let e = g.iter_edges().next().unwrap();
    g.set_edge_attr(e, "minlen", "3");
    let rank = rank_of(&mut g);
    assert_eq!(rank["b"] - rank["a"], 3);
}

#[test]
fn edge_labels_double_minlen() {
    let mut g = new_graph(&[("a", "b")]);
    let e = g.iter_edges().next().unwrap();
    g.edge_mut(e).layout.label = Some(Label {
        text: "x".into(),
        dimen: Point::new(20.0, 10.0),
        ..Label::default()
    });
    let rank = rank_of(&mut g);
    assert_eq!(rank["b"], 2);
}

#[test]
fn non_constraint_edges_are_ignored() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
    let back = g.iter_edges().nth(2).unwrap();
    g.set_edge_attr(back, "constraint", "false");
    let rank = rank_of(&mut g);
    assert_eq!((rank["a"], rank["b"], rank["c"]), (0, 1, 2));
}

#[test]
fn same_rank_sets_share_a_rank() {
    let mut g = new_graph(&[("a", "b"), ("a", "c"), ("c", "d")]);
    rank_set(&mut g, "s", "same", &["b", "d"]);
    let rank = rank_of(&mut g);
    assert_eq!(rank["b"], rank["d"]);
    assert_eq!((rank["a"], rank["c"], rank["d"]), (0, 1, 2));
}

#[test]
fn min_set_sits_on_the_top_rank() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("d", "c")]);
    rank_set(&mut g, "s", "min", &["d"]);
    let rank = rank_of(&mut g);
    assert_eq!(rank["d"], 0);
    assert_eq!(rank["a"], 0);
}

#[test]
fn source_set_is_strictly_first() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("d", "c")]);
    rank_set(&mut g, "s", "source", &["d"]);
    let rank = rank_of(&mut g);
    assert_eq!(rank["d"], 0);
    for n in ["a", "b", "c"] {
        assert!(rank[n] > 0, "{n} shares the source rank");
    }
}

#[test]
fn max_and_sink_sets_sit_on_the_bottom_rank() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("a", "d")]);
    rank_set(&mut g, "s", "max", &["d"]);
    let rank = rank_of(&mut g);
    assert_eq!(rank["d"], rank["c"]);

    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("a", "d")]);
    rank_set(&mut g, "s", "sink", &["d"]);
    let rank = rank_of(&mut g);
    for n in ["a", "b", "c"] {
        assert!(rank[n] < rank["d"], "{n} shares the sink rank");
    }
}

#[test]
fn clusters_are_ranked_as_a_unit() {
    let mut g = new_graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
    let sg = g.add_subgraph("cluster_x", None);
    for n in ["b", "c"] {
        let id = g.add_node(n);
        g.add_to_subgraph(sg, id);
    }
    let dg = DotGraph::from_graph(&mut g);
    let ranking = dot_rank(&dg).unwrap();
    assert_eq!(ranking.rank, vec![0, 1, 2]);
    assert_eq!(ranking.cluster_span, vec![(1, 2)]);
}

#[test]
fn newrank_lets_rank_sets_cross_clusters() {
    let mut g = new_graph(&[("a", "b"), ("c", "d")]);
    for (name, members) in [("cluster_1", ["a", "b"]), ("cluster_2", ["c", "d"])] {
        let sg = g.add_subgraph(name, None);
        for m in members {
            let id = g.add_node(m);
            g.add_to_subgraph(sg, id);
        }
    }
    rank_set(&mut g, "s", "same", &["a", "d"]);

    let rank = rank_of(&mut g);
    assert_eq!(rank["a"], rank["c"]);

    g.set_graph_attr("newrank", "true");
    let rank = rank_of(&mut g);
    assert_eq!(rank["a"], rank["d"]);
    assert_eq!((rank["c"], rank["a"], rank["b"]), (0, 1, 2));
}

#[test]
fn ranking_is_repeatable() {
    let mut g = new_graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "a")]);
    let dg = DotGraph::from_graph(&mut g);
    let first = dot_rank(&dg).unwrap();
    let second = dot_rank(&dg).unwrap();
    assert_eq!(first, second);
}
