use sirenia_dot::{Phase, dot_layout};
use sirenia_graph::{Graph, Label, Point, WarningKind};

fn graph(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new("G", true);
    for (t, h) in edges {
        g.add_edge_by_name(t, h);
    }
    g
}

fn coord(g: &Graph, name: &str) -> Point {
    g.node(g.node_id(name).unwrap()).layout.coord
}

#[test]
fn cycle_is_broken_by_reversing_one_edge() {
    let mut g = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
    let stats = dot_layout(&mut g).unwrap();
    assert_eq!(stats.phase, Phase::Route);
    assert_eq!(stats.ranks, 3);

    let reversed: Vec<_> = g.iter_edges().filter(|e| g.edge(*e).layout.reversed).collect();
    assert_eq!(reversed.len(), 1);
    let ranks: Vec<i32> = ["a", "b", "c"]
        .iter()
        .map(|n| g.node(g.node_id(n).unwrap()).layout.rank)
        .collect();
    assert_eq!(ranks, vec![0, 1, 2]);
    let (a, b, c) = (coord(&g, "a"), coord(&g, "b"), coord(&g, "c"));
    assert!(a.y > b.y && b.y > c.y);
    assert!(g.iter_edges().all(|e| !g.edge(e).layout.spl.is_empty()));
}

#[test]
fn rank_phase_only_writes_ranks() {
    let mut g = graph(&[("a", "b"), ("b", "c")]);
    g.set_graph_attr("phase", "1");
    let stats = dot_layout(&mut g).unwrap();
    assert_eq!(stats.phase, Phase::Rank);
    assert_eq!(stats.ranks, 3);
    assert_eq!(g.node(g.node_id("c").unwrap()).layout.rank, 2);
    assert_eq!(coord(&g, "c"), Point::default());
    assert!(g.iter_edges().all(|e| g.edge(e).layout.spl.is_empty()));
}

#[test]
fn order_phase_writes_orders_but_no_coordinates() {
    let mut g = graph(&[("r", "a"), ("r", "b")]);
    g.set_graph_attr("phase", "2");
    let stats = dot_layout(&mut g).unwrap();
    assert_eq!(stats.phase, Phase::Order);
    let mut orders: Vec<i32> = ["a", "b"]
        .iter()
        .map(|n| g.node(g.node_id(n).unwrap()).layout.order)
        .collect();
    orders.sort();
    assert_eq!(orders, vec![0, 1]);
    assert_eq!(coord(&g, "a"), Point::default());
}

#[test]
fn left_to_right_runs_ranks_along_x() {
    let mut g = graph(&[("a", "b"), ("b", "c")]);
    g.set_graph_attr("rankdir", "LR");
    dot_layout(&mut g).unwrap();
    let (a, b, c) = (coord(&g, "a"), coord(&g, "b"), coord(&g, "c"));
    assert!(a.x < b.x && b.x < c.x, "{a:?} {b:?} {c:?}");
    assert!((a.y - b.y).abs() < 1e-6 && (b.y - c.y).abs() < 1e-6);
    let node = &g.node(g.node_id("a").unwrap()).layout;
    assert_eq!((node.width, node.height), (54.0, 36.0));
}

#[test]
fn bottom_to_top_runs_ranks_upward() {
    let mut g = graph(&[("a", "b")]);
    g.set_graph_attr("rankdir", "BT");
    dot_layout(&mut g).unwrap();
    assert!(coord(&g, "a").y < coord(&g, "b").y);
}

#[test]
fn bounding_box_covers_everything() {
    let mut g = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "d")]);
    let e = g.iter_edges().next().unwrap();
    g.edge_mut(e).layout.label = Some(Label {
        text: "ab".into(),
        dimen: Point::new(24.0, 14.0),
        ..Label::default()
    });
    dot_layout(&mut g).unwrap();
    let bb = g.bb;
    for n in g.iter_nodes() {
        assert!(bb.contains_box(&g.node(n).layout.bbox()));
    }
    for e in g.iter_edges() {
        for bz in &g.edge(e).layout.spl {
            assert!(bb.contains_box(&bz.bbox()));
        }
    }
    let label = g.edge(e).layout.label.clone().unwrap();
    assert!(label.set);
    assert!(bb.contains(label.pos));
}

#[test]
fn clusters_get_boxes_and_rank_spans() {
    let mut g = graph(&[("a", "b"), ("b", "c"), ("c", "d")]);
    let sg = g.add_subgraph("cluster_mid", None);
    for n in ["b", "c"] {
        let id = g.add_node(n);
        g.add_to_subgraph(sg, id);
    }
    dot_layout(&mut g).unwrap();
    let layout = &g.subgraph(sg).layout;
    assert_eq!((layout.min_rank, layout.max_rank), (1, 2));
    assert!(!layout.bb.is_empty());
    for n in ["b", "c"] {
        assert!(layout.bb.contains(coord(&g, n)));
    }
    assert!(!layout.bb.contains(coord(&g, "a")));
}

#[test]
fn curved_edges_with_labels_warn() {
    let mut g = graph(&[("a", "b")]);
    g.set_graph_attr("splines", "curved");
    let e = g.iter_edges().next().unwrap();
    g.edge_mut(e).layout.label = Some(Label {
        text: "x".into(),
        dimen: Point::new(10.0, 10.0),
        ..Label::default()
    });
    dot_layout(&mut g).unwrap();
    assert!(g.warnings.has(WarningKind::Unsupported));
    assert_eq!(g.edge(e).layout.spl.len(), 1);
}

#[test]
fn empty_graph_lays_out_to_nothing() {
    let mut g = Graph::new("G", true);
    let stats = dot_layout(&mut g).unwrap();
    assert_eq!(stats.ranks, 0);
    assert_eq!(stats.crossings, 0);
}

#[test]
fn layout_is_repeatable() {
    let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "a"), ("c", "e")];
    let mut first = graph(&edges);
    let mut second = graph(&edges);
    dot_layout(&mut first).unwrap();
    dot_layout(&mut second).unwrap();
    for n in first.iter_nodes() {
        assert_eq!(first.node(n).layout.coord, second.node(n).layout.coord);
    }
    for e in first.iter_edges() {
        assert_eq!(first.edge(e).layout.spl, second.edge(e).layout.spl);
    }
}

#[test]
fn numeric_ratio_stretches_rank_spacing() {
    let mut plain = graph(&[("a", "b")]);
    dot_layout(&mut plain).unwrap();
    let gap = coord(&plain, "a").y - coord(&plain, "b").y;

    // 54 wide and 108 tall is already 2:1; asking for 4:1 doubles every y.
    let mut tall = graph(&[("a", "b")]);
    tall.set_graph_attr("ratio", "4");
    dot_layout(&mut tall).unwrap();
    let stretched = coord(&tall, "a").y - coord(&tall, "b").y;
    assert!((stretched - 2.0 * gap).abs() <= 1.0, "{gap} {stretched}");
    assert!((coord(&tall, "a").x - coord(&tall, "b").x).abs() < 1e-6);
}
