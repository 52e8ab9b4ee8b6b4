use sirenia_dot::{Phase, dot_layout};
use sirenia_graph::{Graph, Label, Point, WarningKind};

fn positioned(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new("G", true);
    for (t, h) in edges {
        g.add_edge_by_name(t, h);
    }
    g.set_graph_attr("phase", "3");
    g
}

fn coord(g: &Graph, name: &str) -> Point {
    g.node(g.node_id(name).unwrap()).layout.coord
}

#[test]
fn single_edge_is_vertical() {
    let mut g = positioned(&[("a", "b")]);
    let stats = dot_layout(&mut g).unwrap();
    assert_eq!(stats.phase, Phase::Position);
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert!((a.x - b.x).abs() < 1e-6, "a={a:?} b={b:?}");
    // Two default nodes half an inch tall plus the default rank separation.
    assert!((a.y - b.y - 72.0).abs() < 1e-6, "a={a:?} b={b:?}");
}

#[test]
fn rank_neighbours_keep_nodesep_apart() {
    let mut g = Graph::new("G", true);
    g.add_node("a");
    g.add_node("b");
    g.set_graph_attr("phase", "3");
    dot_layout(&mut g).unwrap();
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert_eq!(a.y, b.y);
    // Default width 54 plus nodesep 18.
    assert!((a.x - b.x).abs() >= 72.0 - 1e-6, "a={a:?} b={b:?}");
}

#[test]
fn nodesep_widens_the_gap() {
    let mut g = positioned(&[("r", "a"), ("r", "b")]);
    g.set_graph_attr("nodesep", "1");
    dot_layout(&mut g).unwrap();
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert!((a.x - b.x).abs() >= 54.0 + 72.0 - 1e-6);
}

#[test]
fn ranks_descend_in_y() {
    let mut g = positioned(&[("a", "b"), ("b", "c"), ("a", "d"), ("d", "e"), ("e", "c")]);
    dot_layout(&mut g).unwrap();
    let ys: Vec<f64> = ["a", "b", "c"].iter().map(|n| coord(&g, n).y).collect();
    assert!(ys[0] > ys[1] && ys[1] > ys[2], "{ys:?}");
    for n in g.iter_nodes() {
        let l = &g.node(n).layout;
        let same_rank: Vec<f64> = g
            .iter_nodes()
            .filter(|m| g.node(*m).layout.rank == l.rank)
            .map(|m| g.node(m).layout.coord.y)
            .collect();
        assert!(same_rank.iter().all(|y| *y == l.coord.y));
    }
}

#[test]
fn nodes_of_a_rank_do_not_overlap() {
    let mut g = positioned(&[
        ("a", "b"),
        ("a", "c"),
        ("a", "d"),
        ("b", "e"),
        ("c", "e"),
        ("d", "f"),
        ("a", "f"),
    ]);
    dot_layout(&mut g).unwrap();
    let ids: Vec<_> = g.iter_nodes().collect();
    for (i, &m) in ids.iter().enumerate() {
        for &n in &ids[i + 1..] {
            let (p, q) = (&g.node(m).layout, &g.node(n).layout);
            if p.rank != q.rank {
                continue;
            }
            let gap = (p.coord.x - q.coord.x).abs() - (p.width + q.width) / 2.0;
            assert!(gap >= 18.0 - 1e-6, "{} and {} are {gap} apart", g.node(m).name, g.node(n).name);
        }
    }
}

#[test]
fn clusters_enclose_their_nodes() {
    let mut g = positioned(&[("a", "b"), ("b", "c"), ("x", "c")]);
    let sg = g.add_subgraph("cluster_0", None);
    for n in ["a", "b"] {
        let id = g.add_node(n);
        g.add_to_subgraph(sg, id);
    }
    dot_layout(&mut g).unwrap();
    let bb = g.subgraph(sg).layout.bb;
    for n in ["a", "b"] {
        let nb = g.node(g.node_id(n).unwrap()).layout.bbox();
        assert!(bb.contains_box(&nb), "{n} escapes {bb:?}");
    }
    for n in ["x", "c"] {
        let nb = g.node(g.node_id(n).unwrap()).layout.bbox();
        assert!(!bb.overlaps(&nb), "{n} intrudes into {bb:?}");
    }
}

#[test]
fn edge_labels_sit_between_their_ends() {
    let mut g = positioned(&[("a", "b")]);
    let e = g.iter_edges().next().unwrap();
    g.edge_mut(e).layout.label = Some(Label {
        text: "label".into(),
        dimen: Point::new(40.0, 14.0),
        ..Label::default()
    });
    dot_layout(&mut g).unwrap();
    let label = g.edge(e).layout.label.clone().unwrap();
    assert!(label.set);
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert!(label.pos.y < a.y && label.pos.y > b.y, "label at {:?}", label.pos);
}

#[test]
fn parent_sits_midway_between_two_children() {
    let mut g = positioned(&[("a", "b"), ("a", "c")]);
    dot_layout(&mut g).unwrap();
    let (a, b, c) = (coord(&g, "a"), coord(&g, "b"), coord(&g, "c"));
    assert!((b.x - c.x).abs() >= 72.0 - 1e-6);
    assert!((a.x - (b.x + c.x) / 2.0).abs() <= 1.0, "a={a:?} b={b:?} c={c:?}");
}

#[test]
fn child_sits_midway_below_two_parents() {
    let mut g = positioned(&[("a", "c"), ("b", "c")]);
    dot_layout(&mut g).unwrap();
    let (a, b, c) = (coord(&g, "a"), coord(&g, "b"), coord(&g, "c"));
    assert!((c.x - (a.x + b.x) / 2.0).abs() <= 1.0, "a={a:?} b={b:?} c={c:?}");
}

#[test]
fn labelled_flat_edges_keep_cluster_members_inside() {
    let mut g = positioned(&[
        ("c0", "x"),
        ("c0", "w"),
        ("s", "y"),
        ("s", "z"),
        ("y", "x"),
        ("w", "z"),
        ("y", "w"),
    ]);
    let sg = g.add_subgraph("cluster_a", None);
    for n in ["c0", "x", "w"] {
        let id = g.node_id(n).unwrap();
        g.add_to_subgraph(sg, id);
    }
    let flat: Vec<_> = g.iter_edges().skip(4).collect();
    for (i, &e) in flat.iter().enumerate() {
        g.set_edge_attr(e, "minlen", "0");
        g.edge_mut(e).layout.label = Some(Label {
            text: format!("flat {i}"),
            dimen: Point::new(30.0, 12.0),
            ..Label::default()
        });
    }
    dot_layout(&mut g).unwrap();
    assert!(!g.warnings.has(WarningKind::InternalConsistency));
    let bb = g.subgraph(sg).layout.bb;
    for n in ["c0", "x", "w"] {
        let nb = g.node(g.node_id(n).unwrap()).layout.bbox();
        assert!(bb.contains_box(&nb), "{n} escapes {bb:?}");
    }
}

#[test]
fn compress_keeps_a_connected_layout() {
    let mut g = positioned(&[("a", "b"), ("a", "c"), ("d", "e")]);
    g.set_graph_attr("ratio", "compress").set_graph_attr("size", "1,1");
    dot_layout(&mut g).unwrap();
    assert!(!g.warnings.has(WarningKind::InternalConsistency));
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert!(a.y > b.y);
}
