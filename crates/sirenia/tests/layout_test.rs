use sirenia::{Engine, Graph, NodeId, Point, WarningKind, layout};

fn new_graph(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new("G", true);
    for (t, h) in edges {
        g.add_edge_by_name(t, h);
    }
    g
}

fn id(g: &Graph, name: &str) -> NodeId {
    g.node_id(name).unwrap()
}

fn coord(g: &Graph, name: &str) -> Point {
    g.node(id(g, name)).layout.coord
}

#[test]
fn default_nodes_are_three_quarters_by_half_an_inch() {
    let mut g = new_graph(&[("a", "b")]);
    layout(&mut g, Engine::Dot).unwrap();
    let a = &g.node(id(&g, "a")).layout;
    assert_eq!((a.width, a.height), (54.0, 36.0));
    assert_eq!(a.shape.width, 54.0);
    let label = a.label.as_ref().unwrap();
    assert_eq!(label.text, "a");
    assert!(label.set);
    assert_eq!(label.pos, a.coord);
}

#[test]
fn dot_drawing_is_padded_and_moved_to_the_origin() {
    let mut g = new_graph(&[("a", "b"), ("a", "c")]);
    layout(&mut g, Engine::Dot).unwrap();
    assert_eq!(g.bb.ll, Point::default());
    for n in g.iter_nodes() {
        let nb = g.node(n).layout.bbox();
        assert!(nb.ll.x >= 4.0 - 1e-6 && nb.ll.y >= 4.0 - 1e-6);
        assert!(nb.ur.x <= g.bb.ur.x - 4.0 + 1e-6);
        assert!(nb.ur.y <= g.bb.ur.y - 4.0 + 1e-6);
    }
    assert!(coord(&g, "a").y > coord(&g, "b").y);
    for e in g.iter_edges() {
        for b in &g.edge(e).layout.spl {
            assert!(b.points.iter().all(|p| g.bb.contains(*p)));
        }
    }
}

#[test]
fn single_node_box_is_the_node_plus_pad() {
    let mut g = Graph::new("G", false);
    g.add_node("solo");
    g.set_graph_attr("pad", "0.5");
    layout(&mut g, Engine::Dot).unwrap();
    let n = &g.node(id(&g, "solo")).layout;
    assert!((g.bb.width() - (n.width + 72.0)).abs() < 1e-6);
    assert!((g.bb.height() - (n.height + 72.0)).abs() < 1e-6);
    assert!((n.coord.x - g.bb.width() / 2.0).abs() < 1e-6);
}

#[test]
fn plain_nodes_hug_their_label() {
    let mut g = Graph::new("G", true);
    let n = g.add_node("n");
    g.set_node_attr(n, "shape", "plain")
        .set_node_attr(n, "label", "a wide label");
    layout(&mut g, Engine::Dot).unwrap();
    let layout = &g.node(n).layout;
    let dimen = layout.label.as_ref().unwrap().dimen;
    assert_eq!((layout.width, layout.height), (dimen.x, dimen.y));
}

#[test]
fn fixed_size_ignores_the_label() {
    let mut g = Graph::new("G", true);
    let n = g.add_node("n");
    g.set_node_attr(n, "shape", "box")
        .set_node_attr(n, "fixedsize", "true")
        .set_node_attr(n, "width", "0.3")
        .set_node_attr(n, "label", "much longer than the box");
    layout(&mut g, Engine::Dot).unwrap();
    assert!((g.node(n).layout.width - 21.6).abs() < 1e-9);
}

#[test]
fn node_margin_pads_the_label() {
    let mut g = Graph::new("G", true);
    let (a, b) = (g.add_node("a"), g.add_node("b"));
    for n in [a, b] {
        g.set_node_attr(n, "shape", "box")
            .set_node_attr(n, "label", "a fairly long label");
    }
    g.set_node_attr(b, "margin", "0.5");
    layout(&mut g, Engine::Dot).unwrap();
    let (wa, wb) = (g.node(a).layout.width, g.node(b).layout.width);
    // Half an inch a side instead of the default 0.11 inch.
    assert!(wb > wa + 36.0, "{wa} vs {wb}");
    assert!(!g.warnings.has(WarningKind::MalformedAttribute));
}

#[test]
fn unknown_ports_warn_and_attach_at_the_center() {
    let mut g = new_graph(&[("a", "b")]);
    let e = g.iter_edges().next().unwrap();
    g.set_edge_attr(e, "tailport", "nowhere");
    layout(&mut g, Engine::Dot).unwrap();
    assert!(g.warnings.has(WarningKind::UnknownPort));
    assert_eq!(g.edge(e).layout.tail_port.p, Point::default());
}

#[test]
fn html_cells_name_ports() {
    let mut g = new_graph(&[("t", "b")]);
    let t = id(&g, "t");
    g.set_node_attr(t, "shape", "plaintext").set_node_attr(
        t,
        "label",
        r#"<<TABLE><TR><TD PORT="left">x</TD><TD PORT="right">y</TD></TR></TABLE>>"#,
    );
    let e = g.iter_edges().next().unwrap();
    g.set_edge_attr(e, "tailport", "right");
    layout(&mut g, Engine::Dot).unwrap();
    assert!(!g.warnings.has(WarningKind::UnknownPort));
    assert!(g.node(t).layout.label.as_ref().unwrap().html);
    assert!(g.edge(e).layout.tail_port.p.x > 0.0);
}

#[test]
fn broken_html_falls_back_to_text() {
    let mut g = Graph::new("G", true);
    let n = g.add_node("n");
    g.set_node_attr(n, "label", "<<TABLE><TR><TD>x</TABLE>>");
    layout(&mut g, Engine::Dot).unwrap();
    assert!(g.warnings.has(WarningKind::HtmlLabel));
    assert!(!g.node(n).layout.label.as_ref().unwrap().html);
}

#[test]
fn cluster_labels_sit_on_top_of_their_box() {
    let mut g = new_graph(&[("a", "b"), ("b", "c")]);
    let sg = g.add_subgraph("cluster_0", None);
    g.set_subgraph_attr(sg, "label", "Group");
    for name in ["a", "b"] {
        let n = id(&g, name);
        g.add_to_subgraph(sg, n);
    }
    layout(&mut g, Engine::Dot).unwrap();
    let cl = &g.subgraph(sg).layout;
    let label = cl.label.as_ref().unwrap();
    assert!(label.set);
    assert_eq!(cl.label_pos, label.pos);
    assert!(cl.bb.contains(cl.label_pos));
    assert!(cl.label_pos.y > coord(&g, "a").y);
    assert!(cl.bb.contains_box(&g.node(id(&g, "a")).layout.bbox()));
    assert!(!cl.bb.contains(coord(&g, "c")));
}

#[test]
fn graph_label_goes_below_unless_asked() {
    let mut g = new_graph(&[("a", "b")]);
    g.set_graph_attr("label", "Caption");
    layout(&mut g, Engine::Dot).unwrap();
    let low = g.label.as_ref().unwrap().pos;
    assert!(low.y < coord(&g, "b").y);

    let mut g = new_graph(&[("a", "b")]);
    g.set_graph_attr("label", "Caption").set_graph_attr("labelloc", "t");
    layout(&mut g, Engine::Dot).unwrap();
    let high = g.label.as_ref().unwrap().pos;
    assert!(high.y > coord(&g, "a").y);
    assert!(g.bb.contains(high));
}

#[test]
fn stress_places_every_node_and_draws_straight_edges() {
    let mut g = Graph::new("G", false);
    for (t, h) in [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")] {
        g.add_edge_by_name(t, h);
    }
    layout(&mut g, Engine::Stress).unwrap();
    assert_eq!(g.bb.ll, Point::default());
    let (a, b) = (coord(&g, "a"), coord(&g, "b"));
    assert!((a - b).x.hypot((a - b).y) > 1.0);
    for e in g.iter_edges() {
        let spl = &g.edge(e).layout.spl;
        assert_eq!(spl.len(), 1);
        assert_eq!(spl[0].points.len(), 4);
        assert!(!spl[0].eflag && !spl[0].sflag);
    }
}

#[test]
fn stress_keeps_pinned_positions() {
    let mut g = new_graph(&[("a", "b"), ("b", "c")]);
    g.set_graph_attr("notranslate", "true");
    let a = id(&g, "a");
    g.set_node_attr(a, "pos", "72,144!");
    layout(&mut g, Engine::Stress).unwrap();
    assert_eq!(coord(&g, "a"), Point::new(72.0, 144.0));
    assert!(g.node(a).layout.pinned);
    assert!(g.iter_edges().all(|e| g.edge(e).layout.spl[0].eflag));
}

#[test]
fn stress_boxes_clusters() {
    let mut g = new_graph(&[("a", "b"), ("b", "c")]);
    let sg = g.add_subgraph("cluster_x", None);
    let (a, b) = (id(&g, "a"), id(&g, "b"));
    g.add_to_subgraph(sg, a);
    g.add_to_subgraph(sg, b);
    layout(&mut g, Engine::Stress).unwrap();
    let bb = g.subgraph(sg).layout.bb;
    assert!(bb.contains_box(&g.node(a).layout.bbox()));
    assert!(bb.contains_box(&g.node(b).layout.bbox()));
    assert!(g.bb.contains_box(&bb));
}

#[test]
fn failed_layout_leaves_the_graph_alone() {
    let mut g = new_graph(&[("a", "b")]);
    let e = g.iter_edges().next().unwrap();
    g.edge_mut(e).head = NodeId(7);
    assert!(layout(&mut g, Engine::Dot).is_err());
    assert_eq!(coord(&g, "a"), Point::default());
    assert_eq!(g.node(id(&g, "a")).layout.width, 0.0);
}

#[test]
fn engine_names() {
    assert_eq!(Engine::parse("dot"), Some(Engine::Dot));
    assert_eq!(Engine::parse("NEATO"), Some(Engine::Stress));
    assert_eq!(Engine::parse("fdp"), None);
}
