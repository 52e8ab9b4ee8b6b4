use sirenia_graph::{Graph, WarningKind};

fn new_graph() -> Graph {
    let mut g = Graph::new("G", true);
    g.add_edge_by_name("a", "b");
    g.add_edge_by_name("b", "c");
    g
}

#[test]
fn nodes_are_unique_by_name() {
    let mut g = new_graph();
    let a = g.add_node("a");
    assert_eq!(g.node_count(), 3);
    assert_eq!(g.node_id("a"), Some(a));
    assert_eq!(g.iter_out(a).len(), 1);
    let e = g.iter_out(a)[0];
    assert_eq!(g.node(g.head(e)).name, "b");
    assert_eq!(g.edge_name(e), "a -> b");
}

#[test]
fn subgraph_membership_propagates_to_ancestors() {
    let mut g = new_graph();
    let outer = g.add_subgraph("cluster_outer", None);
    let plain = g.add_subgraph("group", Some(outer));
    let inner = g.add_subgraph("cluster_inner", Some(plain));
    let b = g.node_id("b").unwrap();
    g.add_to_subgraph(inner, b);
    g.add_to_subgraph(inner, b);
    assert_eq!(g.subgraph(inner).nodes, vec![b]);
    assert_eq!(g.subgraph(plain).nodes, vec![b]);
    assert_eq!(g.subgraph(outer).nodes, vec![b]);
    assert!(g.is_cluster(outer));
    assert!(!g.is_cluster(plain));
    assert_eq!(g.child_clusters(Some(outer)), vec![inner]);
    assert_eq!(g.child_clusters(None), vec![outer]);
    assert_eq!(g.subgraphs_preorder(), vec![outer, plain, inner]);
}

#[test]
fn attribute_defaults_and_malformed_values() {
    let mut g = new_graph();
    let a = g.node_id("a").unwrap();
    g.node_defaults.insert("width".into(), "2".into());
    assert_eq!(g.node_double(a, "width", 0.75, 0.01), 2.0);
    g.set_node_attr(a, "width", "huge");
    assert_eq!(g.node_double(a, "width", 0.75, 0.01), 0.75);
    g.set_graph_attr("nodesep", "0.001");
    assert_eq!(g.graph_double("nodesep", 0.25, 0.02), 0.02);
    assert!(g.warnings.has(WarningKind::MalformedAttribute));
    assert_eq!(g.warnings.messages().len(), 1);
}

#[test]
fn validate_accepts_well_formed_graph() {
    assert!(new_graph().validate().is_ok());
}
