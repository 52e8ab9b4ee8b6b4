//! The attributed user graph.
//!
//! Nodes, edges and subgraphs live in arenas and are addressed by typed indices. Every object
//! carries its attributes (strings, as given by the caller) and a layout record that engines fill
//! in. Subgraph membership follows the usual convention: a node added to a subgraph also belongs
//! to every ancestor of that subgraph.

use crate::attrs::{self, Attrs};
use crate::error::{Error, Result};
use crate::geom::{BBox, Bezier, Point};
use crate::shape::{Port, ShapeDesc};
use crate::text::FontSpec;
use crate::warn::Warnings;
use rustc_hash::FxBuildHasher;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubgraphId(pub usize);

/// A measured label. `dimen` includes margins; `pos` is the label center once `set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Label {
    pub text: String,
    pub html: bool,
    pub font: FontSpec,
    pub dimen: Point,
    pub pos: Point,
    pub set: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NodeLayout {
    pub coord: Point,
    /// Full width and height in points.
    pub width: f64,
    pub height: f64,
    pub lw: f64,
    pub rw: f64,
    pub ht: f64,
    pub rank: i32,
    pub order: i32,
    pub shape: ShapeDesc,
    pub label: Option<Label>,
    pub pinned: bool,
}

impl NodeLayout {
    pub fn bbox(&self) -> BBox {
        BBox::from_coords(
            self.coord.x - self.lw,
            self.coord.y - self.ht / 2.0,
            self.coord.x + self.rw,
            self.coord.y + self.ht / 2.0,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeLayout {
    pub spl: Vec<Bezier>,
    pub label: Option<Label>,
    pub tail_port: Port,
    pub head_port: Port,
    /// The drawing direction was reversed to break a cycle.
    pub reversed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterLayout {
    pub bb: BBox,
    pub label: Option<Label>,
    pub label_pos: Point,
    pub min_rank: i32,
    pub max_rank: i32,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub attrs: Attrs,
    pub layout: NodeLayout,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub tail: NodeId,
    pub head: NodeId,
    pub key: Option<String>,
    pub attrs: Attrs,
    pub layout: EdgeLayout,
}

#[derive(Debug, Clone)]
pub struct Subgraph {
    pub name: String,
    pub attrs: Attrs,
    pub parent: Option<SubgraphId>,
    pub children: Vec<SubgraphId>,
    /// Members, including members of nested subgraphs, in insertion order.
    pub nodes: Vec<NodeId>,
    pub layout: ClusterLayout,
}

#[derive(Debug, Clone)]
pub struct Graph {
    pub name: String,
    pub directed: bool,
    pub attrs: Attrs,
    pub node_defaults: Attrs,
    pub edge_defaults: Attrs,
    pub bb: BBox,
    /// Root graph label, placed by post-processing.
    pub label: Option<Label>,
    pub warnings: Warnings,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    subgraphs: Vec<Subgraph>,
    root_subgraphs: Vec<SubgraphId>,
    node_by_name: HashMap<String, NodeId>,
    out_edges: Vec<Vec<EdgeId>>,
    in_edges: Vec<Vec<EdgeId>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("G", true)
    }
}

impl Graph {
    pub fn new(name: impl Into<String>, directed: bool) -> Self {
        Self {
            name: name.into(),
            directed,
            attrs: Attrs::new(),
            node_defaults: Attrs::new(),
            edge_defaults: Attrs::new(),
            bb: BBox::default(),
            label: None,
            warnings: Warnings::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            root_subgraphs: Vec::new(),
            node_by_name: HashMap::default(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        }
    }

    // ---- nodes ----------------------------------------------------------------------------

    /// Returns the existing node with this name or creates it.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        if let Some(id) = self.node_by_name.get(&name) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.node_by_name.insert(name.clone(), id);
        self.nodes.push(Node {
            name,
            attrs: Attrs::new(),
            layout: NodeLayout::default(),
        });
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        id
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in creation order (stable within a pass).
    pub fn iter_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    // ---- edges ----------------------------------------------------------------------------

    pub fn add_edge(&mut self, tail: NodeId, head: NodeId) -> EdgeId {
        self.add_edge_with_key(tail, head, None)
    }

    pub fn add_edge_with_key(
        &mut self,
        tail: NodeId,
        head: NodeId,
        key: Option<String>,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            tail,
            head,
            key,
            attrs: Attrs::new(),
            layout: EdgeLayout::default(),
        });
        self.out_edges[tail.0].push(id);
        self.in_edges[head.0].push(id);
        id
    }

    /// Adds an edge between named nodes, creating them as needed.
    pub fn add_edge_by_name(&mut self, tail: &str, head: &str) -> EdgeId {
        let t = self.add_node(tail);
        let h = self.add_node(head);
        self.add_edge(t, h)
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.0]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn iter_out(&self, n: NodeId) -> &[EdgeId] {
        &self.out_edges[n.0]
    }

    pub fn iter_in(&self, n: NodeId) -> &[EdgeId] {
        &self.in_edges[n.0]
    }

    pub fn tail(&self, e: EdgeId) -> NodeId {
        self.edges[e.0].tail
    }

    pub fn head(&self, e: EdgeId) -> NodeId {
        self.edges[e.0].head
    }

    /// Human-readable edge name for diagnostics.
    pub fn edge_name(&self, e: EdgeId) -> String {
        let edge = &self.edges[e.0];
        let arrow = if self.directed { "->" } else { "--" };
        format!(
            "{} {} {}",
            self.nodes[edge.tail.0].name, arrow, self.nodes[edge.head.0].name
        )
    }

    // ---- subgraphs ------------------------------------------------------------------------

    pub fn add_subgraph(
        &mut self,
        name: impl Into<String>,
        parent: Option<SubgraphId>,
    ) -> SubgraphId {
        let id = SubgraphId(self.subgraphs.len());
        self.subgraphs.push(Subgraph {
            name: name.into(),
            attrs: Attrs::new(),
            parent,
            children: Vec::new(),
            nodes: Vec::new(),
            layout: ClusterLayout::default(),
        });
        match parent {
            Some(p) => self.subgraphs[p.0].children.push(id),
            None => self.root_subgraphs.push(id),
        }
        id
    }

    /// Adds `n` to `sg` and every ancestor of `sg`.
    pub fn add_to_subgraph(&mut self, sg: SubgraphId, n: NodeId) {
        let mut cur = Some(sg);
        while let Some(s) = cur {
            let sub = &mut self.subgraphs[s.0];
            if !sub.nodes.contains(&n) {
                sub.nodes.push(n);
            }
            cur = sub.parent;
        }
    }

    pub fn subgraph(&self, id: SubgraphId) -> &Subgraph {
        &self.subgraphs[id.0]
    }

    pub fn subgraph_mut(&mut self, id: SubgraphId) -> &mut Subgraph {
        &mut self.subgraphs[id.0]
    }

    pub fn subgraph_count(&self) -> usize {
        self.subgraphs.len()
    }

    /// Direct subgraphs of `parent` (the root graph when `None`).
    pub fn subgraphs(&self, parent: Option<SubgraphId>) -> &[SubgraphId] {
        match parent {
            Some(p) => &self.subgraphs[p.0].children,
            None => &self.root_subgraphs,
        }
    }

    pub fn parent(&self, sg: SubgraphId) -> Option<SubgraphId> {
        self.subgraphs[sg.0].parent
    }

    pub fn is_cluster(&self, sg: SubgraphId) -> bool {
        self.subgraphs[sg.0].name.starts_with("cluster")
    }

    /// Nearest cluster descendants of `parent`, looking through non-cluster subgraphs.
    pub fn child_clusters(&self, parent: Option<SubgraphId>) -> Vec<SubgraphId> {
        let mut out = Vec::new();
        let mut stack: Vec<SubgraphId> = self.subgraphs(parent).iter().rev().copied().collect();
        while let Some(sg) = stack.pop() {
            if self.is_cluster(sg) {
                out.push(sg);
            } else {
                stack.extend(self.subgraphs[sg.0].children.iter().rev().copied());
            }
        }
        out
    }

    /// Every subgraph in pre-order.
    pub fn subgraphs_preorder(&self) -> Vec<SubgraphId> {
        let mut out = Vec::with_capacity(self.subgraphs.len());
        let mut stack: Vec<SubgraphId> = self.root_subgraphs.iter().rev().copied().collect();
        while let Some(sg) = stack.pop() {
            out.push(sg);
            stack.extend(self.subgraphs[sg.0].children.iter().rev().copied());
        }
        out
    }

    // ---- attributes -----------------------------------------------------------------------

    pub fn set_graph_attr(&mut self, name: &str, value: &str) -> &mut Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_node_attr(&mut self, n: NodeId, name: &str, value: &str) -> &mut Self {
        self.nodes[n.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_edge_attr(&mut self, e: EdgeId, name: &str, value: &str) -> &mut Self {
        self.edges[e.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_subgraph_attr(&mut self, sg: SubgraphId, name: &str, value: &str) -> &mut Self {
        self.subgraphs[sg.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn graph_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn node_attr(&self, n: NodeId, name: &str) -> Option<&str> {
        attrs::lookup(&self.nodes[n.0].attrs, &self.node_defaults, name)
    }

    pub fn edge_attr(&self, e: EdgeId, name: &str) -> Option<&str> {
        attrs::lookup(&self.edges[e.0].attrs, &self.edge_defaults, name)
    }

    pub fn subgraph_attr(&self, sg: SubgraphId, name: &str) -> Option<&str> {
        self.subgraphs[sg.0].attrs.get(name).map(String::as_str)
    }

    pub fn graph_double(&mut self, name: &str, default: f64, min: f64) -> f64 {
        let raw = self.attrs.get(name).map(String::as_str);
        attrs::parse_double(raw, name, default, min, &mut self.warnings)
    }

    pub fn graph_int(&mut self, name: &str, default: i32, min: i32) -> i32 {
        let raw = self.attrs.get(name).map(String::as_str);
        attrs::parse_int(raw, name, default, min, &mut self.warnings)
    }

    pub fn graph_bool(&mut self, name: &str, default: bool) -> bool {
        let raw = self.attrs.get(name).map(String::as_str);
        attrs::parse_bool(raw, name, default, &mut self.warnings)
    }

    pub fn node_double(&mut self, n: NodeId, name: &str, default: f64, min: f64) -> f64 {
        let raw = attrs::lookup(&self.nodes[n.0].attrs, &self.node_defaults, name);
        attrs::parse_double(raw, name, default, min, &mut self.warnings)
    }

    pub fn node_bool(&mut self, n: NodeId, name: &str, default: bool) -> bool {
        let raw = attrs::lookup(&self.nodes[n.0].attrs, &self.node_defaults, name);
        attrs::parse_bool(raw, name, default, &mut self.warnings)
    }

    pub fn edge_double(&mut self, e: EdgeId, name: &str, default: f64, min: f64) -> f64 {
        let raw = attrs::lookup(&self.edges[e.0].attrs, &self.edge_defaults, name);
        attrs::parse_double(raw, name, default, min, &mut self.warnings)
    }

    pub fn edge_int(&mut self, e: EdgeId, name: &str, default: i32, min: i32) -> i32 {
        let raw = attrs::lookup(&self.edges[e.0].attrs, &self.edge_defaults, name);
        attrs::parse_int(raw, name, default, min, &mut self.warnings)
    }

    pub fn edge_bool(&mut self, e: EdgeId, name: &str, default: bool) -> bool {
        let raw = attrs::lookup(&self.edges[e.0].attrs, &self.edge_defaults, name);
        attrs::parse_bool(raw, name, default, &mut self.warnings)
    }

    /// Checks that every edge endpoint refers to an existing node.
    pub fn validate(&self) -> Result<()> {
        for (ix, e) in self.edges.iter().enumerate() {
            if e.tail.0 >= self.nodes.len() || e.head.0 >= self.nodes.len() {
                return Err(Error::MissingEndpoint {
                    edge: format!("#{ix}"),
                });
            }
        }
        for sg in &self.subgraphs {
            if sg.nodes.iter().any(|n| n.0 >= self.nodes.len()) {
                return Err(Error::MissingEndpoint {
                    edge: format!("subgraph {}", sg.name),
                });
            }
        }
        Ok(())
    }
}
