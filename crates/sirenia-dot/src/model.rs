//! The proper layered graph shared by ordering, positioning and routing.

use rustc_hash::{FxHashMap, FxHashSet};
use sirenia_graph::{BBox, FEdge, FNode, FastGraph, Point, Port};

#[derive(Debug, Clone, Default)]
pub struct LNode {
    /// Index of the real node, `None` for virtual nodes.
    pub real: Option<usize>,
    pub lw: f64,
    pub rw: f64,
    pub ht: f64,
    pub x: f64,
    pub y: f64,
    /// Real edge whose label this virtual node reserves room for.
    pub label_of: Option<usize>,
    /// Innermost cluster the node belongs to.
    pub cluster: Option<usize>,
    pub flat_out: Vec<usize>,
    pub flat_in: Vec<usize>,
    pub self_loops: Vec<usize>,
    /// Some incident edge attaches through a port.
    pub has_port: bool,
    /// Degree bucket used to weight chain edges (0, 1, 2 or 3+).
    pub weight_class: u8,
}

impl LNode {
    pub fn is_virtual(&self) -> bool {
        self.real.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LEdge {
    /// Real edges drawn along this segment.
    pub orig: Vec<usize>,
    pub xpenalty: i32,
    pub tail_port: Port,
    pub head_port: Port,
}

/// An edge between two nodes of the same rank.
#[derive(Debug, Clone)]
pub struct FlatEdge {
    pub tail: FNode,
    pub head: FNode,
    pub weight: i32,
    /// Real edges represented; empty for ordering constraints.
    pub orig: Vec<usize>,
    pub alive: bool,
    /// Points from the real edge's head to its tail.
    pub reversed: bool,
}

impl FlatEdge {
    pub fn is_ordering(&self) -> bool {
        self.orig.is_empty()
    }
}

/// How a real edge is represented in the layered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Layout edges from the lower-ranked endpoint down to the higher-ranked one.
    Chain { edges: Vec<FEdge>, reversed: bool },
    /// Index into [`Layered::flat`].
    Flat(usize),
    SelfLoop,
    Ignored,
}

pub type LGraph = FastGraph<LNode, LEdge>;

#[derive(Debug, Clone, Default)]
pub struct Layered {
    pub g: LGraph,
    /// Nodes of each rank, left to right once ordered.
    pub ranks: Vec<Vec<FNode>>,
    pub node_of: Vec<FNode>,
    pub route: Vec<Route>,
    pub flat: Vec<FlatEdge>,
    /// Flat pairs `(left, right)` whose relative order is fixed.
    pub flat_order: FxHashSet<(FNode, FNode)>,
    pub cluster_span: Vec<(i32, i32)>,
    /// Rank separation after the label adjustment, in points.
    pub ranksep: f64,
    /// Extent of each rank below (`ht1`) and above (`ht2`) its centre line.
    pub ht1: Vec<f64>,
    pub ht2: Vec<f64>,
    pub cluster_bb: Vec<BBox>,
    /// Label node of each labelled flat edge that is not between neighbours, by real edge.
    pub flat_label: FxHashMap<usize, FNode>,
    /// Label centre per real edge, in the layout frame.
    pub label_pos: Vec<Option<Point>>,
}

impl Layered {
    pub fn max_rank(&self) -> i32 {
        self.ranks.len() as i32 - 1
    }

    /// Y of rank `r`'s centre line once coordinates are assigned.
    pub fn rank_y(&self, r: usize) -> f64 {
        self.ranks[r].first().map_or(0.0, |v| self.g.node(*v).data.y)
    }

    pub fn order(&self, n: FNode) -> i32 {
        self.g.node(n).order
    }

    pub fn coord(&self, n: FNode) -> Point {
        let d = &self.g.node(n).data;
        Point::new(d.x, d.y)
    }

    /// Rewrites `order` for every node of rank `r` from its array position.
    pub fn renumber(&mut self, r: usize) {
        for (i, v) in self.ranks[r].iter().enumerate() {
            self.g.node_mut(*v).order = i as i32;
        }
    }

    pub fn renumber_all(&mut self) {
        for r in 0..self.ranks.len() {
            self.renumber(r);
        }
    }

    pub fn add_flat(&mut self, f: FlatEdge) -> usize {
        let ix = self.flat.len();
        self.g.node_mut(f.tail).data.flat_out.push(ix);
        self.g.node_mut(f.head).data.flat_in.push(ix);
        self.flat.push(f);
        ix
    }

    pub fn delete_flat(&mut self, ix: usize) {
        if !self.flat[ix].alive {
            return;
        }
        self.flat[ix].alive = false;
        let (t, h) = (self.flat[ix].tail, self.flat[ix].head);
        self.g.node_mut(t).data.flat_out.retain(|f| *f != ix);
        self.g.node_mut(h).data.flat_in.retain(|f| *f != ix);
    }

    pub fn find_flat(&self, t: FNode, h: FNode) -> Option<usize> {
        self.g
            .node(t)
            .data
            .flat_out
            .iter()
            .copied()
            .find(|f| self.flat[*f].head == h)
    }

    /// Walks the chain of real edge `e` again, following segments that carry it.
    pub fn trace_chain(&self, e: usize, from: FNode, to_rank: i32) -> Vec<FEdge> {
        let mut out = Vec::new();
        let mut v = from;
        while self.g.rank(v) < to_rank {
            let Some(next) = self
                .g
                .out_edges(v)
                .iter()
                .copied()
                .find(|f| self.g.edge(*f).data.orig.contains(&e))
            else {
                break;
            };
            out.push(next);
            v = self.g.head(next);
        }
        out
    }
}
