//! Extraction of the layout problem from the attributed graph.
//!
//! Everything downstream works in the layout frame: ranks run top to bottom along -y, and for
//! left-to-right drawings node and label extents are swapped here once.

use crate::config::{ClusterRank, DotConfig, Ordering, RankDir};
use sirenia_graph::clip::ARROW_LENGTH;
use sirenia_graph::shape::MC_SCALE;
use sirenia_graph::{
    BBox, EdgeId, Graph, NodeId, POINTS_PER_INCH, Point, Port, ShapeDesc, ShapeKind, SubgraphId,
    WarningKind, Warnings, sides,
};

/// Cross penalty of edges between nodes of the same `group`.
pub const CL_CROSS: i32 = 1000;
/// Default cluster margin in points.
pub const CL_OFFSET: f64 = 8.0;
/// Extra room around a cluster label.
const LABEL_GAP: f64 = 4.0;

pub(crate) const BOTTOM_IX: usize = 0;
pub(crate) const RIGHT_IX: usize = 1;
pub(crate) const TOP_IX: usize = 2;
pub(crate) const LEFT_IX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Same,
    Min,
    Source,
    Max,
    Sink,
}

impl RankKind {
    fn parse(s: &str) -> Option<RankKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same" => Some(RankKind::Same),
            "min" => Some(RankKind::Min),
            "source" => Some(RankKind::Source),
            "max" => Some(RankKind::Max),
            "sink" => Some(RankKind::Sink),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub lw: f64,
    pub rw: f64,
    pub ht: f64,
    /// Outline in the drawing frame; see [`FramedShape`](crate::splines::FramedShape).
    pub shape: ShapeDesc,
    pub group: Option<String>,
    pub ordering: Option<Ordering>,
}

#[derive(Debug, Clone)]
pub struct EdgeInfo {
    pub id: EdgeId,
    pub tail: usize,
    pub head: usize,
    pub weight: i32,
    pub minlen: i32,
    pub constraint: bool,
    pub xpenalty: i32,
    /// Label extent in the layout frame.
    pub label: Option<Point>,
    pub tail_port: Port,
    pub head_port: Port,
    /// Arrowhead lengths at the user's tail and head.
    pub arrow_tail: Option<f64>,
    pub arrow_head: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub sg: SubgraphId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
    /// Nodes owned by this cluster or one of its descendants, in node order.
    pub members: Vec<usize>,
    /// Label room per side (`BOTTOM_IX`, `RIGHT_IX`, `TOP_IX`, `LEFT_IX`), layout frame.
    pub border: [Point; 4],
    pub margin: f64,
}

#[derive(Debug, Clone)]
pub struct RankSet {
    /// Innermost enclosing cluster, `None` for the root graph.
    pub scope: Option<usize>,
    pub kind: RankKind,
    pub nodes: Vec<usize>,
}

/// The layout problem: sizes, edge parameters, cluster tree and rank sets.
#[derive(Debug, Clone)]
pub struct DotGraph {
    pub cfg: DotConfig,
    pub nodes: Vec<NodeInfo>,
    pub edges: Vec<EdgeInfo>,
    pub clusters: Vec<ClusterInfo>,
    pub top_clusters: Vec<usize>,
    /// Innermost cluster owning each node.
    pub owner: Vec<Option<usize>>,
    pub rank_sets: Vec<RankSet>,
    pub has_edge_labels: bool,
    pub warnings: Warnings,
}

impl DotGraph {
    pub fn from_graph(g: &mut Graph) -> DotGraph {
        let cfg = DotConfig::from_graph(g);
        let dir = cfg.rankdir;
        let mut nodes = Vec::with_capacity(g.node_count());
        for n in g.iter_nodes().collect::<Vec<_>>() {
            nodes.push(node_info(g, n, dir));
        }
        let mut edges = Vec::with_capacity(g.edge_count());
        for e in g.iter_edges().collect::<Vec<_>>() {
            edges.push(edge_info(g, e, &nodes, dir));
        }
        let has_edge_labels = edges.iter().any(|e| e.label.is_some());

        let mut dg = DotGraph {
            cfg,
            nodes,
            edges,
            clusters: Vec::new(),
            top_clusters: Vec::new(),
            owner: vec![None; g.node_count()],
            rank_sets: Vec::new(),
            has_edge_labels,
            warnings: Warnings::new(),
        };
        if dg.cfg.clusterrank == ClusterRank::Local {
            dg.collect_clusters(g);
        }
        dg.collect_rank_sets(g);
        dg
    }

    fn collect_clusters(&mut self, g: &Graph) {
        let mut ix_of: Vec<Option<usize>> = vec![None; g.subgraph_count()];
        for sg in g.subgraphs_preorder() {
            if !g.is_cluster(sg) || g.subgraph(sg).nodes.is_empty() {
                continue;
            }
            let mut up = g.parent(sg);
            let mut parent = None;
            while let Some(p) = up {
                if let Some(ix) = ix_of[p.0] {
                    parent = Some(ix);
                    break;
                }
                up = g.parent(p);
            }
            let ix = self.clusters.len();
            ix_of[sg.0] = Some(ix);
            let depth = parent.map_or(1, |p| self.clusters[p].depth + 1);
            let border = cluster_border(g, sg, self.cfg.rankdir);
            self.clusters.push(ClusterInfo {
                sg,
                parent,
                children: Vec::new(),
                depth,
                members: Vec::new(),
                border,
                margin: CL_OFFSET,
            });
            match parent {
                Some(p) => self.clusters[p].children.push(ix),
                None => self.top_clusters.push(ix),
            }
            // First claim wins: a node already owned by a sibling stays there.
            for n in &g.subgraph(sg).nodes {
                if self.owner[n.0] == parent {
                    self.owner[n.0] = Some(ix);
                } else if !self.is_ancestor(self.owner[n.0], ix) {
                    self.warnings.warn(
                        WarningKind::Layout,
                        format!(
                            "node {} is in two clusters; keeping the first",
                            g.node(*n).name
                        ),
                    );
                }
            }
        }
        for n in 0..self.owner.len() {
            let mut c = self.owner[n];
            while let Some(ix) = c {
                self.clusters[ix].members.push(n);
                c = self.clusters[ix].parent;
            }
        }
        // Clusters left without members after ownership resolution are dropped.
        if self.clusters.iter().any(|c| c.members.is_empty()) {
            self.prune_empty_clusters();
        }
    }

    fn prune_empty_clusters(&mut self) {
        let keep: Vec<bool> = self.clusters.iter().map(|c| !c.members.is_empty()).collect();
        let mut remap: Vec<Option<usize>> = vec![None; keep.len()];
        let mut next = 0;
        for (i, k) in keep.iter().enumerate() {
            if *k {
                remap[i] = Some(next);
                next += 1;
            }
        }
        let old = std::mem::take(&mut self.clusters);
        for (i, mut c) in old.into_iter().enumerate() {
            if !keep[i] {
                continue;
            }
            c.parent = c.parent.and_then(|p| remap[p]);
            c.children = c.children.iter().filter_map(|ch| remap[*ch]).collect();
            self.clusters.push(c);
        }
        self.top_clusters = self.top_clusters.iter().filter_map(|c| remap[*c]).collect();
        for o in &mut self.owner {
            *o = o.and_then(|c| remap[c]);
        }
    }

    pub(crate) fn is_ancestor(&self, anc: Option<usize>, mut c: usize) -> bool {
        let Some(anc) = anc else {
            return true;
        };
        loop {
            if c == anc {
                return true;
            }
            match self.clusters[c].parent {
                Some(p) => c = p,
                None => return false,
            }
        }
    }

    fn collect_rank_sets(&mut self, g: &Graph) {
        for sg in g.subgraphs_preorder() {
            if self.cluster_of_subgraph(sg).is_some() {
                continue;
            }
            let Some(kind) = g.subgraph_attr(sg, "rank").and_then(RankKind::parse) else {
                continue;
            };
            let nodes: Vec<usize> = g.subgraph(sg).nodes.iter().map(|n| n.0).collect();
            if nodes.is_empty() {
                continue;
            }
            let mut up = g.parent(sg);
            let mut scope = None;
            while let Some(p) = up {
                if let Some(ix) = self.cluster_of_subgraph(p) {
                    scope = Some(ix);
                    break;
                }
                up = g.parent(p);
            }
            self.rank_sets.push(RankSet { scope, kind, nodes });
        }
    }

    pub fn cluster_of_subgraph(&self, sg: SubgraphId) -> Option<usize> {
        self.clusters.iter().position(|c| c.sg == sg)
    }

    /// Clusters on the path from the top level down to the owner of `n`.
    pub fn cluster_path(&self, n: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut c = self.owner[n];
        while let Some(ix) = c {
            path.push(ix);
            c = self.clusters[ix].parent;
        }
        path.reverse();
        path
    }

    /// Whether `c` is `n`'s owner or one of its ancestors.
    pub fn contains(&self, c: usize, n: usize) -> bool {
        let mut cur = self.owner[n];
        while let Some(ix) = cur {
            if ix == c {
                return true;
            }
            cur = self.clusters[ix].parent;
        }
        false
    }

    /// Innermost cluster containing both nodes.
    pub fn common_cluster(&self, a: usize, b: usize) -> Option<usize> {
        let pa = self.cluster_path(a);
        let pb = self.cluster_path(b);
        pa.iter()
            .zip(pb.iter())
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| *x)
    }
}

fn node_info(g: &mut Graph, n: NodeId, dir: RankDir) -> NodeInfo {
    let layout = &g.node(n).layout;
    let (mut w, mut h) = (layout.width, layout.height);
    let mut shape = layout.shape.clone();
    if w <= 0.0 && h <= 0.0 {
        w = 0.75 * POINTS_PER_INCH;
        h = 0.5 * POINTS_PER_INCH;
        shape = ShapeDesc::new(ShapeKind::Ellipse, w, h);
    }
    if shape.width <= 0.0 && shape.height <= 0.0 {
        shape = ShapeDesc::new(shape.kind, w, h);
    }
    let (lw, ht) = if dir.is_flipped() { (h / 2.0, w) } else { (w / 2.0, h) };
    let group = g
        .node_attr(n, "group")
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let ordering = g.node_attr(n, "ordering").and_then(Ordering::parse);
    NodeInfo {
        id: n,
        lw,
        rw: lw,
        ht,
        shape,
        group,
        ordering,
    }
}

fn edge_info(g: &mut Graph, e: EdgeId, nodes: &[NodeInfo], dir: RankDir) -> EdgeInfo {
    let (t, h) = (g.tail(e).0, g.head(e).0);
    let mut weight = g.edge_int(e, "weight", 1, 0);
    let minlen = g.edge_int(e, "minlen", 1, 0);
    let constraint = g.edge_bool(e, "constraint", true);
    let mut xpenalty = 1;
    if let (Some(a), Some(b)) = (&nodes[t].group, &nodes[h].group)
        && a == b
    {
        xpenalty = CL_CROSS;
        weight = weight.saturating_mul(100);
    }
    if !constraint {
        xpenalty = 0;
        weight = 0;
    }
    let label = g.edge(e).layout.label.as_ref().map(|l| {
        if dir.is_flipped() {
            Point::new(l.dimen.y, l.dimen.x)
        } else {
            l.dimen
        }
    });
    let tail_port = port_to_layout(&g.edge(e).layout.tail_port, &nodes[t], dir);
    let head_port = port_to_layout(&g.edge(e).layout.head_port, &nodes[h], dir);

    let arrowsize = g.edge_double(e, "arrowsize", 1.0, 0.0);
    let len = ARROW_LENGTH * arrowsize;
    let default_dir = if g.directed { "forward" } else { "none" };
    let (arrow_tail, arrow_head) = match g.edge_attr(e, "dir").unwrap_or(default_dir) {
        "back" => (Some(len), None),
        "both" => (Some(len), Some(len)),
        "none" => (None, None),
        _ => (None, Some(len)),
    };
    EdgeInfo {
        id: e,
        tail: t,
        head: h,
        weight,
        minlen,
        constraint,
        xpenalty,
        label,
        tail_port,
        head_port,
        arrow_tail: arrow_tail.filter(|l| *l > 0.0),
        arrow_head: arrow_head.filter(|l| *l > 0.0),
    }
}

/// Rotates a drawing-frame port into the layout frame and recomputes its crossing order.
fn port_to_layout(port: &Port, node: &NodeInfo, dir: RankDir) -> Port {
    let mut p = port.clone();
    if !p.defined {
        return p;
    }
    p.p = dir.to_layout(port.p);
    p.bp = port.bp.map(|b| {
        let a = dir.to_layout(b.ll);
        let c = dir.to_layout(b.ur);
        BBox::from_coords(a.x.min(c.x), a.y.min(c.y), a.x.max(c.x), a.y.max(c.y))
    });
    p.side = rotate_sides(port.side, dir);
    let span = node.lw + node.rw;
    if span > 0.0 {
        p.order = (MC_SCALE * (node.lw + p.p.x) / span).clamp(0.0, 255.0) as u8;
    }
    p
}

fn rotate_sides(side: u8, dir: RankDir) -> u8 {
    let mut out = 0;
    for (bit, v) in [
        (sides::BOTTOM, Point::new(0.0, -1.0)),
        (sides::RIGHT, Point::new(1.0, 0.0)),
        (sides::TOP, Point::new(0.0, 1.0)),
        (sides::LEFT, Point::new(-1.0, 0.0)),
    ] {
        if side & bit == 0 {
            continue;
        }
        out |= side_of(dir.to_layout(v));
    }
    out
}

fn side_of(v: Point) -> u8 {
    if v.y < -0.5 {
        sides::BOTTOM
    } else if v.x > 0.5 {
        sides::RIGHT
    } else if v.y > 0.5 {
        sides::TOP
    } else {
        sides::LEFT
    }
}

fn cluster_border(g: &Graph, sg: SubgraphId, dir: RankDir) -> [Point; 4] {
    let mut border = [Point::default(); 4];
    let Some(label) = g.subgraph(sg).layout.label.as_ref() else {
        return border;
    };
    let padded = Point::new(
        label.dimen.x + 4.0 * LABEL_GAP,
        label.dimen.y + 2.0 * LABEL_GAP,
    );
    let at_bottom = g
        .subgraph_attr(sg, "labelloc")
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("b"));
    let up = if at_bottom {
        Point::new(0.0, -1.0)
    } else {
        Point::new(0.0, 1.0)
    };
    let ix = match side_of(dir.to_layout(up)) {
        sides::BOTTOM => BOTTOM_IX,
        sides::RIGHT => RIGHT_IX,
        sides::TOP => TOP_IX,
        _ => LEFT_IX,
    };
    border[ix] = if dir.is_flipped() {
        Point::new(padded.y, padded.x)
    } else {
        padded
    };
    border
}
