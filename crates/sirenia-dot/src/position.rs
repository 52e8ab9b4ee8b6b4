//! Coordinate assignment.
//!
//! X coordinates come from a second network-simplex problem on an auxiliary graph: every pair
//! of rank neighbours gets a separation edge, every layout edge gets a slack node pulling its
//! endpoints into line, and clusters get left/right bounding nodes that contain their members
//! and keep other nodes out. Y coordinates stack the rank heights bottom-up.
//!
//! Labels of flat edges between non-neighbours are placed first, as virtual nodes on the rank
//! above the edge.

use crate::acyclic;
use crate::conc;
use crate::config::{DotConfig, Ratio};
use crate::init::{BOTTOM_IX, CL_OFFSET, DotGraph, LEFT_IX, RIGHT_IX, TOP_IX};
use crate::model::{LEdge, LNode, Layered};
use crate::network_simplex::{self, Balance, NsOptions};
use sirenia_graph::{
    BBox, Error, FEdge, FNode, FastGraph, NodeKind, Point, Port, Result, WarningKind, Warnings,
    sides,
};

/// Horizontal room reserved to the right of a node per self loop.
pub const SELF_EDGE_SIZE: f64 = 18.0;
/// Weight pulling a cluster's left and right bounding nodes together.
const COMPACTION_WEIGHT: i32 = 128;
/// Weight pulling the drawing's sides together under `ratio=compress`.
const COMPRESS_WEIGHT: i32 = 1000;
/// Separation on label ranks.
const LABEL_RANK_SEP: f64 = 5.0;

type AuxGraph = FastGraph<(), ()>;

/// Assigns `x`/`y` to every ranked node, the rank heights and the cluster boxes, all in the
/// layout frame. Runs edge concentration first when it is enabled.
pub fn dot_position(dg: &DotGraph, lg: &mut Layered, warnings: &mut Warnings) -> Result<()> {
    if lg.ranks.iter().all(Vec::is_empty) {
        return Ok(());
    }
    if dg.cfg.concentrate {
        conc::dot_concentrate(lg);
    }
    let dist = flat_labels(dg, lg);
    set_xcoords(dg, lg, &dist, warnings)?;
    set_ycoords(dg, lg);
    set_aspect(dg, lg);
    place_labels(dg, lg);
    tracing::debug!(
        ranks = lg.ranks.len(),
        clusters = lg.cluster_bb.len(),
        "coordinates assigned"
    );
    Ok(())
}

/// Widest label of each labelled flat edge between neighbours, by flat index. Labels of the
/// other flat edges get a virtual node on the rank above.
fn flat_labels(dg: &DotGraph, lg: &mut Layered) -> Vec<f64> {
    let mut dist = vec![0.0; lg.flat.len()];
    let mut pending: Vec<(usize, usize)> = Vec::new();
    for (f, fe) in lg.flat.iter().enumerate() {
        if !fe.alive {
            continue;
        }
        let adjacent = flat_adjacent(lg, fe.tail, fe.head);
        for &o in &fe.orig {
            let Some(dim) = dg.edges[o].label else {
                continue;
            };
            if adjacent {
                dist[f] = f64::max(dist[f], dim.x);
            } else {
                pending.push((f, o));
            }
        }
    }
    if pending.is_empty() {
        return dist;
    }
    if pending.iter().any(|(f, _)| lg.g.rank(lg.flat[*f].tail) == 0) {
        insert_top_rank(lg);
    }

    let mut label_ranks: Vec<usize> = Vec::new();
    for (f, o) in pending {
        let (t, h) = (lg.flat[f].tail, lg.flat[f].head);
        let r = lg.g.rank(t) as usize - 1;
        let (lpos, rpos) = {
            let (a, b) = (lg.order(t), lg.order(h));
            (a.min(b), a.max(b))
        };
        let (left, right) = if lg.order(t) < lg.order(h) {
            (t, h)
        } else {
            (h, t)
        };
        let (lo, hi) = cluster_limits(dg, lg, r, left, right);
        let place = flat_limits(lg, r, lpos, rpos);
        let place = if lo <= hi { place.clamp(lo, hi) } else { place };
        let dim = dg.edges[o].label.unwrap_or_default();
        let cluster = label_cluster(dg, lg, t, h, r as i32);
        let vn = lg.g.add_node(
            NodeKind::Virtual,
            LNode {
                lw: dim.x / 2.0,
                rw: dim.x / 2.0,
                ht: dim.y,
                label_of: Some(o),
                cluster,
                ..LNode::default()
            },
        );
        lg.g.node_mut(vn).rank = r as i32;
        lg.ranks[r].insert(place, vn);
        lg.renumber(r);

        let weight = dg.edges[o].weight;
        let (lw_vn, rw_vn) = (dim.x / 2.0, dim.x / 2.0);
        let to_tail = LEdge {
            tail_port: x_port(-lw_vn),
            head_port: x_port(lg.g.node(t).data.rw),
            ..LEdge::default()
        };
        let to_head = LEdge {
            tail_port: x_port(rw_vn),
            head_port: x_port(lg.g.node(h).data.lw),
            ..LEdge::default()
        };
        lg.g.add_edge(vn, t, weight, 1, to_tail);
        lg.g.add_edge(vn, h, weight, 1, to_head);
        lg.flat_label.insert(o, vn);
        if !label_ranks.contains(&r) {
            label_ranks.push(r);
        }
    }
    for r in label_ranks {
        check_label_order(lg, r);
    }
    dist
}

fn x_port(x: f64) -> Port {
    Port {
        p: Point::new(x, 0.0),
        ..Port::default()
    }
}

/// Makes room for labels of flat edges on the top rank.
fn insert_top_rank(lg: &mut Layered) {
    for v in lg.g.nodes().collect::<Vec<_>>() {
        lg.g.node_mut(v).rank += 1;
    }
    lg.ranks.insert(0, Vec::new());
    for span in &mut lg.cluster_span {
        span.0 += 1;
        span.1 += 1;
    }
}

/// Innermost cluster holding both endpoints whose rank range covers `r`.
fn label_cluster(dg: &DotGraph, lg: &Layered, t: FNode, h: FNode, r: i32) -> Option<usize> {
    let (Some(a), Some(b)) = (lg.g.node(t).data.real, lg.g.node(h).data.real) else {
        return None;
    };
    let mut c = dg.common_cluster(a, b);
    while let Some(ix) = c {
        if lg.cluster_span[ix].0 <= r {
            return Some(ix);
        }
        c = dg.clusters[ix].parent;
    }
    None
}

/// Slot on rank `r` for a label over the flat edge spanning `lpos..=rpos` on rank `r + 1`
/// that crosses as few inter-rank edges as possible.
fn flat_limits(lg: &Layered, r: usize, lpos: i32, rpos: i32) -> usize {
    let rank = &lg.ranks[r];
    let (mut hlb, mut hrb) = (-1i64, rank.len() as i64);
    for (i, &u) in rank.iter().enumerate() {
        let heads = lg.g.out_edges(u).iter().map(|e| lg.order(lg.g.head(*e)));
        let (lo, hi) = heads.fold((i32::MAX, i32::MIN), |(lo, hi), o| (lo.min(o), hi.max(o)));
        if lo > hi {
            continue;
        }
        if hi <= lpos {
            hlb = hlb.max(i as i64);
        } else if lo >= rpos {
            hrb = hrb.min(i as i64);
        }
    }
    let pos = if hlb < hrb {
        (hlb + hrb + 1) / 2
    } else {
        hlb + 1
    };
    pos.clamp(0, rank.len() as i64) as usize
}

/// Slots on rank `r` a flat edge's label may take without leaving the clusters of its ends: at
/// or after the first member of every cluster around `left`, and at or before the slot after the
/// last member of every cluster around `right`.
fn cluster_limits(
    dg: &DotGraph,
    lg: &Layered,
    r: usize,
    left: FNode,
    right: FNode,
) -> (usize, usize) {
    let rank = &lg.ranks[r];
    let members = |c: usize| {
        let mut slots = rank
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                let m = lg.g.node(**v).data.cluster;
                m.is_some_and(|m| dg.is_ancestor(Some(c), m))
            })
            .map(|(i, _)| i);
        let first = slots.next()?;
        Some((first, slots.last().unwrap_or(first)))
    };
    let (mut lo, mut hi) = (0, rank.len());
    let mut c = lg.g.node(left).data.cluster;
    while let Some(ix) = c {
        if let Some((first, _)) = members(ix) {
            lo = lo.max(first);
        }
        c = dg.clusters[ix].parent;
    }
    let mut c = lg.g.node(right).data.cluster;
    while let Some(ix) = c {
        if let Some((_, last)) = members(ix) {
            hi = hi.min(last + 1);
        }
        c = dg.clusters[ix].parent;
    }
    (lo, hi)
}

/// Sorts the flat-label nodes of rank `r` by the span of their edges, keeping their slots.
fn check_label_order(lg: &mut Layered, r: usize) {
    let slots: Vec<usize> = (0..lg.ranks[r].len())
        .filter(|i| is_flat_label(lg, lg.ranks[r][*i]))
        .collect();
    if slots.len() < 2 {
        return;
    }
    let mut labels: Vec<(i32, i32, FNode)> = slots
        .iter()
        .map(|i| {
            let vn = lg.ranks[r][*i];
            let ends: Vec<i32> = lg
                .g
                .out_edges(vn)
                .iter()
                .map(|e| lg.order(lg.g.head(*e)))
                .collect();
            let lo = ends.iter().copied().min().unwrap_or(0);
            let hi = ends.iter().copied().max().unwrap_or(0);
            (lo, hi, vn)
        })
        .collect();
    labels.sort_by_key(|(lo, hi, _)| (*lo, *hi));
    for (slot, (_, _, vn)) in slots.into_iter().zip(labels) {
        lg.ranks[r][slot] = vn;
    }
    lg.renumber(r);
}

pub(crate) fn is_flat_label(lg: &Layered, v: FNode) -> bool {
    let node = lg.g.node(v);
    node.data.label_of.is_some() && node.in_edges.is_empty()
}

/// Nothing but plain virtual nodes sits between the ends of a flat edge.
pub(crate) fn flat_adjacent(lg: &Layered, t: FNode, h: FNode) -> bool {
    let (a, b) = (lg.order(t), lg.order(h));
    let (lo, hi) = (a.min(b) as usize, a.max(b) as usize);
    let rank = &lg.ranks[lg.g.rank(t) as usize];
    rank[lo + 1..hi].iter().all(|v| {
        let data = &lg.g.node(*v).data;
        data.is_virtual() && data.label_of.is_none()
    })
}

/// A self loop with these ports is drawn on the right of its node.
pub(crate) fn loops_right(t: &Port, h: &Port) -> bool {
    (!t.defined && !h.defined)
        || (t.side & sides::LEFT == 0
            && h.side & sides::LEFT == 0
            && !(t.side == h.side && t.side & (sides::TOP | sides::BOTTOM) != 0))
}

/// Room a self loop takes to the right of its node.
pub(crate) fn self_right_space(dg: &DotGraph, e: usize) -> f64 {
    let info = &dg.edges[e];
    if !loops_right(&info.tail_port, &info.head_port) {
        return 0.0;
    }
    SELF_EDGE_SIZE + info.label.map_or(0.0, |l| l.x)
}

struct Aux {
    g: AuxGraph,
    /// Auxiliary node of every ranked layout node.
    of: Vec<Option<FNode>>,
    /// Right half-width including self-loop room.
    rw: Vec<f64>,
    ln: Vec<FNode>,
    rn: Vec<FNode>,
    /// Left and right bounds of the whole drawing, made only when something needs them.
    root: Option<(FNode, FNode)>,
}

impl Aux {
    fn new(dg: &DotGraph, lg: &Layered) -> Aux {
        let n = lg.g.node_count();
        let mut g = AuxGraph::with_capacity(n * 2, n * 4);
        let mut of = vec![None; n];
        let mut rw = vec![0.0; n];
        for v in lg.ranks.iter().flatten() {
            of[v.0] = Some(g.add_node(NodeKind::Normal, ()));
            let data = &lg.g.node(*v).data;
            rw[v.0] = data.rw
                + data
                    .self_loops
                    .iter()
                    .map(|e| self_right_space(dg, *e))
                    .sum::<f64>();
        }
        let mut ln = Vec::with_capacity(dg.clusters.len());
        let mut rn = Vec::with_capacity(dg.clusters.len());
        for _ in &dg.clusters {
            ln.push(g.add_node(NodeKind::Slack, ()));
            rn.push(g.add_node(NodeKind::Slack, ()));
        }
        Aux {
            g,
            of,
            rw,
            ln,
            rn,
            root: None,
        }
    }

    fn root_bounds(&mut self) -> (FNode, FNode) {
        if let Some(bounds) = self.root {
            return bounds;
        }
        let bounds = (
            self.g.add_node(NodeKind::Slack, ()),
            self.g.add_node(NodeKind::Slack, ()),
        );
        self.root = Some(bounds);
        bounds
    }

    fn node(&self, v: FNode) -> Option<FNode> {
        self.of[v.0]
    }

    /// Adds `u -> v` with minimum length `len`, folding into an existing edge.
    fn edge(&mut self, u: FNode, v: FNode, len: f64, weight: i32) -> FEdge {
        let minlen = len.round() as i32;
        if let Some(e) = self.g.find_edge(u, v) {
            let edge = self.g.edge_mut(e);
            edge.minlen = edge.minlen.max(minlen);
            edge.weight = edge.weight.saturating_add(weight);
            return e;
        }
        self.g.add_edge(u, v, weight, minlen, ())
    }

    fn can_reach(&self, from: FNode, to: FNode) -> bool {
        let mut seen = vec![false; self.g.node_count()];
        let mut stack = vec![from];
        seen[from.0] = true;
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            for &e in self.g.out_edges(v) {
                let w = self.g.head(e);
                if !seen[w.0] {
                    seen[w.0] = true;
                    stack.push(w);
                }
            }
        }
        false
    }
}

fn set_xcoords(
    dg: &DotGraph,
    lg: &mut Layered,
    dist: &[f64],
    warnings: &mut Warnings,
) -> Result<()> {
    let mut aux = Aux::new(dg, lg);
    lr_constraints(dg, lg, dist, &mut aux)?;
    edge_pairs(lg, &mut aux);
    let slices = cluster_slices(dg, lg);
    if !dg.clusters.is_empty() {
        pos_clusters(dg, lg, &slices, &mut aux)?;
    }
    if dg.cfg.ratio == Ratio::Compress && dg.cfg.size.is_some() {
        compress_width(lg, &mut aux);
    }
    connect_ranks(lg, &mut aux);

    let reversed = acyclic::run(&mut aux.g);
    if reversed > 0 {
        warnings.warn(
            WarningKind::InternalConsistency,
            format!("reversed {reversed} cyclic x-coordinate constraints"),
        );
    }
    let opts = NsOptions {
        balance: Balance::LeftRight,
        max_iter: DotConfig::ns_limit(dg.cfg.nslimit, dg.nodes.len()),
        search_size: dg.cfg.searchsize,
    };
    let stats = network_simplex::rank(&mut aux.g, &opts)?;
    tracing::trace!(iterations = stats.iterations, "x coordinates solved");

    for v in lg.ranks.iter().flatten().copied().collect::<Vec<_>>() {
        let a = aux.node(v).ok_or_else(|| {
            Error::InternalConsistency(format!("node {} has no x constraint", v.0))
        })?;
        lg.g.node_mut(v).data.x = f64::from(aux.g.rank(a));
    }
    lg.cluster_bb = (0..dg.clusters.len())
        .map(|c| {
            let (l, r) = (aux.g.rank(aux.ln[c]), aux.g.rank(aux.rn[c]));
            BBox::from_coords(f64::from(l), 0.0, f64::from(r), 0.0)
        })
        .collect();
    Ok(())
}

/// Bounds every rank by the drawing's sides and pulls the sides together.
fn compress_width(lg: &Layered, aux: &mut Aux) {
    let (ln, rn) = aux.root_bounds();
    for rank in lg.ranks.iter().filter(|r| !r.is_empty()) {
        let (first, last) = (rank[0], rank[rank.len() - 1]);
        if let (Some(af), Some(al)) = (aux.node(first), aux.node(last)) {
            aux.edge(ln, af, lg.g.node(first).data.lw, 0);
            aux.edge(al, rn, aux.rw[last.0], 0);
        }
    }
    aux.edge(ln, rn, 1.0, COMPRESS_WEIGHT);
}

/// Ties every rank that no layout edge leaves downwards to the next non-empty rank, so the
/// auxiliary graph stays connected.
fn connect_ranks(lg: &Layered, aux: &mut Aux) {
    let filled: Vec<usize> = (0..lg.ranks.len())
        .filter(|r| !lg.ranks[*r].is_empty())
        .collect();
    for pair in filled.windows(2) {
        let (r, next) = (pair[0], pair[1]);
        let linked = lg.ranks[r].iter().any(|v| {
            let mut heads = lg.g.out_edges(*v).iter().map(|e| lg.g.head(*e));
            heads.any(|w| lg.g.rank(w) > r as i32)
        });
        if linked {
            continue;
        }
        let (Some(a), Some(b)) = (aux.node(lg.ranks[r][0]), aux.node(lg.ranks[next][0])) else {
            continue;
        };
        let sn = aux.g.add_node(NodeKind::Slack, ());
        aux.edge(sn, a, 0.0, 0);
        aux.edge(sn, b, 0.0, 0);
    }
}

/// Separation between rank neighbours and around flat edges and their labels.
fn lr_constraints(dg: &DotGraph, lg: &Layered, dist: &[f64], aux: &mut Aux) -> Result<()> {
    let nodesep = dg.cfg.nodesep;
    let missing = |v: FNode| Error::InternalConsistency(format!("unranked node {}", v.0));
    for (r, rank) in lg.ranks.iter().enumerate() {
        let sep = if dg.has_edge_labels && r % 2 == 1 {
            LABEL_RANK_SEP
        } else {
            nodesep
        };
        for (j, &u) in rank.iter().enumerate() {
            let au = aux.node(u).ok_or_else(|| missing(u))?;
            if let Some(&v) = rank.get(j + 1) {
                let av = aux.node(v).ok_or_else(|| missing(v))?;
                let width = aux.rw[u.0] + lg.g.node(v).data.lw + sep;
                aux.edge(au, av, width, 0);
            }

            if is_flat_label(lg, u) {
                flat_label_constraints(dg, lg, u, aux);
            }

            for &f in &lg.g.node(u).data.flat_out {
                let fe = &lg.flat[f];
                if !fe.alive || fe.is_ordering() {
                    continue;
                }
                let (t0, h0) = if lg.order(fe.tail) < lg.order(fe.head) {
                    (fe.tail, fe.head)
                } else {
                    (fe.head, fe.tail)
                };
                let (Some(at), Some(ah)) = (aux.node(t0), aux.node(h0)) else {
                    continue;
                };
                let minlen = fe
                    .orig
                    .iter()
                    .map(|o| dg.edges[*o].minlen)
                    .max()
                    .unwrap_or(1);
                let width = aux.rw[t0.0] + lg.g.node(h0).data.lw;
                let mut m0 = f64::from(minlen) * nodesep + width;
                if let Some(e) = aux.g.find_edge(at, ah) {
                    m0 = m0.max(width + nodesep + dist[f].round());
                    let edge = aux.g.edge_mut(e);
                    edge.minlen = edge.minlen.max(m0.round() as i32);
                    edge.weight = edge.weight.max(fe.weight);
                } else if !fe.orig.iter().any(|o| dg.edges[*o].label.is_some()) {
                    aux.edge(at, ah, m0, fe.weight);
                }
            }
        }
    }
    Ok(())
}

/// Keeps a flat edge's label node between the edge's endpoints.
fn flat_label_constraints(dg: &DotGraph, lg: &Layered, vn: FNode, aux: &mut Aux) {
    let Some(o) = lg.g.node(vn).data.label_of else {
        return;
    };
    let mut ends: Vec<FNode> = lg.g.out_edges(vn).iter().map(|e| lg.g.head(*e)).collect();
    if ends.len() != 2 {
        return;
    }
    ends.sort_by_key(|v| lg.order(*v));
    let (left, right) = (ends[0], ends[1]);
    let (Some(av), Some(al), Some(ar)) = (aux.node(vn), aux.node(left), aux.node(right)) else {
        return;
    };
    let e = &dg.edges[o];
    let m0 = f64::from(e.minlen) * dg.cfg.nodesep / 2.0;
    let vdata = &lg.g.node(vn).data;
    let m1 = m0 + aux.rw[left.0] + vdata.lw;
    if !aux.can_reach(av, al) {
        aux.edge(al, av, m1, e.weight);
    }
    let m1 = m0 + vdata.rw + lg.g.node(right).data.lw;
    if !aux.can_reach(ar, av) {
        aux.edge(av, ar, m1, e.weight);
    }
}

/// One slack node per layout edge, pulling both endpoints (offset by their ports) into line.
fn edge_pairs(lg: &Layered, aux: &mut Aux) {
    for e in lg.g.edges().collect::<Vec<_>>() {
        let edge = lg.g.edge(e);
        let (Some(at), Some(ah)) = (aux.node(edge.tail), aux.node(edge.head)) else {
            continue;
        };
        let sn = aux.g.add_node(NodeKind::Slack, ());
        let d = (edge.data.head_port.p.x - edge.data.tail_port.p.x).trunc();
        let (m0, m1) = if d > 0.0 { (d, 0.0) } else { (0.0, -d) };
        aux.edge(sn, at, m0 + 1.0, edge.weight);
        aux.edge(sn, ah, m1 + 1.0, edge.weight);
    }
}

/// First and last node of every cluster on every rank, by cluster.
type Slices = Vec<Vec<Option<(FNode, FNode)>>>;

fn cluster_slices(dg: &DotGraph, lg: &Layered) -> Slices {
    let mut slices: Slices = vec![vec![None; lg.ranks.len()]; dg.clusters.len()];
    for (r, rank) in lg.ranks.iter().enumerate() {
        for &v in rank {
            let mut c = lg.g.node(v).data.cluster;
            while let Some(ix) = c {
                let slot = &mut slices[ix][r];
                *slot = Some(match *slot {
                    Some((first, _)) => (first, v),
                    None => (v, v),
                });
                c = dg.clusters[ix].parent;
            }
        }
    }
    slices
}

fn pos_clusters(dg: &DotGraph, lg: &Layered, slices: &Slices, aux: &mut Aux) -> Result<()> {
    let flipped = dg.cfg.rankdir.is_flipped();
    for (c, info) in dg.clusters.iter().enumerate() {
        let (ln, rn) = (aux.ln[c], aux.rn[c]);
        let w = info.border[BOTTOM_IX].x.max(info.border[TOP_IX].x);
        if w > 0.0 && !flipped {
            aux.edge(ln, rn, w, 0);
        }
        aux.edge(ln, rn, 1.0, COMPACTION_WEIGHT);
        contain_nodes(lg, c, info.margin, info.border, &slices[c], aux)?;
        keepout_othernodes(dg, lg, c, &slices[c], aux);
    }
    contain_subclust(dg, None, aux);
    separate_subclust(dg, lg, None, slices, aux);
    Ok(())
}

fn contain_nodes(
    lg: &Layered,
    c: usize,
    margin: f64,
    border: [Point; 4],
    slice: &[Option<(FNode, FNode)>],
    aux: &mut Aux,
) -> Result<()> {
    for &(first, last) in slice.iter().flatten() {
        let (Some(af), Some(al)) = (aux.node(first), aux.node(last)) else {
            return Err(Error::InternalConsistency(format!(
                "cluster {c} holds an unranked node"
            )));
        };
        let left = lg.g.node(first).data.lw + margin + border[LEFT_IX].x;
        aux.edge(aux.ln[c], af, left, 0);
        let right = aux.rw[last.0] + margin + border[RIGHT_IX].x;
        aux.edge(al, aux.rn[c], right, 0);
    }
    Ok(())
}

/// Whether virtual node `v` carries no edge with an endpoint inside cluster `c`.
fn vnode_unrelated(dg: &DotGraph, lg: &Layered, c: usize, v: FNode) -> bool {
    let node = lg.g.node(v);
    let real_edges: Vec<usize> = match node.data.label_of {
        Some(o) => vec![o],
        None => node
            .out_edges
            .iter()
            .chain(node.in_edges.iter())
            .take(1)
            .flat_map(|e| lg.g.edge(*e).data.orig.iter().copied())
            .collect(),
    };
    !real_edges.iter().any(|o| {
        let e = &dg.edges[*o];
        dg.contains(c, e.tail) || dg.contains(c, e.head)
    })
}

fn keepout_othernodes(
    dg: &DotGraph,
    lg: &Layered,
    c: usize,
    slice: &[Option<(FNode, FNode)>],
    aux: &mut Aux,
) {
    let margin = dg.clusters[c].margin;
    let keeps_out =
        |u: FNode| !lg.g.node(u).data.is_virtual() || vnode_unrelated(dg, lg, c, u);
    for (r, s) in slice.iter().enumerate() {
        let Some((first, last)) = *s else {
            continue;
        };
        let rank = &lg.ranks[r];
        let (lo, hi) = (lg.order(first) as usize, lg.order(last) as usize);
        if let Some(&u) = rank[..lo].iter().rev().find(|u| keeps_out(**u))
            && let Some(au) = aux.node(u)
        {
            aux.edge(au, aux.ln[c], margin + aux.rw[u.0], 0);
        }
        if let Some(&u) = rank[hi + 1..].iter().find(|u| keeps_out(**u))
            && let Some(au) = aux.node(u)
        {
            aux.edge(aux.rn[c], au, margin + lg.g.node(u).data.lw, 0);
        }
    }
}

fn children(dg: &DotGraph, parent: Option<usize>) -> &[usize] {
    match parent {
        Some(p) => &dg.clusters[p].children,
        None => &dg.top_clusters,
    }
}

/// Nests each cluster's box inside its parent's, leaving room for the parent's side labels.
fn contain_subclust(dg: &DotGraph, parent: Option<usize>, aux: &mut Aux) {
    let (margin, border, pl, pr) = match parent {
        Some(p) => (
            dg.clusters[p].margin,
            dg.clusters[p].border,
            aux.ln[p],
            aux.rn[p],
        ),
        None => {
            let (ln, rn) = aux.root_bounds();
            (CL_OFFSET, [Point::default(); 4], ln, rn)
        }
    };
    for &c in children(dg, parent) {
        aux.edge(pl, aux.ln[c], margin + border[LEFT_IX].x, 0);
        aux.edge(aux.rn[c], pr, margin + border[RIGHT_IX].x, 0);
        contain_subclust(dg, Some(c), aux);
    }
}

/// Keeps sibling clusters that share a rank apart.
fn separate_subclust(
    dg: &DotGraph,
    lg: &Layered,
    parent: Option<usize>,
    slices: &Slices,
    aux: &mut Aux,
) {
    let margin = parent.map_or(CL_OFFSET, |p| dg.clusters[p].margin);
    let kids = children(dg, parent);
    for (i, &a) in kids.iter().enumerate() {
        for &b in &kids[i + 1..] {
            let (mut low, mut high) = (a, b);
            if lg.cluster_span[low].0 > lg.cluster_span[high].0 {
                std::mem::swap(&mut low, &mut high);
            }
            if lg.cluster_span[low].1 < lg.cluster_span[high].0 {
                continue;
            }
            let r = lg.cluster_span[high].0 as usize;
            let (Some((lf, _)), Some((hf, _))) = (slices[low][r], slices[high][r]) else {
                continue;
            };
            let (left, right) = if lg.order(lf) < lg.order(hf) {
                (low, high)
            } else {
                (high, low)
            };
            aux.edge(aux.rn[left], aux.ln[right], margin, 0);
        }
        separate_subclust(dg, lg, Some(a), slices, aux);
    }
}

fn set_ycoords(dg: &DotGraph, lg: &mut Layered) {
    let nr = lg.ranks.len();
    let nc = dg.clusters.len();
    // Primitive heights from nodes only; `ht1`/`ht2` also cover cluster margins.
    let (mut pht1, mut pht2) = (vec![0.0_f64; nr], vec![0.0_f64; nr]);
    let (mut cht1, mut cht2) = (vec![0.0_f64; nc], vec![0.0_f64; nc]);
    for (r, rank) in lg.ranks.iter().enumerate() {
        for &v in rank {
            let data = &lg.g.node(v).data;
            let mut h2 = data.ht / 2.0;
            for &e in &data.self_loops {
                if let Some(l) = dg.edges[e].label {
                    h2 = h2.max(l.y / 2.0);
                }
            }
            pht1[r] = pht1[r].max(h2);
            pht2[r] = pht2[r].max(h2);
            if let Some(c) = data.cluster {
                let yoff = dg.clusters[c].margin;
                let (lo, hi) = lg.cluster_span[c];
                if r as i32 == lo {
                    cht2[c] = cht2[c].max(h2 + yoff);
                }
                if r as i32 == hi {
                    cht1[c] = cht1[c].max(h2 + yoff);
                }
            }
        }
    }
    let (mut ht1, mut ht2) = (pht1.clone(), pht2.clone());
    let flipped = dg.cfg.rankdir.is_flipped();
    for &c in &dg.top_clusters {
        clust_ht(dg, lg, c, flipped, &mut cht1, &mut cht2, &mut ht1, &mut ht2);
    }

    let mut y = vec![0.0; nr];
    if nr > 0 {
        y[nr - 1] = ht1[nr - 1];
        for r in (0..nr - 1).rev() {
            let d0 = pht2[r + 1] + pht1[r] + lg.ranksep;
            let d1 = ht2[r + 1] + ht1[r] + CL_OFFSET;
            y[r] = y[r + 1] + d0.max(d1);
        }
    }
    for (r, rank) in lg.ranks.iter().enumerate() {
        for &v in rank {
            lg.g.node_mut(v).data.y = y[r];
        }
    }
    for c in 0..nc {
        let (lo, hi) = lg.cluster_span[c];
        let (lo, hi) = (lo.max(0) as usize, (hi.max(0) as usize).min(nr - 1));
        let bb = &mut lg.cluster_bb[c];
        bb.ll.y = y[hi] - cht1[c];
        bb.ur.y = y[lo] + cht2[c];
    }
    lg.ht1 = ht1;
    lg.ht2 = ht2;
}

#[allow(clippy::too_many_arguments)]
fn clust_ht(
    dg: &DotGraph,
    lg: &Layered,
    c: usize,
    flipped: bool,
    cht1: &mut [f64],
    cht2: &mut [f64],
    ht1: &mut [f64],
    ht2: &mut [f64],
) {
    let info = &dg.clusters[c];
    let (lo, hi) = lg.cluster_span[c];
    let (mut h1, mut h2) = (cht1[c], cht2[c]);
    for &child in &info.children {
        clust_ht(dg, lg, child, flipped, cht1, cht2, ht1, ht2);
        let (clo, chi) = lg.cluster_span[child];
        if chi == hi {
            h1 = h1.max(cht1[child] + info.margin);
        }
        if clo == lo {
            h2 = h2.max(cht2[child] + info.margin);
        }
    }
    if !flipped {
        h1 += info.border[BOTTOM_IX].y;
        h2 += info.border[TOP_IX].y;
    }
    cht1[c] = h1;
    cht2[c] = h2;
    if let Some(slot) = ht2.get_mut(lo.max(0) as usize) {
        *slot = slot.max(h2);
    }
    if let Some(slot) = ht1.get_mut(hi.max(0) as usize) {
        *slot = slot.max(h1);
    }
}

/// Stretches the drawing for `ratio` before edges are routed. Node centres and cluster boxes
/// move; node sizes stay.
fn set_aspect(dg: &DotGraph, lg: &mut Layered) {
    if dg.cfg.ratio == Ratio::None || lg.ranks.len() < 2 {
        return;
    }
    let mut bb = BBox::empty();
    for &v in lg.ranks.iter().flatten() {
        bb = bb.union(&node_box(lg, v));
    }
    for c in &lg.cluster_bb {
        bb = bb.union(c);
    }
    let flipped = dg.cfg.rankdir.is_flipped();
    let sz = if flipped {
        Point::new(bb.height(), bb.width())
    } else {
        Point::new(bb.width(), bb.height())
    };
    let Some((mut xf, mut yf)) = dg.cfg.ratio.factors(sz, dg.cfg.size) else {
        return;
    };
    if flipped {
        std::mem::swap(&mut xf, &mut yf);
    }
    for v in lg.ranks.iter().flatten().copied().collect::<Vec<_>>() {
        let data = &mut lg.g.node_mut(v).data;
        data.x = (data.x * xf).round();
        data.y = (data.y * yf).round();
    }
    for (c, info) in dg.clusters.iter().enumerate() {
        let b = lg.cluster_bb[c];
        let mut scaled = BBox::from_coords(b.ll.x * xf, b.ll.y * yf, b.ur.x * xf, b.ur.y * yf);
        // Shrinking can pull the box inside its members.
        for &m in &info.members {
            scaled = scaled.union(&node_box(lg, lg.node_of[m]));
        }
        lg.cluster_bb[c] = scaled;
    }
    tracing::debug!(xf, yf, "aspect ratio applied");
}

fn node_box(lg: &Layered, v: FNode) -> BBox {
    let d = &lg.g.node(v).data;
    BBox::from_coords(d.x - d.lw, d.y - d.ht / 2.0, d.x + d.rw, d.y + d.ht / 2.0)
}

/// Label centres of chained and flat edges whose labels got a virtual node.
fn place_labels(dg: &DotGraph, lg: &mut Layered) {
    for v in lg.ranks.iter().flatten().copied().collect::<Vec<_>>() {
        let data = &lg.g.node(v).data;
        let Some(o) = data.label_of else {
            continue;
        };
        let pos = if is_flat_label(lg, v) {
            Point::new(data.x, data.y)
        } else {
            let width = dg.edges[o].label.map_or(0.0, |l| l.x);
            Point::new(data.x + width / 2.0, data.y)
        };
        lg.label_pos[o] = Some(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_limits_avoids_crossing_edges() {
        // Rank 0: a, b, c. a points left of the flat span, c right of it.
        let mut lg = Layered::default();
        let ids: Vec<FNode> = (0..6)
            .map(|_| lg.g.add_node(NodeKind::Normal, LNode::default()))
            .collect();
        lg.ranks = vec![ids[..3].to_vec(), ids[3..].to_vec()];
        for (r, rank) in lg.ranks.clone().iter().enumerate() {
            for v in rank {
                lg.g.node_mut(*v).rank = r as i32;
            }
        }
        lg.renumber_all();
        lg.g.add_edge(ids[0], ids[3], 1, 1, LEdge::default());
        lg.g.add_edge(ids[2], ids[5], 1, 1, LEdge::default());
        // Flat span covers orders 0..=2 on rank 1; b has no edges.
        assert_eq!(flat_limits(&lg, 0, 0, 2), 1);
        // Span 1..=2: a is left of it, c is right of it, so the label goes between them.
        let pos = flat_limits(&lg, 0, 1, 2);
        assert!((1..=2).contains(&pos));
    }
}
