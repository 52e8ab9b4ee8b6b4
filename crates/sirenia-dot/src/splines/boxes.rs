//! Corridor boxes: around nodes, between ranks and at the ends of edges.

use super::Router;
use sirenia_graph::{BBox, FEdge, FNode, Point, Port, sides};

/// Minimum corridor width between ranks.
pub(crate) const MINW: f64 = 16.0;
const HALFMINW: f64 = 8.0;
const FUDGE: f64 = 4.0;
/// Room right of a label node's centre kept for the edge.
const LABEL_ROOM: f64 = 10.0;

/// The path end at a node: where the spline starts and the boxes around it.
#[derive(Debug, Clone)]
pub(crate) struct PathEnd {
    pub p: Point,
    pub boxes: Vec<BBox>,
    /// The port names a side, so the spline starts on it and is not clipped.
    pub side_port: bool,
}

impl PathEnd {
    pub fn last(&self) -> BBox {
        self.boxes.last().copied().unwrap_or_else(BBox::empty)
    }

    /// Adds the box between the end box and the rank boundary at `y`.
    pub fn close_to_rank(&mut self, y: f64) {
        let closing = closing_box(self.last(), y);
        self.boxes.extend(closing);
    }
}

/// The box spanning `b`'s width from its nearer horizontal side to `y`.
fn closing_box(b: BBox, y: f64) -> Option<BBox> {
    let closing = if y < b.ll.y {
        BBox::from_coords(b.ll.x, y, b.ur.x, b.ll.y)
    } else {
        BBox::from_coords(b.ll.x, b.ur.y, b.ur.x, y)
    };
    (closing.ll.x < closing.ur.x && closing.ll.y < closing.ur.y).then_some(closing)
}

fn mirror_y(b: BBox, cy: f64) -> BBox {
    BBox::from_coords(b.ll.x, 2.0 * cy - b.ur.y, b.ur.x, 2.0 * cy - b.ll.y)
}

impl Router<'_> {
    /// The free band between rank `r` and the rank below it.
    pub(crate) fn rank_box(&self, r: usize) -> BBox {
        let lg = self.lg;
        BBox::from_coords(
            self.left_bound,
            lg.rank_y(r + 1) + lg.ht2[r + 1],
            self.right_bound,
            lg.rank_y(r) - lg.ht1[r],
        )
    }

    /// The widest box around `vn` on its rank that stays clear of its neighbours and of
    /// clusters the edge does not belong to.
    pub(crate) fn maximal_bbox(&self, vn: FNode, ie: Option<FEdge>, oe: Option<FEdge>) -> BBox {
        let lg = self.lg;
        let d = &lg.g.node(vn).data;
        let r = lg.g.rank(vn) as usize;
        let half_sep = self.dg.cfg.nodesep / 2.0;

        let mut b = d.x - d.lw - FUDGE;
        let llx = match self.neighbor(vn, ie, oe, -1) {
            Some(left) => {
                let nb = match self.cl_bound(vn, left) {
                    Some(c) => lg.cluster_bb[c].ur.x + self.splinesep,
                    None => {
                        let a = &lg.g.node(left).data;
                        let gap = if a.is_virtual() { self.splinesep } else { half_sep };
                        a.x + self.mval[left.0] + gap
                    }
                };
                b = b.min(nb);
                b.round()
            }
            None => b.round().min(self.left_bound),
        };

        let label = d.is_virtual() && d.label_of.is_some();
        let mut b = if label {
            d.x + LABEL_ROOM
        } else {
            d.x + d.rw + FUDGE
        };
        let mut urx = match self.neighbor(vn, ie, oe, 1) {
            Some(right) => {
                let nb = match self.cl_bound(vn, right) {
                    Some(c) => lg.cluster_bb[c].ll.x - self.splinesep,
                    None => {
                        let a = &lg.g.node(right).data;
                        let gap = if a.is_virtual() { self.splinesep } else { half_sep };
                        a.x - a.lw - gap
                    }
                };
                b = b.max(nb);
                b.round()
            }
            None => b.round().max(self.right_bound),
        };
        if label {
            urx -= d.rw;
            if urx < llx {
                urx = d.x;
            }
        }
        BBox::from_coords(llx, d.y - lg.ht1[r], urx, d.y + lg.ht2[r])
    }

    /// Nearest node in direction `dir` that an edge through `vn` must keep clear of.
    fn neighbor(&self, vn: FNode, ie: Option<FEdge>, oe: Option<FEdge>, dir: i32) -> Option<FNode> {
        let lg = self.lg;
        let rank = &lg.ranks[lg.g.rank(vn) as usize];
        let mut i = lg.order(vn) + dir;
        while i >= 0 && (i as usize) < rank.len() {
            let n = rank[i as usize];
            let d = &lg.g.node(n).data;
            if !d.is_virtual() || d.label_of.is_some() || !self.paths_cross(n, vn, ie, oe) {
                return Some(n);
            }
            i += dir;
        }
        None
    }

    /// Whether the chain through `n0` swaps sides with the one through `n1` within two ranks.
    fn paths_cross(&self, n0: FNode, n1: FNode, ie1: Option<FEdge>, oe1: Option<FEdge>) -> bool {
        let g = &self.lg.g;
        let left = g.node(n0).order > g.node(n1).order;
        let (outs, ins) = (g.out_edges(n0), g.in_edges(n0));
        if outs.len() != 1 && ins.len() != 1 {
            return false;
        }
        if let (1, Some(mut e1)) = (outs.len(), oe1) {
            let mut e0 = outs[0];
            for _ in 0..2 {
                let (na, nb) = (g.head(e0), g.head(e1));
                if na == nb {
                    break;
                }
                if left != (g.node(na).order > g.node(nb).order) {
                    return true;
                }
                if g.out_edges(na).len() != 1 || !g.node(na).data.is_virtual() {
                    break;
                }
                e0 = g.out_edges(na)[0];
                if g.out_edges(nb).len() != 1 || !g.node(nb).data.is_virtual() {
                    break;
                }
                e1 = g.out_edges(nb)[0];
            }
        }
        if let (1, Some(mut e1)) = (ins.len(), ie1) {
            let mut e0 = ins[0];
            for _ in 0..2 {
                let (na, nb) = (g.tail(e0), g.tail(e1));
                if na == nb {
                    break;
                }
                if left != (g.node(na).order > g.node(nb).order) {
                    return true;
                }
                if g.in_edges(na).len() != 1 || !g.node(na).data.is_virtual() {
                    break;
                }
                e0 = g.in_edges(na)[0];
                if g.in_edges(nb).len() != 1 || !g.node(nb).data.is_virtual() {
                    break;
                }
                e1 = g.in_edges(nb)[0];
            }
        }
        false
    }

    /// Real edge a virtual node stands for.
    fn vnode_orig(&self, v: FNode) -> Option<usize> {
        let g = &self.lg.g;
        let d = &g.node(v).data;
        d.label_of.or_else(|| {
            g.out_edges(v)
                .iter()
                .chain(g.in_edges(v))
                .find_map(|e| g.edge(*e).data.orig.first().copied())
        })
    }

    /// Cluster whose box bounds the corridor of `n` on the side of `adj`.
    fn cl_bound(&self, n: FNode, adj: FNode) -> Option<usize> {
        let (dg, lg) = (self.dg, self.lg);
        let nd = &lg.g.node(n).data;
        let (tcl, hcl) = if nd.is_virtual() {
            match self.vnode_orig(n) {
                Some(o) => (dg.owner[dg.edges[o].tail], dg.owner[dg.edges[o].head]),
                None => (None, None),
            }
        } else {
            (nd.cluster, nd.cluster)
        };
        let foreign = |c: Option<usize>| c.filter(|c| Some(*c) != tcl && Some(*c) != hcl);
        let ad = &lg.g.node(adj).data;
        if !ad.is_virtual() {
            return foreign(ad.cluster);
        }
        let o = self.vnode_orig(adj)?;
        let p = lg.coord(adj);
        let holds = |c: &usize| lg.cluster_bb.get(*c).is_some_and(|bb| bb.contains(p));
        foreign(dg.owner[dg.edges[o].tail])
            .filter(holds)
            .or_else(|| foreign(dg.owner[dg.edges[o].head]).filter(holds))
    }

    /// Path end of a regular edge: leaving `n` downward, or entering it from above when
    /// `at_head`. Head ends are built as tail ends mirrored about the node's centre line.
    pub(crate) fn regular_end(&self, n: FNode, port: &Port, nb: BBox, at_head: bool) -> PathEnd {
        let lg = self.lg;
        let d = &lg.g.node(n).data;
        let c = lg.coord(n);
        let ht2 = d.ht / 2.0;
        let flip = |p: Point| {
            if at_head {
                Point::new(p.x, 2.0 * c.y - p.y)
            } else {
                p
            }
        };
        let flip_box = |b: BBox| if at_head { mirror_y(b, c.y) } else { b };
        let mut side = port.side;
        if at_head {
            let tb = side & (sides::TOP | sides::BOTTOM);
            if tb == sides::TOP || tb == sides::BOTTOM {
                side ^= sides::TOP | sides::BOTTOM;
            }
        }

        let mut p = flip(c + port.p);
        let mut b = flip_box(nb);
        let side_port = !d.is_virtual() && side != 0;
        let mut boxes = Vec::with_capacity(2);
        if !side_port {
            b.ur.y = p.y;
            boxes.push(b);
            p.y -= 1.0;
        } else if side & sides::TOP != 0 {
            let top = c.y + ht2 + lg.ranksep / 2.0;
            if p.x < c.x {
                boxes.push(BBox::from_coords(b.ll.x - 1.0, p.y, b.ur.x, top));
                boxes.push(BBox::from_coords(
                    b.ll.x - 1.0,
                    c.y - ht2,
                    c.x - d.lw - (FUDGE - 2.0),
                    p.y,
                ));
            } else {
                boxes.push(BBox::from_coords(b.ll.x, p.y, b.ur.x + 1.0, top));
                boxes.push(BBox::from_coords(
                    c.x + d.rw + (FUDGE - 2.0),
                    c.y - ht2,
                    b.ur.x + 1.0,
                    p.y,
                ));
            }
            p.y += 1.0;
        } else if side & sides::BOTTOM != 0 {
            b.ur.y = b.ur.y.max(p.y);
            boxes.push(b);
            p.y -= 1.0;
        } else if side & sides::LEFT != 0 {
            boxes.push(BBox::from_coords(b.ll.x, c.y - ht2, p.x, p.y));
            p.x -= 1.0;
        } else {
            boxes.push(BBox::from_coords(p.x, c.y - ht2, b.ur.x, p.y));
            p.x += 1.0;
        }
        PathEnd {
            p: flip(p),
            boxes: boxes.into_iter().map(flip_box).collect(),
            side_port,
        }
    }

    /// Path end of a flat edge routed above (`top`) or below its rank.
    pub(crate) fn flat_end(&self, n: FNode, port: &Port, at_head: bool, top: bool) -> PathEnd {
        let lg = self.lg;
        let d = &lg.g.node(n).data;
        let c = lg.coord(n);
        let r = lg.g.rank(n) as usize;
        let ht2 = d.ht / 2.0;
        let nb = self.maximal_bbox(n, None, None);
        let mut b = nb;
        let mut p = c + port.p;
        let mut boxes = Vec::with_capacity(2);
        let side = port.side;
        if side == 0 {
            if top {
                b.ll.y = p.y;
            } else {
                b.ur.y = p.y;
            }
            boxes.push(b);
        } else if side & sides::TOP != 0 {
            b.ll.y = b.ll.y.min(p.y);
            boxes.push(b);
            p.y += 1.0;
        } else if side & sides::BOTTOM != 0 {
            if top {
                // Around the outer side of the node, then up.
                let below = c.y - ht2;
                let drop = below - lg.ranksep / 2.0;
                if at_head {
                    boxes.push(BBox::from_coords(b.ll.x - 1.0, drop, p.x, below));
                    boxes.push(BBox::from_coords(b.ll.x - 1.0, below, c.x - d.lw - 2.0, c.y + ht2));
                } else {
                    boxes.push(BBox::from_coords(p.x, drop, b.ur.x + 1.0, below));
                    boxes.push(BBox::from_coords(c.x + d.rw + 2.0, below, b.ur.x + 1.0, c.y + ht2));
                }
            } else {
                b.ur.y = b.ur.y.max(p.y);
                boxes.push(b);
            }
            p.y -= 1.0;
        } else {
            if side & sides::LEFT != 0 {
                b.ur.x = p.x + 1.0;
            } else {
                b.ll.x = p.x - 1.0;
            }
            if top {
                b.ur.y = c.y + ht2;
                b.ll.y = p.y - 1.0;
            } else {
                b.ll.y = c.y - ht2;
                b.ur.y = p.y + 1.0;
            }
            boxes.push(b);
            p.x += if side & sides::LEFT != 0 { -1.0 } else { 1.0 };
        }
        let last = boxes.last().copied().unwrap_or(nb);
        let base = BBox::from_coords(nb.ll.x, last.ll.y, nb.ur.x, last.ur.y);
        let y = if top {
            c.y + lg.ht2[r]
        } else {
            c.y - lg.ht1[r]
        };
        boxes.extend(closing_box(base, y));
        PathEnd {
            p,
            boxes,
            side_port: side != 0,
        }
    }
}

/// Widens narrow boxes of a regular edge's corridor and makes consecutive boxes overlap by
/// at least [`MINW`]. Boxes at `fb`, `fb + 2`, .. up to `lb` surround virtual nodes; the ones
/// in between are inter-rank bands.
pub(crate) fn adjust_regular_path(boxes: &mut [BBox], fb: isize, lb: isize) {
    let widen = |b: &mut BBox| {
        let x = (b.ll.x + b.ur.x) / 2.0;
        b.ll.x = x - HALFMINW;
        b.ur.x = x + HALFMINW;
    };
    let node_box = |i: isize| i >= fb && i <= lb && (i - fb) % 2 == 0;
    for i in (fb - 1).max(0)..=lb.min(boxes.len() as isize - 1) {
        let b = &mut boxes[i as usize];
        if (i - fb) % 2 == 0 {
            if b.ll.x >= b.ur.x {
                widen(b);
            }
        } else if b.ll.x + MINW > b.ur.x {
            widen(b);
        }
    }
    for i in 0..boxes.len().saturating_sub(1) {
        let ii = i as isize;
        let (b1, b2) = (boxes[i], boxes[i + 1]);
        if node_box(ii) {
            let b2 = &mut boxes[i + 1];
            if b1.ll.x + MINW > b2.ur.x {
                b2.ur.x = b1.ll.x + MINW;
            }
            if b1.ur.x - MINW < b2.ll.x {
                b2.ll.x = b1.ur.x - MINW;
            }
        } else if ii + 1 >= fb && ii < lb && (ii + 1 - fb) % 2 == 0 {
            let b1 = &mut boxes[i];
            if b1.ll.x + MINW > b2.ur.x {
                b1.ll.x = b2.ur.x - MINW;
            }
            if b1.ur.x - MINW < b2.ll.x {
                b1.ur.x = b2.ll.x + MINW;
            }
        }
    }
}
