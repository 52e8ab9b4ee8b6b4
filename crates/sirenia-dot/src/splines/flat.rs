//! Edges between nodes of the same rank.
//!
//! Neighbours are joined directly, fanning multi-edges across the node height. Other flat
//! edges arc through the gap above the rank (below it when their ports face down); a labelled
//! one passes just under its label node on the rank above.

use super::Router;
use super::route::BoxPath;
use crate::config::Splines;
use crate::model::Route;
use crate::position::flat_adjacent;
use sirenia_graph::{BBox, FNode, Point, sides};

/// Vertical gap around stacked labels of edges between neighbours.
const LBL_SPACE: f64 = 6.0;

impl Router<'_> {
    fn flat_ends(&self, f: usize) -> (FNode, FNode) {
        let fe = &self.lg.flat[f];
        let tn = self.left_end(f);
        let hn = if tn == fe.tail { fe.head } else { fe.tail };
        (tn, hn)
    }

    /// Routes a group of unlabelled (or neighbouring) edges sharing flat edge `f`.
    pub(super) fn make_flat_edges(&mut self, f: usize, edges: &[usize]) {
        let (tn, hn) = self.flat_ends(f);
        if flat_adjacent(self.lg, tn, hn) {
            return self.flat_adjacent_edges(edges, tn, hn);
        }
        if self.mode == Splines::Line {
            return self.simple_flat(edges, tn, hn);
        }
        let (tp, hp) = self.oriented_ports(edges[0], tn);
        let (ts, hs) = (tp.side, hp.side);
        let bottom = (ts == sides::BOTTOM && hs != sides::TOP) || (hs == sides::BOTTOM && ts != sides::TOP);
        self.flat_arc_edges(edges, tn, hn, !bottom);
    }

    /// Straight spindle between `tn` and `hn`.
    fn simple_flat(&mut self, edges: &[usize], tn: FNode, hn: FNode) {
        if edges.is_empty() {
            return;
        }
        let lg = self.lg;
        let cnt = edges.len();
        let (tport, hport) = self.oriented_ports(edges[0], tn);
        let tp = lg.coord(tn) + tport.p;
        let hp = lg.coord(hn) + hport.p;
        let ht = lg.g.node(tn).data.ht;
        let stepy = if cnt > 1 { ht / (cnt - 1) as f64 } else { 0.0 };
        let mut dy = tp.y - if cnt > 1 { ht / 2.0 } else { 0.0 };
        for &e in edges {
            let a = Point::new((2.0 * tp.x + hp.x) / 3.0, dy);
            let b = Point::new((2.0 * hp.x + tp.x) / 3.0, dy);
            let pts = if self.mode == Splines::Polyline {
                vec![tp, tp, a, a, a, b, b, b, hp, hp]
            } else {
                vec![tp, a, b, hp]
            };
            self.install(e, &pts, tn, hn, (false, false));
            dy += stepy;
        }
    }

    /// Edges between neighbours. Labels stack upward from the edge line, and every labelled
    /// edge after the first bows up to pass just under its own label.
    fn flat_adjacent_edges(&mut self, edges: &[usize], tn: FNode, hn: FNode) {
        let dg = self.dg;
        let (plain, labelled): (Vec<usize>, Vec<usize>) =
            edges.iter().partition(|e| dg.edges[**e].label.is_none());
        self.simple_flat(&plain, tn, hn);
        let Some(&first) = labelled.first() else {
            return;
        };
        let lg = self.lg;
        let (tport, hport) = self.oriented_ports(first, tn);
        let tp = lg.coord(tn) + tport.p;
        let hp = lg.coord(hn) + hport.p;
        let (td, hd) = (&lg.g.node(tn).data, &lg.g.node(hn).data);
        let mid_x = (td.x + td.rw + hd.x - hd.lw) / 2.0;
        let base = tp.y.max(hp.y);
        let mut floor = base;
        for &e in &labelled {
            let dim = dg.edges[e].label.unwrap_or_default();
            // Control points at `c` put the middle of the cubic at `floor`.
            let c = base + (floor - base) / 0.75;
            let pts = [
                tp,
                Point::new((2.0 * tp.x + hp.x) / 3.0, c),
                Point::new((2.0 * hp.x + tp.x) / 3.0, c),
                hp,
            ];
            self.labels
                .push((e, Point::new(mid_x, floor + LBL_SPACE / 2.0 + dim.y / 2.0)));
            self.install(e, &pts, tn, hn, (false, false));
            floor += LBL_SPACE + dim.y;
        }
    }

    /// Arcs above (`top`) or below the rank, multi-edges nested outward.
    fn flat_arc_edges(&mut self, edges: &[usize], tn: FNode, hn: FNode, top: bool) {
        let lg = self.lg;
        let r = lg.g.rank(tn) as usize;
        let y = lg.coord(tn).y;
        let vspace = if top {
            let prev = if self.dg.has_edge_labels {
                r.checked_sub(2)
            } else {
                r.checked_sub(1)
            };
            match prev.filter(|p| !lg.ranks[*p].is_empty()) {
                Some(p) => lg.rank_y(p) - lg.ht1[p] - y - lg.ht2[r],
                None => lg.ranksep,
            }
        } else if r + 1 < lg.ranks.len() && !lg.ranks[r + 1].is_empty() {
            y - lg.ht1[r] - (lg.rank_y(r + 1) + lg.ht2[r + 1])
        } else {
            lg.ranksep
        };
        let vspace = vspace.max(2.0);
        let cnt = edges.len() as f64;
        let stepx = self.multisep / (cnt + 1.0);
        let stepy = vspace / (cnt + 1.0);

        let (tport, hport) = self.oriented_ports(edges[0], tn);
        let tend = self.flat_end(tn, tport, false, top);
        let hend = self.flat_end(hn, hport, true, top);
        let (tb, hb) = (tend.last(), hend.last());
        for (i, &e) in edges.iter().enumerate() {
            let k = (i + 1) as f64;
            let arc = if top {
                let b0 = BBox::from_coords(tb.ll.x, tb.ur.y, tb.ur.x + k * stepx, tb.ur.y + k * stepy);
                let b1 = BBox::from_coords(tb.ll.x, b0.ur.y, hb.ur.x, b0.ur.y + stepy);
                let b2 = BBox::from_coords(hb.ll.x - k * stepx, hb.ur.y, hb.ur.x, b1.ll.y);
                [b0, b1, b2]
            } else {
                let b0 = BBox::from_coords(tb.ll.x, tb.ll.y - k * stepy, tb.ur.x + k * stepx, tb.ll.y);
                let b1 = BBox::from_coords(tb.ll.x, b0.ll.y - stepy, hb.ur.x, b0.ll.y);
                let b2 = BBox::from_coords(hb.ll.x - k * stepx, b1.ur.y, hb.ur.x, hb.ll.y);
                [b0, b1, b2]
            };
            let mut path = BoxPath::new(tend.p, hend.p);
            for b in tend.boxes.iter().chain(&arc).chain(hend.boxes.iter().rev()) {
                path.add_box(*b);
            }
            let raw = self.route(&path, e);
            self.install(e, &raw, tn, hn, (tend.side_port, hend.side_port));
        }
    }

    /// A labelled flat edge between non-neighbours, passing under its label node.
    pub(super) fn make_flat_labeled_edge(&mut self, e: usize) {
        let lg = self.lg;
        let Route::Flat(f) = lg.route[e] else {
            return;
        };
        let Some(&ln) = lg.flat_label.get(&e) else {
            return;
        };
        let (tn, hn) = self.flat_ends(f);
        let (tport, hport) = self.oriented_ports(e, tn);
        let ld = &lg.g.node(ln).data;
        let lc = lg.coord(ln);
        let label_bottom = lc.y - ld.ht / 2.0;

        if self.mode == Splines::Line {
            let start = lg.coord(tn) + tport.p;
            let end = lg.coord(hn) + hport.p;
            let lp = Point::new(lc.x, label_bottom);
            let pts = [start, start, lp, lp, lp, end, end];
            return self.install(e, &pts, tn, hn, (false, false));
        }

        let r = lg.g.rank(tn) as usize;
        let ydelta = ((lc.y - lg.ht1[r] - lg.coord(tn).y + lg.ht2[r]) / 6.0).max(5.0);
        let tend = self.flat_end(tn, tport, false, true);
        let hend = self.flat_end(hn, hport, true, true);
        let (tb, hb) = (tend.last(), hend.last());
        let floor = tb.ur.y.max(hb.ur.y) + 1.0;
        let slab_top = label_bottom.max(floor + 1.0);
        let slab_bottom = (label_bottom - ydelta).max(floor).min(slab_top - 1.0);
        let (lb_left, lb_right) = (lc.x - ld.lw, lc.x + ld.rw);
        let arc = [
            BBox::from_coords(tb.ll.x, tb.ur.y, lb_left.max(tb.ur.x), slab_bottom),
            BBox::from_coords(tb.ll.x, slab_bottom, hb.ur.x, slab_top),
            BBox::from_coords(lb_right.min(hb.ll.x), hb.ur.y, hb.ur.x, slab_bottom),
        ];
        let mut path = BoxPath::new(tend.p, hend.p);
        for b in tend.boxes.iter().chain(&arc).chain(hend.boxes.iter().rev()) {
            path.add_box(*b);
        }
        let raw = self.route(&path, e);
        self.install(e, &raw, tn, hn, (tend.side_port, hend.side_port));
    }
}
