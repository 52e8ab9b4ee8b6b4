//! Edges between ranks, routed down their chain of virtual nodes.

use super::boxes::adjust_regular_path;
use super::route::BoxPath;
use super::{Router, side_dir};
use crate::config::Splines;
use crate::model::Route;
use sirenia_graph::{FNode, Point};

/// Bend of `splines=curved` edges as a fraction of their length.
const CURVE_BEND: f64 = 0.12;

/// `p3` lies left of the ray `p1 -> p2`.
fn left_of(p1: Point, p2: Point, p3: Point) -> bool {
    (p1.y - p2.y) * (p3.x - p2.x) - (p3.y - p2.y) * (p1.x - p2.x) > 0.0
}

impl Router<'_> {
    /// Routes a group of edges sharing one chain.
    pub(super) fn make_regular_edges(&mut self, edges: &[usize]) {
        let lg = self.lg;
        let Route::Chain { edges: chain, .. } = &lg.route[edges[0]] else {
            return;
        };
        let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
            return;
        };
        let g = &lg.g;
        let (tn, hn) = (g.tail(first), g.head(last));
        match self.mode {
            Splines::Line => return self.line_edges(edges, tn, hn),
            Splines::Curved => return self.curved_edges(edges, tn, hn),
            _ => {}
        }
        let tp = &g.edge(first).data.tail_port;
        let hp = &g.edge(last).data.head_port;
        let (rt, rh) = (g.rank(tn) as usize, g.rank(hn) as usize);

        let tnb = self.maximal_bbox(tn, None, Some(first));
        let mut tend = self.regular_end(tn, tp, tnb, false);
        tend.close_to_rank(lg.coord(tn).y - lg.ht1[rt]);

        let mut mid = Vec::with_capacity(2 * chain.len());
        for (i, &e) in chain.iter().enumerate() {
            mid.push(self.rank_box(g.rank(g.tail(e)) as usize));
            if let Some(&next) = chain.get(i + 1) {
                mid.push(self.maximal_bbox(g.head(e), Some(e), Some(next)));
            }
        }

        let hnb = self.maximal_bbox(hn, Some(last), None);
        let mut hend = self.regular_end(hn, hp, hnb, true);
        hend.close_to_rank(lg.coord(hn).y + lg.ht2[rh]);

        let mut boxes = tend.boxes.clone();
        let fb = boxes.len() as isize + 1;
        let lb = fb + mid.len() as isize - 3;
        boxes.extend(mid);
        boxes.extend(hend.boxes.iter().rev());
        adjust_regular_path(&mut boxes, fb, lb);

        let mut path = BoxPath::new(tend.p, hend.p);
        for b in boxes {
            path.add_box(b);
        }
        if tend.side_port {
            path.start_dir = side_dir(tp.side);
        }
        if hend.side_port {
            path.end_dir = side_dir(hp.side).map(|d| d * -1.0);
        }
        let raw = self.route(&path, edges[0]);
        self.spread(edges, &raw, tn, hn, (tend.side_port, hend.side_port));
    }

    /// Installs one copy of `raw` per edge, spreading the members of a multi-edge apart.
    fn spread(
        &mut self,
        edges: &[usize],
        raw: &[Point],
        from: FNode,
        to: FNode,
        side_ports: (bool, bool),
    ) {
        let cnt = edges.len();
        let n = raw.len();
        let mut dx = -self.multisep * (cnt as f64 - 1.0) / 2.0;
        for &e in edges {
            let mut pts = raw.to_vec();
            if cnt > 1 && n > 2 {
                for p in &mut pts[1..n - 1] {
                    p.x += dx;
                }
            }
            self.install(e, &pts, from, to, side_ports);
            dx += self.multisep;
        }
    }

    /// `splines=line`: straight from port to port, bending once at the label.
    fn line_edges(&mut self, edges: &[usize], tn: FNode, hn: FNode) {
        let lg = self.lg;
        for &e in edges {
            let (tp, hp) = self.oriented_ports(e, tn);
            let start = lg.coord(tn) + tp.p;
            let end = lg.coord(hn) + hp.p;
            let pts = match (self.dg.edges[e].label, lg.label_pos[e]) {
                (Some(dim), Some(lp)) => {
                    let lp = if left_of(end, start, lp) {
                        Point::new(lp.x + dim.x / 2.0, lp.y - dim.y / 2.0)
                    } else {
                        Point::new(lp.x - dim.x / 2.0, lp.y + dim.y / 2.0)
                    };
                    vec![start, start, lp, lp, lp, end, end]
                }
                _ => vec![start, start, end, end],
            };
            self.install(e, &pts, tn, hn, (false, false));
        }
    }

    /// `splines=curved`: one bowed cubic per edge, multi-edges bowing further apart.
    fn curved_edges(&mut self, edges: &[usize], tn: FNode, hn: FNode) {
        let lg = self.lg;
        let cnt = edges.len() as f64;
        for (i, &e) in edges.iter().enumerate() {
            let (tp, hp) = self.oriented_ports(e, tn);
            let a = lg.coord(tn) + tp.p;
            let b = lg.coord(hn) + hp.p;
            let d = b - a;
            let normal = Point::new(-d.y, d.x).normalized();
            let bend = d.len() * CURVE_BEND + (i as f64 - (cnt - 1.0) / 2.0) * self.multisep;
            let off = normal * bend;
            let pts = [a, a + d * (1.0 / 3.0) + off, a + d * (2.0 / 3.0) + off, b];
            self.install(e, &pts, tn, hn, (false, false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_of_follows_ray_direction() {
        // Looking down the ray from (0, 10) to (0, 0), +x is on the left.
        let (p1, p2) = (Point::new(0.0, 10.0), Point::new(0.0, 0.0));
        assert!(left_of(p1, p2, Point::new(5.0, 5.0)));
        assert!(!left_of(p1, p2, Point::new(-5.0, 5.0)));
    }
}
