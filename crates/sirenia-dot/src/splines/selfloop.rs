//! Self loops, drawn beside their node.
//!
//! Loops without ports go on the right, where positioning left room for them. Ports on the
//! left side move them left, ports on both left and right or only on top move them over the
//! top, and ports only on the bottom move them under. Members of a group nest outward.

use super::Router;
use crate::position::loops_right;
use sirenia_graph::{FNode, Point, sides};

impl Router<'_> {
    pub(super) fn make_self_edges(&mut self, v: FNode, edges: &[usize]) {
        let lg = self.lg;
        let r = lg.g.rank(v) as usize;
        let y = lg.coord(v).y;
        let last = lg.ranks.len() - 1;
        let up = || lg.rank_y(r - 1) - y;
        let down = || y - lg.rank_y(r + 1);
        let gap = if r == last {
            if r > 0 { up() } else { lg.g.node(v).data.ht }
        } else if r == 0 {
            down()
        } else {
            up().min(down())
        };
        let sizey = gap / 2.0;
        let sizex = self.multisep;

        let info = &self.dg.edges[edges[0]];
        let (ts, hs) = (info.tail_port.side, info.head_port.side);
        if loops_right(&info.tail_port, &info.head_port) {
            self.self_beside(v, edges, sizex, sizey, 1.0);
        } else if (ts | hs) & sides::LEFT != 0 {
            if (ts | hs) & sides::RIGHT != 0 {
                self.self_over(v, edges, sizex, sizey, 1.0);
            } else {
                self.self_beside(v, edges, sizex, sizey, -1.0);
            }
        } else if ts & sides::TOP != 0 {
            self.self_over(v, edges, sizex, sizey, 1.0);
        } else {
            self.self_over(v, edges, sizex, sizey, -1.0);
        }
    }

    /// Loops to the right (`sign = 1`) or left (`sign = -1`) of the node.
    fn self_beside(&mut self, v: FNode, edges: &[usize], stepx: f64, sizey: f64, sign: f64) {
        let lg = self.lg;
        let d = &lg.g.node(v).data;
        let np = lg.coord(v);
        let info = &self.dg.edges[edges[0]];
        let tp = np + info.tail_port.p;
        let hp = np + info.head_port.p;
        let stepy = (sizey / 2.0 / edges.len() as f64).max(2.0);
        let sgn = if tp.y >= hp.y { 1.0 } else { -1.0 };
        let mut dx = if sign > 0.0 { d.rw } else { d.lw };
        let mut dy = 0.0;
        let mut tx = dx.min(3.0 * (dx - sign * (tp.x - np.x)));
        let mut hx = dx.min(3.0 * (dx - sign * (hp.x - np.x)));
        for &e in edges {
            dx += stepx;
            tx += stepx;
            hx += stepx;
            dy += sgn * stepy;
            let side_x = np.x + sign * dx;
            let pts = [
                tp,
                Point::new(tp.x + sign * tx / 3.0, tp.y + dy),
                Point::new(side_x, tp.y + dy),
                Point::new(side_x, (tp.y + hp.y) / 2.0),
                Point::new(side_x, hp.y - dy),
                Point::new(hp.x + sign * hx / 3.0, hp.y - dy),
                hp,
            ];
            if let Some(dim) = self.dg.edges[e].label {
                self.labels
                    .push((e, Point::new(np.x + sign * (dx + dim.x / 2.0), np.y)));
                if dim.x > stepx {
                    dx += dim.x - stepx;
                }
            }
            self.install(e, &pts, v, v, (false, false));
        }
    }

    /// Loops over (`sign = 1`) or under (`sign = -1`) the node.
    fn self_over(&mut self, v: FNode, edges: &[usize], sizex: f64, stepy: f64, sign: f64) {
        let lg = self.lg;
        let d = &lg.g.node(v).data;
        let np = lg.coord(v);
        let info = &self.dg.edges[edges[0]];
        let tp = np + info.tail_port.p;
        let hp = np + info.head_port.p;
        let stepx = (sizex / 2.0 / edges.len() as f64).max(2.0);
        let sgn = if tp.x >= hp.x { 1.0 } else { -1.0 };
        let mut dy = d.ht / 2.0;
        let mut dx = 0.0;
        let mut ty = dy.min(3.0 * (dy - sign * (tp.y - np.y)));
        let mut hy = dy.min(3.0 * (dy - sign * (hp.y - np.y)));
        for &e in edges {
            dy += stepy;
            ty += stepy;
            hy += stepy;
            dx += sgn * stepx;
            let side_y = np.y + sign * dy;
            let pts = [
                tp,
                Point::new(tp.x + dx, tp.y + sign * ty / 3.0),
                Point::new(tp.x + dx, side_y),
                Point::new((tp.x + hp.x) / 2.0, side_y),
                Point::new(hp.x - dx, side_y),
                Point::new(hp.x - dx, hp.y + sign * hy / 3.0),
                hp,
            ];
            if let Some(dim) = self.dg.edges[e].label {
                self.labels
                    .push((e, Point::new(np.x, np.y + sign * (dy + dim.y / 2.0))));
                if dim.y > stepy {
                    dy += dim.y - stepy;
                }
            }
            self.install(e, &pts, v, v, (false, false));
        }
    }
}
