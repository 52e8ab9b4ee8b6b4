//! Weighted medians, median reordering and adjacent transposition.

use super::Mincross;
use super::scope::Scope;
use sirenia_graph::shape::MC_SCALE;

impl Mincross<'_> {
    /// Sets `mval` for every unit on rank `r` from its neighbors on rank `other`.
    /// Returns whether some unit is left fixed in place.
    pub(super) fn medians(&mut self, sc: &mut Scope, r: usize, other: usize) -> bool {
        let ri = r - sc.min_rank;
        let down = other > r;
        for &u in &sc.order[ri] {
            let mut vals: Vec<f64> = Vec::new();
            for &v in &sc.units[u].nodes {
                let list = if down {
                    self.lg.g.out_edges(v)
                } else {
                    self.lg.g.in_edges(v)
                };
                for &e in list {
                    let edge = self.lg.g.edge(e);
                    if edge.data.xpenalty <= 0 {
                        continue;
                    }
                    let (far, port) = if down {
                        (edge.head, edge.data.head_port.order)
                    } else {
                        (edge.tail, edge.data.tail_port.order)
                    };
                    vals.push(MC_SCALE * f64::from(self.lg.order(far)) + f64::from(port));
                }
            }
            sc.units[u].mval = median(&mut vals);
        }

        let mut hasfixed = false;
        for i in 0..sc.order[ri].len() {
            let u = sc.order[ri][i];
            let isolated = sc.units[u].nodes.iter().all(|v| {
                self.lg.g.out_edges(*v).is_empty() && self.lg.g.in_edges(*v).is_empty()
            });
            if isolated {
                hasfixed |= self.flat_mval(sc, u);
            }
        }
        hasfixed
    }

    /// Places a node without inter-rank edges next to a flat neighbor. Returns `true` if the
    /// node stays fixed.
    fn flat_mval(&self, sc: &mut Scope, u: usize) -> bool {
        let &[v] = sc.units[u].nodes.as_slice() else {
            return true;
        };
        let data = &self.lg.g.node(v).data;
        if !data.flat_in.is_empty() {
            let nn = data
                .flat_in
                .iter()
                .map(|f| self.lg.flat[*f].tail)
                .max_by_key(|t| self.lg.order(*t));
            if let Some(nu) = nn.and_then(|t| sc.unit(t)) {
                let m = sc.units[nu].mval;
                if m >= 0.0 {
                    sc.units[u].mval = m + 1.0;
                    return false;
                }
            }
        } else if !data.flat_out.is_empty() {
            let nn = data
                .flat_out
                .iter()
                .map(|f| self.lg.flat[*f].head)
                .min_by_key(|h| self.lg.order(*h));
            if let Some(nu) = nn.and_then(|h| sc.unit(h)) {
                let m = sc.units[nu].mval;
                if m > 0.0 {
                    sc.units[u].mval = m - 1.0;
                    return false;
                }
            }
        }
        true
    }

    /// Whether unit `a`, placed left of `b`, must stay there.
    pub(super) fn left2right(&self, sc: &Scope, a: usize, b: usize) -> bool {
        let (ua, ub) = (&sc.units[a], &sc.units[b]);
        if sc.node_level {
            let ca = self.lg.g.node(ua.nodes[0]).data.cluster;
            let cb = self.lg.g.node(ub.nodes[0]).data.cluster;
            if ca != cb {
                return true;
            }
        }
        if ua.block.is_some() || ub.block.is_some() {
            return false;
        }
        self.lg.flat_order.contains(&(ua.nodes[0], ub.nodes[0]))
    }

    fn is_cluster_unit(&self, sc: &Scope, u: usize) -> bool {
        if sc.node_level {
            self.lg.g.node(sc.units[u].nodes[0]).data.cluster.is_some()
        } else {
            sc.units[u].block.is_some()
        }
    }

    /// Bubbles units with a median towards ascending order; fixed units keep their slots.
    pub(super) fn reorder(&mut self, sc: &mut Scope, r: usize, reverse: bool, hasfixed: bool) {
        let ri = r - sc.min_rank;
        let n = sc.order[ri].len();
        let mut ep = n;
        let mut changed = false;
        for _ in 0..n {
            let mut lp = 0;
            while lp < ep {
                while lp < ep && sc.units[sc.order[ri][lp]].mval < 0.0 {
                    lp += 1;
                }
                if lp >= ep {
                    break;
                }
                let mut sawclust = false;
                let mut muststay = false;
                let mut rp = lp + 1;
                while rp < ep {
                    let ur = sc.order[ri][rp];
                    if sawclust && self.is_cluster_unit(sc, ur) {
                        rp += 1;
                        continue;
                    }
                    if self.left2right(sc, sc.order[ri][lp], ur) {
                        muststay = true;
                        break;
                    }
                    if sc.units[ur].mval >= 0.0 {
                        break;
                    }
                    if self.is_cluster_unit(sc, ur) {
                        sawclust = true;
                    }
                    rp += 1;
                }
                if rp >= ep {
                    break;
                }
                if !muststay {
                    let p1 = sc.units[sc.order[ri][lp]].mval;
                    let p2 = sc.units[sc.order[ri][rp]].mval;
                    if p1 > p2 || (p1 == p2 && reverse) {
                        sc.order[ri].swap(lp, rp);
                        changed = true;
                    }
                }
                lp = rp;
            }
            if !hasfixed && !reverse && ep > 0 {
                ep -= 1;
            }
        }
        if changed {
            sc.write_back(self.lg, ri);
        }
    }

    /// Exchanges adjacent units while that strictly lowers crossings; with `reverse`, equal
    /// non-zero counts also exchange.
    pub(super) fn transpose(&mut self, sc: &mut Scope, reverse: bool) {
        let mut candidate = vec![true; sc.rank_count()];
        loop {
            let mut delta = 0;
            for ri in 0..sc.rank_count() {
                if candidate[ri] {
                    delta += self.transpose_step(sc, ri, reverse, &mut candidate);
                }
            }
            if delta < 1 {
                break;
            }
        }
    }

    fn transpose_step(
        &mut self,
        sc: &mut Scope,
        ri: usize,
        reverse: bool,
        candidate: &mut [bool],
    ) -> i64 {
        let mut rv = 0;
        candidate[ri] = false;
        let n = sc.order[ri].len();
        for i in 0..n.saturating_sub(1) {
            let (v, w) = (sc.order[ri][i], sc.order[ri][i + 1]);
            if self.left2right(sc, v, w) {
                continue;
            }
            let (c0, c1) = self.pair_cross(sc, v, w);
            if c1 < c0 || (c0 > 0 && reverse && c1 == c0) {
                sc.swap_adjacent(self.lg, ri, i);
                rv += c0 - c1;
                candidate[ri] = true;
                if ri > 0 {
                    candidate[ri - 1] = true;
                }
                if ri + 1 < candidate.len() {
                    candidate[ri + 1] = true;
                }
            }
        }
        rv
    }
}

/// Median of neighbor positions; `-1` with no neighbors, weighted towards the denser side when
/// the count is even.
pub(super) fn median(vals: &mut [f64]) -> f64 {
    match vals.len() {
        0 => -1.0,
        1 => vals[0],
        2 => (vals[0] + vals[1]) / 2.0,
        j => {
            vals.sort_by(f64::total_cmp);
            if j % 2 == 1 {
                vals[j / 2]
            } else {
                let rm = j / 2;
                let lm = rm - 1;
                let rspan = vals[j - 1] - vals[rm];
                let lspan = vals[lm] - vals[0];
                if lspan == rspan {
                    (vals[lm] + vals[rm]) / 2.0
                } else {
                    (vals[lm] * rspan + vals[rm] * lspan) / (lspan + rspan)
                }
            }
        }
    }
}
