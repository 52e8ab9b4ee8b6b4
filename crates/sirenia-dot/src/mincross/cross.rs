//! Crossing counts.
//!
//! An edge endpoint is keyed by `order * 256 + port.order`, so edges leaving one node through
//! different ports are ordered by where the port sits on the node.

use super::Mincross;
use super::scope::Scope;
use sirenia_graph::FNode;

/// Weighted inversion counter over compressed keys.
struct Fenwick {
    tree: Vec<i64>,
}

impl Fenwick {
    fn new(n: usize) -> Self {
        Self {
            tree: vec![0; n + 1],
        }
    }

    fn add(&mut self, i: usize, w: i64) {
        let mut i = i + 1;
        while i < self.tree.len() {
            self.tree[i] += w;
            i += i & i.wrapping_neg();
        }
    }

    /// Sum over keys `0..=i`.
    fn prefix(&self, i: usize) -> i64 {
        let mut i = i + 1;
        let mut s = 0;
        while i > 0 {
            s += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        s
    }
}

/// Sum of `w_a * w_b` over pairs whose first keys and second keys are strictly inverted.
pub(super) fn count_inversions(mut edges: Vec<(i64, i64, i64)>) -> i64 {
    if edges.len() < 2 {
        return 0;
    }
    edges.sort_unstable();
    let mut keys: Vec<i64> = edges.iter().map(|e| e.1).collect();
    keys.sort_unstable();
    keys.dedup();
    let mut fw = Fenwick::new(keys.len());
    let mut total = 0i64;
    let mut cross = 0i64;
    for (_, k, w) in edges {
        let ix = keys.partition_point(|x| *x < k);
        cross += w * (total - fw.prefix(ix));
        fw.add(ix, w);
        total += w;
    }
    cross
}

/// Up or down from a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Up,
    Down,
}

impl Mincross<'_> {
    pub(super) fn key(&self, v: FNode, port_order: u8) -> i64 {
        i64::from(self.lg.order(v)) * 256 + i64::from(port_order)
    }

    /// Total weighted crossings between consecutive ranks of the scope.
    pub(super) fn ncross(&self, sc: &Scope) -> i64 {
        (0..sc.rank_count().saturating_sub(1))
            .map(|ri| self.rcross(sc, ri))
            .sum()
    }

    /// Crossings among edges leaving rank offset `ri` downwards.
    fn rcross(&self, sc: &Scope, ri: usize) -> i64 {
        let mut edges = Vec::new();
        for &u in &sc.order[ri] {
            for &v in &sc.units[u].nodes {
                for &e in self.lg.g.out_edges(v) {
                    let edge = self.lg.g.edge(e);
                    let w = self.edge_penalty(sc, edge.tail, edge.head, edge.data.xpenalty);
                    if w == 0 {
                        continue;
                    }
                    edges.push((
                        self.key(edge.tail, edge.data.tail_port.order),
                        self.key(edge.head, edge.data.head_port.order),
                        w,
                    ));
                }
            }
        }
        count_inversions(edges)
    }

    /// Far-end keys and weights of the edges of unit `u` on `side`.
    pub(super) fn unit_ends(&self, sc: &Scope, u: usize, side: Side) -> Vec<(i64, i64)> {
        let mut out = Vec::new();
        for &v in &sc.units[u].nodes {
            let list = match side {
                Side::Down => self.lg.g.out_edges(v),
                Side::Up => self.lg.g.in_edges(v),
            };
            for &e in list {
                let edge = self.lg.g.edge(e);
                let w = self.edge_penalty(sc, edge.tail, edge.head, edge.data.xpenalty);
                if w == 0 {
                    continue;
                }
                let key = match side {
                    Side::Down => self.key(edge.head, edge.data.head_port.order),
                    Side::Up => self.key(edge.tail, edge.data.tail_port.order),
                };
                out.push((key, w));
            }
        }
        out
    }

    /// Crossings between units `a` and `b` as placed (`a` left), and if they were exchanged.
    pub(super) fn pair_cross(&self, sc: &Scope, a: usize, b: usize) -> (i64, i64) {
        let (mut c0, mut c1) = (0, 0);
        for side in [Side::Up, Side::Down] {
            let ea = self.unit_ends(sc, a, side);
            if ea.is_empty() {
                continue;
            }
            let eb = self.unit_ends(sc, b, side);
            for &(ka, wa) in &ea {
                for &(kb, wb) in &eb {
                    if ka > kb {
                        c0 += wa * wb;
                    } else if ka < kb {
                        c1 += wa * wb;
                    }
                }
            }
        }
        (c0, c1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inversions_are_weighted_products() {
        // (0 -> 1) and (1 -> 0) cross once, weighted 2 * 3.
        assert_eq!(count_inversions(vec![(0, 1, 2), (1, 0, 3)]), 6);
        assert_eq!(count_inversions(vec![(0, 0, 1), (1, 1, 1)]), 0);
    }

    #[test]
    fn shared_endpoints_do_not_cross() {
        assert_eq!(count_inversions(vec![(0, 5, 1), (1, 5, 1)]), 0);
        assert_eq!(count_inversions(vec![(3, 1, 1), (3, 0, 1)]), 0);
    }

    #[test]
    fn complete_bipartite_three_by_three() {
        let mut edges = Vec::new();
        for t in 0..3 {
            for h in 0..3 {
                edges.push((t * 256, h * 256, 1));
            }
        }
        assert_eq!(count_inversions(edges), 9);
    }
}
