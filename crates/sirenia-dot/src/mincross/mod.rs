//! Crossing minimization.
//!
//! Ordering works on *scopes*: the root graph (one connected component at a time) and then each
//! cluster, recursively. Inside a scope every rank is a sequence of units, where a unit is
//! either a node that belongs directly to the scope or the whole block of a child cluster on that
//! rank. Blocks move as one piece, which keeps cluster members contiguous, and edges inside a
//! block cost [`CL_CROSS`] per crossing so other edges route around them.
//!
//! Each scope runs the classic weighted-median heuristic followed by adjacent transpositions,
//! keeping the best ordering seen. After the clusters are ordered, an optional node-level pass
//! over the whole graph (`remincross`) repairs crossings between clusters.

mod build;
mod cross;
mod flat;
mod order;
mod scope;

use crate::init::{CL_CROSS, DotGraph};
use crate::model::Layered;
use scope::Scope;
use sirenia_graph::{Error, FNode, Result};

/// A ratio below this counts as real progress and resets the patience counter.
const CONVERGENCE: f64 = 0.995;

pub(crate) struct Mincross<'a> {
    dg: &'a DotGraph,
    lg: &'a mut Layered,
    min_quit: usize,
    max_iter: usize,
    flipped: bool,
}

/// Orders every rank of `lg` and returns the number of weighted crossings left.
pub fn dot_mincross(dg: &DotGraph, lg: &mut Layered) -> Result<i64> {
    let mut mc = Mincross {
        dg,
        lg,
        min_quit: dg.cfg.min_quit(),
        max_iter: dg.cfg.max_iter(),
        flipped: dg.cfg.rankdir.is_flipped(),
    };

    let mut comps = Scope::root_components(mc.dg, mc.lg);
    for sc in &mut comps {
        mc.ordered_edges(sc);
        sc.write_back_all(mc.lg);
    }
    let mut total = 0;
    for (i, sc) in comps.iter_mut().enumerate() {
        let c = mc.mincross(sc, 0);
        tracing::trace!(component = i, crossings = c, "component ordered");
        total += c;
    }
    for &c in &dg.top_clusters {
        total += mc.mincross_cluster(c);
    }
    if !dg.clusters.is_empty() && dg.cfg.remincross != Some(false) {
        let mut sc = Scope::node_level(mc.lg);
        total = mc.mincross(&mut sc, 2);
    }
    validate(mc.lg)?;
    tracing::debug!(
        crossings = total,
        components = comps.len(),
        "mincross finished"
    );
    Ok(total)
}

impl Mincross<'_> {
    fn mincross_cluster(&mut self, c: usize) -> i64 {
        let mut sc = Scope::cluster(self.dg, self.lg, c);
        self.build_ranks(&mut sc, 0);
        self.ordered_edges(&mut sc);
        self.flat_breakcycles(&mut sc);
        self.flat_reorder(&mut sc);
        let mut nc = self.mincross(&mut sc, 2);
        let dg = self.dg;
        for &child in &dg.clusters[c].children {
            nc += self.mincross_cluster(child);
        }
        nc
    }

    /// Runs passes `startpass..=2` on one scope and leaves the best ordering installed.
    fn mincross(&mut self, sc: &mut Scope, startpass: usize) -> i64 {
        let (mut cur, mut best) = if startpass > 1 {
            let c = self.ncross(sc);
            (c, c)
        } else {
            (i64::MAX, i64::MAX)
        };
        let mut best_order = sc.order.clone();

        for pass in startpass..=2 {
            let max_this_pass = if pass <= 1 {
                if sc.is_root_component() {
                    self.build_ranks(sc, pass);
                }
                if pass == 0 {
                    self.flat_breakcycles(sc);
                }
                self.flat_reorder(sc);
                cur = self.ncross(sc);
                if cur <= best {
                    best_order.clone_from(&sc.order);
                    best = cur;
                }
                self.max_iter.min(4)
            } else {
                if cur > best {
                    sc.restore(self.lg, &best_order);
                }
                cur = best;
                self.max_iter
            };

            let mut trying = 0;
            for iter in 0..max_this_pass {
                if trying >= self.min_quit || cur == 0 {
                    break;
                }
                trying += 1;
                self.step(sc, iter);
                cur = self.ncross(sc);
                if cur <= best {
                    best_order.clone_from(&sc.order);
                    if (cur as f64) < CONVERGENCE * best as f64 {
                        trying = 0;
                    }
                    best = cur;
                }
            }
            tracing::trace!(pass, best, "mincross pass");
            if cur == 0 {
                break;
            }
        }
        if cur > best {
            sc.restore(self.lg, &best_order);
        }
        if best > 0 {
            self.transpose(sc, false);
            best = self.ncross(sc);
        }
        best
    }

    /// One median sweep: down on even iterations, up on odd ones.
    fn step(&mut self, sc: &mut Scope, iter: usize) {
        let reverse = iter % 2 == 1;
        let (min, max) = (sc.min_rank as i64, sc.max_rank as i64);
        let root_max = self.lg.max_rank() as i64;
        let (first, last, dir) = if iter % 2 == 0 {
            let first = if min > 0 { min } else { min + 1 };
            (first, max, 1)
        } else {
            let first = if max < root_max { max } else { max - 1 };
            (first, min, -1)
        };
        let mut r = first;
        while (dir > 0 && r <= last) || (dir < 0 && r >= last) {
            let other = r - dir;
            if (0..=root_max).contains(&other) {
                let hasfixed = self.medians(sc, r as usize, other as usize);
                self.reorder(sc, r as usize, reverse, hasfixed);
            }
            r += dir;
        }
        self.transpose(sc, !reverse);
    }

    /// Crossing weight of a layout edge inside scope `sc`.
    fn edge_penalty(&self, sc: &Scope, t: FNode, h: FNode, xpenalty: i32) -> i64 {
        let base = i64::from(xpenalty);
        if sc.same_block(t, h) {
            base * i64::from(CL_CROSS)
        } else {
            base
        }
    }
}

/// Every rank holds each of its nodes exactly once, with `order` matching the position.
fn validate(lg: &Layered) -> Result<()> {
    let mut seen = vec![false; lg.g.node_count()];
    for (r, rank) in lg.ranks.iter().enumerate() {
        for (i, &v) in rank.iter().enumerate() {
            let node = lg.g.node(v);
            if seen[v.0] || node.rank != r as i32 || node.order != i as i32 {
                return Err(Error::InternalConsistency(format!(
                    "rank {r} position {i} holds a misplaced node"
                )));
            }
            seen[v.0] = true;
        }
    }
    if let Some(v) = seen.iter().position(|s| !s) {
        return Err(Error::InternalConsistency(format!(
            "layout node {v} was not installed in its rank"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class2;
    use crate::rank::dot_rank;
    use sirenia_graph::Graph;

    fn ordered(g: &mut Graph) -> (Layered, i64) {
        let dg = DotGraph::from_graph(g);
        let ranking = dot_rank(&dg).unwrap();
        let mut lg = class2::build(&dg, &ranking);
        let c = dot_mincross(&dg, &mut lg).unwrap();
        (lg, c)
    }

    #[test]
    fn independent_edges_do_not_cross() {
        let mut g = Graph::new("G", true);
        for (t, h) in [("a", "d"), ("b", "c"), ("a", "e")] {
            g.add_edge_by_name(t, h);
        }
        let (lg, c) = ordered(&mut g);
        assert_eq!(c, 0);
        assert!(validate(&lg).is_ok());
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut g = Graph::new("G", true);
        g.add_edge_by_name("a", "b");
        let (mut lg, _) = ordered(&mut g);
        let first = lg.ranks[0][0];
        lg.ranks[1].push(first);
        assert!(validate(&lg).is_err());
    }
}
