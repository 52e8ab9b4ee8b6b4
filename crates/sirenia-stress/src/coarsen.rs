//! Multilevel coarsening.
//!
//! Each level collapses a heavy-edge matching of the finer graph: nodes are visited by ascending
//! degree and paired with the unmatched neighbour joined by the heaviest edge. Coarse edges add up
//! the weights of the fine edges they replace and average their lengths. The coarsest graph is
//! laid out first; every finer level starts from its parent's position plus a small jitter.

use crate::distance::{all_pairs, pivots, sparse_pairs};
use crate::graph::Adjacency;
use crate::init::{self, Coords};
use crate::majorize::{self, Outcome};
use crate::options::Model;
use crate::rng::XorShift64Star;
use nalgebra::DVector;
use rustc_hash::FxHashMap;

/// Graphs smaller than this are not coarsened further.
pub const MIN_NODES: usize = 50;
/// A level that keeps more than this share of its nodes ends the hierarchy.
const MIN_SHRINK: f64 = 0.75;
const JITTER: f64 = 1e-2;

/// One coarsening step.
#[derive(Debug, Clone)]
pub struct Level {
    /// Coarse node of every fine node.
    pub parent: Vec<usize>,
    /// The coarse graph.
    pub adj: Adjacency,
    /// Edge weights of the coarse graph, parallel to `adj`.
    pub weights: Vec<Vec<f64>>,
}

impl Level {
    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }
}

/// Builds up to `max_levels` levels, finest first.
pub fn coarsen(adj: &Adjacency, max_levels: usize) -> Vec<Level> {
    let mut levels: Vec<Level> = Vec::new();
    let mut adj = adj.clone();
    let mut weights: Vec<Vec<f64>> = adj.iter().map(|row| vec![1.0; row.len()]).collect();
    while levels.len() < max_levels && adj.len() >= MIN_NODES {
        let level = collapse(&adj, &weights);
        if level.len() as f64 > MIN_SHRINK * adj.len() as f64 {
            break;
        }
        tracing::debug!(fine = adj.len(), coarse = level.len(), "coarsened");
        adj = level.adj.clone();
        weights = level.weights.clone();
        levels.push(level);
    }
    levels
}

fn collapse(adj: &Adjacency, weights: &[Vec<f64>]) -> Level {
    let n = adj.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&v| (adj[v].len(), v));

    let mut parent = vec![usize::MAX; n];
    let mut next = 0;
    for &v in &order {
        if parent[v] != usize::MAX {
            continue;
        }
        let mate = adj[v]
            .iter()
            .zip(&weights[v])
            .filter(|((u, _), _)| parent[*u] == usize::MAX && *u != v)
            .max_by(|((a, _), wa), ((b, _), wb)| {
                wa.total_cmp(wb)
                    .then_with(|| adj[*b].len().cmp(&adj[*a].len()))
                    .then_with(|| b.cmp(a))
            })
            .map(|((u, _), _)| *u);
        parent[v] = next;
        if let Some(u) = mate {
            parent[u] = next;
        }
        next += 1;
    }

    // (coarse a, coarse b) -> (weight, summed length, fine edges)
    let mut merged: FxHashMap<(usize, usize), (f64, f64, usize)> = FxHashMap::default();
    for (v, row) in adj.iter().enumerate() {
        for (&(u, len), &w) in row.iter().zip(&weights[v]) {
            let (a, b) = (parent[v], parent[u]);
            if a == b {
                continue;
            }
            let e = merged.entry((a, b)).or_insert((0.0, 0.0, 0));
            e.0 += w;
            e.1 += len;
            e.2 += 1;
        }
    }
    let mut coarse: Adjacency = vec![Vec::new(); next];
    let mut coarse_w: Vec<Vec<f64>> = vec![Vec::new(); next];
    let mut keys: Vec<_> = merged.keys().copied().collect();
    keys.sort_unstable();
    for (a, b) in keys {
        let (w, sum, count) = merged[&(a, b)];
        coarse[a].push((b, sum / count as f64));
        coarse_w[a].push(w);
    }
    Level {
        parent,
        adj: coarse,
        weights: coarse_w,
    }
}

pub(crate) struct Params {
    pub model: Model,
    pub max_iter: usize,
    pub epsilon: f64,
    pub exp: u8,
    pub cg_tol: f64,
    pub pivots: usize,
}

/// Lays out the coarsest level with dense majorization, then prolongs and refines level by level
/// with sparse majorization. `None` when the graph is too small to coarsen.
pub(crate) fn multilevel(
    adj: &Adjacency,
    levels: &[Level],
    dim: usize,
    params: &Params,
    rng: &mut XorShift64Star,
) -> Option<(Coords, Outcome)> {
    let coarsest = levels.last()?;
    let n = coarsest.len();
    let free = vec![false; adj.len().max(n)];
    let mut x = init::random(n, dim, rng);
    let pairs = all_pairs(&coarsest.adj, params.model).ok()?;
    let mut outcome = majorize::majorize(&pairs, &mut x, &major(params, &free[..n]), rng);

    for (k, level) in levels.iter().enumerate().rev() {
        let fine = if k == 0 { adj } else { &levels[k - 1].adj };
        x = prolong(&x, &level.parent, rng);
        let p = pivots(fine, params.model, params.pivots);
        let pairs = sparse_pairs(fine, params.model, &p);
        let step = majorize::majorize(&pairs, &mut x, &major(params, &free[..fine.len()]), rng);
        outcome.iterations += step.iterations;
        outcome.stress = step.stress;
    }
    Some((x, outcome))
}

fn major<'a>(params: &Params, pinned: &'a [bool]) -> majorize::Params<'a> {
    majorize::Params {
        max_iter: params.max_iter,
        epsilon: params.epsilon,
        exp: params.exp,
        cg_tol: params.cg_tol,
        pinned,
    }
}

fn prolong(x: &Coords, parent: &[usize], rng: &mut XorShift64Star) -> Coords {
    x.iter()
        .map(|axis| DVector::from_iterator(parent.len(), parent.iter().map(|&p| axis[p] + JITTER * rng.next_f64_signed())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_prefers_heavier_edges() {
        // Triangle whose 0-2 edge is three times heavier than the others.
        let adj: Adjacency = vec![
            vec![(1, 1.0), (2, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(0, 1.0), (1, 1.0)],
        ];
        let weights = vec![vec![1.0, 3.0], vec![1.0, 1.0], vec![3.0, 1.0]];
        let level = collapse(&adj, &weights);
        assert_eq!(level.parent[0], level.parent[2]);
        assert_ne!(level.parent[0], level.parent[1]);
        assert_eq!(level.weights[level.parent[1]], vec![2.0]);
        assert_eq!(level.adj[level.parent[1]], vec![(level.parent[0], 1.0)]);
    }
}
