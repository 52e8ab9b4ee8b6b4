//! Ideal distances.
//!
//! Every solver consumes a [`PairSet`]: for each node, the partners it has a stress term with and
//! their ideal distance. The dense models fill every row; the sparse model keeps 2-hop
//! neighbourhoods plus distances to a set of pivots.

use crate::error::{Error, Result};
use crate::graph::Adjacency;
use crate::options::Model;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ideal distances are clamped to at least this so weights stay finite.
const MIN_DIST: f64 = 1e-4;

/// Symmetric stress terms: row `i` lists `(j, d_ij)` for every `j` paired with `i`.
#[derive(Debug, Clone, Default)]
pub struct PairSet {
    pub rows: Vec<Vec<(usize, f64)>>,
}

impl PairSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every pair once, as `(i, j, d)` with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().filter(move |(j, _)| *j > i).map(move |&(j, d)| (i, j, d)))
    }

    fn from_map(n: usize, map: FxHashMap<(usize, usize), f64>) -> Self {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for ((i, j), d) in map {
            let d = d.max(MIN_DIST);
            rows[i].push((j, d));
            rows[j].push((i, d));
        }
        for row in &mut rows {
            row.sort_by_key(|(j, _)| *j);
        }
        PairSet { rows }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct Reached(f64, usize);

impl Eq for Reached {}

impl Ord for Reached {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0).then_with(|| other.1.cmp(&self.1))
    }
}

impl PartialOrd for Reached {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest paths; unreachable nodes get `f64::INFINITY`.
pub fn dijkstra(adj: &Adjacency, src: usize) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; adj.len()];
    let mut heap = BinaryHeap::new();
    dist[src] = 0.0;
    heap.push(Reached(0.0, src));
    while let Some(Reached(d, v)) = heap.pop() {
        if d > dist[v] {
            continue;
        }
        for &(u, len) in &adj[v] {
            let nd = d + len;
            if nd < dist[u] {
                dist[u] = nd;
                heap.push(Reached(nd, u));
            }
        }
    }
    dist
}

/// Edge lengths the shortest paths of `model` run on.
fn model_lengths(adj: &Adjacency, model: Model) -> Adjacency {
    match model {
        Model::Subset => subset_lengths(adj),
        Model::ShortPath | Model::Mds | Model::Circuit => adj.clone(),
    }
}

/// `d(i) + d(j) - 2|N(i) ∩ N(j)|` per edge, floored at the edge's own `len`.
fn subset_lengths(adj: &Adjacency) -> Adjacency {
    let mut mark = vec![usize::MAX; adj.len()];
    adj.iter()
        .enumerate()
        .map(|(i, row)| {
            for &(u, _) in row {
                mark[u] = i;
            }
            row.iter()
                .map(|&(j, len)| {
                    let common = adj[j].iter().filter(|(u, _)| mark[*u] == i).count();
                    let w = (row.len() + adj[j].len() - 2 * common) as f64;
                    (j, w.max(len))
                })
                .collect()
        })
        .collect()
}

/// All-pairs ideal distances of one connected component.
pub fn all_pairs(adj: &Adjacency, model: Model) -> Result<PairSet> {
    let n = adj.len();
    if model == Model::Circuit {
        return resistance(adj);
    }
    let lengths = model_lengths(adj, model);
    let mut map = FxHashMap::default();
    for i in 0..n {
        let dist = dijkstra(&lengths, i);
        for (j, &d) in dist.iter().enumerate().skip(i + 1) {
            if d.is_finite() {
                map.insert((i, j), d);
            }
        }
    }
    if model == Model::Mds {
        override_edges(adj, &mut map);
    }
    Ok(PairSet::from_map(n, map))
}

/// Direct edges keep their user length even when a shorter path exists.
fn override_edges(adj: &Adjacency, map: &mut FxHashMap<(usize, usize), f64>) {
    for (i, row) in adj.iter().enumerate() {
        for &(j, len) in row {
            if i < j {
                map.insert((i, j), len);
            }
        }
    }
}

/// Effective resistance between every pair, with `1/len` as the conductance of each edge.
fn resistance(adj: &Adjacency) -> Result<PairSet> {
    let n = adj.len();
    // Adding J/n makes the Laplacian of a connected graph invertible without changing
    // G_ii + G_jj - 2 G_ij.
    let mut g = DMatrix::<f64>::from_element(n, n, 1.0 / n as f64);
    for (i, row) in adj.iter().enumerate() {
        for &(j, len) in row {
            let c = 1.0 / len;
            g[(i, j)] -= c;
            g[(i, i)] += c;
        }
    }
    let inv = g.try_inverse().ok_or(Error::NotConnected)?;
    let mut map = FxHashMap::default();
    for i in 0..n {
        for j in i + 1..n {
            let r = inv[(i, i)] + inv[(j, j)] - 2.0 * inv[(i, j)];
            if !r.is_finite() {
                return Err(Error::NotConnected);
            }
            map.insert((i, j), r);
        }
    }
    Ok(PairSet::from_map(n, map))
}

/// Pivots spread by max-min distance, with their distance rows.
#[derive(Debug, Clone, Default)]
pub struct Pivots {
    pub ids: Vec<usize>,
    /// `dist[p][i]`: distance from pivot `ids[p]` to node `i`.
    pub dist: Vec<Vec<f64>>,
}

/// Picks up to `k` pivots, starting at node 0 and then always taking the node farthest from the
/// pivots chosen so far.
pub fn pivots(adj: &Adjacency, model: Model, k: usize) -> Pivots {
    let n = adj.len();
    let lengths = model_lengths(adj, model);
    let mut out = Pivots::default();
    if n == 0 {
        return out;
    }
    let mut min_dist = vec![f64::INFINITY; n];
    let mut next = 0;
    for _ in 0..k.min(n) {
        let dist = dijkstra(&lengths, next);
        for (m, d) in min_dist.iter_mut().zip(&dist) {
            *m = m.min(*d);
        }
        out.ids.push(next);
        out.dist.push(dist);
        let Some((far, d)) = min_dist
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        else {
            break;
        };
        if *d <= 0.0 {
            break;
        }
        next = far;
    }
    out
}

/// Sparse terms: every pair at most two hops apart plus every (node, pivot) pair.
pub fn sparse_pairs(adj: &Adjacency, model: Model, pivots: &Pivots) -> PairSet {
    let n = adj.len();
    let lengths = model_lengths(adj, model);
    let mut map: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    for i in 0..n {
        for &(k, l1) in &lengths[i] {
            keep(&mut map, i, k, l1);
            for &(j, l2) in &lengths[k] {
                keep(&mut map, i, j, l1 + l2);
            }
        }
    }
    for (p, &pv) in pivots.ids.iter().enumerate() {
        for (i, &d) in pivots.dist[p].iter().enumerate() {
            keep(&mut map, pv, i, d);
        }
    }
    if model == Model::Mds {
        override_edges(adj, &mut map);
    }
    PairSet::from_map(n, map)
}

fn keep(map: &mut FxHashMap<(usize, usize), f64>, i: usize, j: usize, d: f64) {
    if i == j || !d.is_finite() {
        return;
    }
    let e = map.entry((i.min(j), i.max(j))).or_insert(d);
    *e = e.min(d);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> Adjacency {
        (0..n)
            .map(|i| {
                let mut row = Vec::new();
                if i > 0 {
                    row.push((i - 1, 1.0));
                }
                if i + 1 < n {
                    row.push((i + 1, 1.0));
                }
                row
            })
            .collect()
    }

    fn distance(ps: &PairSet, i: usize, j: usize) -> Option<f64> {
        ps.rows[i].iter().find(|(k, _)| *k == j).map(|(_, d)| *d)
    }

    #[test]
    fn shortest_paths_on_a_path() {
        let ps = all_pairs(&path(4), Model::ShortPath).unwrap();
        assert_eq!(distance(&ps, 0, 3), Some(3.0));
        assert_eq!(distance(&ps, 2, 1), Some(1.0));
        assert_eq!(ps.pairs().count(), 6);
    }

    #[test]
    fn resistance_of_a_tree_is_path_length() {
        let ps = all_pairs(&path(3), Model::Circuit).unwrap();
        assert!((distance(&ps, 0, 2).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn resistance_of_a_cycle_combines_both_ways_round() {
        // Square: one edge in parallel with a path of three, 1 * 3 / (1 + 3).
        let adj: Adjacency = vec![
            vec![(1, 1.0), (3, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(1, 1.0), (3, 1.0)],
            vec![(2, 1.0), (0, 1.0)],
        ];
        let ps = all_pairs(&adj, Model::Circuit).unwrap();
        assert!((distance(&ps, 0, 1).unwrap() - 0.75).abs() < 1e-9);
        assert!((distance(&ps, 0, 2).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mds_keeps_user_lengths_on_edges() {
        // Triangle with one long edge that a two-edge path undercuts.
        let adj: Adjacency = vec![
            vec![(1, 1.0), (2, 5.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(1, 1.0), (0, 5.0)],
        ];
        let sp = all_pairs(&adj, Model::ShortPath).unwrap();
        let mds = all_pairs(&adj, Model::Mds).unwrap();
        assert_eq!(distance(&sp, 0, 2), Some(2.0));
        assert_eq!(distance(&mds, 0, 2), Some(5.0));
    }

    #[test]
    fn subset_model_separates_hubs() {
        // Star with four leaves: each spoke joins degrees 4 and 1 with no common neighbour.
        let mut adj: Adjacency = vec![Vec::new(); 5];
        for leaf in 1..5 {
            adj[0].push((leaf, 1.0));
            adj[leaf].push((0, 1.0));
        }
        let ps = all_pairs(&adj, Model::Subset).unwrap();
        assert_eq!(distance(&ps, 0, 1), Some(5.0));
        assert_eq!(distance(&ps, 1, 2), Some(10.0));
    }

    #[test]
    fn subset_lengths_never_undercut_the_edge_len() {
        // Triangle: every edge has one common neighbour, so 2 + 2 - 2 = 2 < len.
        let mut adj: Adjacency = vec![Vec::new(); 3];
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            adj[i].push((j, 3.0));
            adj[j].push((i, 3.0));
        }
        let ps = all_pairs(&adj, Model::Subset).unwrap();
        assert_eq!(distance(&ps, 0, 1), Some(3.0));
    }

    #[test]
    fn pivots_spread_to_the_far_end() {
        let p = pivots(&path(10), Model::ShortPath, 3);
        assert_eq!(p.ids[..2], [0, 9]);
        assert_eq!(p.ids.len(), 3);
        assert_eq!(p.dist[1][0], 9.0);
    }

    #[test]
    fn sparse_pairs_cover_two_hops_and_pivots() {
        let adj = path(8);
        let p = pivots(&adj, Model::ShortPath, 1);
        let ps = sparse_pairs(&adj, Model::ShortPath, &p);
        assert_eq!(distance(&ps, 3, 5), Some(2.0));
        assert_eq!(distance(&ps, 3, 6), None);
        assert_eq!(distance(&ps, 7, 0), Some(7.0));
    }
}
