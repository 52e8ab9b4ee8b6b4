//! Rank assignment.
//!
//! The default ranker works bottom-up over the cluster tree. Each cluster is ranked on its own,
//! then collapsed into a single leader with per-member offsets; `rank=same|min|max` sets are
//! collapsed the same way. Edges touching a collapsed cluster become a pair of soft constraints
//! through a slack node, so inter-cluster edges cannot force cycles.
//!
//! With `newrank=true` the whole graph is ranked in one pass instead (see [`crate::newrank`]).

use crate::acyclic;
use crate::config::DotConfig;
use crate::init::{DotGraph, RankKind};
use crate::network_simplex::{self, Balance, NsOptions};
use rustc_hash::FxHashMap;
use sirenia_graph::{FNode, FastGraph, NodeKind, Result, alg};

/// Soft weight multiplier pulling a cluster towards the tail of an inter-cluster edge.
pub const CL_BACK: i32 = 10;

/// Ranks of the real nodes plus the rank span of every cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking {
    pub rank: Vec<i32>,
    /// `(min_rank, max_rank)` per cluster.
    pub cluster_span: Vec<(i32, i32)>,
}

impl Ranking {
    pub fn max_rank(&self) -> i32 {
        self.rank.iter().copied().max().unwrap_or(0)
    }
}

/// Union-find where every member stores its rank offset from the set leader.
#[derive(Debug, Clone)]
pub(crate) struct OffsetSets {
    parent: Vec<usize>,
    offset: Vec<i32>,
}

impl OffsetSets {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            offset: vec![0; n],
        }
    }

    /// Leader of `v` and `rank(v) - rank(leader)`.
    pub(crate) fn find(&mut self, v: usize) -> (usize, i32) {
        let mut path = Vec::new();
        let mut cur = v;
        while self.parent[cur] != cur {
            path.push(cur);
            cur = self.parent[cur];
        }
        let root = cur;
        // Compress from the node nearest the root so each offset is relative to `root`.
        for &p in path.iter().rev() {
            let up = self.parent[p];
            if up != root {
                self.offset[p] += self.offset[up];
            }
            self.parent[p] = root;
        }
        (root, self.offset[v])
    }

    /// Puts `a` and `b` on the same rank. Returns `false` if they already share a leader.
    pub(crate) fn union_same(&mut self, a: usize, b: usize) -> bool {
        let (la, oa) = self.find(a);
        let (lb, ob) = self.find(b);
        if la == lb {
            return false;
        }
        let (keep, absorb, off) = if la < lb {
            (la, lb, oa - ob)
        } else {
            (lb, la, ob - oa)
        };
        self.parent[absorb] = keep;
        self.offset[absorb] = off;
        true
    }

    /// Attaches `v` (a set leader) under `leader` at a fixed offset.
    pub(crate) fn attach(&mut self, v: usize, leader: usize, offset: i32) {
        self.parent[v] = leader;
        self.offset[v] = offset;
    }
}

/// Node payload of a ranking graph: the real node it leads, if any.
pub(crate) type RankGraph = FastGraph<Option<usize>, ()>;

/// Ranks every node of `dg`, dispatching on `newrank`.
pub fn dot_rank(dg: &DotGraph) -> Result<Ranking> {
    let rank = if dg.cfg.newrank {
        crate::newrank::rank(dg)?
    } else {
        rank_by_cluster(dg)?
    };
    let cluster_span = cluster_spans(dg, &rank);
    tracing::debug!(
        nodes = dg.nodes.len(),
        max_rank = rank.iter().copied().max().unwrap_or(0),
        newrank = dg.cfg.newrank,
        "ranks assigned"
    );
    Ok(Ranking { rank, cluster_span })
}

pub(crate) fn cluster_spans(dg: &DotGraph, rank: &[i32]) -> Vec<(i32, i32)> {
    dg.clusters
        .iter()
        .map(|c| {
            let lo = c.members.iter().map(|n| rank[*n]).min().unwrap_or(0);
            let hi = c.members.iter().map(|n| rank[*n]).max().unwrap_or(0);
            (lo, hi)
        })
        .collect()
}

/// Edge minlen after doubling for edge labels.
pub(crate) fn rank_minlen(dg: &DotGraph, minlen: i32) -> i32 {
    if dg.has_edge_labels {
        minlen.saturating_mul(2)
    } else {
        minlen
    }
}

fn rank_by_cluster(dg: &DotGraph) -> Result<Vec<i32>> {
    let n = dg.nodes.len();
    let mut sets = OffsetSets::new(n);
    let all: Vec<usize> = (0..n).collect();
    let mut rank = vec![0; n];
    rank_scope(dg, None, &all, &mut sets, &mut rank)?;
    let min = rank.iter().copied().min().unwrap_or(0);
    for r in &mut rank {
        *r -= min;
    }
    Ok(rank)
}

/// Ranks the members of one scope (root or cluster), writing ranks relative to the scope.
fn rank_scope(
    dg: &DotGraph,
    scope: Option<usize>,
    members: &[usize],
    sets: &mut OffsetSets,
    rank: &mut [i32],
) -> Result<()> {
    let children: &[usize] = match scope {
        Some(c) => &dg.clusters[c].children,
        None => &dg.top_clusters,
    };
    let mut collapsed = vec![false; dg.nodes.len()];
    for &child in children {
        let child_members = &dg.clusters[child].members;
        rank_scope(dg, Some(child), child_members, sets, rank)?;
        collapse_cluster(child_members, sets, rank);
        for &m in child_members {
            collapsed[m] = true;
        }
    }

    let mut in_scope = vec![false; dg.nodes.len()];
    for &m in members {
        in_scope[m] = true;
    }
    let mut min_leader: Option<(usize, bool)> = None;
    let mut max_leader: Option<(usize, bool)> = None;
    for set in dg.rank_sets.iter().filter(|s| s.scope == scope) {
        let nodes: Vec<usize> = set
            .nodes
            .iter()
            .copied()
            .filter(|n| in_scope[*n] && !collapsed[*n])
            .collect();
        let Some(&first) = nodes.first() else {
            continue;
        };
        for &v in &nodes[1..] {
            sets.union_same(first, v);
        }
        match set.kind {
            RankKind::Same => {}
            RankKind::Min | RankKind::Source => {
                let strict = set.kind == RankKind::Source;
                min_leader = Some(match min_leader {
                    Some((m, s)) => {
                        sets.union_same(m, first);
                        (m, s || strict)
                    }
                    None => (first, strict),
                });
            }
            RankKind::Max | RankKind::Sink => {
                let strict = set.kind == RankKind::Sink;
                max_leader = Some(match max_leader {
                    Some((m, s)) => {
                        sets.union_same(m, first);
                        (m, s || strict)
                    }
                    None => (first, strict),
                });
            }
        }
    }

    let mut g: RankGraph = FastGraph::with_capacity(members.len(), members.len());
    let mut index: FxHashMap<usize, FNode> = FxHashMap::default();
    for &m in members {
        let (leader, _) = sets.find(m);
        index
            .entry(leader)
            .or_insert_with(|| g.add_node(NodeKind::Normal, Some(leader)));
    }

    for e in &dg.edges {
        if !e.constraint || !in_scope[e.tail] || !in_scope[e.head] {
            continue;
        }
        let (lt, ot) = sets.find(e.tail);
        let (lh, oh) = sets.find(e.head);
        if lt == lh {
            continue;
        }
        let (t, h) = (index[&lt], index[&lh]);
        let minlen = rank_minlen(dg, e.minlen);
        if collapsed[e.tail] || collapsed[e.head] {
            interclust(&mut g, t, h, minlen + ot - oh, e.weight);
        } else {
            add_or_merge(&mut g, t, h, e.weight, minlen);
        }
    }

    let min_node = min_leader.map(|(m, strict)| (index[&sets.find(m).0], strict));
    let max_node = max_leader.map(|(m, strict)| (index[&sets.find(m).0], strict));
    reverse_into_extremes(&mut g, min_node.map(|m| m.0), max_node.map(|m| m.0));
    acyclic::run(&mut g);
    add_extreme_edges(&mut g, min_node, max_node);

    let balance = if children.is_empty() {
        Balance::TopBottom(dg.cfg.tb_balance)
    } else {
        Balance::Normalize
    };
    rank_components(&mut g, &dg.cfg, balance)?;

    for &m in members {
        let (leader, off) = sets.find(m);
        rank[m] = g.rank(index[&leader]) + off;
    }
    Ok(())
}

/// Folds a ranked cluster into one leader; the first member with the smallest rank leads.
fn collapse_cluster(members: &[usize], sets: &mut OffsetSets, rank: &[i32]) {
    let Some(&leader) = members.iter().min_by_key(|m| (rank[**m], **m)) else {
        return;
    };
    for &m in members {
        if m != leader {
            sets.attach(m, leader, rank[m] - rank[leader]);
        }
    }
    sets.attach(leader, leader, 0);
}

/// `tail -> head` with `rank(head) - rank(tail) >= offset`, expressed through a slack node so
/// that it can be violated at a cost.
fn interclust(g: &mut RankGraph, t: FNode, h: FNode, offset: i32, weight: i32) {
    let (t_len, h_len) = if offset > 0 { (0, offset) } else { (-offset, 0) };
    let v = g.add_node(NodeKind::Slack, None);
    g.add_edge(v, t, CL_BACK.saturating_mul(weight), t_len, ());
    g.add_edge(v, h, weight, h_len, ());
}

pub(crate) fn add_or_merge(g: &mut RankGraph, t: FNode, h: FNode, weight: i32, minlen: i32) {
    match g.find_edge(t, h) {
        Some(e) => {
            let edge = g.edge_mut(e);
            edge.weight = edge.weight.saturating_add(weight);
            edge.minlen = edge.minlen.max(minlen);
        }
        None => {
            g.add_edge(t, h, weight, minlen, ());
        }
    }
}

/// Edges entering the min set or leaving the max set are turned around.
fn reverse_into_extremes(g: &mut RankGraph, min: Option<FNode>, max: Option<FNode>) {
    if let Some(m) = min {
        while let Some(&e) = g.in_edges(m).first() {
            flip(g, e);
        }
    }
    if let Some(m) = max {
        while let Some(&e) = g.out_edges(m).first() {
            flip(g, e);
        }
    }
}

fn flip(g: &mut RankGraph, e: sirenia_graph::FEdge) {
    let (t, h) = (g.tail(e), g.head(e));
    let existing = g.find_edge(h, t);
    g.reverse_edge(e);
    if let Some(keep) = existing {
        g.merge_edges(keep, e);
    }
}

/// Ties every source to the min set and every sink to the max set.
fn add_extreme_edges(g: &mut RankGraph, min: Option<(FNode, bool)>, max: Option<(FNode, bool)>) {
    let nodes: Vec<FNode> = g.nodes().collect();
    for n in nodes {
        if g.kind(n) == NodeKind::Slack {
            continue;
        }
        if let Some((m, strict)) = max
            && n != m
            && g.out_edges(n).is_empty()
        {
            g.add_edge(n, m, 0, i32::from(strict), ());
        }
        if let Some((m, strict)) = min
            && n != m
            && g.in_edges(n).is_empty()
        {
            g.add_edge(m, n, 0, i32::from(strict), ());
        }
    }
}

/// Runs network simplex on each weakly connected component separately.
pub(crate) fn rank_components(g: &mut RankGraph, cfg: &DotConfig, balance: Balance) -> Result<()> {
    let comps = alg::components(g);
    if comps.len() == 1 {
        let opts = NsOptions {
            balance,
            max_iter: DotConfig::ns_limit(cfg.nslimit1, g.node_count()),
            search_size: cfg.searchsize,
        };
        network_simplex::rank(g, &opts)?;
        return Ok(());
    }
    for comp in comps {
        let mut local: FastGraph<(), ()> = FastGraph::with_capacity(comp.len(), comp.len());
        let mut map: FxHashMap<FNode, FNode> = FxHashMap::default();
        for &v in &comp {
            map.insert(v, local.add_node(g.kind(v), ()));
        }
        for &v in &comp {
            for &e in g.out_edges(v) {
                let edge = g.edge(e);
                local.add_edge(map[&v], map[&edge.head], edge.weight, edge.minlen, ());
            }
        }
        let opts = NsOptions {
            balance,
            max_iter: DotConfig::ns_limit(cfg.nslimit1, comp.len()),
            search_size: cfg.searchsize,
        };
        network_simplex::rank(&mut local, &opts)?;
        for &v in &comp {
            g.node_mut(v).rank = local.rank(map[&v]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_compose_through_unions() {
        let mut s = OffsetSets::new(4);
        s.attach(1, 0, 2);
        s.attach(2, 1, 3);
        assert_eq!(s.find(2), (0, 5));
        assert!(s.union_same(3, 2));
        let (l, o) = s.find(3);
        assert_eq!(l, 0);
        assert_eq!(o, 5);
        assert!(!s.union_same(1, 3));
    }
}
