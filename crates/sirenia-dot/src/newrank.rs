//! Single-pass ranking (`newrank=true`).
//!
//! Every cluster gets a top and a bottom slack node bracketing its members, so cluster rank
//! ranges stay contiguous while edges and `rank=same` sets may cross cluster boundaries freely.

use crate::acyclic;
use crate::init::{DotGraph, RankKind};
use crate::network_simplex::Balance;
use crate::rank::{OffsetSets, RankGraph, add_or_merge, rank_components, rank_minlen};
use rustc_hash::FxHashMap;
use sirenia_graph::{FNode, FastGraph, NodeKind, Result};

pub(crate) fn rank(dg: &DotGraph) -> Result<Vec<i32>> {
    let n = dg.nodes.len();
    let mut sets = OffsetSets::new(n);
    for set in &dg.rank_sets {
        for w in set.nodes.windows(2) {
            sets.union_same(w[0], w[1]);
        }
    }

    let mut g: RankGraph = FastGraph::with_capacity(n + 2 * dg.clusters.len(), dg.edges.len());
    let mut index: FxHashMap<usize, FNode> = FxHashMap::default();
    for v in 0..n {
        let (leader, _) = sets.find(v);
        index
            .entry(leader)
            .or_insert_with(|| g.add_node(NodeKind::Normal, Some(leader)));
    }
    let node_of = |sets: &mut OffsetSets, v: usize| index[&sets.find(v).0];

    let brackets: Vec<(FNode, FNode)> = dg
        .clusters
        .iter()
        .map(|_| {
            let top = g.add_node(NodeKind::Slack, None);
            let bot = g.add_node(NodeKind::Slack, None);
            (top, bot)
        })
        .collect();
    for (ix, c) in dg.clusters.iter().enumerate() {
        let (top, bot) = brackets[ix];
        g.add_edge(top, bot, 0, 0, ());
        if let Some(p) = c.parent {
            let (ptop, pbot) = brackets[p];
            g.add_edge(ptop, top, 0, 0, ());
            g.add_edge(bot, pbot, 0, 0, ());
        }
    }
    for v in 0..n {
        let Some(c) = dg.owner[v] else {
            continue;
        };
        let (top, bot) = brackets[c];
        let x = node_of(&mut sets, v);
        add_or_merge(&mut g, top, x, 0, 0);
        add_or_merge(&mut g, x, bot, 0, 0);
    }

    for e in &dg.edges {
        if !e.constraint {
            continue;
        }
        let t = node_of(&mut sets, e.tail);
        let h = node_of(&mut sets, e.head);
        if t == h {
            continue;
        }
        add_or_merge(&mut g, t, h, e.weight, rank_minlen(dg, e.minlen));
    }

    // Extremes are relative to the enclosing cluster (or the whole graph).
    for set in &dg.rank_sets {
        let Some(&first) = set.nodes.first() else {
            continue;
        };
        let x = node_of(&mut sets, first);
        let scope_nodes: Vec<usize> = match set.scope {
            Some(c) => dg.clusters[c].members.clone(),
            None => (0..n).collect(),
        };
        let strict = i32::from(matches!(set.kind, RankKind::Source | RankKind::Sink));
        for v in scope_nodes {
            let y = node_of(&mut sets, v);
            if y == x {
                continue;
            }
            match set.kind {
                RankKind::Same => break,
                RankKind::Min | RankKind::Source => add_or_merge(&mut g, x, y, 0, strict),
                RankKind::Max | RankKind::Sink => add_or_merge(&mut g, y, x, 0, strict),
            }
        }
    }

    acyclic::run(&mut g);
    rank_components(&mut g, &dg.cfg, Balance::TopBottom(dg.cfg.tb_balance))?;

    let mut rank = vec![0; n];
    for (v, r) in rank.iter_mut().enumerate() {
        *r = g.rank(node_of(&mut sets, v));
    }
    let min = rank.iter().copied().min().unwrap_or(0);
    for r in &mut rank {
        *r -= min;
    }
    Ok(rank)
}
