//! Scopes, their units, and how unit orderings map back onto the global rank arrays.

use crate::init::DotGraph;
use crate::model::Layered;
use rustc_hash::FxHashMap;
use sirenia_graph::FNode;

/// What a node amounts to inside a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Item {
    Node,
    /// Member of this child cluster of the scope.
    Block(usize),
}

/// Classifies a node whose innermost cluster is `cl` relative to `scope`; `None` if outside.
pub(super) fn item_in(dg: &DotGraph, cl: Option<usize>, scope: Option<usize>) -> Option<Item> {
    let mut c = cl;
    let mut below = None;
    loop {
        if c == scope {
            return Some(match below {
                None => Item::Node,
                Some(k) => Item::Block(k),
            });
        }
        let k = c?;
        below = Some(k);
        c = dg.clusters[k].parent;
    }
}

#[derive(Debug, Clone)]
pub(super) struct Unit {
    /// Left to right.
    pub nodes: Vec<FNode>,
    pub block: Option<usize>,
    pub rank: usize,
    pub mval: f64,
}

#[derive(Debug, Clone)]
pub(super) struct Scope {
    root: bool,
    pub node_level: bool,
    pub units: Vec<Unit>,
    /// Scope nodes by ascending index.
    pub nodes: Vec<FNode>,
    pub min_rank: usize,
    pub max_rank: usize,
    /// First array position of the scope's slice, per rank offset.
    start: Vec<usize>,
    /// Unit ids left to right, per rank offset.
    pub order: Vec<Vec<usize>>,
    unit_of: FxHashMap<FNode, usize>,
}

impl Scope {
    /// One scope per connected component of the root graph, laid side by side.
    pub(super) fn root_components(dg: &DotGraph, lg: &Layered) -> Vec<Scope> {
        let n = lg.g.node_count();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(p: &mut [usize], mut v: usize) -> usize {
            while p[v] != v {
                p[v] = p[p[v]];
                v = p[v];
            }
            v
        }
        let union = |p: &mut Vec<usize>, a: usize, b: usize| {
            let (ra, rb) = (find(p, a), find(p, b));
            if ra != rb {
                p[ra.max(rb)] = ra.min(rb);
            }
        };
        for e in lg.g.edges() {
            union(&mut parent, lg.g.tail(e).0, lg.g.head(e).0);
        }
        for f in lg.flat.iter().filter(|f| f.alive) {
            union(&mut parent, f.tail.0, f.head.0);
        }
        let mut block_rep: FxHashMap<usize, usize> = FxHashMap::default();
        for v in lg.g.nodes() {
            if let Some(Item::Block(k)) = item_in(dg, lg.g.node(v).data.cluster, None) {
                let rep = *block_rep.entry(k).or_insert(v.0);
                union(&mut parent, rep, v.0);
            }
        }

        let mut comp_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut members: Vec<Vec<FNode>> = Vec::new();
        for v in 0..n {
            let root = find(&mut parent, v);
            let ix = *comp_of_root.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[ix].push(FNode(v));
        }

        let mut width = vec![0usize; lg.ranks.len()];
        members
            .into_iter()
            .map(|nodes| {
                let sc = Scope::from_nodes(dg, lg, None, nodes, true, |r| width[r]);
                for (ri, units) in sc.order.iter().enumerate() {
                    let placed: usize = units.iter().map(|u| sc.units[*u].nodes.len()).sum();
                    width[sc.min_rank + ri] += placed;
                }
                sc
            })
            .collect()
    }

    /// The slice of cluster `c`, already contiguous on every rank it spans.
    pub(super) fn cluster(dg: &DotGraph, lg: &Layered, c: usize) -> Scope {
        let nodes: Vec<FNode> = lg
            .g
            .nodes()
            .filter(|v| item_in(dg, lg.g.node(*v).data.cluster, Some(c)).is_some())
            .collect();
        let mut first: FxHashMap<usize, usize> = FxHashMap::default();
        for &v in &nodes {
            let node = lg.g.node(v);
            let slot = first.entry(node.rank as usize).or_insert(usize::MAX);
            *slot = (*slot).min(node.order as usize);
        }
        Scope::from_nodes(dg, lg, Some(c), nodes, false, |r| {
            first.get(&r).copied().unwrap_or(0)
        })
    }

    /// Every node of the graph as its own unit.
    pub(super) fn node_level(lg: &Layered) -> Scope {
        let mut units = Vec::with_capacity(lg.g.node_count());
        let mut unit_of = FxHashMap::default();
        let mut order = Vec::with_capacity(lg.ranks.len());
        for (r, rank) in lg.ranks.iter().enumerate() {
            let mut ids = Vec::with_capacity(rank.len());
            for &v in rank {
                unit_of.insert(v, units.len());
                ids.push(units.len());
                units.push(Unit {
                    nodes: vec![v],
                    block: None,
                    rank: r,
                    mval: -1.0,
                });
            }
            order.push(ids);
        }
        Scope {
            root: false,
            node_level: true,
            units,
            nodes: lg.g.nodes().collect(),
            min_rank: 0,
            max_rank: lg.ranks.len().saturating_sub(1),
            start: vec![0; lg.ranks.len()],
            order,
            unit_of,
        }
    }

    fn from_nodes(
        dg: &DotGraph,
        lg: &Layered,
        cluster: Option<usize>,
        mut nodes: Vec<FNode>,
        root: bool,
        mut start_of: impl FnMut(usize) -> usize,
    ) -> Scope {
        nodes.sort_unstable();
        let min_rank = nodes.iter().map(|v| lg.g.rank(*v)).min().unwrap_or(0).max(0) as usize;
        let max_rank = nodes
            .iter()
            .map(|v| lg.g.rank(*v))
            .max()
            .unwrap_or(0)
            .max(0) as usize;
        let mut by_position = nodes.clone();
        by_position.sort_by_key(|v| (lg.g.rank(*v), lg.order(*v)));

        let mut units: Vec<Unit> = Vec::new();
        let mut unit_of = FxHashMap::default();
        let mut block_unit: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut order = vec![Vec::new(); max_rank - min_rank + 1];
        for v in by_position {
            let r = lg.g.rank(v) as usize;
            let item = item_in(dg, lg.g.node(v).data.cluster, cluster).unwrap_or(Item::Node);
            let id = match item {
                Item::Node => None,
                Item::Block(k) => block_unit.get(&(k, r)).copied(),
            };
            let id = match id {
                Some(id) => {
                    units[id].nodes.push(v);
                    id
                }
                None => {
                    let id = units.len();
                    let block = match item {
                        Item::Node => None,
                        Item::Block(k) => {
                            block_unit.insert((k, r), id);
                            Some(k)
                        }
                    };
                    units.push(Unit {
                        nodes: vec![v],
                        block,
                        rank: r,
                        mval: -1.0,
                    });
                    order[r - min_rank].push(id);
                    id
                }
            };
            unit_of.insert(v, id);
        }
        let start = (min_rank..=max_rank).map(&mut start_of).collect();
        Scope {
            root,
            node_level: false,
            units,
            nodes,
            min_rank,
            max_rank,
            start,
            order,
            unit_of,
        }
    }

    pub(super) fn is_root_component(&self) -> bool {
        self.root
    }

    pub(super) fn unit(&self, v: FNode) -> Option<usize> {
        self.unit_of.get(&v).copied()
    }

    /// `v` is a plain node of this scope (not inside a child block).
    pub(super) fn is_node_unit(&self, v: FNode) -> bool {
        self.unit(v).is_some_and(|u| self.units[u].block.is_none())
    }

    pub(super) fn same_block(&self, a: FNode, b: FNode) -> bool {
        match (self.unit(a), self.unit(b)) {
            (Some(ua), Some(ub)) => {
                let ba = self.units[ua].block;
                ba.is_some() && ba == self.units[ub].block
            }
            _ => false,
        }
    }

    pub(super) fn rank_count(&self) -> usize {
        self.order.len()
    }

    /// Copies the unit order of rank offset `ri` into the global rank array.
    pub(super) fn write_back(&self, lg: &mut Layered, ri: usize) {
        let r = self.min_rank + ri;
        let mut pos = self.start[ri];
        for &u in &self.order[ri] {
            for &v in &self.units[u].nodes {
                lg.ranks[r][pos] = v;
                lg.g.node_mut(v).order = pos as i32;
                pos += 1;
            }
        }
    }

    pub(super) fn write_back_all(&self, lg: &mut Layered) {
        for ri in 0..self.order.len() {
            self.write_back(lg, ri);
        }
    }

    pub(super) fn restore(&mut self, lg: &mut Layered, saved: &[Vec<usize>]) {
        self.order = saved.to_vec();
        self.write_back_all(lg);
    }

    /// Exchanges the units at positions `i` and `i + 1` of rank offset `ri`.
    pub(super) fn swap_adjacent(&mut self, lg: &mut Layered, ri: usize, i: usize) {
        let r = self.min_rank + ri;
        let first = self.units[self.order[ri][i]].nodes[0];
        let mut pos = lg.g.node(first).order as usize;
        self.order[ri].swap(i, i + 1);
        for k in [i, i + 1] {
            for &v in &self.units[self.order[ri][k]].nodes {
                lg.ranks[r][pos] = v;
                lg.g.node_mut(v).order = pos as i32;
                pos += 1;
            }
        }
    }
}
