//! Network simplex over a [`FastGraph`].
//!
//! Minimizes `sum(weight * (rank(head) - rank(tail)))` subject to
//! `rank(head) - rank(tail) >= minlen` for every live edge. The same solver ranks nodes and,
//! on an auxiliary graph, assigns x coordinates.
//!
//! The graph must be connected and acyclic. Ranks are read from and written to
//! `FastNode::rank`; an already feasible assignment is used as the starting point.

use sirenia_graph::{Error, FEdge, FNode, FastGraph, NodeKind, Result};
use std::collections::VecDeque;

/// Default window of tree edges scanned by `leave_edge`.
pub const SEARCHSIZE: usize = 30;

/// `TBbalance`: where balanced sources/sinks are pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TbBalance {
    #[default]
    None,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Balance {
    /// Normalize so the minimum rank of a normal node is 0.
    #[default]
    Normalize,
    /// Move nodes with equal in/out weight to the least-populated feasible rank.
    TopBottom(TbBalance),
    /// Center subtrees hanging on zero cut-value tree edges. Ranks are left unnormalized.
    LeftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsOptions {
    pub balance: Balance,
    pub max_iter: usize,
    pub search_size: usize,
}

impl Default for NsOptions {
    fn default() -> Self {
        Self {
            balance: Balance::Normalize,
            max_iter: usize::MAX,
            search_size: SEARCHSIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NsStats {
    pub iterations: usize,
    pub tree_edges: usize,
}

/// Ranks every node of `g`.
pub fn rank<N, E>(g: &mut FastGraph<N, E>, opts: &NsOptions) -> Result<NsStats> {
    if g.node_count() == 0 {
        return Ok(NsStats::default());
    }
    let mut ns = Simplex::new(g, opts.search_size.max(1));
    if !ns.is_feasible() {
        ns.init_rank()?;
    }
    if opts.max_iter == 0 {
        ns.normalize();
        return Ok(NsStats::default());
    }
    ns.feasible_tree()?;

    let mut iterations = 0usize;
    while let Some(e) = ns.leave_edge() {
        let Some(f) = ns.enter_edge(e) else {
            return Err(Error::NotConnected);
        };
        ns.update(e, f)?;
        iterations += 1;
        if iterations >= opts.max_iter {
            break;
        }
    }

    match opts.balance {
        Balance::Normalize => {
            ns.normalize();
        }
        Balance::TopBottom(adj) => ns.tb_balance(adj),
        Balance::LeftRight => ns.lr_balance(),
    }
    let stats = NsStats {
        iterations,
        tree_edges: ns.tree_edges.len(),
    };
    tracing::debug!(
        nodes = ns.g.node_count(),
        edges = ns.g.edge_count(),
        iterations,
        "network simplex"
    );
    Ok(stats)
}

#[derive(Debug, Clone, Copy)]
struct SearchFrame {
    v: FNode,
    in_i: usize,
    out_i: usize,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct RangeFrame {
    v: FNode,
    par: Option<FEdge>,
    lim: i32,
    out_i: usize,
    in_i: usize,
}

#[derive(Debug, Clone)]
struct Subtree {
    rep: FNode,
    size: usize,
    heap_index: Option<usize>,
    par: usize,
}

struct Simplex<'g, N, E> {
    g: &'g mut FastGraph<N, E>,
    search_size: usize,
    s_i: usize,
    tree_edges: Vec<FEdge>,
    /// Per edge: position in `tree_edges`, `-1` when not a tree edge.
    tree_index: Vec<i32>,
    cutvalue: Vec<i64>,
    tree_in: Vec<Vec<FEdge>>,
    tree_out: Vec<Vec<FEdge>>,
    par: Vec<Option<FEdge>>,
    low: Vec<i32>,
    lim: Vec<i32>,
}

impl<'g, N, E> Simplex<'g, N, E> {
    fn new(g: &'g mut FastGraph<N, E>, search_size: usize) -> Self {
        let n = g.node_count();
        let m = g.edge_capacity();
        Self {
            g,
            search_size,
            s_i: 0,
            tree_edges: Vec::with_capacity(n),
            tree_index: vec![-1; m],
            cutvalue: vec![0; m],
            tree_in: vec![Vec::new(); n],
            tree_out: vec![Vec::new(); n],
            par: vec![None; n],
            low: vec![0; n],
            lim: vec![0; n],
        }
    }

    fn is_tree(&self, e: FEdge) -> bool {
        self.tree_index[e.0] >= 0
    }

    fn slack(&self, e: FEdge) -> i32 {
        let edge = self.g.edge(e);
        self.g.rank(edge.head) - self.g.rank(edge.tail) - edge.minlen
    }

    /// `low(v) <= lim(w) <= lim(v)`: `w` lies in the subtree rooted at `v`.
    fn in_subtree(&self, v: FNode, w: FNode) -> bool {
        self.low[v.0] <= self.lim[w.0] && self.lim[w.0] <= self.lim[v.0]
    }

    fn is_feasible(&self) -> bool {
        self.g.edges().all(|e| self.slack(e) >= 0)
    }

    fn init_rank(&mut self) -> Result<()> {
        let mut priority: Vec<usize> = self.g.nodes().map(|n| self.g.in_edges(n).len()).collect();
        let mut q: VecDeque<FNode> = self.g.nodes().filter(|n| priority[n.0] == 0).collect();
        let mut seen = 0usize;
        while let Some(v) = q.pop_front() {
            seen += 1;
            let mut r = 0;
            for e in self.g.in_edges(v) {
                let edge = self.g.edge(*e);
                r = r.max(self.g.rank(edge.tail) + edge.minlen);
            }
            self.g.node_mut(v).rank = r;
            for ix in 0..self.g.out_edges(v).len() {
                let h = self.g.head(self.g.out_edges(v)[ix]);
                priority[h.0] -= 1;
                if priority[h.0] == 0 {
                    q.push_back(h);
                }
            }
        }
        if seen != self.g.node_count() {
            let stuck = self
                .g
                .nodes()
                .find(|n| priority[n.0] > 0)
                .map(|n| n.0)
                .unwrap_or_default();
            return Err(Error::CycleDetected {
                node: format!("#{stuck}"),
            });
        }
        Ok(())
    }

    fn add_tree_edge(&mut self, e: FEdge) -> Result<()> {
        if self.is_tree(e) {
            return Err(Error::InternalConsistency(format!(
                "edge #{} is already a tree edge",
                e.0
            )));
        }
        self.tree_index[e.0] = self.tree_edges.len() as i32;
        self.tree_edges.push(e);
        let (t, h) = (self.g.tail(e), self.g.head(e));
        self.tree_out[t.0].push(e);
        self.tree_in[h.0].push(e);
        Ok(())
    }

    // ---- feasible tree --------------------------------------------------------------------

    /// Grows a tight subtree from `v` over zero-slack edges; returns its size.
    fn tight_subtree_search(&mut self, v: FNode, st: usize, owner: &mut [Option<usize>]) -> Result<usize> {
        owner[v.0] = Some(st);
        let mut todo = vec![SearchFrame {
            v,
            in_i: 0,
            out_i: 0,
            size: 1,
        }];
        let mut total = 1;
        while let Some(top) = todo.last().copied() {
            let mut next: Option<(FEdge, FNode)> = None;
            let mut in_i = top.in_i;
            while in_i < self.g.in_edges(top.v).len() {
                let e = self.g.in_edges(top.v)[in_i];
                in_i += 1;
                let t = self.g.tail(e);
                if !self.is_tree(e) && owner[t.0].is_none() && self.slack(e) == 0 {
                    next = Some((e, t));
                    break;
                }
            }
            let mut out_i = top.out_i;
            if next.is_none() {
                while out_i < self.g.out_edges(top.v).len() {
                    let e = self.g.out_edges(top.v)[out_i];
                    out_i += 1;
                    let h = self.g.head(e);
                    if !self.is_tree(e) && owner[h.0].is_none() && self.slack(e) == 0 {
                        next = Some((e, h));
                        break;
                    }
                }
            }
            if let Some(frame) = todo.last_mut() {
                frame.in_i = in_i;
                frame.out_i = out_i;
            }
            match next {
                Some((e, w)) => {
                    self.add_tree_edge(e)?;
                    owner[w.0] = Some(st);
                    todo.push(SearchFrame {
                        v: w,
                        in_i: 0,
                        out_i: 0,
                        size: 1,
                    });
                }
                None => {
                    let done = todo.pop().map(|f| f.size).unwrap_or(0);
                    match todo.last_mut() {
                        Some(parent) => parent.size += done,
                        None => total = done,
                    }
                }
            }
        }
        Ok(total)
    }

    fn feasible_tree(&mut self) -> Result<()> {
        let n = self.g.node_count();
        let mut owner: Vec<Option<usize>> = vec![None; n];
        let mut trees: Vec<Subtree> = Vec::new();
        for v in 0..n {
            if owner[v].is_some() {
                continue;
            }
            let st = trees.len();
            let size = self.tight_subtree_search(FNode(v), st, &mut owner)?;
            trees.push(Subtree {
                rep: FNode(v),
                size,
                heap_index: None,
                par: st,
            });
        }

        let mut heap = SubtreeHeap::build(&mut trees);
        while heap.len() > 1 {
            let Some(t0) = heap.extract_min(&mut trees) else {
                break;
            };
            let Some(e) = self.inter_tree_edge(&trees, &owner, t0) else {
                return Err(Error::NotConnected);
            };
            let merged = self.merge_trees(&mut trees, &owner, e)?;
            if let Some(ix) = trees[merged].heap_index {
                heap.heapify(&mut trees, ix);
            }
        }
        if self.tree_edges.len() + 1 != n {
            return Err(Error::InternalConsistency(format!(
                "spanning tree has {} edges for {} nodes",
                self.tree_edges.len(),
                n
            )));
        }
        self.init_cutvalues();
        Ok(())
    }

    fn inter_tree_edge(&self, trees: &[Subtree], owner: &[Option<usize>], st: usize) -> Option<FEdge> {
        let ts = find_set(trees, st);
        let mut best: Option<(FEdge, i32)> = None;
        let mut stack: Vec<(FNode, Option<FNode>)> = vec![(trees[st].rep, None)];
        while let Some((v, from)) = stack.pop() {
            if matches!(best, Some((_, 0))) {
                break;
            }
            for e in self.g.out_edges(v) {
                let h = self.g.head(*e);
                if self.is_tree(*e) {
                    if Some(h) != from {
                        stack.push((h, Some(v)));
                    }
                } else if owner[h.0].map(|s| find_set(trees, s)) != Some(ts) {
                    let s = self.slack(*e);
                    if best.is_none_or(|(_, b)| s < b) {
                        best = Some((*e, s));
                    }
                }
            }
            for e in self.g.in_edges(v) {
                let t = self.g.tail(*e);
                if self.is_tree(*e) {
                    if Some(t) != from {
                        stack.push((t, Some(v)));
                    }
                } else if owner[t.0].map(|s| find_set(trees, s)) != Some(ts) {
                    let s = self.slack(*e);
                    if best.is_none_or(|(_, b)| s < b) {
                        best = Some((*e, s));
                    }
                }
            }
        }
        best.map(|(e, _)| e)
    }

    /// Shifts every node of the tree containing `v` by `delta`.
    fn tree_adjust(&mut self, v: FNode, delta: i32) {
        let mut stack: Vec<(FNode, Option<FNode>)> = vec![(v, None)];
        while let Some((u, from)) = stack.pop() {
            self.g.node_mut(u).rank += delta;
            for e in &self.tree_in[u.0] {
                let w = self.g.tail(*e);
                if Some(w) != from {
                    stack.push((w, Some(u)));
                }
            }
            for e in &self.tree_out[u.0] {
                let w = self.g.head(*e);
                if Some(w) != from {
                    stack.push((w, Some(u)));
                }
            }
        }
    }

    fn merge_trees(&mut self, trees: &mut [Subtree], owner: &[Option<usize>], e: FEdge) -> Result<usize> {
        let (t, h) = (self.g.tail(e), self.g.head(e));
        let missing = || Error::InternalConsistency("node outside every tight subtree".to_string());
        let t0 = find_set(trees, owner[t.0].ok_or_else(missing)?);
        let t1 = find_set(trees, owner[h.0].ok_or_else(missing)?);
        if trees[t0].heap_index.is_none() {
            let delta = self.slack(e);
            if delta != 0 {
                self.tree_adjust(trees[t0].rep, delta);
            }
        } else {
            let delta = -self.slack(e);
            if delta != 0 {
                self.tree_adjust(trees[t1].rep, delta);
            }
        }
        self.add_tree_edge(e)?;
        Ok(union_sets(trees, t0, t1))
    }

    // ---- cut values -----------------------------------------------------------------------

    fn init_cutvalues(&mut self) {
        let root = FNode(0);
        self.dfs_range(root, None, 1);
        // Postorder over tree edges so each cut value sees its subtree already done.
        let mut order: Vec<(FNode, Option<FEdge>)> = Vec::with_capacity(self.g.node_count());
        let mut stack: Vec<(FNode, Option<FEdge>)> = vec![(root, None)];
        while let Some((v, par)) = stack.pop() {
            order.push((v, par));
            for e in &self.tree_out[v.0] {
                if Some(*e) != par {
                    stack.push((self.g.head(*e), Some(*e)));
                }
            }
            for e in &self.tree_in[v.0] {
                if Some(*e) != par {
                    stack.push((self.g.tail(*e), Some(*e)));
                }
            }
        }
        for (_, par) in order.into_iter().rev() {
            if let Some(f) = par {
                self.x_cutval(f);
            }
        }
    }

    /// Assigns `par`, `low` and postorder `lim` over the subtree at `v`, numbering from `low`.
    fn dfs_range(&mut self, v: FNode, par: Option<FEdge>, low: i32) {
        self.par[v.0] = par;
        self.low[v.0] = low;
        let mut todo = vec![RangeFrame {
            v,
            par,
            lim: low,
            out_i: 0,
            in_i: 0,
        }];
        while let Some(top) = todo.last().copied() {
            let mut child: Option<(FNode, FEdge)> = None;
            let mut out_i = top.out_i;
            while out_i < self.tree_out[top.v.0].len() {
                let e = self.tree_out[top.v.0][out_i];
                out_i += 1;
                if Some(e) != top.par {
                    child = Some((self.g.head(e), e));
                    break;
                }
            }
            let mut in_i = top.in_i;
            if child.is_none() {
                while in_i < self.tree_in[top.v.0].len() {
                    let e = self.tree_in[top.v.0][in_i];
                    in_i += 1;
                    if Some(e) != top.par {
                        child = Some((self.g.tail(e), e));
                        break;
                    }
                }
            }
            if let Some(frame) = todo.last_mut() {
                frame.out_i = out_i;
                frame.in_i = in_i;
            }
            match child {
                Some((w, e)) => {
                    self.par[w.0] = Some(e);
                    self.low[w.0] = top.lim;
                    todo.push(RangeFrame {
                        v: w,
                        par: Some(e),
                        lim: top.lim,
                        out_i: 0,
                        in_i: 0,
                    });
                }
                None => {
                    self.lim[top.v.0] = top.lim;
                    todo.pop();
                    if let Some(parent) = todo.last_mut() {
                        parent.lim = top.lim + 1;
                    }
                }
            }
        }
    }

    fn x_cutval(&mut self, f: FEdge) {
        let (v, dir) = if self.par[self.g.tail(f).0] == Some(f) {
            (self.g.tail(f), 1)
        } else {
            (self.g.head(f), -1)
        };
        let mut sum: i64 = 0;
        for e in self.g.out_edges(v).iter().chain(self.g.in_edges(v)) {
            sum = sum.saturating_add(self.x_val(*e, v, dir));
        }
        self.cutvalue[f.0] = sum;
    }

    fn x_val(&self, e: FEdge, v: FNode, dir: i32) -> i64 {
        let edge = self.g.edge(e);
        let other = if edge.tail == v { edge.head } else { edge.tail };
        let weight = i64::from(edge.weight);
        let outside = !self.in_subtree(v, other);
        let mut rv = if outside {
            weight
        } else {
            let tree = if self.is_tree(e) { self.cutvalue[e.0] } else { 0 };
            tree - weight
        };
        let mut d = if dir > 0 {
            if edge.head == v { 1 } else { -1 }
        } else if edge.tail == v {
            1
        } else {
            -1
        };
        if outside {
            d = -d;
        }
        if d < 0 {
            rv = -rv;
        }
        rv
    }

    // ---- pivoting -------------------------------------------------------------------------

    /// Most negative cut value among the next `search_size` negative tree edges, scanning from
    /// where the previous call stopped.
    fn leave_edge(&mut self) -> Option<FEdge> {
        let mut rv: Option<FEdge> = None;
        let mut cnt = 0usize;
        let start = self.s_i;
        while self.s_i < self.tree_edges.len() {
            if self.consider_leaving(&mut rv, &mut cnt) {
                return rv;
            }
            self.s_i += 1;
        }
        if start > 0 {
            self.s_i = 0;
            while self.s_i < start {
                if self.consider_leaving(&mut rv, &mut cnt) {
                    return rv;
                }
                self.s_i += 1;
            }
        }
        rv
    }

    fn consider_leaving(&self, rv: &mut Option<FEdge>, cnt: &mut usize) -> bool {
        let f = self.tree_edges[self.s_i];
        if self.cutvalue[f.0] >= 0 {
            return false;
        }
        if rv.is_none_or(|r| self.cutvalue[r.0] > self.cutvalue[f.0]) {
            *rv = Some(f);
        }
        *cnt += 1;
        *cnt >= self.search_size
    }

    /// Minimum-slack non-tree edge reconnecting the two halves of the cut at tree edge `e`.
    fn enter_edge(&self, e: FEdge) -> Option<FEdge> {
        let (t, h) = (self.g.tail(e), self.g.head(e));
        let (v, outsearch) = if self.lim[t.0] < self.lim[h.0] {
            (t, false)
        } else {
            (h, true)
        };
        let (low, lim) = (self.low[v.0], self.lim[v.0]);
        let mut best: Option<(FEdge, i32)> = None;

        // Frames replay the recursive search order: edge list first, then the other tree list.
        let mut todo: Vec<(FNode, usize, usize)> = vec![(v, 0, 0)];
        while let Some(&(u, mut i, mut j)) = todo.last() {
            let (edges, tree_other) = if outsearch {
                (self.g.out_edges(u), &self.tree_in[u.0])
            } else {
                (self.g.in_edges(u), &self.tree_out[u.0])
            };
            let mut descend: Option<FNode> = None;
            while i < edges.len() {
                let f = edges[i];
                i += 1;
                let far = if outsearch { self.g.head(f) } else { self.g.tail(f) };
                if !self.is_tree(f) {
                    let inside = low <= self.lim[far.0] && self.lim[far.0] <= lim;
                    if !inside {
                        let s = self.slack(f);
                        if best.is_none_or(|(_, b)| s < b) {
                            best = Some((f, s));
                        }
                    }
                } else if self.lim[far.0] < self.lim[u.0] {
                    descend = Some(far);
                    break;
                }
            }
            if descend.is_none() {
                while j < tree_other.len() && best.is_none_or(|(_, b)| b > 0) {
                    let f = tree_other[j];
                    j += 1;
                    let far = if outsearch { self.g.tail(f) } else { self.g.head(f) };
                    if self.lim[far.0] < self.lim[u.0] {
                        descend = Some(far);
                        break;
                    }
                }
            }
            if let Some(top) = todo.last_mut() {
                top.1 = i;
                top.2 = j;
            }
            match descend {
                Some(w) => todo.push((w, 0, 0)),
                None => {
                    todo.pop();
                }
            }
        }
        best.map(|(f, _)| f)
    }

    /// Subtracts `delta` from the ranks of the subtree hanging below `v`.
    fn rerank(&mut self, v: FNode, delta: i32) {
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            self.g.node_mut(u).rank -= delta;
            let par = self.par[u.0];
            for e in &self.tree_out[u.0] {
                if Some(*e) != par {
                    stack.push(self.g.head(*e));
                }
            }
            for e in &self.tree_in[u.0] {
                if Some(*e) != par {
                    stack.push(self.g.tail(*e));
                }
            }
        }
    }

    /// Walks from `v` up to the common ancestor with `w`, adjusting cut values on the way.
    fn treeupdate(&mut self, mut v: FNode, w: FNode, cutvalue: i64, dir: bool) -> Result<FNode> {
        while !self.in_subtree(v, w) {
            let Some(e) = self.par[v.0] else {
                return Err(Error::InternalConsistency(
                    "tree walk passed the root".to_string(),
                ));
            };
            let d = if v == self.g.tail(e) { dir } else { !dir };
            if d {
                self.cutvalue[e.0] += cutvalue;
            } else {
                self.cutvalue[e.0] -= cutvalue;
            }
            let (t, h) = (self.g.tail(e), self.g.head(e));
            v = if self.lim[t.0] > self.lim[h.0] { t } else { h };
        }
        Ok(v)
    }

    fn update(&mut self, e: FEdge, f: FEdge) -> Result<()> {
        let delta = self.slack(f);
        if delta > 0 {
            let (t, h) = (self.g.tail(e), self.g.head(e));
            if self.lim[t.0] < self.lim[h.0] {
                self.rerank(t, delta);
            } else {
                self.rerank(h, -delta);
            }
        }
        let cutvalue = self.cutvalue[e.0];
        let (ft, fh) = (self.g.tail(f), self.g.head(f));
        let lca = self.treeupdate(ft, fh, cutvalue, true)?;
        if self.treeupdate(fh, ft, cutvalue, false)? != lca {
            return Err(Error::InternalConsistency(
                "mismatched common ancestor in tree update".to_string(),
            ));
        }
        self.cutvalue[f.0] = -cutvalue;
        self.cutvalue[e.0] = 0;
        self.exchange_tree_edges(e, f);
        let (par, low) = (self.par[lca.0], self.low[lca.0]);
        self.dfs_range(lca, par, low);
        Ok(())
    }

    fn exchange_tree_edges(&mut self, e: FEdge, f: FEdge) {
        let ix = self.tree_index[e.0];
        self.tree_index[f.0] = ix;
        self.tree_edges[ix as usize] = f;
        self.tree_index[e.0] = -1;
        let (t, h) = (self.g.tail(e), self.g.head(e));
        self.tree_out[t.0].retain(|x| *x != e);
        self.tree_in[h.0].retain(|x| *x != e);
        let (t, h) = (self.g.tail(f), self.g.head(f));
        self.tree_out[t.0].push(f);
        self.tree_in[h.0].push(f);
    }

    // ---- balancing ------------------------------------------------------------------------

    /// Shifts ranks so the minimum over normal nodes is 0; returns the maximum rank.
    fn normalize(&mut self) -> i32 {
        let normal = |k: NodeKind| k == NodeKind::Normal;
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for n in self.g.nodes() {
            if normal(self.g.kind(n)) {
                min = min.min(self.g.rank(n));
                max = max.max(self.g.rank(n));
            }
        }
        if min == i32::MAX {
            for n in self.g.nodes() {
                min = min.min(self.g.rank(n));
                max = max.max(self.g.rank(n));
            }
        }
        for ix in 0..self.g.node_count() {
            self.g.node_mut(FNode(ix)).rank -= min;
        }
        max - min
    }

    fn tb_balance(&mut self, adj: TbBalance) {
        let max_rank = self.normalize().max(0);
        if adj != TbBalance::None {
            for n in self.g.nodes().collect::<Vec<_>>() {
                if self.g.kind(n) != NodeKind::Normal {
                    continue;
                }
                if adj == TbBalance::Min && self.g.in_edges(n).is_empty() {
                    self.g.node_mut(n).rank = 0;
                }
                if adj == TbBalance::Max && self.g.out_edges(n).is_empty() {
                    self.g.node_mut(n).rank = max_rank;
                }
            }
        }
        let mut order: Vec<FNode> = self.g.nodes().collect();
        if adj == TbBalance::Max {
            order.sort_by_key(|n| std::cmp::Reverse(self.g.rank(*n)));
        } else {
            order.sort_by_key(|n| self.g.rank(*n));
        }
        let mut nrank = vec![0usize; max_rank as usize + 1];
        for n in &order {
            if self.g.kind(*n) == NodeKind::Normal {
                let r = self.g.rank(*n).clamp(0, max_rank) as usize;
                nrank[r] += 1;
            }
        }
        for n in order {
            if self.g.kind(n) != NodeKind::Normal {
                continue;
            }
            let (mut inweight, mut outweight) = (0i64, 0i64);
            let (mut low, mut high) = (0, max_rank);
            for e in self.g.in_edges(n) {
                let edge = self.g.edge(*e);
                inweight += i64::from(edge.weight);
                low = low.max(self.g.rank(edge.tail) + edge.minlen);
            }
            for e in self.g.out_edges(n) {
                let edge = self.g.edge(*e);
                outweight += i64::from(edge.weight);
                high = high.min(self.g.rank(edge.head) - edge.minlen);
            }
            low = low.max(0);
            if inweight != outweight {
                continue;
            }
            match adj {
                TbBalance::Min => self.g.node_mut(n).rank = low,
                TbBalance::Max => self.g.node_mut(n).rank = high,
                TbBalance::None => {
                    let mut choice = low;
                    for r in low + 1..=high {
                        if nrank[r as usize] < nrank[choice as usize] {
                            choice = r;
                        }
                    }
                    let cur = self.g.rank(n).clamp(0, max_rank) as usize;
                    if (0..=max_rank).contains(&choice) {
                        nrank[cur] -= 1;
                        nrank[choice as usize] += 1;
                        self.g.node_mut(n).rank = choice;
                    }
                }
            }
        }
    }

    fn lr_balance(&mut self) {
        for ix in 0..self.tree_edges.len() {
            let e = self.tree_edges[ix];
            if self.cutvalue[e.0] != 0 {
                continue;
            }
            let Some(f) = self.enter_edge(e) else {
                continue;
            };
            let delta = self.slack(f);
            if delta <= 1 {
                continue;
            }
            let (t, h) = (self.g.tail(e), self.g.head(e));
            if self.lim[t.0] < self.lim[h.0] {
                self.rerank(t, delta / 2);
            } else {
                self.rerank(h, -delta / 2);
            }
        }
    }
}

fn find_set(trees: &[Subtree], mut s: usize) -> usize {
    while trees[s].par != s {
        s = trees[s].par;
    }
    s
}

/// Unites two subtree roots; the root still on the heap (or the larger one) survives.
fn union_sets(trees: &mut [Subtree], s0: usize, s1: usize) -> usize {
    let (r0, r1) = (find_set(trees, s0), find_set(trees, s1));
    if r0 == r1 {
        return r0;
    }
    let r = match (trees[r0].heap_index, trees[r1].heap_index) {
        (_, None) => r0,
        (None, _) => r1,
        _ if trees[r1].size < trees[r0].size => r0,
        _ => r1,
    };
    trees[r0].par = r;
    trees[r1].par = r;
    trees[r].size = trees[r0].size + trees[r1].size;
    r
}

/// Min-heap of subtree indices keyed by size. Merged subtrees grow in place and are sifted down.
struct SubtreeHeap {
    elt: Vec<usize>,
}

impl SubtreeHeap {
    fn build(trees: &mut [Subtree]) -> Self {
        let mut heap = Self {
            elt: (0..trees.len()).collect(),
        };
        for (i, t) in trees.iter_mut().enumerate() {
            t.heap_index = Some(i);
        }
        for i in (0..=heap.elt.len() / 2).rev() {
            heap.heapify(trees, i);
        }
        heap
    }

    fn len(&self) -> usize {
        self.elt.len()
    }

    fn heapify(&mut self, trees: &mut [Subtree], mut i: usize) {
        let size = self.elt.len();
        while i < size {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < size && trees[self.elt[left]].size < trees[self.elt[smallest]].size {
                smallest = left;
            }
            if right < size && trees[self.elt[right]].size < trees[self.elt[smallest]].size {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.elt.swap(i, smallest);
            trees[self.elt[i]].heap_index = Some(i);
            trees[self.elt[smallest]].heap_index = Some(smallest);
            i = smallest;
        }
    }

    fn extract_min(&mut self, trees: &mut [Subtree]) -> Option<usize> {
        if self.elt.is_empty() {
            return None;
        }
        let rv = self.elt.swap_remove(0);
        trees[rv].heap_index = None;
        if let Some(first) = self.elt.first() {
            trees[*first].heap_index = Some(0);
            self.heapify(trees, 0);
        }
        Some(rv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> FastGraph<(), ()> {
        let mut g = FastGraph::new();
        let nodes: Vec<FNode> = (0..n).map(|_| g.add_node(NodeKind::Normal, ())).collect();
        for w in nodes.windows(2) {
            g.add_edge(w[0], w[1], 1, 1, ());
        }
        g
    }

    #[test]
    fn subtree_heap_pops_smallest_first() {
        let mut trees: Vec<Subtree> = [5usize, 1, 3]
            .iter()
            .enumerate()
            .map(|(i, s)| Subtree {
                rep: FNode(i),
                size: *s,
                heap_index: None,
                par: i,
            })
            .collect();
        let mut heap = SubtreeHeap::build(&mut trees);
        assert_eq!(heap.extract_min(&mut trees), Some(1));
        assert_eq!(heap.extract_min(&mut trees), Some(2));
        assert_eq!(heap.extract_min(&mut trees), Some(0));
        assert_eq!(heap.extract_min(&mut trees), None);
    }

    #[test]
    fn lim_is_postorder_within_low() {
        let mut g = chain(4);
        let mut ns = Simplex::new(&mut g, SEARCHSIZE);
        ns.init_rank().unwrap();
        ns.feasible_tree().unwrap();
        // Root is node 0, so the chain hangs below it.
        assert_eq!(ns.lim[0], 4);
        assert_eq!(ns.lim[3], 1);
        assert!(ns.in_subtree(FNode(1), FNode(3)));
        assert!(!ns.in_subtree(FNode(2), FNode(1)));
    }
}
