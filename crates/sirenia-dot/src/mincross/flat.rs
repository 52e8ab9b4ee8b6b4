//! Flat edges: `ordering` constraints, cycle breaking and left-to-right placement.

use super::Mincross;
use super::scope::Scope;
use crate::config::Ordering;
use crate::model::{FlatEdge, Route};
use sirenia_graph::{FEdge, FNode};

impl Mincross<'_> {
    /// Adds ordering-only flat edges between consecutive out- (or in-) neighbors of the scope's
    /// plain real nodes that ask for `ordering`.
    pub(super) fn ordered_edges(&mut self, sc: &mut Scope) {
        let dg = self.dg;
        let nodes: Vec<FNode> = sc.nodes.iter().copied().filter(|v| sc.is_node_unit(*v)).collect();
        for v in nodes {
            let Some(real) = self.lg.g.node(v).data.real else {
                continue;
            };
            let Some(ordering) = dg.cfg.ordering.or(dg.nodes[real].ordering) else {
                continue;
            };
            self.order_neighbors(v, ordering);
        }
    }

    fn order_neighbors(&mut self, v: FNode, ordering: Ordering) {
        let dg = self.dg;
        let g = &self.lg.g;
        let list = match ordering {
            Ordering::Out => g.out_edges(v),
            Ordering::In => g.in_edges(v),
        };
        let mut edges: Vec<(usize, FEdge)> = list
            .iter()
            .filter_map(|e| {
                let orig = g.edge(*e).data.orig.iter().copied().min()?;
                let real = &dg.edges[orig];
                (dg.owner[real.tail] == dg.owner[real.head]).then_some((orig, *e))
            })
            .collect();
        if edges.len() <= 1 {
            return;
        }
        edges.sort_unstable();
        let far = |e: FEdge| match ordering {
            Ordering::Out => g.head(e),
            Ordering::In => g.tail(e),
        };
        let pairs: Vec<(FNode, FNode)> = edges.windows(2).map(|w| (far(w[0].1), far(w[1].1))).collect();
        for (a, b) in pairs {
            if a == b {
                continue;
            }
            if self.lg.find_flat(a, b).is_some() {
                return;
            }
            self.lg.add_flat(FlatEdge {
                tail: a,
                head: b,
                weight: 1,
                orig: Vec::new(),
                alive: true,
                reversed: false,
            });
        }
    }

    /// A flat edge the scope must respect when ordering its plain nodes.
    fn constraining(&self, sc: &Scope, f: usize) -> bool {
        let fe = &self.lg.flat[f];
        fe.alive && fe.weight != 0 && sc.is_node_unit(fe.tail) && sc.is_node_unit(fe.head)
    }

    fn set_left_of(&mut self, a: FNode, b: FNode) {
        let pair = if self.flipped { (b, a) } else { (a, b) };
        self.lg.flat_order.insert(pair);
    }

    /// Records the left-to-right order implied by flat edges, reversing edges that close a
    /// cycle. Ordering-only edges that close a cycle are dropped.
    pub(super) fn flat_breakcycles(&mut self, sc: &mut Scope) {
        let n = self.lg.g.node_count();
        let mut mark = vec![false; n];
        let mut onstack = vec![false; n];
        for ri in 0..sc.rank_count() {
            let rank: Vec<FNode> = sc.order[ri]
                .iter()
                .filter(|u| sc.units[**u].block.is_none())
                .map(|u| sc.units[*u].nodes[0])
                .collect();
            if !rank.iter().any(|v| !self.lg.g.node(*v).data.flat_out.is_empty()) {
                continue;
            }
            for v in rank {
                if !mark[v.0] {
                    self.flat_search(sc, v, &mut mark, &mut onstack);
                }
            }
        }
    }

    fn flat_search(&mut self, sc: &Scope, root: FNode, mark: &mut [bool], onstack: &mut [bool]) {
        mark[root.0] = true;
        onstack[root.0] = true;
        let mut stack: Vec<(FNode, usize)> = vec![(root, 0)];
        while let Some(&(v, i)) = stack.last() {
            let top = stack.len() - 1;
            let Some(&f) = self.lg.g.node(v).data.flat_out.get(i) else {
                onstack[v.0] = false;
                stack.pop();
                continue;
            };
            if !self.constraining(sc, f) {
                stack[top].1 += 1;
                continue;
            }
            let (t, h) = (self.lg.flat[f].tail, self.lg.flat[f].head);
            if onstack[h.0] {
                self.set_left_of(h, t);
                let ordering_only = self.lg.flat[f].is_ordering();
                // Deleting unlinks `f` from `v`'s list, so `i` stays put.
                self.lg.delete_flat(f);
                if !ordering_only {
                    self.flat_rev(f);
                }
            } else {
                self.set_left_of(t, h);
                stack[top].1 += 1;
                if !mark[h.0] {
                    mark[h.0] = true;
                    onstack[h.0] = true;
                    stack.push((h, 0));
                }
            }
        }
    }

    /// Re-adds deleted flat edge `f` pointing the other way, merging into an existing opposite.
    pub(super) fn flat_rev(&mut self, f: usize) {
        let old = self.lg.flat[f].clone();
        let target = match self.lg.find_flat(old.head, old.tail) {
            Some(r) => {
                let fe = &mut self.lg.flat[r];
                fe.weight = fe.weight.saturating_add(old.weight);
                fe.orig.extend(old.orig.iter().copied());
                r
            }
            None => self.lg.add_flat(FlatEdge {
                tail: old.head,
                head: old.tail,
                weight: old.weight,
                orig: old.orig.clone(),
                alive: true,
                reversed: !old.reversed,
            }),
        };
        for o in old.orig {
            self.lg.route[o] = Route::Flat(target);
        }
    }

    /// Topologically sorts each rank by its constraining flat edges, then turns the remaining
    /// flat edges so they point left to right.
    pub(super) fn flat_reorder(&mut self, sc: &mut Scope) {
        if !self.lg.flat.iter().any(|f| f.alive) {
            return;
        }
        for ri in 0..sc.rank_count() {
            let units = sc.order[ri].clone();
            let n = units.len();
            if n == 0 {
                continue;
            }
            let mut mark = vec![false; sc.units.len()];
            let mut temprank: Vec<usize> = Vec::with_capacity(n);
            for i in 0..n {
                let u = if self.flipped { units[i] } else { units[n - 1 - i] };
                let (ins, outs) = self.constraining_degree(sc, u);
                if ins == 0 && outs == 0 {
                    temprank.push(u);
                } else if !mark[u] && ins == 0 {
                    self.postorder(sc, u, &mut mark, &mut temprank);
                }
            }
            if temprank.len() != n {
                continue;
            }
            if !self.flipped {
                temprank.reverse();
            }
            sc.order[ri] = temprank;
            sc.write_back(self.lg, ri);

            for &u in &sc.order[ri] {
                if sc.units[u].block.is_some() {
                    continue;
                }
                let v = sc.units[u].nodes[0];
                let outs = self.lg.g.node(v).data.flat_out.clone();
                for f in outs {
                    let (t, h) = (self.lg.flat[f].tail, self.lg.flat[f].head);
                    let (ot, oh) = (self.lg.order(t), self.lg.order(h));
                    if (!self.flipped && oh < ot) || (self.flipped && oh > ot) {
                        self.lg.delete_flat(f);
                        self.flat_rev(f);
                    }
                }
            }
        }
    }

    fn constraining_degree(&self, sc: &Scope, u: usize) -> (usize, usize) {
        if sc.units[u].block.is_some() {
            return (0, 0);
        }
        let data = &self.lg.g.node(sc.units[u].nodes[0]).data;
        let ins = data.flat_in.iter().filter(|f| self.constraining(sc, **f)).count();
        let outs = data.flat_out.iter().filter(|f| self.constraining(sc, **f)).count();
        (ins, outs)
    }

    fn postorder(&self, sc: &Scope, root: usize, mark: &mut [bool], out: &mut Vec<usize>) {
        mark[root] = true;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(u, i)) = stack.last() {
            let top = stack.len() - 1;
            let v = sc.units[u].nodes[0];
            let next = self.lg.g.node(v).data.flat_out.get(i).copied();
            let Some(f) = next else {
                out.push(u);
                stack.pop();
                continue;
            };
            stack[top].1 += 1;
            if !self.constraining(sc, f) {
                continue;
            }
            if let Some(hu) = sc.unit(self.lg.flat[f].head)
                && !mark[hu]
            {
                mark[hu] = true;
                stack.push((hu, 0));
            }
        }
    }
}
