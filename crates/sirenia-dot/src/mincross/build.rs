//! Initial orderings by breadth-first search.

use super::Mincross;
use super::scope::Scope;
use rustc_hash::FxHashMap;
use sirenia_graph::FNode;
use std::collections::VecDeque;

impl Mincross<'_> {
    /// Rebuilds the unit order of every rank by BFS from the sources (`pass == 0`) or the sinks
    /// (`pass == 1`) of the scope. A child cluster is installed on all its ranks at once.
    pub(super) fn build_ranks(&mut self, sc: &mut Scope, pass: usize) {
        // Items: a plain node unit, or every unit of one child block.
        let mut item_of_unit = vec![0usize; sc.units.len()];
        let mut items: Vec<Vec<usize>> = Vec::new();
        let mut block_item: FxHashMap<usize, usize> = FxHashMap::default();
        for (u, unit) in sc.units.iter().enumerate() {
            let it = match unit.block {
                Some(k) => *block_item.entry(k).or_insert_with(|| {
                    items.push(Vec::new());
                    items.len() - 1
                }),
                None => {
                    items.push(Vec::new());
                    items.len() - 1
                }
            };
            items[it].push(u);
            item_of_unit[u] = it;
        }
        for units in &mut items {
            units.sort_by_key(|u| sc.units[*u].rank);
        }
        let item_of = |v: FNode| sc.unit(v).map(|u| item_of_unit[u]);

        let g = &self.lg.g;
        let preds = |v: FNode| -> Vec<FNode> {
            if pass == 0 {
                g.in_edges(v).iter().map(|e| g.tail(*e)).collect()
            } else {
                g.out_edges(v).iter().map(|e| g.head(*e)).collect()
            }
        };
        let succs = |v: FNode| -> Vec<FNode> {
            if pass == 0 {
                g.out_edges(v).iter().map(|e| g.head(*e)).collect()
            } else {
                g.in_edges(v).iter().map(|e| g.tail(*e)).collect()
            }
        };

        let mut mark = vec![false; items.len()];
        let mut new_order: Vec<Vec<usize>> = vec![Vec::new(); sc.rank_count()];
        let mut queue = VecDeque::new();
        let mut visit = |start: usize, mark: &mut Vec<bool>, new_order: &mut Vec<Vec<usize>>| {
            mark[start] = true;
            queue.push_back(start);
            while let Some(it) = queue.pop_front() {
                for &u in &items[it] {
                    new_order[sc.units[u].rank - sc.min_rank].push(u);
                }
                for &u in &items[it] {
                    for &v in &sc.units[u].nodes {
                        for w in succs(v) {
                            if let Some(next) = item_of(w)
                                && !mark[next]
                            {
                                mark[next] = true;
                                queue.push_back(next);
                            }
                        }
                    }
                }
            }
        };

        for &v in &sc.nodes {
            let Some(it) = item_of(v) else {
                continue;
            };
            if mark[it] {
                continue;
            }
            let has_pred = items[it].iter().any(|u| {
                sc.units[*u].nodes.iter().any(|x| {
                    preds(*x)
                        .into_iter()
                        .any(|p| item_of(p).is_some_and(|pi| pi != it))
                })
            });
            if has_pred {
                continue;
            }
            visit(it, &mut mark, &mut new_order);
        }
        for &v in &sc.nodes {
            if let Some(it) = item_of(v)
                && !mark[it]
            {
                visit(it, &mut mark, &mut new_order);
            }
        }

        if self.flipped {
            for rank in &mut new_order {
                rank.reverse();
            }
        }
        sc.order = new_order;
        sc.write_back_all(self.lg);
        if sc.is_root_component() && self.ncross(sc) > 0 {
            self.transpose(sc, false);
        }
    }
}
