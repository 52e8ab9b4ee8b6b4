//! Break cycles by reversing back edges found by depth-first search.
//!
//! A reversed edge that duplicates an existing edge in the new direction is merged into it
//! (weights add, minlen takes the max).

use sirenia_graph::{FEdge, FNode, FastGraph};

#[derive(Debug, Clone, Copy)]
struct Frame {
    v: FNode,
    i: usize,
}

/// Reverses back edges in place. Returns the number of edges reversed.
pub fn run<N, E>(g: &mut FastGraph<N, E>) -> usize {
    let n = g.node_count();
    let mut mark = vec![false; n];
    let mut onstack = vec![false; n];
    let mut reversed = 0usize;
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..n {
        if mark[root] {
            continue;
        }
        mark[root] = true;
        onstack[root] = true;
        stack.push(Frame {
            v: FNode(root),
            i: 0,
        });
        while let Some(top) = stack.last_mut() {
            let v = top.v;
            let Some(&e) = g.out_edges(v).get(top.i) else {
                onstack[v.0] = false;
                stack.pop();
                continue;
            };
            let w = g.head(e);
            if onstack[w.0] {
                // The reversal unlinks `e` from `v`'s out list, so `i` stays put.
                reverse(g, e);
                reversed += 1;
                continue;
            }
            top.i += 1;
            if !mark[w.0] {
                mark[w.0] = true;
                onstack[w.0] = true;
                stack.push(Frame { v: w, i: 0 });
            }
        }
    }
    if reversed > 0 {
        tracing::trace!(reversed, "acyclic");
    }
    reversed
}

fn reverse<N, E>(g: &mut FastGraph<N, E>, e: FEdge) {
    let (t, h) = (g.tail(e), g.head(e));
    if t == h {
        g.delete_fast_edge(e);
        return;
    }
    let existing = g.find_edge(h, t);
    g.reverse_edge(e);
    if let Some(keep) = existing {
        g.merge_edges(keep, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirenia_graph::{NodeKind, alg};

    fn new_graph(n: usize, edges: &[(usize, usize)]) -> FastGraph<(), ()> {
        let mut g = FastGraph::new();
        for _ in 0..n {
            g.add_node(NodeKind::Normal, ());
        }
        for (t, h) in edges {
            g.add_edge(FNode(*t), FNode(*h), 1, 1, ());
        }
        g
    }

    #[test]
    fn triangle_loses_one_edge_direction() {
        let mut g = new_graph(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(run(&mut g), 1);
        assert!(alg::topological_order(&g).is_ok());
        assert_eq!(g.edges().filter(|e| g.edge(*e).reversed).count(), 1);
    }

    #[test]
    fn two_cycle_merges_into_one_edge() {
        let mut g = new_graph(2, &[(0, 1), (1, 0)]);
        run(&mut g);
        assert_eq!(g.edge_count(), 1);
        let e = g.edges().next().unwrap();
        assert_eq!(g.edge(e).weight, 2);
    }
}
