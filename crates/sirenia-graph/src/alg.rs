//! Traversals over [`FastGraph`](crate::FastGraph).

use crate::fast::{FNode, FastGraph};
use std::collections::VecDeque;

/// Weakly connected components, each listed in BFS order. Components are ordered by their
/// lowest node index.
pub fn components<N, E>(g: &FastGraph<N, E>) -> Vec<Vec<FNode>> {
    let mut seen = vec![false; g.node_count()];
    let mut out: Vec<Vec<FNode>> = Vec::new();
    for start in g.nodes() {
        if seen[start.0] {
            continue;
        }
        seen[start.0] = true;
        let mut comp = Vec::new();
        let mut q: VecDeque<FNode> = VecDeque::new();
        q.push_back(start);
        while let Some(v) = q.pop_front() {
            comp.push(v);
            for w in g.neighbors(v) {
                if !seen[w.0] {
                    seen[w.0] = true;
                    q.push_back(w);
                }
            }
        }
        out.push(comp);
    }
    out
}

/// Kahn order. Returns `Err(node)` with a node left on a cycle when the graph is not acyclic.
pub fn topological_order<N, E>(g: &FastGraph<N, E>) -> Result<Vec<FNode>, FNode> {
    let mut indeg: Vec<usize> = g.nodes().map(|n| g.in_edges(n).len()).collect();
    let mut q: VecDeque<FNode> = g.nodes().filter(|n| indeg[n.0] == 0).collect();
    let mut out = Vec::with_capacity(g.node_count());
    while let Some(v) = q.pop_front() {
        out.push(v);
        for e in g.out_edges(v) {
            let h = g.head(*e);
            indeg[h.0] -= 1;
            if indeg[h.0] == 0 {
                q.push_back(h);
            }
        }
    }
    if out.len() == g.node_count() {
        return Ok(out);
    }
    let stuck = g
        .nodes()
        .find(|n| indeg[n.0] > 0)
        .unwrap_or(FNode(0));
    Err(stuck)
}
