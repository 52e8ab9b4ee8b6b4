use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Undirected weighted adjacency: `(neighbour, length)` per node, one entry per neighbour.
pub type Adjacency = Vec<Vec<(usize, f64)>>;

/// Input of a stress layout. Node and edge indices are positions in the vectors.
#[derive(Debug, Clone, Default)]
pub struct StressGraph {
    pub nodes: Vec<StressNode>,
    pub edges: Vec<StressEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct StressNode {
    pub id: String,
    /// User position in points, one value per axis.
    pub pos: Option<Vec<f64>>,
    /// Keep `pos` fixed. Ignored without a position.
    pub pinned: bool,
}

#[derive(Debug, Clone)]
pub struct StressEdge {
    pub a: usize,
    pub b: usize,
    /// Ideal length in inches.
    pub len: f64,
}

impl StressGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>) -> usize {
        self.nodes.push(StressNode {
            id: id.into(),
            ..StressNode::default()
        });
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, a: usize, b: usize) -> usize {
        self.add_edge_with_len(a, b, 1.0)
    }

    pub fn add_edge_with_len(&mut self, a: usize, b: usize, len: f64) -> usize {
        self.edges.push(StressEdge { a, b, len });
        self.edges.len() - 1
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.nodes.len();
        for (i, e) in self.edges.iter().enumerate() {
            if e.a >= n || e.b >= n {
                return Err(Error::MissingEndpoint { edge: i });
            }
        }
        Ok(())
    }

    /// Symmetric adjacency without self loops. Parallel edges collapse to the shortest length;
    /// non-positive or non-finite lengths count as 1.
    pub fn adjacency(&self) -> Adjacency {
        let mut adj: Adjacency = vec![Vec::new(); self.nodes.len()];
        for e in &self.edges {
            if e.a == e.b {
                continue;
            }
            let len = if e.len.is_finite() && e.len > 0.0 { e.len } else { 1.0 };
            for (u, v) in [(e.a, e.b), (e.b, e.a)] {
                match adj[u].iter_mut().find(|(w, _)| *w == v) {
                    Some(entry) => entry.1 = entry.1.min(len),
                    None => adj[u].push((v, len)),
                }
            }
        }
        adj
    }
}

/// Connected components in order of their lowest node, each sorted.
pub fn components(adj: &Adjacency) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut seen = vec![false; n];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let mut comp = Vec::new();
        while let Some(v) = queue.pop_front() {
            comp.push(v);
            for &(u, _) in &adj[v] {
                if !seen[u] {
                    seen[u] = true;
                    queue.push_back(u);
                }
            }
        }
        comp.sort_unstable();
        out.push(comp);
    }
    out
}

/// Adjacency of the subgraph induced by `nodes`, renumbered to positions in `nodes`.
pub(crate) fn induced(adj: &Adjacency, nodes: &[usize]) -> Adjacency {
    let mut local = vec![usize::MAX; adj.len()];
    for (i, &v) in nodes.iter().enumerate() {
        local[v] = i;
    }
    nodes
        .iter()
        .map(|&v| {
            adj[v]
                .iter()
                .filter(|(u, _)| local[*u] != usize::MAX)
                .map(|&(u, len)| (local[u], len))
                .collect()
        })
        .collect()
}

/// Result of [`crate::layout`].
#[derive(Debug, Clone, Default)]
pub struct StressLayout {
    /// Per node, one coordinate per axis, in points.
    pub coords: Vec<Vec<f64>>,
    /// Solver iterations summed over components.
    pub iterations: usize,
    /// Final stress summed over components, in inch units.
    pub stress: f64,
    /// Fallbacks taken while laying out, for the caller's warning stream.
    pub notes: Vec<String>,
}

impl StressLayout {
    /// First two coordinates of node `i`.
    pub fn xy(&self, i: usize) -> (f64, f64) {
        let c = &self.coords[i];
        (c[0], c[1])
    }
}
