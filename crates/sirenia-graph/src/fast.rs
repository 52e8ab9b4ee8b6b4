//! Arena graph used by the layout passes.
//!
//! Each node keeps its own in/out edge lists; edges reference nodes by index, and nodes reference
//! edges by index. Reversing an edge moves its index between lists; deleting an edge unlinks it
//! and leaves a tombstone so indices stay stable for the rest of the pass.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FNode(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FEdge(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Normal,
    Virtual,
    Slack,
    Cluster,
}

#[derive(Debug, Clone)]
pub struct FastNode<N> {
    pub kind: NodeKind,
    pub rank: i32,
    pub order: i32,
    pub out_edges: Vec<FEdge>,
    pub in_edges: Vec<FEdge>,
    pub data: N,
}

#[derive(Debug, Clone)]
pub struct FastEdge<E> {
    pub tail: FNode,
    pub head: FNode,
    pub weight: i32,
    pub minlen: i32,
    /// Flipped by [`FastGraph::reverse_edge`]; toggles on every reversal.
    pub reversed: bool,
    pub alive: bool,
    pub data: E,
}

#[derive(Debug, Clone)]
pub struct FastGraph<N, E> {
    nodes: Vec<FastNode<N>>,
    edges: Vec<FastEdge<E>>,
    live_edges: usize,
}

impl<N, E> Default for FastGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> FastGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            live_edges: 0,
        }
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
            live_edges: 0,
        }
    }

    pub fn add_node(&mut self, kind: NodeKind, data: N) -> FNode {
        let id = FNode(self.nodes.len());
        self.nodes.push(FastNode {
            kind,
            rank: 0,
            order: 0,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            data,
        });
        id
    }

    pub fn add_edge(&mut self, tail: FNode, head: FNode, weight: i32, minlen: i32, data: E) -> FEdge {
        let id = FEdge(self.edges.len());
        self.edges.push(FastEdge {
            tail,
            head,
            weight,
            minlen,
            reversed: false,
            alive: true,
            data,
        });
        self.nodes[tail.0].out_edges.push(id);
        self.nodes[head.0].in_edges.push(id);
        self.live_edges += 1;
        id
    }

    pub fn node(&self, n: FNode) -> &FastNode<N> {
        &self.nodes[n.0]
    }

    pub fn node_mut(&mut self, n: FNode) -> &mut FastNode<N> {
        &mut self.nodes[n.0]
    }

    pub fn edge(&self, e: FEdge) -> &FastEdge<E> {
        &self.edges[e.0]
    }

    pub fn edge_mut(&mut self, e: FEdge) -> &mut FastEdge<E> {
        &mut self.edges[e.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live (not deleted) edges.
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Size of the edge arena, tombstones included.
    pub fn edge_capacity(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = FNode> + '_ {
        (0..self.nodes.len()).map(FNode)
    }

    pub fn edges(&self) -> impl Iterator<Item = FEdge> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive)
            .map(|(ix, _)| FEdge(ix))
    }

    pub fn out_edges(&self, n: FNode) -> &[FEdge] {
        &self.nodes[n.0].out_edges
    }

    pub fn in_edges(&self, n: FNode) -> &[FEdge] {
        &self.nodes[n.0].in_edges
    }

    pub fn tail(&self, e: FEdge) -> FNode {
        self.edges[e.0].tail
    }

    pub fn head(&self, e: FEdge) -> FNode {
        self.edges[e.0].head
    }

    pub fn rank(&self, n: FNode) -> i32 {
        self.nodes[n.0].rank
    }

    pub fn kind(&self, n: FNode) -> NodeKind {
        self.nodes[n.0].kind
    }

    /// Swaps tail and head in place and moves the edge between the adjacency lists.
    pub fn reverse_edge(&mut self, e: FEdge) {
        let (t, h) = (self.edges[e.0].tail, self.edges[e.0].head);
        unlink(&mut self.nodes[t.0].out_edges, e);
        unlink(&mut self.nodes[h.0].in_edges, e);
        let edge = &mut self.edges[e.0];
        edge.tail = h;
        edge.head = t;
        edge.reversed = !edge.reversed;
        self.nodes[h.0].out_edges.push(e);
        self.nodes[t.0].in_edges.push(e);
    }

    /// Unlinks `e` from both endpoint lists. The arena slot remains as a tombstone.
    pub fn delete_fast_edge(&mut self, e: FEdge) {
        if !self.edges[e.0].alive {
            return;
        }
        let (t, h) = (self.edges[e.0].tail, self.edges[e.0].head);
        unlink(&mut self.nodes[t.0].out_edges, e);
        unlink(&mut self.nodes[h.0].in_edges, e);
        self.edges[e.0].alive = false;
        self.live_edges -= 1;
    }

    /// Folds `absorb` into `keep`: weights add, minlen takes the max. `absorb` is deleted.
    pub fn merge_edges(&mut self, keep: FEdge, absorb: FEdge) {
        if keep == absorb {
            return;
        }
        let (w, m) = (self.edges[absorb.0].weight, self.edges[absorb.0].minlen);
        let k = &mut self.edges[keep.0];
        k.weight = k.weight.saturating_add(w);
        k.minlen = k.minlen.max(m);
        self.delete_fast_edge(absorb);
    }

    /// First live edge `tail -> head`, if any.
    pub fn find_edge(&self, tail: FNode, head: FNode) -> Option<FEdge> {
        self.nodes[tail.0]
            .out_edges
            .iter()
            .copied()
            .find(|e| self.edges[e.0].head == head)
    }

    /// Neighbours reachable by out- and in-edges, in list order.
    pub fn neighbors(&self, n: FNode) -> impl Iterator<Item = FNode> + '_ {
        let node = &self.nodes[n.0];
        node.out_edges
            .iter()
            .map(|e| self.edges[e.0].head)
            .chain(node.in_edges.iter().map(|e| self.edges[e.0].tail))
    }
}

fn unlink(list: &mut Vec<FEdge>, e: FEdge) {
    if let Some(pos) = list.iter().position(|x| *x == e) {
        list.remove(pos);
    }
}
