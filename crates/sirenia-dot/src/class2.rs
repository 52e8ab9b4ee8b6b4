//! Builds the proper layered graph from ranked nodes.
//!
//! Edges spanning more than one rank become chains of virtual nodes; a labelled edge reserves
//! its label on the middle virtual node. Parallel edges share one chain, same-rank edges are
//! kept aside as flat edges and loops are attached to their node.

use crate::init::DotGraph;
use crate::model::{FlatEdge, LEdge, LNode, Layered, Route};
use crate::rank::Ranking;
use sirenia_graph::{FEdge, FNode, FastGraph, NodeKind, Port};

const ORDINARY: usize = 0;
const SINGLETON: usize = 1;
const VIRTUAL: usize = 2;

/// Chain-edge weight multiplier by endpoint class.
const WEIGHT_TABLE: [[i32; 3]; 3] = [[1, 1, 1], [1, 2, 2], [1, 2, 4]];

pub fn build(dg: &DotGraph, ranking: &Ranking) -> Layered {
    let n = dg.nodes.len();
    let mut g = FastGraph::with_capacity(n * 2, dg.edges.len() * 2);
    for (i, info) in dg.nodes.iter().enumerate() {
        let v = g.add_node(
            NodeKind::Normal,
            LNode {
                real: Some(i),
                lw: info.lw,
                rw: info.rw,
                ht: info.ht,
                cluster: dg.owner[i],
                ..LNode::default()
            },
        );
        g.node_mut(v).rank = ranking.rank[i];
    }
    for e in &dg.edges {
        if e.tail == e.head {
            continue;
        }
        for v in [e.tail, e.head] {
            let wc = &mut g.node_mut(FNode(v)).data.weight_class;
            if *wc <= 2 {
                *wc += 1;
            }
        }
    }

    let mut lg = Layered {
        g,
        ranks: Vec::new(),
        node_of: (0..n).map(FNode).collect(),
        route: vec![Route::Ignored; dg.edges.len()],
        flat: Vec::new(),
        flat_order: Default::default(),
        cluster_span: ranking.cluster_span.clone(),
        ranksep: if dg.has_edge_labels {
            ((dg.cfg.ranksep + 1.0) / 2.0).floor()
        } else {
            dg.cfg.ranksep
        },
        label_pos: vec![None; dg.edges.len()],
        ..Layered::default()
    };
    let vnode_width = (dg.cfg.nodesep / 2.0).floor();

    let mut out_lists: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (ix, e) in dg.edges.iter().enumerate() {
        out_lists[e.tail].push(ix);
    }
    for list in &out_lists {
        let mut prev: Option<usize> = None;
        for &ix in list {
            let e = &dg.edges[ix];
            if !matches!(lg.route[ix], Route::Ignored) {
                // Already carried by an opposite edge's chain.
                prev = Some(ix);
                continue;
            }
            if e.tail == e.head {
                lg.route[ix] = Route::SelfLoop;
                lg.g.node_mut(FNode(e.tail)).data.self_loops.push(ix);
                prev = Some(ix);
                continue;
            }
            let (rt, rh) = (ranking.rank[e.tail], ranking.rank[e.head]);

            if let Some(p) = prev
                && dg.edges[p].tail == e.tail
                && dg.edges[p].head == e.head
            {
                if rt == rh {
                    if let Route::Flat(f) = lg.route[p] {
                        lg.flat[f].orig.push(ix);
                        lg.flat[f].weight += e.weight;
                        lg.route[ix] = Route::Flat(f);
                        continue;
                    }
                } else if mergeable(dg, p, ix) {
                    merge_chain(&mut lg, dg, p, ix, vnode_width);
                    continue;
                }
            }

            if rt == rh {
                let f = lg.add_flat(FlatEdge {
                    tail: FNode(e.tail),
                    head: FNode(e.head),
                    weight: e.weight,
                    orig: vec![ix],
                    alive: true,
                    reversed: false,
                });
                lg.route[ix] = Route::Flat(f);
                prev = Some(ix);
                continue;
            }
            if rh > rt {
                make_chain(&mut lg, dg, ix, false, vnode_width);
                prev = Some(ix);
                continue;
            }
            // A backward edge may shadow a forward edge between the same pair.
            let opp = out_lists[e.head].iter().copied().find(|o| {
                dg.edges[*o].head == e.tail && dg.edges[*o].tail != dg.edges[*o].head
            });
            if let Some(o) = opp
                && dg.edges[o].label.is_none()
                && e.label.is_none()
                && ports_eq_opposite(dg, o, ix)
            {
                if matches!(lg.route[o], Route::Ignored) {
                    make_chain(&mut lg, dg, o, false, vnode_width);
                }
                merge_chain(&mut lg, dg, o, ix, vnode_width);
                if let Route::Chain { edges, .. } = &lg.route[ix] {
                    lg.route[ix] = Route::Chain {
                        edges: edges.clone(),
                        reversed: true,
                    };
                }
                continue;
            }
            make_chain(&mut lg, dg, ix, true, vnode_width);
            prev = Some(ix);
        }
    }

    fill_cluster_ranks(&mut lg, dg);
    mark_ports(&mut lg);

    let nranks = lg.g.nodes().map(|v| lg.g.rank(v) + 1).max().unwrap_or(0);
    lg.ranks = vec![Vec::new(); nranks.max(0) as usize];
    for v in lg.g.nodes().collect::<Vec<_>>() {
        let r = lg.g.rank(v) as usize;
        lg.ranks[r].push(v);
    }
    lg.renumber_all();
    tracing::debug!(
        nodes = lg.g.node_count(),
        edges = lg.g.edge_count(),
        flat = lg.flat.len(),
        "layered graph built"
    );
    lg
}

fn mergeable(dg: &DotGraph, a: usize, b: usize) -> bool {
    let (ea, eb) = (&dg.edges[a], &dg.edges[b]);
    ea.label.is_none()
        && eb.label.is_none()
        && ea.tail_port.same_geometry(&eb.tail_port)
        && ea.head_port.same_geometry(&eb.head_port)
}

fn ports_eq_opposite(dg: &DotGraph, fwd: usize, back: usize) -> bool {
    let (f, b) = (&dg.edges[fwd], &dg.edges[back]);
    f.tail_port.same_geometry(&b.head_port) && f.head_port.same_geometry(&b.tail_port)
}

fn endpoint_class(v: &LNode) -> usize {
    if v.is_virtual() {
        VIRTUAL
    } else if v.weight_class <= 1 {
        SINGLETON
    } else {
        ORDINARY
    }
}

/// Creates the virtual chain of real edge `ix`; `reversed` runs it from head to tail.
fn make_chain(lg: &mut Layered, dg: &DotGraph, ix: usize, reversed: bool, vnode_width: f64) {
    let e = &dg.edges[ix];
    let (from, to) = if reversed {
        (e.head, e.tail)
    } else {
        (e.tail, e.head)
    };
    let (from, to) = (FNode(from), FNode(to));
    let (r0, r1) = (lg.g.rank(from), lg.g.rank(to));
    let label_rank = e.label.map(|_| (r0 + r1) / 2);
    let cluster = dg.common_cluster(e.tail, e.head);
    let (from_port, to_port) = if reversed {
        (e.head_port.clone(), e.tail_port.clone())
    } else {
        (e.tail_port.clone(), e.head_port.clone())
    };

    let mut edges = Vec::with_capacity((r1 - r0) as usize);
    let mut u = from;
    for r in r0 + 1..=r1 {
        let v = if r < r1 {
            let data = match (label_rank, e.label) {
                (Some(lr), Some(dim)) if lr == r => LNode {
                    lw: dg.cfg.nodesep,
                    rw: dim.x,
                    ht: dim.y,
                    label_of: Some(ix),
                    cluster,
                    ..LNode::default()
                },
                _ => LNode {
                    lw: 1.0 + vnode_width,
                    rw: 1.0 + vnode_width,
                    ht: 1.0,
                    cluster,
                    ..LNode::default()
                },
            };
            let v = lg.g.add_node(NodeKind::Virtual, data);
            lg.g.node_mut(v).rank = r;
            v
        } else {
            to
        };
        let t = WEIGHT_TABLE[endpoint_class(&lg.g.node(u).data)][endpoint_class(&lg.g.node(v).data)];
        let data = LEdge {
            orig: vec![ix],
            xpenalty: e.xpenalty,
            tail_port: if u == from { from_port.clone() } else { Port::default() },
            head_port: if v == to { to_port.clone() } else { Port::default() },
        };
        edges.push(lg.g.add_edge(u, v, e.weight.saturating_mul(t), 1, data));
        u = v;
    }
    lg.route[ix] = Route::Chain { edges, reversed };
}

/// Lets real edge `ix` ride on the chain already built for `rep`.
fn merge_chain(lg: &mut Layered, dg: &DotGraph, rep: usize, ix: usize, vnode_width: f64) {
    let Route::Chain { edges, reversed } = lg.route[rep].clone() else {
        return;
    };
    let e = &dg.edges[ix];
    let last = edges.len().saturating_sub(1);
    for (i, f) in edges.iter().enumerate() {
        let fe = lg.g.edge_mut(*f);
        fe.weight = fe.weight.saturating_add(e.weight);
        fe.data.xpenalty = fe.data.xpenalty.saturating_add(e.xpenalty);
        fe.data.orig.push(ix);
        if i < last {
            let h = lg.g.head(*f);
            let d = &mut lg.g.node_mut(h).data;
            d.lw += vnode_width;
            d.rw += vnode_width;
        }
    }
    lg.route[ix] = Route::Chain { edges, reversed };
}

/// Every rank a cluster spans gets at least one node so its box stays connected.
fn fill_cluster_ranks(lg: &mut Layered, dg: &DotGraph) {
    for (c, (lo, hi)) in lg.cluster_span.clone().into_iter().enumerate() {
        if hi < lo {
            continue;
        }
        let mut covered = vec![false; (hi - lo + 1) as usize];
        for v in lg.g.nodes() {
            let d = &lg.g.node(v).data;
            let inside = match d.real {
                Some(r) => dg.contains(c, r),
                None => d.cluster.is_some_and(|k| is_within(dg, k, c)),
            };
            if inside {
                let r = lg.g.rank(v);
                if (lo..=hi).contains(&r) {
                    covered[(r - lo) as usize] = true;
                }
            }
        }
        for (i, _) in covered.iter().enumerate().filter(|(_, c)| !**c) {
            let v = lg.g.add_node(
                NodeKind::Virtual,
                LNode {
                    lw: 0.5,
                    rw: 0.5,
                    ht: 1.0,
                    cluster: Some(c),
                    ..LNode::default()
                },
            );
            lg.g.node_mut(v).rank = lo + i as i32;
        }
    }
}

/// Whether cluster `inner` is `outer` or nested in it.
pub(crate) fn is_within(dg: &DotGraph, inner: usize, outer: usize) -> bool {
    let mut c = Some(inner);
    while let Some(k) = c {
        if k == outer {
            return true;
        }
        c = dg.clusters[k].parent;
    }
    false
}

fn mark_ports(lg: &mut Layered) {
    let edges: Vec<FEdge> = lg.g.edges().collect();
    for e in edges {
        let (t, h) = (lg.g.tail(e), lg.g.head(e));
        let d = &lg.g.edge(e).data;
        let (tp, hp) = (d.tail_port.defined, d.head_port.defined);
        if tp {
            lg.g.node_mut(t).data.has_port = true;
        }
        if hp {
            lg.g.node_mut(h).data.has_port = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirenia_graph::Graph;

    fn ranked(g: &mut Graph) -> (DotGraph, Ranking) {
        let dg = DotGraph::from_graph(g);
        let ranking = crate::rank::dot_rank(&dg).unwrap();
        (dg, ranking)
    }

    #[test]
    fn long_edge_becomes_proper_chain() {
        let mut g = Graph::new("G", true);
        let (a, b, c) = (g.add_node("a"), g.add_node("b"), g.add_node("c"));
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(a, c);
        let (dg, ranking) = ranked(&mut g);
        let lg = build(&dg, &ranking);
        assert_eq!(lg.g.node_count(), 4);
        for e in lg.g.edges() {
            assert_eq!(lg.g.rank(lg.g.head(e)) - lg.g.rank(lg.g.tail(e)), 1);
        }
        let Route::Chain { edges, reversed } = &lg.route[2] else {
            panic!("expected a chain");
        };
        assert_eq!(edges.len(), 2);
        assert!(!reversed);
    }

    #[test]
    fn parallel_edges_share_a_chain() {
        let mut g = Graph::new("G", true);
        let (a, b) = (g.add_node("a"), g.add_node("b"));
        g.add_edge(a, b);
        g.add_edge(a, b);
        let (dg, ranking) = ranked(&mut g);
        let lg = build(&dg, &ranking);
        assert_eq!(lg.g.edge_count(), 1);
        let e = lg.g.edges().next().unwrap();
        assert_eq!(lg.g.edge(e).data.orig, vec![0, 1]);
        assert_eq!(lg.route[0], lg.route[1]);
    }

    #[test]
    fn same_rank_edges_are_flat() {
        let mut g = Graph::new("G", true);
        let (a, b) = (g.add_node("a"), g.add_node("b"));
        let sg = g.add_subgraph("s", None);
        g.add_to_subgraph(sg, a);
        g.add_to_subgraph(sg, b);
        g.set_subgraph_attr(sg, "rank", "same");
        g.add_edge(a, b);
        let (dg, ranking) = ranked(&mut g);
        let lg = build(&dg, &ranking);
        assert_eq!(lg.route[0], Route::Flat(0));
        assert_eq!(lg.g.node(FNode(0)).data.flat_out, vec![0]);
    }
}
