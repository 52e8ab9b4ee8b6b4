//! Edge concentration (`concentrate=true`).
//!
//! Runs after ordering. Adjacent virtual nodes on a rank whose chains leave the same tail (or
//! enter the same head) through the same port are merged, so the drawing shows one trunk that
//! fans out. Chains are re-traced through the surviving segments afterwards.

use crate::model::{LEdge, Layered, Route};
use sirenia_graph::{FEdge, FNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Down,
    Up,
}

/// Merges concentrated virtual nodes. Returns how many nodes were folded away.
pub fn dot_concentrate(lg: &mut Layered) -> usize {
    if lg.max_rank() <= 1 {
        return 0;
    }
    // Drawing direction of every chained real edge.
    let dirs: Vec<Option<bool>> = lg
        .route
        .iter()
        .map(|r| match r {
            Route::Chain { reversed, .. } => Some(*reversed),
            _ => None,
        })
        .collect();
    let mut merged = 0;
    let mut r = 1;
    while r + 1 < lg.ranks.len() && !lg.ranks[r + 1].is_empty() {
        merged += sweep(lg, &dirs, r, Dir::Down);
        r += 1;
    }
    while r > 0 {
        merged += sweep(lg, &dirs, r, Dir::Up);
        r -= 1;
    }
    if merged > 0 {
        retrace_chains(lg);
        tracing::debug!(merged, "edges concentrated");
    }
    merged
}

fn sweep(lg: &mut Layered, dirs: &[Option<bool>], r: usize, dir: Dir) -> usize {
    let mut merged = 0;
    let mut left = 0;
    while left < lg.ranks[r].len() {
        let lv = lg.ranks[r][left];
        if !candidate(lg, lv) {
            left += 1;
            continue;
        }
        let mut right = left + 1;
        while right < lg.ranks[r].len() && both_candidates(lg, dirs, lv, lg.ranks[r][right], dir) {
            right += 1;
        }
        if right - left > 1 {
            merged += right - left - 1;
            merge_virtual(lg, r, left, right - 1, dir);
        }
        left += 1;
    }
    merged
}

fn candidate(lg: &Layered, v: FNode) -> bool {
    let node = lg.g.node(v);
    node.data.is_virtual()
        && node.data.label_of.is_none()
        && node.in_edges.len() == 1
        && node.out_edges.len() == 1
}

fn both_candidates(lg: &Layered, dirs: &[Option<bool>], u: FNode, v: FNode, dir: Dir) -> bool {
    if !candidate(lg, v) || lg.g.node(u).data.cluster != lg.g.node(v).data.cluster {
        return false;
    }
    let (e, f) = match dir {
        Dir::Down => (lg.g.in_edges(u)[0], lg.g.in_edges(v)[0]),
        Dir::Up => (lg.g.out_edges(u)[0], lg.g.out_edges(v)[0]),
    };
    let (ee, fe) = (lg.g.edge(e), lg.g.edge(f));
    let shared = match dir {
        Dir::Down => {
            ee.tail == fe.tail && ee.data.tail_port.same_geometry(&fe.data.tail_port)
        }
        Dir::Up => ee.head == fe.head && ee.data.head_port.same_geometry(&fe.data.head_port),
    };
    shared && same_dir(dirs, &ee.data, &fe.data)
}

/// Both segments carry real edges drawn the same way round.
fn same_dir(dirs: &[Option<bool>], a: &LEdge, b: &LEdge) -> bool {
    let dir_of = |e: &LEdge| {
        let mut it = e.orig.iter().map(|o| dirs[*o]);
        let first = it.next().flatten()?;
        it.all(|d| d == Some(first)).then_some(first)
    };
    matches!((dir_of(a), dir_of(b)), (Some(x), Some(y)) if x == y)
}

/// Folds the nodes at `lpos + 1..=rpos` of rank `r` into the node at `lpos`.
fn merge_virtual(lg: &mut Layered, r: usize, lpos: usize, rpos: usize, dir: Dir) {
    let left = lg.ranks[r][lpos];
    for i in lpos + 1..=rpos {
        let right = lg.ranks[r][i];
        let (near, far) = match dir {
            Dir::Down => (lg.g.in_edges(right)[0], lg.g.out_edges(right)[0]),
            Dir::Up => (lg.g.out_edges(right)[0], lg.g.in_edges(right)[0]),
        };
        // The shared side collapses onto left's existing segment.
        let left_near = match dir {
            Dir::Down => lg.g.in_edges(left)[0],
            Dir::Up => lg.g.out_edges(left)[0],
        };
        absorb(lg, left_near, near);

        let other = match dir {
            Dir::Down => lg.g.head(far),
            Dir::Up => lg.g.tail(far),
        };
        let existing = match dir {
            Dir::Down => lg.g.find_edge(left, other),
            Dir::Up => lg.g.find_edge(other, left),
        };
        match existing {
            Some(keep) => absorb(lg, keep, far),
            None => {
                let fe = lg.g.edge(far);
                let (weight, minlen, data) = (fe.weight, fe.minlen, fe.data.clone());
                match dir {
                    Dir::Down => lg.g.add_edge(left, other, weight, minlen, data),
                    Dir::Up => lg.g.add_edge(other, left, weight, minlen, data),
                };
                lg.g.delete_fast_edge(far);
            }
        }
    }
    lg.ranks[r].drain(lpos + 1..=rpos);
    lg.renumber(r);
}

/// Moves the real edges of `absorb` onto `keep` and deletes `absorb`.
fn absorb(lg: &mut Layered, keep: FEdge, absorb: FEdge) {
    let orig = std::mem::take(&mut lg.g.edge_mut(absorb).data.orig);
    let xpenalty = lg.g.edge(absorb).data.xpenalty;
    let data = &mut lg.g.edge_mut(keep).data;
    data.orig.extend(orig);
    data.xpenalty = data.xpenalty.saturating_add(xpenalty);
    lg.g.merge_edges(keep, absorb);
}

/// Rebuilds every chain route from the segments that now carry it.
pub(crate) fn retrace_chains(lg: &mut Layered) {
    for ix in 0..lg.route.len() {
        let Route::Chain { reversed, .. } = lg.route[ix] else {
            continue;
        };
        let Some((from, to)) = chain_ends(lg, ix) else {
            continue;
        };
        let to_rank = lg.g.rank(to);
        let edges = lg.trace_chain(ix, from, to_rank);
        lg.route[ix] = Route::Chain { edges, reversed };
    }
}

/// The upper and lower layout endpoints of a chained real edge.
fn chain_ends(lg: &Layered, ix: usize) -> Option<(FNode, FNode)> {
    let Route::Chain { edges, .. } = &lg.route[ix] else {
        return None;
    };
    let first = *edges.first()?;
    let last = *edges.last()?;
    Some((lg.g.tail(first), lg.g.head(last)))
}
