//! The dot pipeline: rank, order, position, route, then write the results back.
//!
//! All intermediate state lives in [`DotGraph`] and [`Layered`]; the user graph is only touched
//! once the last requested phase succeeded, so a failing layout leaves it as it was apart from
//! the warning stream.

use crate::class2;
use crate::config::{RankDir, Splines};
use crate::init::DotGraph;
use crate::mincross;
use crate::model::{Layered, Route};
use crate::position;
use crate::rank::{self, Ranking};
use crate::splines;
use sirenia_graph::{BBox, Bezier, Graph, Result, WarningKind};

/// How far a layout run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Rank = 1,
    Order = 2,
    Position = 3,
    Route = 4,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct DotStats {
    pub phase: Phase,
    pub ranks: usize,
    pub crossings: i64,
}

/// Lays out `g` with the hierarchical engine.
///
/// Node sizes, shapes, labels and ports must already be on the layout records. Stops early when
/// `phase` is set, writing back what the completed phases produced.
pub fn dot_layout(g: &mut Graph) -> Result<DotStats> {
    g.validate()?;
    let mut dg = DotGraph::from_graph(g);
    if dg.cfg.splines == Splines::Curved && dg.has_edge_labels {
        dg.warnings.warn(
            WarningKind::Unsupported,
            "curved edges do not support edge labels; labels are placed as for splines",
        );
    }
    let result = run(&mut dg);
    g.warnings.absorb(std::mem::take(&mut dg.warnings));
    let out = result?;
    let stats = DotStats {
        phase: out.phase,
        ranks: out.ranks(),
        crossings: out.crossings,
    };
    out.apply(&dg, g);
    tracing::debug!(
        phase = ?stats.phase,
        ranks = stats.ranks,
        crossings = stats.crossings,
        "dot layout done"
    );
    Ok(stats)
}

struct Outcome {
    phase: Phase,
    ranking: Ranking,
    lg: Option<Layered>,
    crossings: i64,
    splines: Vec<Vec<Bezier>>,
}

fn run(dg: &mut DotGraph) -> Result<Outcome> {
    let stop = dg.cfg.phase;
    let ranking = rank::dot_rank(dg)?;
    let mut out = Outcome {
        phase: Phase::Rank,
        ranking,
        lg: None,
        crossings: 0,
        splines: Vec::new(),
    };
    if stop == 1 {
        return Ok(out);
    }

    let mut lg = class2::build(dg, &out.ranking);
    out.crossings = mincross::dot_mincross(dg, &mut lg)?;
    out.phase = Phase::Order;
    if stop == 2 {
        out.lg = Some(lg);
        return Ok(out);
    }

    let mut warnings = std::mem::take(&mut dg.warnings);
    let positioned = position::dot_position(dg, &mut lg, &mut warnings);
    dg.warnings = warnings;
    positioned?;
    out.phase = Phase::Position;
    if stop == 3 {
        out.lg = Some(lg);
        return Ok(out);
    }

    let mut warnings = std::mem::take(&mut dg.warnings);
    out.splines = splines::dot_splines(dg, &mut lg, &mut warnings);
    dg.warnings = warnings;
    out.phase = Phase::Route;
    out.lg = Some(lg);
    Ok(out)
}

impl Outcome {
    fn ranks(&self) -> usize {
        match &self.lg {
            Some(lg) => lg.ranks.len(),
            None if self.ranking.rank.is_empty() => 0,
            None => self.ranking.max_rank() as usize + 1,
        }
    }

    fn apply(self, dg: &DotGraph, g: &mut Graph) {
        let dir = dg.cfg.rankdir;
        let Some(lg) = self.lg else {
            for (i, info) in dg.nodes.iter().enumerate() {
                g.node_mut(info.id).layout.rank = self.ranking.rank[i];
            }
            write_cluster_ranks(dg, g, &self.ranking.cluster_span);
            return;
        };

        for (i, info) in dg.nodes.iter().enumerate() {
            let v = lg.node_of[i];
            let node = lg.g.node(v);
            let layout = &mut g.node_mut(info.id).layout;
            layout.rank = node.rank;
            layout.order = node.order;
            if self.phase < Phase::Position {
                continue;
            }
            layout.coord = dir.to_final(lg.coord(v));
            let (w, h) = if dir.is_flipped() {
                (info.ht, info.lw + info.rw)
            } else {
                (info.lw + info.rw, info.ht)
            };
            layout.width = w;
            layout.height = h;
            layout.lw = w / 2.0;
            layout.rw = w / 2.0;
            layout.ht = h;
        }
        write_cluster_ranks(dg, g, &lg.cluster_span);

        for (e, info) in dg.edges.iter().enumerate() {
            let reversed = match &lg.route[e] {
                Route::Chain { reversed, .. } => *reversed,
                Route::Flat(f) => lg.flat[*f].reversed,
                Route::SelfLoop | Route::Ignored => false,
            };
            let layout = &mut g.edge_mut(info.id).layout;
            layout.reversed = reversed;
            if self.phase < Phase::Position {
                continue;
            }
            if let (Some(label), Some(p)) = (layout.label.as_mut(), lg.label_pos[e]) {
                label.pos = dir.to_final(p);
                label.set = true;
            }
            if let Some(spl) = self.splines.get(e) {
                layout.spl = spl.iter().map(|b| bezier_to_final(b, dir)).collect();
            }
        }

        if self.phase < Phase::Position {
            return;
        }
        let mut bb = BBox::empty();
        for (c, info) in dg.clusters.iter().enumerate() {
            let cb = box_to_final(lg.cluster_bb[c], dir);
            bb = bb.union(&cb);
            g.subgraph_mut(info.sg).layout.bb = cb;
        }
        for info in &dg.nodes {
            bb = bb.union(&g.node(info.id).layout.bbox());
        }
        for info in &dg.edges {
            let layout = &g.edge(info.id).layout;
            for b in &layout.spl {
                bb = bb.union(&b.bbox());
            }
            if let Some(l) = layout.label.as_ref().filter(|l| l.set) {
                bb = bb.union(&BBox::from_center(l.pos, l.dimen.x, l.dimen.y));
            }
        }
        g.bb = bb;
    }
}

fn write_cluster_ranks(dg: &DotGraph, g: &mut Graph, spans: &[(i32, i32)]) {
    for (info, (lo, hi)) in dg.clusters.iter().zip(spans) {
        let layout = &mut g.subgraph_mut(info.sg).layout;
        layout.min_rank = *lo;
        layout.max_rank = *hi;
    }
}

fn bezier_to_final(b: &Bezier, dir: RankDir) -> Bezier {
    let mut out = b.clone();
    out.map_points(|p| dir.to_final(p));
    out
}

fn box_to_final(b: BBox, dir: RankDir) -> BBox {
    if b.is_empty() {
        return b;
    }
    let (p, q) = (dir.to_final(b.ll), dir.to_final(b.ur));
    BBox::from_coords(p.x.min(q.x), p.y.min(q.y), p.x.max(q.x), p.y.max(q.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirenia_graph::Point;

    #[test]
    fn left_to_right_boxes_stay_normalized() {
        let b = BBox::from_coords(0.0, 0.0, 10.0, 20.0);
        let f = box_to_final(b, RankDir::LeftRight);
        assert!(f.ll.x <= f.ur.x && f.ll.y <= f.ur.y);
        assert_eq!(f.width(), 20.0);
        assert_eq!(f.height(), 10.0);
    }

    #[test]
    fn bottom_top_mirrors_spline_points() {
        let b = Bezier {
            points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            ..Bezier::default()
        };
        let f = bezier_to_final(&b, RankDir::BottomTop);
        assert_eq!(f.points, vec![Point::new(1.0, -2.0), Point::new(3.0, -4.0)]);
    }
}
