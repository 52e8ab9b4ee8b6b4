//! Edge routing.
//!
//! Every real edge gets one spline in the layout frame, oriented from its tail to its head.
//! Edges are routed in groups of equivalent edges (same layout path, same ports); a group is
//! routed once and its members spread `nodesep` apart. Regular edges run through a corridor
//! of boxes down their chain of virtual nodes, flat edges arc over (or under) their rank, and
//! self loops are drawn beside their node.

mod boxes;
mod flat;
mod regular;
mod route;
mod selfloop;

use crate::config::{RankDir, Splines};
use crate::init::DotGraph;
use crate::model::{Layered, Route};
use crate::position::flat_adjacent;
use indexmap::IndexMap;
use sirenia_graph::clip::{ArrowSpec, ClipEnd, clip_and_install, polyline_to_bezier};
use sirenia_graph::{
    BBox, Bezier, FEdge, FNode, Point, Port, Shape, ShapeDesc, WarningKind, Warnings, sides,
};

use boxes::MINW;
use route::BoxPath;

/// A node outline seen from the layout frame.
///
/// Shapes are described in the drawing frame; points handed to [`Shape::inside`] are mapped
/// back through the rank direction first. Port boxes are already in the layout frame.
pub struct FramedShape<'a> {
    shape: &'a ShapeDesc,
    dir: RankDir,
}

impl<'a> FramedShape<'a> {
    pub fn new(shape: &'a ShapeDesc, dir: RankDir) -> Self {
        Self { shape, dir }
    }
}

impl Shape for FramedShape<'_> {
    fn inside(&self, p: Point, bp: Option<&BBox>) -> bool {
        match bp {
            Some(bp) => bp.contains(p),
            None => self.shape.inside(self.dir.to_final(p), None),
        }
    }

    fn port_box(&self, port: &str, compass: Option<&str>) -> Option<Port> {
        self.shape.port_box(port, compass)
    }
}

/// Outward normal of a port side.
fn side_dir(side: u8) -> Option<Point> {
    if side & sides::TOP != 0 {
        Some(Point::new(0.0, 1.0))
    } else if side & sides::BOTTOM != 0 {
        Some(Point::new(0.0, -1.0))
    } else if side & sides::LEFT != 0 {
        Some(Point::new(-1.0, 0.0))
    } else if side & sides::RIGHT != 0 {
        Some(Point::new(1.0, 0.0))
    } else {
        None
    }
}

/// Port geometry reduced to a hashable key.
type PortKey = (bool, i64, i64);

fn port_key(p: &Port) -> PortKey {
    (
        p.defined,
        (p.p.x * 1000.0).round() as i64,
        (p.p.y * 1000.0).round() as i64,
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Chain(Vec<FEdge>),
    Flat(usize, PortKey, PortKey),
    FlatLabel(usize),
    SelfLoop(FNode, PortKey, PortKey),
}

pub(crate) struct Router<'a> {
    pub dg: &'a DotGraph,
    pub lg: &'a Layered,
    pub left_bound: f64,
    pub right_bound: f64,
    /// Gap kept between an edge and a virtual neighbour.
    pub splinesep: f64,
    /// Spacing of the members of a multi-edge.
    pub multisep: f64,
    /// Right extent of each node including its self loops.
    pub mval: Vec<f64>,
    pub mode: Splines,
    pub out: Vec<Vec<Bezier>>,
    /// Label centres decided while routing (self loops, flat edges between neighbours).
    pub labels: Vec<(usize, Point)>,
    warnings: &'a mut Warnings,
}

/// Routes every edge. Returns the splines per real edge, in the layout frame; label centres
/// decided here are written to `lg.label_pos`.
pub fn dot_splines(dg: &DotGraph, lg: &mut Layered, warnings: &mut Warnings) -> Vec<Vec<Bezier>> {
    if dg.cfg.splines == Splines::None || lg.ranks.iter().all(Vec::is_empty) {
        return vec![Vec::new(); dg.edges.len()];
    }
    let (out, labels) = {
        let mut router = Router::new(dg, lg, warnings);
        router.run();
        (router.out, router.labels)
    };
    for (e, p) in labels {
        lg.label_pos[e] = Some(p);
    }
    let routed = out.iter().filter(|s| !s.is_empty()).count();
    tracing::debug!(routed, edges = dg.edges.len(), "edges routed");
    out
}

impl<'a> Router<'a> {
    fn new(dg: &'a DotGraph, lg: &'a Layered, warnings: &'a mut Warnings) -> Self {
        let mut left_bound = f64::INFINITY;
        let mut right_bound = f64::NEG_INFINITY;
        for rank in &lg.ranks {
            let (Some(first), Some(last)) = (rank.first(), rank.last()) else {
                continue;
            };
            let (f, l) = (&lg.g.node(*first).data, &lg.g.node(*last).data);
            left_bound = left_bound.min(f.x - f.lw);
            right_bound = right_bound.max(l.x + l.rw);
        }
        let mut mval = vec![0.0; lg.g.node_count()];
        for v in lg.ranks.iter().flatten() {
            let data = &lg.g.node(*v).data;
            mval[v.0] = data.rw
                + data
                    .self_loops
                    .iter()
                    .map(|e| crate::position::self_right_space(dg, *e))
                    .sum::<f64>();
        }
        Router {
            dg,
            lg,
            left_bound: left_bound - MINW,
            right_bound: right_bound + MINW,
            splinesep: dg.cfg.nodesep / 4.0,
            multisep: dg.cfg.nodesep,
            mval,
            mode: dg.cfg.splines,
            out: vec![Vec::new(); dg.edges.len()],
            labels: Vec::new(),
            warnings,
        }
    }

    fn run(&mut self) {
        for (key, edges) in self.groups() {
            match key {
                GroupKey::Chain(_) => self.make_regular_edges(&edges),
                GroupKey::Flat(f, ..) => self.make_flat_edges(f, &edges),
                GroupKey::FlatLabel(e) => self.make_flat_labeled_edge(e),
                GroupKey::SelfLoop(v, ..) => self.make_self_edges(v, &edges),
            }
        }
    }

    /// Equivalent edges, in the order their first member appears.
    fn groups(&self) -> IndexMap<GroupKey, Vec<usize>> {
        let (dg, lg) = (self.dg, self.lg);
        let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
        for (e, info) in dg.edges.iter().enumerate() {
            let key = match &lg.route[e] {
                Route::Chain { edges, .. } if !edges.is_empty() => GroupKey::Chain(edges.clone()),
                Route::Flat(f) => {
                    let fe = &lg.flat[*f];
                    if info.label.is_some()
                        && lg.flat_label.contains_key(&e)
                        && !flat_adjacent(lg, fe.tail, fe.head)
                    {
                        GroupKey::FlatLabel(e)
                    } else {
                        let (a, b) = self.oriented_ports(e, self.left_end(*f));
                        GroupKey::Flat(*f, port_key(a), port_key(b))
                    }
                }
                Route::SelfLoop => GroupKey::SelfLoop(
                    lg.node_of[info.tail],
                    port_key(&info.tail_port),
                    port_key(&info.head_port),
                ),
                _ => continue,
            };
            groups.entry(key).or_default().push(e);
        }
        groups
    }

    /// The leftmost end of flat edge `f`.
    fn left_end(&self, f: usize) -> FNode {
        let fe = &self.lg.flat[f];
        if self.lg.order(fe.tail) <= self.lg.order(fe.head) {
            fe.tail
        } else {
            fe.head
        }
    }

    /// Whether real edge `e` is drawn starting at layout node `from`.
    fn starts_at(&self, e: usize, from: FNode) -> bool {
        self.lg.node_of[self.dg.edges[e].tail] == from
    }

    /// Ports of `e` ordered as (at `from`, at the other end).
    fn oriented_ports(&self, e: usize, from: FNode) -> (&'a Port, &'a Port) {
        let info = &self.dg.edges[e];
        if self.starts_at(e, from) {
            (&info.tail_port, &info.head_port)
        } else {
            (&info.head_port, &info.tail_port)
        }
    }

    /// Routes `path` with the configured edge style, falling back to a straight segment.
    fn route(&mut self, path: &BoxPath, e: usize) -> Vec<Point> {
        let routed = match self.mode {
            Splines::Polyline | Splines::Line => route::route_polylines(path),
            _ => route::route_splines(path),
        };
        routed.unwrap_or_else(|| {
            self.warnings.warn(
                WarningKind::Layout,
                format!("unable to find a route for edge {e}; drawing it straight"),
            );
            polyline_to_bezier(&[path.start, path.end])
        })
    }

    /// Clips `raw` (running from `from` to `to`) to both end shapes and stores it for `e`,
    /// turned round when `e` runs the other way.
    fn install(&mut self, e: usize, raw: &[Point], from: FNode, to: FNode, side_ports: (bool, bool)) {
        let (dg, lg) = (self.dg, self.lg);
        let info = &dg.edges[e];
        let forward = self.starts_at(e, from);
        let (from_port, to_port) = self.oriented_ports(e, from);
        let arrows = if forward {
            ArrowSpec {
                start: info.arrow_tail,
                end: info.arrow_head,
            }
        } else {
            ArrowSpec {
                start: info.arrow_head,
                end: info.arrow_tail,
            }
        };
        let dir = dg.cfg.rankdir;
        let shape_of = |v: FNode| {
            lg.g.node(v)
                .data
                .real
                .map(|r| FramedShape::new(&dg.nodes[r].shape, dir))
        };
        let (fs, ts) = (shape_of(from), shape_of(to));
        let from_end = fs.as_ref().map(|s| ClipEnd {
            center: lg.coord(from),
            shape: s,
            bp: from_port.bp,
            clip: from_port.clip && !side_ports.0,
        });
        let to_end = ts.as_ref().map(|s| ClipEnd {
            center: lg.coord(to),
            shape: s,
            bp: to_port.bp,
            clip: to_port.clip && !side_ports.1,
        });
        match clip_and_install(raw, from_end.as_ref(), to_end.as_ref(), arrows) {
            Some(mut spl) => {
                if !forward {
                    spl.reverse();
                }
                self.out[e].push(spl);
            }
            None => {
                self.warnings.warn(
                    WarningKind::Layout,
                    format!("edge {e} produced a degenerate spline"),
                );
            }
        }
    }
}
