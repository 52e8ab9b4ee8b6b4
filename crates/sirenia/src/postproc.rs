//! Post-processing shared by the engines: label placement, `pad` and translation to the origin.
//!
//! Engines leave their results in the drawing frame with `rankdir` and `ratio` already applied
//! and `g.bb` covering nodes, splines, edge labels and cluster boxes. Post-processing makes room
//! for the root label, places cluster and root labels, adds `pad` and moves the lower-left corner
//! of the drawing to the origin.

use sirenia_graph::{BBox, Graph, Label, Point, SubgraphId};

/// Extra room around a graph or cluster label, in points.
pub const LABEL_PADDING: Point = Point::new(16.0, 8.0);
/// Default `pad`, in inches.
pub const DEFAULT_PAD: f64 = 4.0 / 72.0;
/// Gap between a stress cluster's members and its border.
const CLUSTER_MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Just {
    Left,
    Center,
    Right,
}

impl Just {
    fn parse(raw: Option<&str>) -> Just {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s.starts_with('l') => Just::Left,
            Some(s) if s.starts_with('r') => Just::Right,
            _ => Just::Center,
        }
    }
}

fn at_bottom(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s.starts_with('b') => true,
        Some(s) if s.starts_with('t') => false,
        _ => default,
    }
}

/// Reads `notranslate` and runs [`postprocess`].
pub fn dot_postprocess(g: &mut Graph) {
    let translate = !g.graph_bool("notranslate", false);
    postprocess(g, translate);
}

pub fn postprocess(g: &mut Graph, translate: bool) {
    if g.bb.is_empty() {
        g.bb = BBox::default();
    }
    center_node_labels(g);
    place_cluster_labels(g);
    place_root_label(g);
    let pad = g.graph_double("pad", DEFAULT_PAD, 0.0) * 72.0;
    g.bb = g.bb.expand(pad, pad);
    if translate {
        let offset = Point::new(-g.bb.ll.x, -g.bb.ll.y);
        translate_drawing(g, offset);
    }
    tracing::trace!(
        width = g.bb.width(),
        height = g.bb.height(),
        translate,
        "post-processing done"
    );
}

fn label_center(bb: &BBox, d: Point, just: Just, bottom: bool) -> Point {
    let y = if bottom {
        bb.ll.y + d.y / 2.0
    } else {
        bb.ur.y - d.y / 2.0
    };
    let x = match just {
        Just::Left => bb.ll.x + d.x / 2.0,
        Just::Right => bb.ur.x - d.x / 2.0,
        Just::Center => bb.center().x,
    };
    Point::new(x, y)
}

fn center_node_labels(g: &mut Graph) {
    for n in g.iter_nodes().collect::<Vec<_>>() {
        let layout = &mut g.node_mut(n).layout;
        if let Some(label) = layout.label.as_mut() {
            label.pos = layout.coord;
            label.set = true;
        }
    }
}

fn place_cluster_labels(g: &mut Graph) {
    for sg in g.subgraphs_preorder() {
        if !g.is_cluster(sg) {
            continue;
        }
        let bb = g.subgraph(sg).layout.bb;
        let pending = g
            .subgraph(sg)
            .layout
            .label
            .as_ref()
            .is_some_and(|l| !l.set);
        if !pending || bb.is_empty() {
            continue;
        }
        let just = Just::parse(g.subgraph_attr(sg, "labeljust"));
        let bottom = at_bottom(g.subgraph_attr(sg, "labelloc"), false);
        let layout = &mut g.subgraph_mut(sg).layout;
        let Some(label) = layout.label.as_mut() else {
            continue;
        };
        let p = label_center(&bb, label.dimen + LABEL_PADDING, just, bottom);
        label.pos = p;
        label.set = true;
        layout.label_pos = p;
    }
}

/// The root label sits below the drawing unless `labelloc=t`.
fn place_root_label(g: &mut Graph) {
    let Some(dimen) = g.label.as_ref().map(|l| l.dimen) else {
        return;
    };
    let d = dimen + LABEL_PADDING;
    let bottom = at_bottom(g.graph_attr("labelloc"), true);
    let just = Just::parse(g.graph_attr("labeljust"));
    let mut bb = g.bb;
    if bottom {
        bb.ll.y -= d.y;
    } else {
        bb.ur.y += d.y;
    }
    if d.x > bb.width() {
        let grow = (d.x - bb.width()) / 2.0;
        bb.ll.x -= grow;
        bb.ur.x += grow;
    }
    g.bb = bb;
    let p = label_center(&bb, d, just, bottom);
    if let Some(label) = g.label.as_mut() {
        label.pos = p;
        label.set = true;
    }
}

fn shift_label(label: &mut Option<Label>, d: Point) {
    if let Some(l) = label.as_mut().filter(|l| l.set) {
        l.pos = l.pos + d;
    }
}

fn translate_drawing(g: &mut Graph, d: Point) {
    if d == Point::default() {
        return;
    }
    for n in g.iter_nodes().collect::<Vec<_>>() {
        let layout = &mut g.node_mut(n).layout;
        layout.coord = layout.coord + d;
        shift_label(&mut layout.label, d);
    }
    for e in g.iter_edges().collect::<Vec<_>>() {
        let layout = &mut g.edge_mut(e).layout;
        for b in &mut layout.spl {
            b.map_points(|p| p + d);
        }
        shift_label(&mut layout.label, d);
    }
    for sg in g.subgraphs_preorder() {
        let layout = &mut g.subgraph_mut(sg).layout;
        if !layout.bb.is_empty() {
            layout.bb = layout.bb.translate(d);
        }
        if let Some(l) = layout.label.as_mut().filter(|l| l.set) {
            l.pos = l.pos + d;
            layout.label_pos = l.pos;
        }
    }
    shift_label(&mut g.label, d);
    g.bb = g.bb.translate(d);
}

/// Cluster boxes from member nodes, for engines that do not compute them.
///
/// Children are boxed before their parents; each box keeps a margin around its members and room
/// for its label at the top, or at the bottom with `labelloc=b`.
pub(crate) fn cluster_boxes(g: &mut Graph) {
    let order = g.subgraphs_preorder();
    for &sg in order.iter().rev() {
        if !g.is_cluster(sg) {
            continue;
        }
        let bb = cluster_box(g, sg);
        g.subgraph_mut(sg).layout.bb = bb;
    }
}

fn cluster_box(g: &Graph, sg: SubgraphId) -> BBox {
    let sub = g.subgraph(sg);
    let mut bb = BBox::empty();
    for &n in &sub.nodes {
        bb = bb.union(&g.node(n).layout.bbox());
    }
    for &c in &sub.children {
        let cb = g.subgraph(c).layout.bb;
        if g.is_cluster(c) && !cb.is_empty() {
            bb = bb.union(&cb);
        }
    }
    if bb.is_empty() {
        return bb;
    }
    bb = bb.expand(CLUSTER_MARGIN, CLUSTER_MARGIN);
    if let Some(label) = sub.layout.label.as_ref() {
        let room = label.dimen.y + CLUSTER_MARGIN;
        if at_bottom(g.subgraph_attr(sg, "labelloc"), false) {
            bb.ll.y -= room;
        } else {
            bb.ur.y += room;
        }
        let d = label.dimen + LABEL_PADDING;
        if d.x > bb.width() {
            let grow = (d.x - bb.width()) / 2.0;
            bb.ll.x -= grow;
            bb.ur.x += grow;
        }
    }
    bb
}
