//! The stress engine on an attributed graph: options from attributes, coordinates back onto the
//! nodes, and straight edges between them.

use crate::postproc;
use sirenia_dot::config::{Ratio, parse_size};
use sirenia_graph::attrs::parse_point;
use sirenia_graph::clip::{ARROW_LENGTH, ArrowSpec, ClipEnd, clip_and_install, line_bezier};
use sirenia_graph::{BBox, EdgeId, Graph, NodeId, Point, WarningKind};
use sirenia_stress::options::MAX_DIM;
use sirenia_stress::{Mode, Model, Start, StressGraph, StressOptions};

/// Ideal edge length below which `len` is clamped, in inches.
const MIN_EDGE_LEN: f64 = 0.01;
/// Loop reach beyond the node per stacked self loop.
const SELF_LOOP_STEP: f64 = 18.0;

pub(crate) fn stress_layout(g: &mut Graph) -> crate::Result<()> {
    let nodes: Vec<NodeId> = g.iter_nodes().collect();
    if nodes.is_empty() {
        g.bb = BBox::default();
        return Ok(());
    }
    let opts = options(g);
    let mut sg = StressGraph::new();
    for &n in &nodes {
        let i = sg.add_node(g.node(n).name.clone());
        let pin_attr = g.node_bool(n, "pin", false);
        if let Some(raw) = g.node_attr(n, "pos").map(str::to_string) {
            match parse_point(&raw) {
                Some((x, y, pinned)) => {
                    sg.nodes[i].pos = Some(vec![x, y]);
                    sg.nodes[i].pinned = pinned || pin_attr;
                }
                None => {
                    let msg = format!("invalid pos {raw:?} on node {}; ignored", g.node(n).name);
                    g.warnings.warn(WarningKind::MalformedPos, msg);
                }
            }
        }
    }
    for e in g.iter_edges().collect::<Vec<_>>() {
        let len = g.edge_double(e, "len", 1.0, MIN_EDGE_LEN);
        sg.add_edge_with_len(g.tail(e).0, g.head(e).0, len);
    }

    let out = sirenia_stress::layout(&sg, &opts)?;
    for note in &out.notes {
        g.warnings.warn(WarningKind::Layout, note.clone());
    }
    for (i, &n) in nodes.iter().enumerate() {
        let (x, y) = out.xy(i);
        let layout = &mut g.node_mut(n).layout;
        layout.coord = Point::new(x, y);
        layout.pinned = sg.nodes[i].pinned;
    }
    tracing::debug!(
        iterations = out.iterations,
        stress = out.stress,
        "stress coordinates assigned"
    );

    set_aspect(g, &nodes);
    route_edges(g);
    postproc::cluster_boxes(g);
    g.bb = drawing_box(g);
    Ok(())
}

fn options(g: &mut Graph) -> StressOptions {
    let mut opts = StressOptions::default();
    if let Some(raw) = g.graph_attr("mode").map(str::to_string) {
        opts.mode = match raw.trim().to_ascii_lowercase().as_str() {
            "hier" | "ipsep" => {
                g.warnings.warn(
                    WarningKind::Unsupported,
                    format!("mode={raw} is not supported; using major"),
                );
                Some(Mode::Major)
            }
            _ => Mode::parse(&raw).or_else(|| {
                g.warnings.warn(
                    WarningKind::MalformedAttribute,
                    format!("invalid mode {raw:?}; using the default"),
                );
                None
            }),
        };
    }
    if let Some(raw) = g.graph_attr("model").map(str::to_string) {
        match Model::parse(&raw) {
            Some(m) => opts.model = m,
            None => {
                g.warnings.warn(
                    WarningKind::MalformedAttribute,
                    format!("invalid model {raw:?}; using shortpath"),
                );
            }
        }
    }
    if let Some(raw) = g.graph_attr("start").map(str::to_string) {
        opts.start = Start::parse(&raw);
        if opts.start.is_none() {
            g.warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid start {raw:?}; using the default"),
            );
        }
    }
    if g.graph_attr("maxiter").is_some() {
        opts.max_iter = Some(g.graph_int("maxiter", 200, 0) as usize);
    }
    if g.graph_attr("epsilon").is_some() {
        opts.epsilon = Some(g.graph_double("epsilon", 1e-3, f64::MIN_POSITIVE));
    }
    opts.stress_exp = g.graph_int("stresswt", 2, 1).min(2) as u8;
    opts.dim = (g.graph_int("dim", 2, 2) as usize).min(MAX_DIM);
    opts.levels = g.graph_int("levels", 0, 0) as usize;
    opts
}

/// `ratio` scales node centres; edges are drawn afterwards.
fn set_aspect(g: &mut Graph, nodes: &[NodeId]) {
    let Some(raw) = g.graph_attr("ratio").map(str::to_string) else {
        return;
    };
    let Some(ratio) = Ratio::parse(&raw) else {
        g.warnings.warn(
            WarningKind::MalformedAttribute,
            format!("invalid ratio {raw:?}; ignored"),
        );
        return;
    };
    let size = parse_size(g);
    let mut bb = BBox::empty();
    for &n in nodes {
        bb = bb.union(&g.node(n).layout.bbox());
    }
    let Some((xf, yf)) = ratio.factors(Point::new(bb.width(), bb.height()), size) else {
        return;
    };
    for &n in nodes {
        let c = &mut g.node_mut(n).layout.coord;
        *c = Point::new(c.x * xf, c.y * yf);
    }
}

fn arrows(g: &mut Graph, e: EdgeId) -> ArrowSpec {
    let len = ARROW_LENGTH * g.edge_double(e, "arrowsize", 1.0, 0.0);
    if len <= 0.0 {
        return ArrowSpec::default();
    }
    let default_dir = if g.directed { "forward" } else { "none" };
    match g.edge_attr(e, "dir").unwrap_or(default_dir) {
        "back" => ArrowSpec {
            start: Some(len),
            end: None,
        },
        "both" => ArrowSpec {
            start: Some(len),
            end: Some(len),
        },
        "none" => ArrowSpec::default(),
        _ => ArrowSpec {
            start: None,
            end: Some(len),
        },
    }
}

/// Straight edges clipped to the node outlines, loops on the right of their node.
fn route_edges(g: &mut Graph) {
    match g.graph_attr("splines").map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s.is_empty() || s == "none" => return,
        Some(s) if !matches!(s.as_str(), "line" | "false" | "no") => {
            g.warnings.warn(
                WarningKind::Unsupported,
                format!("splines={s} is not supported by the stress engine; using straight lines"),
            );
        }
        _ => {}
    }
    let mut loops_at: Vec<usize> = vec![0; g.node_count()];
    for e in g.iter_edges().collect::<Vec<_>>() {
        let spec = arrows(g, e);
        let (t, h) = (g.tail(e), g.head(e));
        let raw = if t == h {
            let k = loops_at[t.0];
            loops_at[t.0] += 1;
            self_loop(g, t, k)
        } else {
            let tp = &g.edge(e).layout.tail_port;
            let hp = &g.edge(e).layout.head_port;
            line_bezier(g.node(t).layout.coord + tp.p, g.node(h).layout.coord + hp.p)
        };
        let edge = g.edge(e);
        let (tn, hn) = (&g.node(t).layout, &g.node(h).layout);
        let tail = ClipEnd {
            center: tn.coord,
            shape: &tn.shape,
            bp: edge.layout.tail_port.bp,
            clip: edge.layout.tail_port.clip,
        };
        let head = ClipEnd {
            center: hn.coord,
            shape: &hn.shape,
            bp: edge.layout.head_port.bp,
            clip: edge.layout.head_port.clip,
        };
        let Some(spl) = clip_and_install(&raw, Some(&tail), Some(&head), spec) else {
            continue;
        };
        let mid = spline_midpoint(&spl.points);
        let layout = &mut g.edge_mut(e).layout;
        if let Some(label) = layout.label.as_mut() {
            label.pos = mid;
            label.set = true;
        }
        layout.spl = vec![spl];
    }
}

/// Control points of the `k`-th loop on the right of `n`.
fn self_loop(g: &Graph, n: NodeId, k: usize) -> Vec<Point> {
    let layout = &g.node(n).layout;
    let c = layout.coord;
    let (w, a) = (layout.rw, layout.ht / 6.0);
    let reach = w + SELF_LOOP_STEP * (k + 1) as f64;
    let b = SELF_LOOP_STEP * (k + 1) as f64 / 2.0;
    [
        (0.0, a),
        (w, a + b),
        (reach, a + b),
        (reach, 0.0),
        (reach, -a - b),
        (w, -a - b),
        (0.0, -a),
    ]
    .into_iter()
    .map(|(x, y)| c + Point::new(x, y))
    .collect()
}

fn spline_midpoint(points: &[Point]) -> Point {
    match points {
        [] => Point::default(),
        [p] => *p,
        _ => {
            let (a, b) = (points[0], points[points.len() - 1]);
            if points.len() == 4 {
                (a + b) * 0.5
            } else {
                points[points.len() / 2]
            }
        }
    }
}

fn drawing_box(g: &Graph) -> BBox {
    let mut bb = BBox::empty();
    for n in g.iter_nodes() {
        bb = bb.union(&g.node(n).layout.bbox());
    }
    for e in g.iter_edges() {
        let layout = &g.edge(e).layout;
        for b in &layout.spl {
            bb = bb.union(&b.bbox());
        }
        if let Some(l) = layout.label.as_ref().filter(|l| l.set) {
            bb = bb.union(&BBox::from_center(l.pos, l.dimen.x, l.dimen.y));
        }
    }
    for sg in g.subgraphs_preorder() {
        let cb = g.subgraph(sg).layout.bb;
        if g.is_cluster(sg) && !cb.is_empty() && cb != BBox::default() {
            bb = bb.union(&cb);
        }
    }
    bb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loops_grow_outward() {
        let mut g = Graph::new("G", true);
        let a = g.add_node("a");
        g.node_mut(a).layout.rw = 27.0;
        g.node_mut(a).layout.ht = 36.0;
        let first = self_loop(&g, a, 0);
        let second = self_loop(&g, a, 1);
        assert_eq!(first.len(), 7);
        assert!(second[3].x > first[3].x);
        assert_eq!(first[0], Point::new(0.0, 6.0));
    }
}
