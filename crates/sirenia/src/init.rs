//! Node, edge and cluster initialisation.
//!
//! Turns attributes into the layout records the engines read: node shapes and sizes, measured
//! labels (plain or HTML-like), edge ports, and cluster and graph labels. Sizes are in points;
//! `width`, `height` and `margin` are given in inches.

use sirenia_graph::text::{DEFAULT_FONTNAME, DEFAULT_FONTSIZE, measure_label};
use sirenia_graph::{
    EdgeId, FontSpec, Graph, Label, NodeId, POINTS_PER_INCH, Point, Port, ShapeDesc, ShapeKind,
    SubgraphId, TextMeasurer, WarningKind, Warnings,
};
use sirenia_html::{HtmlEnv, ImageSizer, html_ports, make_html_label};
use std::f64::consts::{PI, SQRT_2};

/// Inches.
pub const DEFAULT_NODE_WIDTH: f64 = 0.75;
pub const DEFAULT_NODE_HEIGHT: f64 = 0.5;
pub const MIN_NODE_WIDTH: f64 = 0.01;
pub const MIN_NODE_HEIGHT: f64 = 0.02;
pub const DEFAULT_POINT_SIZE: f64 = 0.05;
pub const MIN_POINT_SIZE: f64 = 0.0003;
/// Space between a node label and the node outline, per side, in inches.
pub const DEFAULT_NODE_MARGIN: (f64, f64) = (0.11, 0.055);
pub const MIN_FONTSIZE: f64 = 1.0;

/// What labels are measured with.
#[derive(Clone, Copy)]
pub struct Measure<'a> {
    pub text: &'a dyn TextMeasurer,
    pub images: &'a dyn ImageSizer,
}

/// Initialises every node, edge, cluster and the graph label.
pub fn init_graph(g: &mut Graph, text: &dyn TextMeasurer, images: &dyn ImageSizer) {
    let m = Measure { text, images };
    for n in g.iter_nodes().collect::<Vec<_>>() {
        init_node(g, n, m);
    }
    for e in g.iter_edges().collect::<Vec<_>>() {
        init_edge(g, e, m);
    }
    for sg in g.subgraphs_preorder() {
        if g.is_cluster(sg) {
            init_cluster(g, sg, m);
        }
    }
    init_root_label(g, m);
}

/// The body of an HTML-like label: a value written `<...>`.
pub fn html_body(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('<')?.strip_suffix('>')?;
    Some(inner)
}

/// Replaces `\N`, `\G`, `\E`, `\T` and `\H` with the object, graph, edge, tail and head names.
/// Other escapes are left for line splitting.
pub fn expand_escapes(raw: &str, names: &Names<'_>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let sub = match chars.peek() {
            Some('N') => Some(names.object),
            Some('G') => Some(names.graph),
            Some('E') => Some(names.object),
            Some('T') => names.tail,
            Some('H') => names.head,
            _ => None,
        };
        match sub {
            Some(s) => {
                chars.next();
                out.push_str(s);
            }
            None => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
        }
    }
    out
}

pub struct Names<'a> {
    pub object: &'a str,
    pub graph: &'a str,
    pub tail: Option<&'a str>,
    pub head: Option<&'a str>,
}

/// A measured label and, for HTML-like labels, the laid-out table (centred on the origin).
pub struct Made {
    pub label: Label,
    pub html: Option<sirenia_html::HtmlLabel>,
}

/// Measures `raw` (already escape-expanded for plain text). An HTML-like label that fails to
/// parse warns and is measured as plain text.
pub fn make_label(
    raw: &str,
    font: FontSpec,
    font_color: Option<String>,
    m: Measure<'_>,
    warnings: &mut Warnings,
) -> Made {
    let mut text = raw;
    if let Some(body) = html_body(raw) {
        let env = HtmlEnv {
            measurer: m.text,
            images: m.images,
            font: font.clone(),
            font_color,
        };
        match make_html_label(body, &env, warnings) {
            Ok(html) => {
                let bb = html.bbox();
                return Made {
                    label: Label {
                        text: raw.to_string(),
                        html: true,
                        font,
                        dimen: Point::new(bb.width(), bb.height()),
                        ..Label::default()
                    },
                    html: Some(html),
                };
            }
            Err(err) => {
                warnings.warn(
                    WarningKind::HtmlLabel,
                    format!("{err}; using the label as plain text"),
                );
                text = body;
            }
        }
    }
    let dimen = measure_label(m.text, text, &font);
    Made {
        label: Label {
            text: text.to_string(),
            html: false,
            font,
            dimen,
            ..Label::default()
        },
        html: None,
    }
}

fn font_spec(name: Option<&str>, size: f64) -> FontSpec {
    let name = name.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_FONTNAME);
    let lower = name.to_ascii_lowercase();
    FontSpec {
        name: name.to_string(),
        size,
        bold: lower.contains("bold"),
        italic: lower.contains("italic") || lower.contains("oblique"),
    }
}

/// `margin` is `"x,y"` or a single value for both, in inches.
fn parse_margin(raw: Option<&str>, warnings: &mut Warnings) -> Option<(f64, f64)> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let mut parts = raw.split(',').map(|p| p.trim().parse::<f64>());
    let parsed = match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), None, _) => Some((x, x)),
        (Some(Ok(x)), Some(Ok(y)), None) => Some((x, y)),
        _ => None,
    };
    match parsed {
        Some((x, y)) if x.is_finite() && y.is_finite() => Some((x.max(0.0), y.max(0.0))),
        _ => {
            warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid margin {raw:?}; using the default"),
            );
            None
        }
    }
}

/// Grows a label box so the outline of `kind` contains it.
fn outline_for(kind: ShapeKind, label: Point, height: f64) -> Point {
    match kind {
        ShapeKind::Ellipse | ShapeKind::Circle => {
            let temp = label.y * SQRT_2;
            // A node taller than the inscribed box lets the ellipse stay narrower.
            let x = if height > temp {
                let r = label.y / height;
                label.x * (1.0 / (1.0 - r * r)).sqrt()
            } else {
                label.x * SQRT_2
            };
            Point::new(x, temp)
        }
        ShapeKind::Polygon { sides, orientation }
            if !(sides == 4 && (orientation.round() as i64) % 90 == 0) =>
        {
            let c = (PI / f64::from(sides.max(3))).cos();
            Point::new(label.x / c, label.y / c)
        }
        _ => label,
    }
}

fn init_node(g: &mut Graph, n: NodeId, m: Measure<'_>) {
    let name = g.node(n).name.clone();
    let shape_name = g
        .node_attr(n, "shape")
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "ellipse".to_string());
    let mut kind = match ShapeKind::from_name(&shape_name) {
        Some(k) => k,
        None => {
            g.warnings.warn(
                WarningKind::MalformedAttribute,
                format!("unknown shape {shape_name:?} on node {name}; using ellipse"),
            );
            ShapeKind::Ellipse
        }
    };
    if let ShapeKind::Polygon { sides, orientation } = &mut kind {
        if shape_name == "polygon" {
            *sides = g.node_double(n, "sides", 4.0, 3.0).min(120.0) as u32;
        }
        *orientation += g.node_double(n, "orientation", 0.0, -360.0);
    }

    let width_attr = g.node_attr(n, "width").is_some();
    let height_attr = g.node_attr(n, "height").is_some();
    let width = g.node_double(n, "width", DEFAULT_NODE_WIDTH, MIN_NODE_WIDTH) * POINTS_PER_INCH;
    let height = g.node_double(n, "height", DEFAULT_NODE_HEIGHT, MIN_NODE_HEIGHT) * POINTS_PER_INCH;

    if kind == ShapeKind::Point {
        let size = match (width_attr, height_attr) {
            (false, false) => DEFAULT_POINT_SIZE * POINTS_PER_INCH,
            (true, false) => width,
            (false, true) => height,
            (true, true) => width.min(height),
        }
        .max(MIN_POINT_SIZE * POINTS_PER_INCH);
        set_node_geometry(g, n, ShapeDesc::new(kind, size, size), None);
        return;
    }

    let fixed = match g.node_attr(n, "fixedsize").map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("shape") => true,
        _ => g.node_bool(n, "fixedsize", false),
    };
    let regular =
        matches!(kind, ShapeKind::Circle) || shape_name == "square" || g.node_bool(n, "regular", false);

    let fontsize = g.node_double(n, "fontsize", DEFAULT_FONTSIZE, MIN_FONTSIZE);
    let font = font_spec(g.node_attr(n, "fontname"), fontsize);
    let font_color = g.node_attr(n, "fontcolor").map(str::to_string);
    let raw = g.node_attr(n, "label").unwrap_or("\\N").to_string();
    let text = if html_body(&raw).is_some() {
        raw
    } else {
        let names = Names {
            object: &name,
            graph: &g.name,
            tail: None,
            head: None,
        };
        expand_escapes(&raw, &names)
    };
    let made = make_label(&text, font, font_color, m, &mut g.warnings);

    let margin = if shape_name == "plain" {
        (0.0, 0.0)
    } else {
        let raw = g.node_attr(n, "margin").map(str::to_string);
        parse_margin(raw.as_deref(), &mut g.warnings).unwrap_or(DEFAULT_NODE_MARGIN)
    };
    let mut label = made.label;
    label.dimen = label.dimen
        + Point::new(
            2.0 * margin.0 * POINTS_PER_INCH,
            2.0 * margin.1 * POINTS_PER_INCH,
        );

    let (mut w, mut h) = if fixed {
        (width, height)
    } else {
        let need = outline_for(kind, label.dimen, height);
        (need.x.max(width), need.y.max(height))
    };
    if shape_name == "plain" && !width_attr && !height_attr {
        (w, h) = (label.dimen.x, label.dimen.y);
    }
    if regular {
        let side = if fixed && (width_attr != height_attr) {
            if width_attr { w } else { h }
        } else {
            w.max(h)
        };
        (w, h) = (side, side);
    }
    let mut shape = ShapeDesc::new(kind, w, h);
    if let Some(html) = &made.html {
        shape.ports = html_ports(html);
    }
    set_node_geometry(g, n, shape, Some(label));
}

fn set_node_geometry(g: &mut Graph, n: NodeId, shape: ShapeDesc, label: Option<Label>) {
    let layout = &mut g.node_mut(n).layout;
    layout.width = shape.width;
    layout.height = shape.height;
    layout.lw = shape.width / 2.0;
    layout.rw = shape.width / 2.0;
    layout.ht = shape.height;
    layout.shape = shape;
    layout.label = label;
}

fn init_edge(g: &mut Graph, e: EdgeId, m: Measure<'_>) {
    let (t, h) = (g.tail(e), g.head(e));
    if let Some(raw) = g.edge_attr(e, "label").filter(|s| !s.is_empty()).map(str::to_string) {
        let fontsize = g.edge_double(e, "fontsize", DEFAULT_FONTSIZE, MIN_FONTSIZE);
        let font = font_spec(g.edge_attr(e, "fontname"), fontsize);
        let font_color = g.edge_attr(e, "fontcolor").map(str::to_string);
        let text = if html_body(&raw).is_some() {
            raw
        } else {
            let edge_name = g.edge_name(e);
            let names = Names {
                object: &edge_name,
                graph: &g.name,
                tail: Some(&g.node(t).name),
                head: Some(&g.node(h).name),
            };
            expand_escapes(&raw, &names)
        };
        let made = make_label(&text, font, font_color, m, &mut g.warnings);
        g.edge_mut(e).layout.label = Some(made.label);
    }
    let tail_port = resolve_port(g, e, t, "tailport");
    let head_port = resolve_port(g, e, h, "headport");
    let layout = &mut g.edge_mut(e).layout;
    layout.tail_port = tail_port;
    layout.head_port = head_port;
}

fn resolve_port(g: &mut Graph, e: EdgeId, n: NodeId, attr: &str) -> Port {
    let Some(spec) = g.edge_attr(e, attr).map(str::to_string) else {
        return Port::default();
    };
    match g.node(n).layout.shape.resolve_port(&spec) {
        Some(port) => port,
        None => {
            let msg = format!(
                "node {}, port {spec} unrecognized in edge {}",
                g.node(n).name,
                g.edge_name(e)
            );
            g.warnings.warn(WarningKind::UnknownPort, msg);
            Port::default()
        }
    }
}

/// Cluster labels take their font from the cluster, falling back to the root graph.
fn init_cluster(g: &mut Graph, sg: SubgraphId, m: Measure<'_>) {
    let Some(raw) = g.subgraph_attr(sg, "label").filter(|s| !s.is_empty()).map(str::to_string) else {
        return;
    };
    let attr = |g: &Graph, name: &str| {
        g.subgraph_attr(sg, name)
            .or_else(|| g.graph_attr(name))
            .map(str::to_string)
    };
    let fontsize = sirenia_graph::attrs::parse_double(
        attr(g, "fontsize").as_deref(),
        "fontsize",
        DEFAULT_FONTSIZE,
        MIN_FONTSIZE,
        &mut g.warnings,
    );
    let font = font_spec(attr(g, "fontname").as_deref(), fontsize);
    let font_color = attr(g, "fontcolor");
    let text = if html_body(&raw).is_some() {
        raw
    } else {
        let sg_name = g.subgraph(sg).name.clone();
        let names = Names {
            object: &sg_name,
            graph: &g.name,
            tail: None,
            head: None,
        };
        expand_escapes(&raw, &names)
    };
    let made = make_label(&text, font, font_color, m, &mut g.warnings);
    g.subgraph_mut(sg).layout.label = Some(made.label);
}

fn init_root_label(g: &mut Graph, m: Measure<'_>) {
    let Some(raw) = g.graph_attr("label").filter(|s| !s.is_empty()).map(str::to_string) else {
        g.label = None;
        return;
    };
    let fontsize = g.graph_double("fontsize", DEFAULT_FONTSIZE, MIN_FONTSIZE);
    let font = font_spec(g.graph_attr("fontname"), fontsize);
    let font_color = g.graph_attr("fontcolor").map(str::to_string);
    let text = if html_body(&raw).is_some() {
        raw
    } else {
        let names = Names {
            object: &g.name,
            graph: &g.name,
            tail: None,
            head: None,
        };
        expand_escapes(&raw, &names)
    };
    let made = make_label(&text, font, font_color, m, &mut g.warnings);
    g.label = Some(made.label);
}
