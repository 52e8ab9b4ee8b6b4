//! Node shapes: inside tests and port resolution.

use crate::geom::{BBox, Point, sides};
use std::f64::consts::PI;

/// Scale used to encode port positions for crossing minimization.
pub const MC_SCALE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ShapeKind {
    #[default]
    Ellipse,
    Rect,
    Circle,
    Point,
    /// No outline (`plaintext`, `plain`, `none`); clipped to the label box.
    Plain,
    Polygon {
        sides: u32,
        orientation: f64,
    },
}

impl ShapeKind {
    pub fn from_name(name: &str) -> Option<ShapeKind> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "ellipse" | "oval" => ShapeKind::Ellipse,
            "box" | "rect" | "rectangle" | "square" => ShapeKind::Rect,
            "circle" | "doublecircle" => ShapeKind::Circle,
            "point" => ShapeKind::Point,
            "plaintext" | "plain" | "none" => ShapeKind::Plain,
            "triangle" => ShapeKind::Polygon {
                sides: 3,
                orientation: 0.0,
            },
            "diamond" => ShapeKind::Polygon {
                sides: 4,
                orientation: 45.0,
            },
            "pentagon" => ShapeKind::Polygon {
                sides: 5,
                orientation: 0.0,
            },
            "hexagon" => ShapeKind::Polygon {
                sides: 6,
                orientation: 0.0,
            },
            "octagon" => ShapeKind::Polygon {
                sides: 8,
                orientation: 0.0,
            },
            "polygon" => ShapeKind::Polygon {
                sides: 4,
                orientation: 0.0,
            },
            _ => return None,
        };
        Some(kind)
    }

    /// Shapes whose outline equals their bounding box.
    pub fn is_box(self) -> bool {
        matches!(self, ShapeKind::Rect | ShapeKind::Plain)
    }
}

/// A named attachment point inside a node, relative to the node center (HTML cells).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPort {
    pub name: String,
    pub bbox: BBox,
    pub sides: u8,
}

/// Resolved edge endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// Offset from the node center.
    pub p: Point,
    /// Exit angle when `constrained`.
    pub theta: f64,
    /// Port box relative to the node center; clipping stops at its boundary.
    pub bp: Option<BBox>,
    pub defined: bool,
    pub constrained: bool,
    pub clip: bool,
    pub order: u8,
    pub side: u8,
    pub name: Option<String>,
}

impl Default for Port {
    fn default() -> Self {
        Self {
            p: Point::default(),
            theta: -1.0,
            bp: None,
            defined: false,
            constrained: false,
            clip: true,
            order: (MC_SCALE / 2.0) as u8,
            side: 0,
            name: None,
        }
    }
}

impl Port {
    /// Ports compare equal for routing purposes when their geometry matches.
    pub fn same_geometry(&self, other: &Port) -> bool {
        if !self.defined && !other.defined {
            return true;
        }
        self.defined == other.defined && self.p.approx_eq(other.p, 1e-6)
    }
}

/// The shape interface consumed by path building and clipping.
pub trait Shape {
    /// `p` is in node-local coordinates. When `bp` is given, the test is against that box.
    fn inside(&self, p: Point, bp: Option<&BBox>) -> bool;

    /// Resolves `port[:compass]`; `None` when the port name is unknown.
    fn port_box(&self, port: &str, compass: Option<&str>) -> Option<Port>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeDesc {
    pub kind: ShapeKind,
    pub width: f64,
    pub height: f64,
    /// Outline relative to the center; empty for ellipse-like and box-like shapes.
    pub vertices: Vec<Point>,
    pub ports: Vec<NamedPort>,
}

impl ShapeDesc {
    pub fn new(kind: ShapeKind, width: f64, height: f64) -> Self {
        let vertices = match kind {
            ShapeKind::Polygon {
                sides,
                orientation,
            } => polygon_vertices(sides.max(3), orientation, width, height),
            _ => Vec::new(),
        };
        Self {
            kind,
            width,
            height,
            vertices,
            ports: Vec::new(),
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_center(Point::default(), self.width, self.height)
    }

    /// Parses `name`, `name:compass` or `compass` and resolves it.
    pub fn resolve_port(&self, spec: &str) -> Option<Port> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Some(Port::default());
        }
        let (name, compass) = match spec.split_once(':') {
            Some((n, c)) => (n, Some(c)),
            None => (spec, None),
        };
        if let Some(port) = self.port_box(name, compass) {
            return Some(port);
        }
        if compass.is_none() && is_compass(name) {
            return self.compass_port(None, name, None);
        }
        None
    }

    fn compass_port(&self, bp: Option<BBox>, compass: &str, name: Option<&str>) -> Option<Port> {
        let b = bp.unwrap_or_else(|| self.bbox());
        let ctr = b.center();
        let (target, theta, side, ray) = match compass.to_ascii_lowercase().as_str() {
            "e" => (Point::new(b.ur.x, ctr.y), 0.0, sides::RIGHT, false),
            "se" => (Point::new(b.ur.x, b.ll.y), -PI * 0.25, sides::BOTTOM | sides::RIGHT, true),
            "s" => (Point::new(ctr.x, b.ll.y), -PI * 0.5, sides::BOTTOM, false),
            "sw" => (Point::new(b.ll.x, b.ll.y), -PI * 0.75, sides::BOTTOM | sides::LEFT, true),
            "w" => (Point::new(b.ll.x, ctr.y), PI, sides::LEFT, false),
            "nw" => (Point::new(b.ll.x, b.ur.y), PI * 0.75, sides::TOP | sides::LEFT, true),
            "n" => (Point::new(ctr.x, b.ur.y), PI * 0.5, sides::TOP, false),
            "ne" => (Point::new(b.ur.x, b.ur.y), PI * 0.25, sides::TOP | sides::RIGHT, true),
            "c" | "_" | "" => {
                return Some(Port {
                    p: ctr,
                    bp,
                    defined: true,
                    side: if compass == "_" { sides::ALL } else { 0 },
                    order: self.port_order(ctr.x),
                    name: name.map(str::to_string),
                    ..Port::default()
                });
            }
            _ => return None,
        };
        // Diagonal points on curved outlines sit where the ray from the center leaves the shape.
        let p = if ray && bp.is_none() && !self.kind.is_box() {
            self.boundary_along(ctr, target)
        } else {
            target
        };
        Some(Port {
            p,
            theta,
            bp,
            defined: true,
            constrained: true,
            clip: false,
            order: self.port_order(p.x),
            side,
            name: name.map(str::to_string),
        })
    }

    fn boundary_along(&self, from: Point, to: Point) -> Point {
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..40 {
            let mid = (lo + hi) / 2.0;
            let p = from + (to - from) * mid;
            if self.inside(p, None) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        from + (to - from) * lo
    }

    fn port_order(&self, x: f64) -> u8 {
        let half = self.width / 2.0;
        if self.width <= 0.0 {
            return (MC_SCALE / 2.0) as u8;
        }
        let v = MC_SCALE * (half + x) / self.width;
        v.clamp(0.0, 255.0) as u8
    }
}

fn is_compass(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "n" | "ne" | "e" | "se" | "s" | "sw" | "w" | "nw" | "c" | "_"
    )
}

impl Shape for ShapeDesc {
    fn inside(&self, p: Point, bp: Option<&BBox>) -> bool {
        if let Some(bp) = bp {
            return bp.contains(p);
        }
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        if hw <= 0.0 || hh <= 0.0 {
            return false;
        }
        match self.kind {
            ShapeKind::Rect | ShapeKind::Plain => p.x.abs() <= hw && p.y.abs() <= hh,
            ShapeKind::Ellipse | ShapeKind::Circle | ShapeKind::Point => {
                let nx = p.x / hw;
                let ny = p.y / hh;
                nx * nx + ny * ny <= 1.0
            }
            ShapeKind::Polygon { .. } => point_in_polygon(&self.vertices, p),
        }
    }

    fn port_box(&self, port: &str, compass: Option<&str>) -> Option<Port> {
        let named = self
            .ports
            .iter()
            .find(|np| np.name.eq_ignore_ascii_case(port))?;
        match compass {
            Some(c) if !c.is_empty() => {
                let mut rv = self.compass_port(Some(named.bbox), c, Some(&named.name))?;
                rv.side &= named.sides;
                Some(rv)
            }
            _ => {
                let ctr = named.bbox.center();
                Some(Port {
                    p: ctr,
                    bp: Some(named.bbox),
                    defined: true,
                    side: named.sides,
                    order: self.port_order(ctr.x),
                    name: Some(named.name.clone()),
                    ..Port::default()
                })
            }
        }
    }
}

fn polygon_vertices(n: u32, orientation_deg: f64, width: f64, height: f64) -> Vec<Point> {
    let start = -PI / 2.0 - PI / n as f64 + orientation_deg.to_radians();
    let step = 2.0 * PI / n as f64;
    let unit: Vec<Point> = (0..n)
        .map(|k| {
            let a = start + step * k as f64;
            Point::new(a.cos(), a.sin())
        })
        .collect();
    let mut bb = BBox::empty();
    for p in &unit {
        bb.include(*p);
    }
    let sx = if bb.width() > 0.0 {
        width / bb.width()
    } else {
        0.0
    };
    let sy = if bb.height() > 0.0 {
        height / bb.height()
    } else {
        0.0
    };
    let c = bb.center();
    unit.into_iter()
        .map(|p| Point::new((p.x - c.x) * sx, (p.y - c.y) * sy))
        .collect()
}

/// Crossing-number test; points on an edge count as inside.
fn point_in_polygon(vs: &[Point], p: Point) -> bool {
    if vs.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vs.len() - 1;
    for i in 0..vs.len() {
        let (a, b) = (vs[i], vs[j]);
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let on_segment = cross.abs() <= 1e-9
            && p.x >= a.x.min(b.x) - 1e-9
            && p.x <= a.x.max(b.x) + 1e-9
            && p.y >= a.y.min(b.y) - 1e-9
            && p.y <= a.y.max(b.y) + 1e-9;
        if on_segment {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_at {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipse_inside_test() {
        let s = ShapeDesc::new(ShapeKind::Ellipse, 100.0, 50.0);
        assert!(s.inside(Point::new(0.0, 0.0), None));
        assert!(s.inside(Point::new(49.0, 0.0), None));
        assert!(!s.inside(Point::new(49.0, 20.0), None));
    }

    #[test]
    fn diamond_vertices_touch_bbox_midpoints() {
        let s = ShapeDesc::new(ShapeKind::from_name("diamond").unwrap(), 40.0, 20.0);
        assert_eq!(s.vertices.len(), 4);
        assert!(s.inside(Point::new(0.0, 0.0), None));
        assert!(!s.inside(Point::new(18.0, 9.0), None));
        assert!(s.inside(Point::new(19.0, 0.0), None));
    }

    #[test]
    fn compass_ports_on_box() {
        let s = ShapeDesc::new(ShapeKind::Rect, 60.0, 40.0);
        let p = s.resolve_port("n").unwrap();
        assert_eq!(p.p, Point::new(0.0, 20.0));
        assert_eq!(p.side, sides::TOP);
        let e = s.resolve_port("e").unwrap();
        assert_eq!(e.order, 255);
        assert!(s.resolve_port("nowhere").is_none());
    }
}
