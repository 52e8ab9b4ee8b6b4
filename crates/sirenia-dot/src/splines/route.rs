//! Routing through a corridor of boxes.
//!
//! A corridor is a sequence of axis-aligned boxes, each touching the next. The shortest polyline
//! through it comes from a funnel walk over the portals shared by consecutive boxes. For smooth
//! edges a cubic is then fitted over every polyline leg, shortening the tangents of any piece
//! that strays out of the corridor until it fits.

use sirenia_graph::clip::{line_bezier, polyline_to_bezier};
use sirenia_graph::geom::cubic_point;
use sirenia_graph::{BBox, Point};

const EPS: f64 = 1e-6;
/// Slack allowed when testing sampled curve points against the corridor.
const CORRIDOR_TOL: f64 = 0.5;
const SAMPLES: usize = 16;
/// Tangent scales tried per piece, the last one giving a straight segment.
const TANGENT_SCALES: [f64; 5] = [1.0, 0.6, 0.35, 0.15, 0.0];

#[derive(Debug, Clone, Default)]
pub(crate) struct BoxPath {
    pub boxes: Vec<BBox>,
    pub start: Point,
    pub end: Point,
    /// Unit tangent forced at the start or end.
    pub start_dir: Option<Point>,
    pub end_dir: Option<Point>,
}

impl BoxPath {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    /// Appends `b` unless it is inverted or flat.
    pub fn add_box(&mut self, b: BBox) {
        if b.ll.x < b.ur.x && b.ll.y < b.ur.y {
            self.boxes.push(b);
        }
    }

    fn inside(&self, p: Point) -> bool {
        self.boxes
            .iter()
            .any(|b| b.expand(CORRIDOR_TOL, CORRIDOR_TOL).contains(p))
    }
}

fn cross(a: Point, b: Point) -> f64 {
    a.x * b.y - a.y * b.x
}

/// The segment two boxes share, as `(left, right)` seen when moving from `a` into `b`.
fn portal(a: &BBox, b: &BBox) -> (Point, Point) {
    let lo = Point::new(a.ll.x.max(b.ll.x), a.ll.y.max(b.ll.y));
    let hi = Point::new(a.ur.x.min(b.ur.x), a.ur.y.min(b.ur.y));
    let (w, h) = (hi.x - lo.x, hi.y - lo.y);
    let (p, q) = if w >= -EPS && (h < -EPS || w >= h) {
        let y = (lo.y + hi.y) / 2.0;
        (Point::new(lo.x, y), Point::new(hi.x.max(lo.x), y))
    } else if h >= -EPS {
        let x = (lo.x + hi.x) / 2.0;
        (Point::new(x, lo.y), Point::new(x, hi.y.max(lo.y)))
    } else {
        let m = (lo + hi) * 0.5;
        (m, m)
    };
    let dir = b.center() - a.center();
    let mid = (p + q) * 0.5;
    if cross(dir, p - mid) >= cross(dir, q - mid) {
        (p, q)
    } else {
        (q, p)
    }
}

/// Shortest polyline from `start` to `end` through `portals`.
fn funnel(start: Point, end: Point, portals: &[(Point, Point)]) -> Vec<Point> {
    let mut gates = Vec::with_capacity(portals.len() + 2);
    gates.push((start, start));
    gates.extend_from_slice(portals);
    gates.push((end, end));

    let mut path = vec![start];
    let (mut apex, mut left, mut right) = (start, start, start);
    let (mut left_i, mut right_i) = (0usize, 0usize);
    let mut i = 1;
    while i < gates.len() {
        let (l, r) = gates[i];
        if cross(right - apex, r - apex) >= 0.0 {
            if apex.approx_eq(right, EPS) || cross(left - apex, r - apex) <= 0.0 {
                right = r;
                right_i = i;
            } else {
                path.push(left);
                apex = left;
                let apex_i = left_i;
                (right, right_i) = (apex, apex_i);
                i = apex_i + 1;
                continue;
            }
        }
        if cross(left - apex, l - apex) <= 0.0 {
            if apex.approx_eq(left, EPS) || cross(right - apex, l - apex) >= 0.0 {
                left = l;
                left_i = i;
            } else {
                path.push(right);
                apex = right;
                let apex_i = right_i;
                (left, left_i) = (apex, apex_i);
                i = apex_i + 1;
                continue;
            }
        }
        i += 1;
    }
    path.push(end);
    path.dedup_by(|a, b| a.approx_eq(*b, EPS));
    path
}

/// Shortest polyline through the corridor, `None` when there is no corridor.
pub(crate) fn shortest_path(path: &BoxPath) -> Option<Vec<Point>> {
    if path.boxes.is_empty() {
        return None;
    }
    let portals: Vec<(Point, Point)> = path
        .boxes
        .windows(2)
        .map(|w| portal(&w[0], &w[1]))
        .collect();
    let mut pts = funnel(path.start, path.end, &portals);
    if pts.len() < 2 {
        pts = vec![path.start, path.end];
    }
    Some(pts)
}

/// Polyline route expanded to cubic pieces.
pub(crate) fn route_polylines(path: &BoxPath) -> Option<Vec<Point>> {
    let pts = shortest_path(path)?;
    Some(polyline_to_bezier(&pts))
}

/// Smooth route: one cubic per polyline leg, tangent-continuous where the corridor allows.
pub(crate) fn route_splines(path: &BoxPath) -> Option<Vec<Point>> {
    let pts = shortest_path(path)?;
    let n = pts.len();
    if n == 2 && path.start_dir.is_none() && path.end_dir.is_none() {
        return Some(line_bezier(pts[0], pts[1]));
    }
    let tangents = tangents(&pts, path.start_dir, path.end_dir);
    let mut out = Vec::with_capacity(3 * (n - 1) + 1);
    out.push(pts[0]);
    for i in 0..n - 1 {
        let (p, q) = (pts[i], pts[i + 1]);
        let len = p.dist(q) / 3.0;
        let piece = TANGENT_SCALES
            .iter()
            .map(|s| {
                [
                    p,
                    p + tangents[i] * (len * s),
                    q - tangents[i + 1] * (len * s),
                    q,
                ]
            })
            .find(|cp| piece_inside(path, cp))
            .unwrap_or_else(|| [p, p + (q - p) * (1.0 / 3.0), p + (q - p) * (2.0 / 3.0), q]);
        out.extend_from_slice(&piece[1..]);
    }
    Some(out)
}

fn piece_inside(path: &BoxPath, cp: &[Point; 4]) -> bool {
    (1..SAMPLES).all(|s| path.inside(cubic_point(cp, s as f64 / SAMPLES as f64)))
}

/// Unit tangents at polyline vertices: ends follow their leg (or the forced direction),
/// interior vertices bisect the turn.
fn tangents(pts: &[Point], start: Option<Point>, end: Option<Point>) -> Vec<Point> {
    let n = pts.len();
    let leg = |i: usize| (pts[i + 1] - pts[i]).normalized();
    let mut t = Vec::with_capacity(n);
    t.push(start.unwrap_or_else(|| leg(0)));
    for i in 1..n - 1 {
        let b = leg(i - 1) + leg(i);
        t.push(if b.len() < EPS { leg(i) } else { b.normalized() });
    }
    t.push(end.unwrap_or_else(|| leg(n - 2)));
    t
}
