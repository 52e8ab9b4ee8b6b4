//! Points, boxes and cubic Bezier helpers.
//!
//! Layout coordinates are y-up: rank 0 sits at the top of a top-to-bottom drawing and has the
//! largest y. Post-processing rotates/mirrors for other rank directions.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Side bits, shared by ports, HTML cell borders and path ends.
pub mod sides {
    pub const BOTTOM: u8 = 1 << 0;
    pub const RIGHT: u8 = 1 << 1;
    pub const TOP: u8 = 1 << 2;
    pub const LEFT: u8 = 1 << 3;
    pub const ALL: u8 = BOTTOM | RIGHT | TOP | LEFT;
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(self, other: Point) -> f64 {
        self.dist2(other).sqrt()
    }

    pub fn dist2(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn len(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized(self) -> Point {
        let l = self.len();
        if l <= f64::EPSILON {
            Point::default()
        } else {
            Point::new(self.x / l, self.y / l)
        }
    }

    pub fn approx_eq(self, other: Point, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }

    /// Counter-clockwise rotation by a multiple of 90 degrees.
    pub fn rotate_ccw(self, quarter_turns: u32) -> Point {
        match quarter_turns % 4 {
            0 => self,
            1 => Point::new(-self.y, self.x),
            2 => Point::new(-self.x, -self.y),
            _ => Point::new(self.y, -self.x),
        }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned box with lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub ll: Point,
    pub ur: Point,
}

impl Default for BBox {
    fn default() -> Self {
        Self::new(Point::default(), Point::default())
    }
}

impl BBox {
    pub const fn new(ll: Point, ur: Point) -> Self {
        Self { ll, ur }
    }

    pub fn from_coords(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self::new(Point::new(llx, lly), Point::new(urx, ury))
    }

    pub fn from_center(c: Point, width: f64, height: f64) -> Self {
        Self::from_coords(
            c.x - width / 2.0,
            c.y - height / 2.0,
            c.x + width / 2.0,
            c.y + height / 2.0,
        )
    }

    /// The identity for [`BBox::union`].
    pub fn empty() -> Self {
        Self::from_coords(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    pub fn is_empty(&self) -> bool {
        self.ll.x > self.ur.x || self.ll.y > self.ur.y
    }

    pub fn width(&self) -> f64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> f64 {
        self.ur.y - self.ll.y
    }

    pub fn center(&self) -> Point {
        Point::new((self.ll.x + self.ur.x) / 2.0, (self.ll.y + self.ur.y) / 2.0)
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox::from_coords(
            self.ll.x.min(other.ll.x),
            self.ll.y.min(other.ll.y),
            self.ur.x.max(other.ur.x),
            self.ur.y.max(other.ur.y),
        )
    }

    pub fn include(&mut self, p: Point) {
        self.ll.x = self.ll.x.min(p.x);
        self.ll.y = self.ll.y.min(p.y);
        self.ur.x = self.ur.x.max(p.x);
        self.ur.y = self.ur.y.max(p.y);
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.ll.x && p.x <= self.ur.x && p.y >= self.ll.y && p.y <= self.ur.y
    }

    pub fn contains_box(&self, other: &BBox) -> bool {
        self.contains(other.ll) && self.contains(other.ur)
    }

    pub fn overlaps(&self, other: &BBox) -> bool {
        self.ll.x <= other.ur.x
            && other.ll.x <= self.ur.x
            && self.ll.y <= other.ur.y
            && other.ll.y <= self.ur.y
    }

    pub fn translate(&self, d: Point) -> BBox {
        BBox::new(self.ll + d, self.ur + d)
    }

    pub fn expand(&self, dx: f64, dy: f64) -> BBox {
        BBox::from_coords(self.ll.x - dx, self.ll.y - dy, self.ur.x + dx, self.ur.y + dy)
    }
}

/// One Bezier piece of an edge spline: `points.len() == 3k + 1`.
///
/// `sflag`/`eflag` mark arrowheads at the start/end; `sp`/`ep` are the arrow tips that the
/// clipped curve stops short of.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bezier {
    pub points: Vec<Point>,
    pub sflag: bool,
    pub eflag: bool,
    pub sp: Point,
    pub ep: Point,
}

impl Bezier {
    pub fn bbox(&self) -> BBox {
        let mut bb = BBox::empty();
        for p in &self.points {
            bb.include(*p);
        }
        if self.sflag {
            bb.include(self.sp);
        }
        if self.eflag {
            bb.include(self.ep);
        }
        bb
    }

    pub fn map_points(&mut self, f: impl Fn(Point) -> Point) {
        for p in &mut self.points {
            *p = f(*p);
        }
        self.sp = f(self.sp);
        self.ep = f(self.ep);
    }

    /// Reverses direction, swapping the arrow ends along with it.
    pub fn reverse(&mut self) {
        self.points.reverse();
        std::mem::swap(&mut self.sflag, &mut self.eflag);
        std::mem::swap(&mut self.sp, &mut self.ep);
    }
}

/// Evaluates a cubic at `t` and returns the two halves of the split (de Casteljau).
pub fn split_cubic(cp: &[Point; 4], t: f64) -> (Point, [Point; 4], [Point; 4]) {
    let lerp = |a: Point, b: Point| a + (b - a) * t;
    let p01 = lerp(cp[0], cp[1]);
    let p12 = lerp(cp[1], cp[2]);
    let p23 = lerp(cp[2], cp[3]);
    let p012 = lerp(p01, p12);
    let p123 = lerp(p12, p23);
    let p = lerp(p012, p123);
    (p, [cp[0], p01, p012, p], [p, p123, p23, cp[3]])
}

pub fn cubic_point(cp: &[Point; 4], t: f64) -> Point {
    split_cubic(cp, t).0
}

/// Samples a multi-piece cubic spline (`3k + 1` control points) at `steps` points per piece.
pub fn sample_spline(points: &[Point], steps: usize) -> Vec<Point> {
    let mut out = Vec::new();
    if points.is_empty() {
        return out;
    }
    out.push(points[0]);
    let mut i = 0;
    while i + 3 < points.len() {
        let cp = [points[i], points[i + 1], points[i + 2], points[i + 3]];
        for s in 1..=steps {
            out.push(cubic_point(&cp, s as f64 / steps as f64));
        }
        i += 3;
    }
    out
}
