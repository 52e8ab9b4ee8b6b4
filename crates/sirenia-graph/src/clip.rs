//! Clipping raw edge splines to node outlines and arrowheads.

use crate::geom::{BBox, Bezier, Point, split_cubic};
use crate::shape::Shape;

/// Length of an arrowhead at `arrowsize = 1`.
pub const ARROW_LENGTH: f64 = 10.0;

const MILLIPOINT: f64 = 0.001;

/// One end of an edge as seen by the clipper.
pub struct ClipEnd<'a> {
    pub center: Point,
    pub shape: &'a dyn Shape,
    pub bp: Option<BBox>,
    pub clip: bool,
}

impl ClipEnd<'_> {
    fn inside(&self, p: Point) -> bool {
        self.shape.inside(p - self.center, self.bp.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArrowSpec {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// Binary search along a cubic for the crossing of `inside`.
///
/// With `left_inside`, `sp[0]` is inside and the curve is trimmed to start near the boundary;
/// otherwise `sp[3]` is inside and the curve is trimmed to end there.
pub fn bezier_clip(inside: impl Fn(Point) -> bool, sp: &mut [Point; 4], left_inside: bool) {
    let orig = *sp;
    let (mut low, mut high) = (0.0_f64, 1.0_f64);
    let mut pt = if left_inside { orig[0] } else { orig[3] };
    let mut best: Option<[Point; 4]> = None;
    let mut seg = orig;
    for _ in 0..64 {
        let opt = pt;
        let t = (low + high) / 2.0;
        let (p, left, right) = split_cubic(&orig, t);
        pt = p;
        seg = if left_inside { right } else { left };
        if inside(pt) {
            if left_inside {
                low = t;
            } else {
                high = t;
            }
            best = Some(seg);
        } else if left_inside {
            high = t;
        } else {
            low = t;
        }
        if (opt.x - pt.x).abs() <= 0.5 && (opt.y - pt.y).abs() <= 0.5 {
            break;
        }
    }
    *sp = best.unwrap_or(seg);
}

fn piece(ps: &[Point], i: usize) -> [Point; 4] {
    [ps[i], ps[i + 1], ps[i + 2], ps[i + 3]]
}

fn put_piece(ps: &mut [Point], i: usize, seg: [Point; 4]) {
    ps[i..i + 4].copy_from_slice(&seg);
}

/// Clips a raw spline (`3k + 1` control points, tail to head) against both end shapes, then
/// trims arrowheads. Returns `None` for inputs too short to form a cubic.
pub fn clip_and_install(
    raw: &[Point],
    tail: Option<&ClipEnd<'_>>,
    head: Option<&ClipEnd<'_>>,
    arrows: ArrowSpec,
) -> Option<Bezier> {
    let pn = raw.len();
    if pn < 4 || (pn - 1) % 3 != 0 {
        return None;
    }
    let mut ps = raw.to_vec();

    let mut start = 0usize;
    if let Some(t) = tail.filter(|t| t.clip) {
        while start < pn - 4 && t.inside(ps[start + 3]) {
            start += 3;
        }
        let mut seg = piece(&ps, start);
        bezier_clip(|p| t.inside(p), &mut seg, true);
        put_piece(&mut ps, start, seg);
    }
    let mut end = pn - 4;
    if let Some(h) = head.filter(|h| h.clip) {
        while end > 0 && h.inside(ps[end]) {
            end -= 3;
        }
        let mut seg = piece(&ps, end);
        bezier_clip(|p| h.inside(p), &mut seg, false);
        put_piece(&mut ps, end, seg);
    }
    while start < pn - 4 && ps[start].approx_eq(ps[start + 3], MILLIPOINT) {
        start += 3;
    }
    while end > 0 && ps[end].approx_eq(ps[end + 3], MILLIPOINT) {
        end -= 3;
    }
    if start > end {
        end = start;
    }

    let mut spl = Bezier::default();
    if let Some(len) = arrows.start {
        start = arrow_start_clip(&mut ps, start, end, &mut spl, len);
    }
    if let Some(len) = arrows.end {
        end = arrow_end_clip(&mut ps, start, end, &mut spl, len);
    }
    spl.points = ps[start..end + 4].to_vec();
    Some(spl)
}

fn arrow_start_clip(
    ps: &mut [Point],
    mut start: usize,
    end: usize,
    spl: &mut Bezier,
    len: f64,
) -> usize {
    let len2 = len * len;
    spl.sflag = true;
    spl.sp = ps[start];
    if end > start && ps[start].dist2(ps[start + 3]) < len2 {
        start += 3;
    }
    let tip = spl.sp;
    let mut sp = [ps[start + 3], ps[start + 2], ps[start + 1], tip];
    bezier_clip(|p| p.dist2(tip) <= len2, &mut sp, false);
    put_piece(ps, start, [sp[3], sp[2], sp[1], sp[0]]);
    start
}

fn arrow_end_clip(
    ps: &mut [Point],
    start: usize,
    mut end: usize,
    spl: &mut Bezier,
    len: f64,
) -> usize {
    let len2 = len * len;
    spl.eflag = true;
    spl.ep = ps[end + 3];
    if end > start && ps[end].dist2(ps[end + 3]) < len2 {
        end -= 3;
    }
    let tip = spl.ep;
    let mut sp = [tip, ps[end + 2], ps[end + 1], ps[end]];
    bezier_clip(|p| p.dist2(tip) <= len2, &mut sp, true);
    put_piece(ps, end, [sp[3], sp[2], sp[1], sp[0]]);
    end
}

/// Expands a polyline into cubic pieces with control points on the segments.
pub fn polyline_to_bezier(points: &[Point]) -> Vec<Point> {
    let mut out = Vec::with_capacity(points.len() * 3);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(*p);
        }
        out.push(*p);
        if i + 1 < points.len() {
            out.push(*p);
        }
    }
    out
}

/// Straight cubic from `a` to `b`.
pub fn line_bezier(a: Point, b: Point) -> Vec<Point> {
    vec![a, a + (b - a) * (1.0 / 3.0), a + (b - a) * (2.0 / 3.0), b]
}
