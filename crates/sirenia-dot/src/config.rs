//! Typed layout configuration read once from graph attributes.

use crate::network_simplex::{SEARCHSIZE, TbBalance};
use sirenia_graph::attrs::parse_point;
use sirenia_graph::{Graph, POINTS_PER_INCH, Point, WarningKind};

pub const DEFAULT_NODESEP: f64 = 0.25;
pub const MIN_NODESEP: f64 = 0.02;
pub const DEFAULT_RANKSEP: f64 = 0.5;
pub const MIN_RANKSEP: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    TopBottom,
    LeftRight,
    BottomTop,
    RightLeft,
}

impl RankDir {
    pub fn parse(s: &str) -> Option<RankDir> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" => Some(RankDir::TopBottom),
            "LR" => Some(RankDir::LeftRight),
            "BT" => Some(RankDir::BottomTop),
            "RL" => Some(RankDir::RightLeft),
            _ => None,
        }
    }

    /// Ranks run horizontally; node widths and heights are swapped during layout.
    pub fn is_flipped(self) -> bool {
        matches!(self, RankDir::LeftRight | RankDir::RightLeft)
    }

    /// Maps a layout-frame offset (ranks top to bottom) into the drawing frame.
    pub fn to_final(self, p: Point) -> Point {
        match self {
            RankDir::TopBottom => p,
            RankDir::BottomTop => Point::new(p.x, -p.y),
            RankDir::LeftRight => p.rotate_ccw(1),
            RankDir::RightLeft => Point::new(p.y, p.x),
        }
    }

    /// Inverse of [`RankDir::to_final`].
    pub fn to_layout(self, p: Point) -> Point {
        match self {
            RankDir::TopBottom => p,
            RankDir::BottomTop => Point::new(p.x, -p.y),
            RankDir::LeftRight => p.rotate_ccw(3),
            RankDir::RightLeft => Point::new(p.y, p.x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterRank {
    #[default]
    Local,
    Global,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Out,
    In,
}

impl Ordering {
    pub fn parse(s: &str) -> Option<Ordering> {
        match s.trim().to_ascii_lowercase().as_str() {
            "out" => Some(Ordering::Out),
            "in" => Some(Ordering::In),
            _ => None,
        }
    }
}

/// `ratio`: how a positioned drawing is stretched towards `size` or an aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ratio {
    #[default]
    None,
    /// Desired height over width.
    Value(f64),
    Fill,
    Compress,
    Expand,
    /// Needs a page size to pick a shape; without one the drawing is left alone.
    Auto,
}

impl Ratio {
    pub fn parse(s: &str) -> Option<Ratio> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Some(Ratio::None),
            "fill" => Some(Ratio::Fill),
            "compress" => Some(Ratio::Compress),
            "expand" => Some(Ratio::Expand),
            "auto" => Some(Ratio::Auto),
            other => match other.parse::<f64>() {
                Ok(v) if v > 0.0 && v.is_finite() => Some(Ratio::Value(v)),
                Ok(_) => Some(Ratio::None),
                Err(_) => None,
            },
        }
    }

    /// Scale factors for x and y that take a drawing of extent `sz` towards `size` (both in the
    /// drawing frame). `None` leaves the drawing as it is.
    pub fn factors(self, sz: Point, size: Option<Point>) -> Option<(f64, f64)> {
        if sz.x <= 0.0 || sz.y <= 0.0 {
            return None;
        }
        let target = size.filter(|s| s.x > 0.0 && s.y > 0.0);
        match self {
            Ratio::None | Ratio::Auto => None,
            Ratio::Value(desired) => {
                let actual = sz.y / sz.x;
                if actual < desired {
                    Some((1.0, desired / actual))
                } else if actual > desired {
                    Some((actual / desired, 1.0))
                } else {
                    None
                }
            }
            Ratio::Fill => {
                let t = target?;
                let (xf, yf) = (t.x / sz.x, t.y / sz.y);
                // Never shrink: the smaller factor is raised to 1 and the other keeps the
                // proportion between them.
                if xf < 1.0 || yf < 1.0 {
                    if xf < yf {
                        Some((1.0, yf / xf))
                    } else {
                        Some((xf / yf, 1.0))
                    }
                } else {
                    Some((xf, yf))
                }
            }
            Ratio::Expand => {
                let t = target?;
                let f = (t.x / sz.x).min(t.y / sz.y);
                (f > 1.0).then_some((f, f))
            }
            Ratio::Compress => {
                let t = target?;
                let f = (t.x / sz.x).min(t.y / sz.y);
                (f < 1.0).then_some((f, f))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Splines {
    #[default]
    Spline,
    Polyline,
    Line,
    Curved,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotConfig {
    /// Points.
    pub nodesep: f64,
    /// Points.
    pub ranksep: f64,
    pub rankdir: RankDir,
    pub clusterrank: ClusterRank,
    pub concentrate: bool,
    pub newrank: bool,
    pub ordering: Option<Ordering>,
    pub mclimit: f64,
    pub searchsize: usize,
    /// Scales the x-coordinate network simplex iteration cap by the node count.
    pub nslimit: Option<f64>,
    /// Scales the ranking network simplex iteration cap by the node count.
    pub nslimit1: Option<f64>,
    pub splines: Splines,
    /// Stop after this phase (1 rank, 2 order, 3 position); 0 runs everything.
    pub phase: u8,
    pub tb_balance: TbBalance,
    /// `None` means "on when the graph has clusters".
    pub remincross: Option<bool>,
    pub ratio: Ratio,
    /// `size` in points, drawing frame.
    pub size: Option<Point>,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            nodesep: DEFAULT_NODESEP * POINTS_PER_INCH,
            ranksep: DEFAULT_RANKSEP * POINTS_PER_INCH,
            rankdir: RankDir::TopBottom,
            clusterrank: ClusterRank::Local,
            concentrate: false,
            newrank: false,
            ordering: None,
            mclimit: 1.0,
            searchsize: SEARCHSIZE,
            nslimit: None,
            nslimit1: None,
            splines: Splines::Spline,
            phase: 0,
            tb_balance: TbBalance::None,
            remincross: None,
            ratio: Ratio::None,
            size: None,
        }
    }
}

impl DotConfig {
    /// Reads every layout attribute off the root graph, warning (once per kind) on bad values.
    pub fn from_graph(g: &mut Graph) -> DotConfig {
        let mut cfg = DotConfig {
            nodesep: g.graph_double("nodesep", DEFAULT_NODESEP, MIN_NODESEP) * POINTS_PER_INCH,
            ..DotConfig::default()
        };
        // "equally" and other suffixes are tolerated; only the leading number matters.
        if let Some(raw) = g.graph_attr("ranksep").map(str::to_string) {
            let lead: String = raw
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            match lead.parse::<f64>() {
                Ok(v) => cfg.ranksep = v.max(MIN_RANKSEP) * POINTS_PER_INCH,
                Err(_) if raw.trim().is_empty() => {}
                Err(_) => {
                    g.warnings.warn(
                        WarningKind::MalformedAttribute,
                        format!("invalid value {raw:?} for attribute \"ranksep\""),
                    );
                }
            }
        }
        if let Some(raw) = g.graph_attr("rankdir").map(str::to_string) {
            match RankDir::parse(&raw) {
                Some(d) => cfg.rankdir = d,
                None => {
                    g.warnings.warn(
                        WarningKind::MalformedAttribute,
                        format!("invalid rankdir {raw:?}; using TB"),
                    );
                }
            }
        }
        cfg.clusterrank = match g.graph_attr("clusterrank").map(str::to_ascii_lowercase).as_deref() {
            Some("global") => ClusterRank::Global,
            Some("none") => ClusterRank::None,
            _ => ClusterRank::Local,
        };
        cfg.concentrate = g.graph_bool("concentrate", false);
        cfg.newrank = g.graph_bool("newrank", false);
        cfg.ordering = g.graph_attr("ordering").and_then(Ordering::parse);
        cfg.mclimit = g.graph_double("mclimit", 1.0, 0.0);
        if g.graph_attr("searchsize").is_some() {
            let v = g.graph_int("searchsize", SEARCHSIZE as i32, -1);
            cfg.searchsize = if v < 0 { SEARCHSIZE } else { v.max(1) as usize };
        }
        cfg.nslimit = g
            .graph_attr("nslimit")
            .is_some()
            .then(|| g.graph_double("nslimit", 0.0, 0.0));
        cfg.nslimit1 = g
            .graph_attr("nslimit1")
            .is_some()
            .then(|| g.graph_double("nslimit1", 0.0, 0.0));
        cfg.splines = parse_splines(g);
        cfg.phase = g.graph_int("phase", 0, 0).min(3) as u8;
        cfg.tb_balance = match g.graph_attr("TBbalance") {
            Some("min") => TbBalance::Min,
            Some("max") => TbBalance::Max,
            _ => TbBalance::None,
        };
        cfg.remincross = g
            .graph_attr("remincross")
            .is_some()
            .then(|| g.graph_bool("remincross", true));
        if let Some(raw) = g.graph_attr("ratio").map(str::to_string) {
            match Ratio::parse(&raw) {
                Some(r) => cfg.ratio = r,
                None => {
                    g.warnings.warn(
                        WarningKind::MalformedAttribute,
                        format!("invalid ratio {raw:?}; ignored"),
                    );
                }
            }
        }
        cfg.size = parse_size(g);
        cfg
    }

    /// `MaxIter`, scaled by `mclimit` and never below 1.
    pub fn max_iter(&self) -> usize {
        ((24.0 * self.mclimit) as usize).max(1)
    }

    /// `MinQuit`, scaled by `mclimit` and never below 1.
    pub fn min_quit(&self) -> usize {
        ((8.0 * self.mclimit) as usize).max(1)
    }

    pub(crate) fn ns_limit(limit: Option<f64>, nodes: usize) -> usize {
        match limit {
            Some(f) => ((f * nodes as f64) as usize).max(1),
            None => usize::MAX,
        }
    }
}

/// `size` is `"w,h"` or a single `"w"` for both, in inches. A trailing `!` is accepted.
pub fn parse_size(g: &mut Graph) -> Option<Point> {
    let raw = g.graph_attr("size")?.trim().to_string();
    if raw.is_empty() {
        return None;
    }
    let body = raw.strip_suffix('!').unwrap_or(&raw);
    let parsed = match parse_point(&raw) {
        Some((x, y, _)) => Some((x, y)),
        None => body.trim().parse::<f64>().ok().map(|v| (v, v)),
    };
    match parsed {
        Some((x, y)) if x > 0.0 && y > 0.0 => {
            Some(Point::new(x * POINTS_PER_INCH, y * POINTS_PER_INCH))
        }
        _ => {
            g.warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid size {raw:?}; ignored"),
            );
            None
        }
    }
}

fn parse_splines(g: &mut Graph) -> Splines {
    let Some(raw) = g.graph_attr("splines").map(str::to_ascii_lowercase) else {
        return Splines::Spline;
    };
    match raw.trim() {
        "" | "none" => Splines::None,
        "spline" | "true" | "yes" => Splines::Spline,
        "polyline" => Splines::Polyline,
        "line" | "false" | "no" => Splines::Line,
        "curved" => Splines::Curved,
        "ortho" => {
            g.warnings.warn(
                WarningKind::Unsupported,
                "orthogonal edges are not supported; using polylines",
            );
            Splines::Polyline
        }
        other => {
            g.warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid splines value {other:?}; using spline"),
            );
            Splines::Spline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rankdir_maps_round_trip() {
        let p = Point::new(3.0, -7.0);
        for d in [
            RankDir::TopBottom,
            RankDir::LeftRight,
            RankDir::BottomTop,
            RankDir::RightLeft,
        ] {
            assert_eq!(d.to_layout(d.to_final(p)), p);
        }
        // The first rank (largest y) ends up leftmost in a left-to-right drawing.
        let down = Point::new(0.0, -1.0);
        assert_eq!(RankDir::LeftRight.to_final(down), Point::new(1.0, 0.0));
    }

    #[test]
    fn attributes_are_read_in_points() {
        let mut g = Graph::new("G", true);
        g.set_graph_attr("nodesep", "0.5")
            .set_graph_attr("ranksep", "1.0 equally")
            .set_graph_attr("splines", "ortho")
            .set_graph_attr("mclimit", "0.01");
        let cfg = DotConfig::from_graph(&mut g);
        assert_eq!(cfg.nodesep, 36.0);
        assert_eq!(cfg.ranksep, 72.0);
        assert_eq!(cfg.splines, Splines::Polyline);
        assert!(g.warnings.has(WarningKind::Unsupported));
        assert_eq!(cfg.max_iter(), 1);
        assert_eq!(cfg.min_quit(), 1);
    }

    #[test]
    fn numeric_ratio_stretches_one_axis() {
        // 100 wide, 50 high; ratio 1 wants them equal, so y doubles.
        let sz = Point::new(100.0, 50.0);
        assert_eq!(Ratio::Value(1.0).factors(sz, None), Some((1.0, 2.0)));
        assert_eq!(Ratio::Value(0.25).factors(sz, None), Some((2.0, 1.0)));
        assert_eq!(Ratio::parse("-3"), Some(Ratio::None));
        assert_eq!(Ratio::parse("tall"), None);
    }

    #[test]
    fn size_bounded_ratios_need_a_size() {
        let sz = Point::new(100.0, 50.0);
        let size = Some(Point::new(200.0, 200.0));
        assert_eq!(Ratio::Fill.factors(sz, None), None);
        assert_eq!(Ratio::Fill.factors(sz, size), Some((2.0, 4.0)));
        assert_eq!(Ratio::Expand.factors(sz, size), Some((2.0, 2.0)));
        assert_eq!(Ratio::Compress.factors(sz, size), None);
        let small = Some(Point::new(50.0, 50.0));
        assert_eq!(Ratio::Compress.factors(sz, small), Some((0.5, 0.5)));
        assert_eq!(Ratio::Auto.factors(sz, small), None);
    }

    #[test]
    fn size_accepts_one_or_two_numbers() {
        let mut g = Graph::new("G", true);
        g.set_graph_attr("size", "2,1!");
        assert_eq!(parse_size(&mut g), Some(Point::new(144.0, 72.0)));
        g.set_graph_attr("size", "3");
        assert_eq!(parse_size(&mut g), Some(Point::new(216.0, 216.0)));
        g.set_graph_attr("size", "big");
        assert_eq!(parse_size(&mut g), None);
        assert!(g.warnings.has(WarningKind::MalformedAttribute));
    }
}
