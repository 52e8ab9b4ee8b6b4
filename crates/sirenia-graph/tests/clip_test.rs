use sirenia_graph::clip::{ArrowSpec, ClipEnd, clip_and_install, line_bezier, polyline_to_bezier};
use sirenia_graph::{Point, Shape, ShapeDesc, ShapeKind};

fn boxes() -> (ShapeDesc, ShapeDesc) {
    (
        ShapeDesc::new(ShapeKind::Rect, 40.0, 20.0),
        ShapeDesc::new(ShapeKind::Rect, 40.0, 20.0),
    )
}

#[test]
fn straight_edge_is_clipped_to_both_boxes() {
    let (ts, hs) = boxes();
    let tail = ClipEnd {
        center: Point::new(0.0, 100.0),
        shape: &ts,
        bp: None,
        clip: true,
    };
    let head = ClipEnd {
        center: Point::new(0.0, 0.0),
        shape: &hs,
        bp: None,
        clip: true,
    };
    let raw = line_bezier(tail.center, head.center);
    let spl = clip_and_install(&raw, Some(&tail), Some(&head), ArrowSpec::default()).unwrap();
    let first = spl.points[0];
    let last = *spl.points.last().unwrap();
    assert!((first.y - 90.0).abs() <= 1.0, "start {first:?}");
    assert!((last.y - 10.0).abs() <= 1.0, "end {last:?}");
    assert!(!spl.sflag && !spl.eflag);
}

#[test]
fn arrowhead_stops_short_of_the_boundary() {
    let (ts, hs) = boxes();
    let tail = ClipEnd {
        center: Point::new(0.0, 100.0),
        shape: &ts,
        bp: None,
        clip: true,
    };
    let head = ClipEnd {
        center: Point::new(0.0, 0.0),
        shape: &hs,
        bp: None,
        clip: true,
    };
    let raw = line_bezier(tail.center, head.center);
    let arrows = ArrowSpec {
        start: None,
        end: Some(10.0),
    };
    let spl = clip_and_install(&raw, Some(&tail), Some(&head), arrows).unwrap();
    assert!(spl.eflag);
    let last = *spl.points.last().unwrap();
    let gap = last.dist(spl.ep);
    assert!((gap - 10.0).abs() <= 1.0, "gap {gap}");
    assert!(hs.inside(spl.ep - head.center, None) || (spl.ep.y - 10.0).abs() <= 1.0);
}

#[test]
fn polyline_expands_to_cubic_pieces() {
    let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
    let cps = polyline_to_bezier(&pts);
    assert_eq!(cps.len(), 7);
    assert_eq!(cps[0], pts[0]);
    assert_eq!(cps[3], pts[1]);
    assert_eq!(cps[6], pts[2]);
}
