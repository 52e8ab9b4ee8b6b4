//! Drawing a positioned label through a renderer.
//!
//! Per table: anchor, background, cells, rules, border, end anchor. Per cell: anchor, background,
//! border, content, end anchor. Invisible elements keep their anchors but draw nothing.

use sirenia_graph::{BBox, Point};

use crate::model::{CellContent, HtmlCell, HtmlData, HtmlLabel, HtmlTable, HtmlText, Justify, Style, TextItem};

const DEFAULT_COLOR: &str = "black";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen<'a> {
    pub color: &'a str,
    pub width: f64,
    pub style: LineStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient<'a> {
    pub to: &'a str,
    pub angle: i32,
    pub radial: bool,
    /// Stop position of the first colour, when given as `color;frac:color`.
    pub frac: Option<f64>,
}

/// A background fill. The outline is drawn without a pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill<'a> {
    pub color: &'a str,
    pub gradient: Option<Gradient<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor<'a> {
    pub href: Option<&'a str>,
    pub target: Option<&'a str>,
    pub title: Option<&'a str>,
    pub id: Option<&'a str>,
}

pub trait HtmlRenderer {
    fn begin_anchor(&mut self, anchor: &Anchor<'_>, area: BBox);
    fn end_anchor(&mut self);
    fn fill(&mut self, outline: &[Point], fill: &Fill<'_>);
    fn polyline(&mut self, points: &[Point], pen: &Pen<'_>);
    /// A closed, unfilled outline.
    fn polygon(&mut self, points: &[Point], pen: &Pen<'_>);
    /// `at` is the left end of the item's baseline.
    fn text(&mut self, at: Point, item: &TextItem);
    fn image(&mut self, src: &str, area: BBox, scale: Option<&str>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions<'a> {
    /// Scaling for images without their own `SCALE`.
    pub image_scale: Option<&'a str>,
    /// Prefix for generated ids of anchors without an `ID`.
    pub id_prefix: Option<&'a str>,
}

/// Draws `label`, positioned around the origin, translated to `pos`.
pub fn emit_html_label(label: &HtmlLabel, pos: Point, opts: &EmitOptions<'_>, renderer: &mut dyn HtmlRenderer) {
    let mut em = Emitter {
        r: renderer,
        pos,
        opts,
        next_id: 0,
    };
    match label {
        HtmlLabel::Text(text) => em.text(text),
        HtmlLabel::Table(tbl) => em.table(tbl),
    }
}

struct Emitter<'r, 'o> {
    r: &'r mut dyn HtmlRenderer,
    pos: Point,
    opts: &'o EmitOptions<'o>,
    next_id: usize,
}

/// Splits `a:b` and `a;0.3:b` gradient specs. A plain colour has no gradient.
fn parse_fill<'a>(color: &'a str, angle: i32, style: Style) -> Fill<'a> {
    let Some((first, second)) = color.split_once(':') else {
        return Fill { color, gradient: None };
    };
    let (first, frac) = match first.split_once(';') {
        Some((c, f)) => (c, f.trim().parse::<f64>().ok().filter(|f| (0.0..=1.0).contains(f))),
        None => (first, None),
    };
    let to = second.split([';', ':']).next().unwrap_or_default();
    Fill {
        color: first,
        gradient: Some(Gradient {
            to: if to.is_empty() { DEFAULT_COLOR } else { to },
            angle,
            radial: style.radial,
            frac,
        }),
    }
}

fn corners(b: BBox) -> [Point; 4] {
    [b.ll, Point::new(b.ur.x, b.ll.y), b.ur, Point::new(b.ll.x, b.ur.y)]
}

/// Inset by half a thick border so the stroke stays inside the box.
fn stroke_box(b: BBox, border: f64) -> BBox {
    if border > 1.0 {
        b.expand(-border / 2.0, -border / 2.0)
    } else {
        b
    }
}

/// Outline of `b` with quarter-circle corners, counter-clockwise from the bottom edge.
fn rounded_outline(b: BBox) -> Vec<Point> {
    const STEPS: usize = 4;
    let r = (b.width().min(b.height()) / 4.0).min(12.0);
    let centers = [
        (Point::new(b.ur.x - r, b.ll.y + r), -90.0f64),
        (Point::new(b.ur.x - r, b.ur.y - r), 0.0),
        (Point::new(b.ll.x + r, b.ur.y - r), 90.0),
        (Point::new(b.ll.x + r, b.ll.y + r), 180.0),
    ];
    let mut out = Vec::with_capacity(4 * (STEPS + 1));
    for (c, start) in centers {
        for k in 0..=STEPS {
            let a = (start + 90.0 * k as f64 / STEPS as f64).to_radians();
            out.push(Point::new(c.x + r * a.cos(), c.y + r * a.sin()));
        }
    }
    out
}

fn pen_for<'a>(data: &'a HtmlData) -> Pen<'a> {
    let style = if data.style.dashed {
        LineStyle::Dashed
    } else if data.style.dotted {
        LineStyle::Dotted
    } else {
        LineStyle::Solid
    };
    Pen {
        color: data.pencolor.as_deref().unwrap_or(DEFAULT_COLOR),
        width: data.border(),
        style,
    }
}

impl Emitter<'_, '_> {
    fn begin_anchor(&mut self, data: &HtmlData, area: BBox) -> bool {
        if !data.has_anchor() {
            return false;
        }
        let generated = match (&data.id, self.opts.id_prefix) {
            (None, Some(prefix)) => {
                let id = format!("{prefix}_{}", self.next_id);
                self.next_id += 1;
                Some(id)
            }
            _ => None,
        };
        let anchor = Anchor {
            href: data.href.as_deref(),
            target: data.target.as_deref(),
            title: data.title.as_deref(),
            id: data.id.as_deref().or(generated.as_deref()),
        };
        self.r.begin_anchor(&anchor, area);
        true
    }

    fn background(&mut self, data: &HtmlData, area: BBox) {
        let Some(color) = &data.bgcolor else {
            return;
        };
        let fill = parse_fill(color, data.gradient_angle, data.style);
        let outline = if data.style.rounded {
            rounded_outline(stroke_box(area, data.border()))
        } else {
            corners(area).to_vec()
        };
        self.r.fill(&outline, &fill);
    }

    fn border(&mut self, data: &HtmlData, area: BBox) {
        let pen = pen_for(data);
        let b = stroke_box(area, data.border());
        if data.style.rounded {
            self.r.polygon(&rounded_outline(b), &pen);
            return;
        }
        let Some(mask) = data.border_sides.filter(|&m| m != sirenia_graph::sides::ALL) else {
            self.r.polygon(&corners(b), &pen);
            return;
        };
        // Side k runs from corner k to corner k + 1: bottom, right, top, left.
        let c = corners(b);
        let order = [
            sirenia_graph::sides::BOTTOM,
            sirenia_graph::sides::RIGHT,
            sirenia_graph::sides::TOP,
            sirenia_graph::sides::LEFT,
        ];
        let present = |k: usize| mask & order[k % 4] != 0;
        for start in 0..4 {
            if !present(start) || present(start + 3) {
                continue;
            }
            let mut points = vec![c[start]];
            let mut k = start;
            while present(k) && points.len() <= 4 {
                k += 1;
                points.push(c[k % 4]);
            }
            self.r.polyline(&points, &pen);
        }
    }

    fn table(&mut self, tbl: &HtmlTable) {
        let area = tbl.data.bbox.translate(self.pos);
        let anchored = self.begin_anchor(&tbl.data, area);
        if !tbl.data.style.invisible {
            self.background(&tbl.data, area);
            for cell in tbl.cells() {
                self.cell(cell);
            }
            let cells: Vec<&HtmlCell> = tbl.cells().collect();
            let color = tbl.data.pencolor.as_deref().unwrap_or(DEFAULT_COLOR);
            let pen = Pen {
                color,
                width: 1.0,
                style: LineStyle::Solid,
            };
            for (i, cell) in cells.iter().enumerate() {
                let next = cells.get(i + 1).copied();
                for line in rules(cell, tbl, next, self.pos).into_iter().flatten() {
                    self.r.polyline(&line, &pen);
                }
            }
            if tbl.data.border() > 0.0 {
                self.border(&tbl.data, area);
            }
        }
        if anchored {
            self.r.end_anchor();
        }
    }

    fn cell(&mut self, cell: &HtmlCell) {
        let area = cell.data.bbox.translate(self.pos);
        let anchored = self.begin_anchor(&cell.data, area);
        if !cell.data.style.invisible {
            self.background(&cell.data, area);
            if cell.data.border() > 0.0 {
                self.border(&cell.data, area);
            }
            match &cell.content {
                CellContent::Table(tbl) => self.table(tbl),
                CellContent::Image(img) => {
                    let scale = img.scale.as_deref().or(self.opts.image_scale);
                    self.r.image(&img.src, img.bbox.translate(self.pos), scale);
                }
                CellContent::Text(text) => self.text(text),
            }
        }
        if anchored {
            self.r.end_anchor();
        }
    }

    fn text(&mut self, text: &HtmlText) {
        let b = text.bbox.translate(self.pos);
        let center = b.center();
        let half = b.width() / 2.0;
        let top = center.y + b.height() / 2.0;
        for span in &text.spans {
            let mut x = match span.just.unwrap_or_default() {
                Justify::Left => center.x - half,
                Justify::Right => center.x + half - span.width,
                Justify::Center => center.x - span.width / 2.0,
            };
            let y = top - span.baseline;
            for item in &span.items {
                self.r.text(Point::new(x, y), item);
                x += item.width;
            }
        }
    }
}

/// Vertical and horizontal rule segments after `cell`, reaching into the table border at the
/// outer rows and columns. A row that ends early extends its rule to the table edge.
fn rules(cell: &HtmlCell, tbl: &HtmlTable, next: Option<&HtmlCell>, pos: Point) -> [Option<[Point; 2]>; 2] {
    let pts = cell.data.bbox.translate(pos);
    let half = tbl.data.space() / 2.0;
    let border = tbl.data.border();
    let (col, row) = (cell.col as usize, cell.row as usize);
    let (colspan, rowspan) = (usize::from(cell.colspan), usize::from(cell.rowspan));

    let mut out = [None, None];
    if cell.vruled && col + colspan < tbl.column_count {
        let (base, y) = if row == 0 {
            (border + half, pts.ll.y - half)
        } else if row + rowspan == tbl.row_count {
            let base = border + half;
            (base, pts.ll.y - half - base)
        } else {
            (0.0, pts.ll.y - half)
        };
        let x = pts.ur.x + half;
        let len = base + pts.height() + tbl.data.space();
        out[0] = Some([Point::new(x, y), Point::new(x, y + len)]);
    }
    if cell.hruled && row + rowspan < tbl.row_count {
        let row_ends_early = next.is_some_and(|n| n.row != cell.row);
        let to_edge = tbl.data.bbox.ur.x + pos.x - (pts.ur.x + half);
        let (mut base, x) = if col == 0 {
            let base = border + half;
            (base, pts.ll.x - base - half)
        } else if col + colspan == tbl.column_count {
            (border + half, pts.ll.x - half)
        } else {
            (0.0, pts.ll.x - half)
        };
        if col == 0 && col + colspan == tbl.column_count {
            base *= 2.0;
        } else if col + colspan != tbl.column_count && row_ends_early {
            base += to_edge;
        }
        let y = pts.ll.y - half;
        let len = base + pts.width() + tbl.data.space();
        out[1] = Some([Point::new(x, y), Point::new(x + len, y)]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_specs_split_into_two_colours() {
        let style = Style::default();
        assert_eq!(parse_fill("red", 0, style).gradient, None);
        let f = parse_fill("red:blue", 90, style);
        assert_eq!(f.color, "red");
        let g = f.gradient.unwrap();
        assert_eq!((g.to, g.angle, g.frac), ("blue", 90, None));
        let f = parse_fill("yellow;0.3:green", 0, style);
        assert_eq!(f.color, "yellow");
        assert_eq!(f.gradient.unwrap().frac, Some(0.3));
        assert_eq!(parse_fill("white:", 0, style).gradient.unwrap().to, "black");
    }

    #[test]
    fn rounded_outline_stays_inside_the_box() {
        let b = BBox::from_coords(0.0, 0.0, 100.0, 40.0);
        let pts = rounded_outline(b);
        assert_eq!(pts.len(), 20);
        for p in pts {
            assert!(p.x >= -1e-9 && p.x <= 100.0 + 1e-9 && p.y >= -1e-9 && p.y <= 40.0 + 1e-9);
        }
    }
}
