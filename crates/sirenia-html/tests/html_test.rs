use sirenia_graph::text::EstimateMeasurer;
use sirenia_graph::{BBox, Point, WarningKind, Warnings, sides};
use sirenia_html::emit::{Anchor, Fill, Pen};
use sirenia_html::model::{Justify, TextItem};
use sirenia_html::{
    CellContent, EmitOptions, Error, HtmlCell, HtmlEnv, HtmlLabel, HtmlRenderer, HtmlTable, ImageSizer,
    emit_html_label, html_port, html_ports, make_html_label, parse_html_label, size_html_label,
};

fn new_label(text: &str) -> (HtmlLabel, Warnings) {
    let mut warnings = Warnings::new();
    let label = make_html_label(text, &HtmlEnv::new(&EstimateMeasurer), &mut warnings).unwrap();
    (label, warnings)
}

fn table(label: &HtmlLabel) -> &HtmlTable {
    match label {
        HtmlLabel::Table(t) => t,
        HtmlLabel::Text(_) => panic!("expected a table"),
    }
}

fn cell_text(cell: &HtmlCell) -> String {
    match &cell.content {
        CellContent::Text(t) => t
            .spans
            .iter()
            .flat_map(|s| s.items.iter().map(|i| i.text.as_str()))
            .collect(),
        _ => String::new(),
    }
}

fn cell<'a>(tbl: &'a HtmlTable, text: &str) -> &'a HtmlCell {
    tbl.cells().find(|c| cell_text(c) == text).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn rowspan_cell_covers_both_rows_and_the_spacing() {
    let (label, _) = new_label(r#"<TABLE><TR><TD>x</TD><TD ROWSPAN="2">y</TD></TR><TR><TD>z</TD></TR></TABLE>"#);
    let tbl = table(&label);
    assert_eq!((tbl.row_count, tbl.column_count), (2, 2));

    let (x, y, z) = (cell(tbl, "x"), cell(tbl, "y"), cell(tbl, "z"));
    assert_eq!((x.row, x.col), (0, 0));
    assert_eq!((y.row, y.col), (0, 1));
    assert_eq!((z.row, z.col), (1, 0));

    let space = tbl.data.space();
    assert!(close(y.data.bbox.height(), x.data.bbox.height() + z.data.bbox.height() + space));
    assert!(close(y.data.bbox.ur.y, x.data.bbox.ur.y));
    assert!(close(y.data.bbox.ll.y, z.data.bbox.ll.y));

    // 'x' is 7 wide and 16.8 high in the default font, plus padding 2 and border 1 on each side.
    assert!(close(x.data.bbox.width(), 13.0));
    assert!(close(tbl.data.bbox.width(), 3.0 * 2.0 + 2.0 + 26.0));
    assert!(tbl.data.bbox.center().approx_eq(Point::default(), 1e-9));
}

#[test]
fn wide_spanning_cell_widens_its_columns_evenly() {
    let (label, _) = new_label(
        r#"<TABLE><TR><TD>a</TD><TD>b</TD></TR><TR><TD COLSPAN="2">a much longer line</TD></TR></TABLE>"#,
    );
    let tbl = table(&label);
    let (a, b, long) = (cell(tbl, "a"), cell(tbl, "b"), cell(tbl, "a much longer line"));
    assert!(close(a.data.bbox.width(), b.data.bbox.width()));
    let space = tbl.data.space();
    assert!(close(a.data.bbox.width() + space + b.data.bbox.width(), long.data.bbox.width()));
    assert!(close(a.data.bbox.ll.x, long.data.bbox.ll.x));
    assert!(close(b.data.bbox.ur.x, long.data.bbox.ur.x));
}

#[test]
fn table_width_covers_columns_border_and_spacing() {
    let (label, _) = new_label(
        r#"<TABLE BORDER="3" CELLSPACING="4"><TR><TD>one</TD><TD>two</TD><TD>three</TD></TR><TR><TD COLSPAN="3">x</TD></TR></TABLE>"#,
    );
    let tbl = table(&label);
    let cols: f64 = tbl.widths.windows(2).map(|w| w[1] - w[0] - 4.0).sum();
    let needed = cols + 2.0 * 3.0 + 2.0 * 4.0;
    assert!(tbl.data.bbox.width() + 1e-9 >= needed);
    for c in tbl.cells() {
        assert!(c.col as usize + usize::from(c.colspan) <= tbl.column_count);
        assert!(c.row as usize + usize::from(c.rowspan) <= tbl.row_count);
        if let CellContent::Text(t) = &c.content {
            assert!(c.data.bbox.contains_box(&t.bbox));
        }
    }
}

#[test]
fn ports_report_the_outer_sides_they_touch() {
    let (label, _) = new_label(
        r#"<TABLE PORT="t"><TR><TD PORT="a">a</TD><TD PORT="b">b</TD></TR><TR><TD COLSPAN="2" PORT="c">c</TD></TR></TABLE>"#,
    );
    let tbl = table(&label);
    let (bbox, s) = html_port(&label, "A").unwrap();
    assert_eq!(bbox, cell(tbl, "a").data.bbox);
    assert_eq!(s, sides::LEFT | sides::TOP);
    assert_eq!(html_port(&label, "b").unwrap().1, sides::TOP | sides::RIGHT);
    assert_eq!(html_port(&label, "c").unwrap().1, sides::LEFT | sides::RIGHT | sides::BOTTOM);
    assert_eq!(html_port(&label, "t").unwrap(), (tbl.data.bbox, sides::ALL));
    assert_eq!(html_port(&label, "missing"), None);

    let names: Vec<String> = html_ports(&label).into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["t", "a", "b", "c"]);
}

#[test]
fn nested_table_ports_inherit_the_cell_sides() {
    let (label, _) = new_label(
        r#"<TABLE><TR><TD>left</TD><TD><TABLE><TR><TD PORT="in">i</TD></TR><TR><TD PORT="low">j</TD></TR></TABLE></TD></TR></TABLE>"#,
    );
    assert_eq!(html_port(&label, "in").unwrap().1, sides::TOP | sides::RIGHT);
    assert_eq!(html_port(&label, "low").unwrap().1, sides::RIGHT | sides::BOTTOM);
}

#[test]
fn fixed_size_cell_keeps_its_size_and_warns() {
    let (label, warnings) =
        new_label(r#"<TABLE><TR><TD FIXEDSIZE="TRUE" WIDTH="5" HEIGHT="5">far too long</TD></TR></TABLE>"#);
    assert!(warnings.has(WarningKind::CellTooSmall));
    let c = table(&label).cells().next().unwrap();
    assert!(close(c.data.bbox.width(), 5.0));
    assert!(close(c.data.bbox.height(), 5.0));

    let (_, warnings) = new_label(r#"<TABLE><TR><TD FIXEDSIZE="TRUE" WIDTH="50">x</TD></TR></TABLE>"#);
    assert!(warnings.has(WarningKind::MalformedAttribute));
    assert!(!warnings.has(WarningKind::CellTooSmall));
}

#[test]
fn fixed_size_table_warns_when_too_small() {
    let (label, warnings) = new_label(
        r#"<TABLE FIXEDSIZE="TRUE" WIDTH="10" HEIGHT="10"><TR><TD>wide content</TD></TR></TABLE>"#,
    );
    assert!(warnings.has(WarningKind::TableTooSmall));
    assert!(close(table(&label).data.bbox.width(), 10.0));
}

#[test]
fn bad_attributes_warn_and_fall_back() {
    let (label, warnings) = new_label(r#"<TABLE BORDER="thick" CELLSPACING="500"><TR><TD>x</TD></TR></TABLE>"#);
    assert!(warnings.has(WarningKind::MalformedAttribute));
    assert_eq!(warnings.messages().len(), 1);
    let tbl = table(&label);
    assert_eq!(tbl.data.border, Some(1));
    assert_eq!(tbl.data.space, Some(127));
}

#[test]
fn cell_border_and_padding_follow_the_table() {
    let (label, _) = new_label(r#"<TABLE BORDER="0" CELLPADDING="5"><TR><TD>x</TD><TD BORDER="2">y</TD></TR></TABLE>"#);
    let tbl = table(&label);
    let (x, y) = (cell(tbl, "x"), cell(tbl, "y"));
    assert_eq!((x.data.border, x.data.pad), (Some(0), Some(5)));
    assert_eq!((y.data.border, y.data.pad), (Some(2), Some(5)));

    let (label, _) = new_label(r#"<TABLE BORDER="3" CELLBORDER="0"><TR><TD>x</TD></TR></TABLE>"#);
    assert_eq!(table(&label).cells().next().unwrap().data.border, Some(0));
}

#[test]
fn structural_mistakes_are_errors() {
    let mut w = Warnings::new();
    assert!(matches!(parse_html_label("<TABLE><TR></TR></TABLE>", &mut w), Err(Error::Parse(_))));
    assert!(matches!(
        parse_html_label("<TABLE><TR><TD>a</TD></TR></TABLE", &mut w),
        Err(Error::Parse(_))
    ));
    assert_eq!(
        parse_html_label("<BLINK>x</BLINK>", &mut w),
        Err(Error::UnknownElement("blink".to_string()))
    );
    assert!(matches!(
        parse_html_label("a<TABLE><TR><TD>x</TD></TR></TABLE>", &mut w),
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        parse_html_label("<TABLE><HR/><TR><TD>x</TD></TR></TABLE>", &mut w),
        Err(Error::Parse(_))
    ));
    assert!(matches!(parse_html_label("<TABLE><TR><TD><IMG/></TD></TR></TABLE>", &mut w), Err(Error::Parse(_))));
}

#[test]
fn names_are_case_insensitive_and_entities_decode() {
    let (label, _) = new_label("<table><tr><td port=\"P\">a&nbsp;b&amp;c</td></tr></table>");
    let tbl = table(&label);
    let c = tbl.cells().next().unwrap();
    assert_eq!(cell_text(c), "a\u{a0}b&c");
    assert!(html_port(&label, "p").is_some());
}

#[test]
fn font_tags_change_measurement() {
    let (label, _) = new_label(r#"x<BR/><FONT POINT-SIZE="28" FACE="Courier">x</FONT>"#);
    let HtmlLabel::Text(text) = &label else {
        panic!("expected text");
    };
    assert_eq!(text.spans.len(), 2);
    let big = &text.spans[1].items[0];
    assert_eq!(big.spec.name, "Courier");
    assert!(close(big.height, 28.0 * 1.2));
    assert!(close(text.bbox.height(), 14.0 * 1.2 + 28.0 * 1.2));

    let (label, _) = new_label("<B><TABLE><TR><TD>x</TD></TR></TABLE></B>");
    let c = table(&label).cells().next().unwrap();
    let CellContent::Text(t) = &c.content else {
        panic!("expected text");
    };
    assert!(t.spans[0].items[0].spec.bold);
}

struct Sized;

impl ImageSizer for Sized {
    fn image_size(&self, _src: &str) -> Option<Point> {
        Some(Point::new(20.0, 10.0))
    }
}

#[test]
fn images_are_sized_by_the_injected_sizer() {
    let text = r#"<TABLE><TR><TD><IMG SRC="logo.png"/></TD></TR></TABLE>"#;
    let (_, warnings) = new_label(text);
    assert!(warnings.has(WarningKind::ImageSize));

    let mut warnings = Warnings::new();
    let env = HtmlEnv {
        images: &Sized,
        ..HtmlEnv::new(&EstimateMeasurer)
    };
    let label = make_html_label(text, &env, &mut warnings).unwrap();
    assert!(warnings.is_empty());
    let c = table(&label).cells().next().unwrap();
    assert!(close(c.data.bbox.width(), 26.0));
    assert!(close(c.data.bbox.height(), 16.0));
    let CellContent::Image(img) = &c.content else {
        panic!("expected an image");
    };
    assert_eq!(img.src, "logo.png");
    assert!(close(img.bbox.width(), 20.0));
}

#[test]
fn sizing_a_laid_out_label_again_changes_nothing() {
    let (mut label, _) = new_label(
        r#"<TABLE><TR><TD ROWSPAN="2">tall</TD><TD>b</TD></TR><TR><TD COLSPAN="1">c</TD></TR></TABLE>"#,
    );
    let sizes = |label: &HtmlLabel| -> Vec<(f64, f64)> {
        table(label)
            .cells()
            .map(|c| (c.data.bbox.width(), c.data.bbox.height()))
            .collect()
    };
    let before = sizes(&label);
    let outer = (label.bbox().width(), label.bbox().height());
    let mut warnings = Warnings::new();
    size_html_label(&mut label, &HtmlEnv::new(&EstimateMeasurer), &mut warnings);
    let after = sizes(&label);
    assert_eq!(before.len(), after.len());
    for ((bw, bh), (aw, ah)) in before.into_iter().zip(after) {
        assert!((bw - aw).abs() < 1e-9 && (bh - ah).abs() < 1e-9);
    }
    assert!(close(outer.0, label.bbox().width()));
    assert!(close(outer.1, label.bbox().height()));
}

#[derive(Debug, PartialEq)]
enum Event {
    Begin(String),
    End,
    Fill(String),
    Line(usize, f64),
    Outline(String),
    Text(String, Point, f64),
    Image(String),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl HtmlRenderer for Recorder {
    fn begin_anchor(&mut self, anchor: &Anchor<'_>, _area: BBox) {
        self.events.push(Event::Begin(anchor.href.unwrap_or_default().to_string()));
    }

    fn end_anchor(&mut self) {
        self.events.push(Event::End);
    }

    fn fill(&mut self, _outline: &[Point], fill: &Fill<'_>) {
        self.events.push(Event::Fill(fill.color.to_string()));
    }

    fn polyline(&mut self, points: &[Point], pen: &Pen<'_>) {
        self.events.push(Event::Line(points.len(), pen.width));
    }

    fn polygon(&mut self, _points: &[Point], pen: &Pen<'_>) {
        self.events.push(Event::Outline(pen.color.to_string()));
    }

    fn text(&mut self, at: Point, item: &TextItem) {
        self.events.push(Event::Text(item.text.clone(), at, item.width));
    }

    fn image(&mut self, src: &str, _area: BBox, _scale: Option<&str>) {
        self.events.push(Event::Image(src.to_string()));
    }
}

fn record(label: &HtmlLabel) -> Vec<Event> {
    let mut rec = Recorder::default();
    emit_html_label(label, Point::new(100.0, 50.0), &EmitOptions::default(), &mut rec);
    rec.events
}

fn texts(events: &[Event]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Text(t, ..) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn emission_brackets_anchors_and_draws_rules_after_cells() {
    let (label, _) = new_label(
        r#"<TABLE HREF="http://x" BGCOLOR="red" COLOR="blue"><TR><TD>a</TD><VR/><TD>b</TD></TR><HR/><TR><TD COLSPAN="2">c</TD></TR></TABLE>"#,
    );
    let events = record(&label);
    let outline = || Event::Outline("blue".to_string());
    let text = |e: &Event| matches!(e, Event::Text(..));
    assert_eq!(events[0], Event::Begin("http://x".to_string()));
    assert_eq!(events[1], Event::Fill("red".to_string()));
    assert_eq!(events[2], outline());
    assert!(text(&events[3]));
    assert_eq!(events[4], outline());
    assert!(text(&events[5]));
    assert_eq!(events[6], outline());
    assert!(text(&events[7]));
    // a: vertical and horizontal rule; b: horizontal rule.
    for e in &events[8..11] {
        assert_eq!(*e, Event::Line(2, 1.0));
    }
    assert_eq!(events[11], outline());
    assert_eq!(events[12], Event::End);
    assert_eq!(events.len(), 13);
    assert_eq!(texts(&events), vec!["a", "b", "c"]);
}

#[test]
fn invisible_tables_keep_their_anchor_only() {
    let (label, _) = new_label(r#"<TABLE TITLE="tip" STYLE="invis"><TR><TD>a</TD></TR></TABLE>"#);
    assert_eq!(record(&label), vec![Event::Begin(String::new()), Event::End]);
}

#[test]
fn partial_borders_are_polylines() {
    let (label, _) = new_label(
        r#"<TABLE BORDER="0" CELLBORDER="1"><TR><TD SIDES="TL">a</TD><TD SIDES="LR">b</TD></TR></TABLE>"#,
    );
    let lines: Vec<Event> = record(&label)
        .into_iter()
        .filter(|e| matches!(e, Event::Line(..) | Event::Outline(_)))
        .collect();
    // Top and left join at a corner; left and right are separate strokes.
    assert_eq!(lines, vec![Event::Line(3, 1.0), Event::Line(2, 1.0), Event::Line(2, 1.0)]);
}

#[test]
fn line_breaks_justify_their_lines() {
    let (label, _) = new_label(r#"left<BR ALIGN="LEFT"/>a much longer line<BR/>r<BR ALIGN="RIGHT"/>"#);
    let HtmlLabel::Text(text) = &label else {
        panic!("expected text");
    };
    let just: Vec<Option<Justify>> = text.spans.iter().map(|s| s.just).collect();
    assert_eq!(just, vec![Some(Justify::Left), Some(Justify::Center), Some(Justify::Right)]);

    let b = text.bbox.translate(Point::new(100.0, 50.0));
    let events = record(&label);
    let Event::Text(_, left_at, _) = &events[0] else {
        panic!("expected text");
    };
    assert!(close(left_at.x, b.ll.x));
    let Event::Text(_, mid_at, mid_w) = &events[1] else {
        panic!("expected text");
    };
    assert!(close(mid_at.x, b.ll.x));
    assert!(close(mid_at.x + mid_w, b.ur.x));
    let Event::Text(_, right_at, right_w) = &events[2] else {
        panic!("expected text");
    };
    assert!(close(right_at.x + right_w, b.ur.x));
    assert!(left_at.y > mid_at.y && mid_at.y > right_at.y);
}

#[test]
fn images_are_emitted_with_their_source() {
    let env = HtmlEnv {
        images: &Sized,
        ..HtmlEnv::new(&EstimateMeasurer)
    };
    let mut warnings = Warnings::new();
    let label = make_html_label(
        r#"<TABLE><TR><TD><IMG SRC="logo.png" SCALE="TRUE"/></TD></TR></TABLE>"#,
        &env,
        &mut warnings,
    )
    .unwrap();
    assert!(record(&label).contains(&Event::Image("logo.png".to_string())));
}
