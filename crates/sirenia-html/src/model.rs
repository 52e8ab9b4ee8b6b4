//! The label tree.
//!
//! Boxes are filled in by sizing (`ll` at the origin, `ur` the size) and replaced by positioning
//! with boxes relative to the label's centre.

use sirenia_graph::{BBox, FontSpec};

pub const DEFAULT_BORDER: u8 = 1;
pub const DEFAULT_CELLPADDING: u8 = 2;
pub const DEFAULT_CELLSPACING: i8 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum HtmlLabel {
    Text(HtmlText),
    Table(Box<HtmlTable>),
}

impl HtmlLabel {
    pub fn bbox(&self) -> BBox {
        match self {
            HtmlLabel::Text(t) => t.bbox,
            HtmlLabel::Table(t) => t.data.bbox,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(HtmlText),
    Image(HtmlImage),
    Table(Box<HtmlTable>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Center,
    Left,
    Right,
    /// `ALIGN="TEXT"`: lines keep their own justification across the whole cell.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Middle,
    Top,
    Bottom,
}

/// Line justification inside a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Center,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub rounded: bool,
    pub radial: bool,
    pub dashed: bool,
    pub dotted: bool,
    pub invisible: bool,
}

/// Attributes shared by tables and cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlData {
    pub href: Option<String>,
    pub port: Option<String>,
    pub target: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
    pub bgcolor: Option<String>,
    pub pencolor: Option<String>,
    pub gradient_angle: i32,
    /// `CELLSPACING`; `None` uses the default.
    pub space: Option<i8>,
    /// `CELLPADDING`; `None` inherits.
    pub pad: Option<u8>,
    /// `BORDER`; `None` inherits.
    pub border: Option<u8>,
    pub width: u16,
    pub height: u16,
    pub fixed_size: bool,
    pub align: HAlign,
    pub valign: VAlign,
    pub balign: Justify,
    pub style: Style,
    /// Sides of the border to draw (`SIDES`); `None` draws all four.
    pub border_sides: Option<u8>,
    pub bbox: BBox,
    /// Outer sides of the node this element touches, set by positioning.
    pub sides: u8,
}

impl HtmlData {
    pub fn border(&self) -> f64 {
        f64::from(self.border.unwrap_or(0))
    }

    pub fn pad(&self) -> f64 {
        f64::from(self.pad.unwrap_or(0))
    }

    pub fn space(&self) -> f64 {
        f64::from(self.space.unwrap_or(0))
    }

    /// A link or tooltip is attached. `TARGET` alone has nothing to open.
    pub fn has_anchor(&self) -> bool {
        self.href.is_some() || self.title.is_some()
    }
}

/// Font changes from `<FONT>` and the style tags. Unset fields inherit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontChange {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<String>,
    pub flags: u8,
}

pub mod flags {
    pub const BOLD: u8 = 1 << 0;
    pub const ITALIC: u8 = 1 << 1;
    pub const UNDERLINE: u8 = 1 << 2;
    pub const SUPERSCRIPT: u8 = 1 << 3;
    pub const SUBSCRIPT: u8 = 1 << 4;
    pub const STRIKE: u8 = 1 << 5;
    pub const OVERLINE: u8 = 1 << 6;
}

impl FontChange {
    /// `self` applied on top of `outer`.
    pub fn over(&self, outer: &FontChange) -> FontChange {
        FontChange {
            name: self.name.clone().or_else(|| outer.name.clone()),
            size: self.size.or(outer.size),
            color: self.color.clone().or_else(|| outer.color.clone()),
            flags: self.flags | outer.flags,
        }
    }
}

/// A run of text in one font.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextItem {
    pub text: String,
    pub font: FontChange,
    /// Resolved by sizing.
    pub spec: FontSpec,
    pub color: Option<String>,
    pub width: f64,
    pub height: f64,
}

/// One line of text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    pub items: Vec<TextItem>,
    /// `None` until a `<BR ALIGN=...>` or the enclosing cell's `BALIGN` decides.
    pub just: Option<Justify>,
    pub width: f64,
    pub height: f64,
    /// Distance from the top of the text block to this line's baseline.
    pub baseline: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlText {
    pub spans: Vec<TextSpan>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlImage {
    pub src: String,
    pub scale: Option<String>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlCell {
    pub data: HtmlData,
    pub content: CellContent,
    pub rowspan: u16,
    pub colspan: u16,
    pub row: u32,
    pub col: u32,
    /// Draw a rule below this cell.
    pub hruled: bool,
    /// Draw a rule right of this cell.
    pub vruled: bool,
}

impl HtmlCell {
    pub fn new(content: CellContent) -> Self {
        Self {
            data: HtmlData::default(),
            content,
            rowspan: 1,
            colspan: 1,
            row: 0,
            col: 0,
            hruled: false,
            vruled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlRow {
    pub cells: Vec<HtmlCell>,
    /// An `<HR/>` follows this row.
    pub ruled: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlTable {
    pub data: HtmlData,
    pub rows: Vec<HtmlRow>,
    /// `CELLBORDER`: default border for the cells.
    pub cellborder: Option<u8>,
    /// `ROWS="*"`: a rule between every pair of rows.
    pub rule_rows: bool,
    /// `COLUMNS="*"`: a rule between every pair of columns.
    pub rule_columns: bool,
    pub font: Option<FontChange>,
    pub row_count: usize,
    pub column_count: usize,
    /// Minimum column widths after sizing; column start positions after positioning, with one
    /// extra entry for the right end.
    pub widths: Vec<f64>,
    /// Minimum row heights after sizing; row top positions after positioning, with one extra
    /// entry for the bottom.
    pub heights: Vec<f64>,
}

impl HtmlTable {
    pub fn cells(&self) -> impl Iterator<Item = &HtmlCell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut HtmlCell> {
        self.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
    }
}
