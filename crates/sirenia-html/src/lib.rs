#![forbid(unsafe_code)]

//! HTML-like labels: `label=<...>` text with tables, fonts and images.
//!
//! A label goes through [`parse_html_label`], [`size_html_label`] and [`position_html_label`]
//! (all three at once with [`make_html_label`]). The positioned tree answers port lookups with
//! [`html_port`] and is drawn through an [`HtmlRenderer`] by [`emit_html_label`].

pub mod emit;
pub mod error;
pub mod model;
mod parse;
mod port;
mod position;
mod size;

use sirenia_graph::{FontSpec, Point, TextMeasurer, Warnings};

pub use emit::{EmitOptions, HtmlRenderer, emit_html_label};
pub use error::{Error, Result};
pub use model::{CellContent, HtmlCell, HtmlLabel, HtmlTable, HtmlText};
pub use parse::parse_html_label;
pub use port::{html_port, html_ports};
pub use position::position_html_label;
pub use size::size_html_label;

/// Natural sizes of images named by `<IMG SRC=...>`.
pub trait ImageSizer {
    /// `None` when the image cannot be found or read.
    fn image_size(&self, src: &str) -> Option<Point>;
}

/// Knows no images; every image is sized 0x0 with a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageSizer for NoImages {
    fn image_size(&self, _src: &str) -> Option<Point> {
        None
    }
}

/// What a label inherits from the object it belongs to.
pub struct HtmlEnv<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub images: &'a dyn ImageSizer,
    pub font: FontSpec,
    pub font_color: Option<String>,
}

impl<'a> HtmlEnv<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            measurer,
            images: &NoImages,
            font: FontSpec::default(),
            font_color: None,
        }
    }
}

/// Parses, sizes and positions a label centred on the origin.
pub fn make_html_label(text: &str, env: &HtmlEnv<'_>, warnings: &mut Warnings) -> Result<HtmlLabel> {
    let mut label = parse_html_label(text, warnings)?;
    size_html_label(&mut label, env, warnings);
    position_html_label(&mut label, Point::default());
    tracing::debug!(
        width = label.bbox().width(),
        height = label.bbox().height(),
        "html label"
    );
    Ok(label)
}
