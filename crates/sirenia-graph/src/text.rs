//! Text measurement.
//!
//! Real font metrics are an external collaborator; layouts call through [`TextMeasurer`].
//! [`EstimateMeasurer`] approximates widths from per-family average advance widths, which is
//! stable across platforms and good enough for tests and headless use.

use crate::geom::Point;

/// Line height as a multiple of the font size.
pub const LINESPACING: f64 = 1.20;

pub const DEFAULT_FONTSIZE: f64 = 14.0;
pub const DEFAULT_FONTNAME: &str = "Times-Roman";

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONTNAME.to_string(),
            size: DEFAULT_FONTSIZE,
            bold: false,
            italic: false,
        }
    }
}

pub trait TextMeasurer {
    /// Size of a single line of text: advance width and line height.
    fn measure(&self, text: &str, font: &FontSpec) -> Point;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateMeasurer;

impl EstimateMeasurer {
    fn em_ratio(font: &FontSpec) -> f64 {
        let name = font.name.to_ascii_lowercase();
        let base = if name.contains("courier") || name.contains("mono") {
            0.60
        } else if name.contains("helvetica") || name.contains("arial") || name.contains("sans") {
            0.55
        } else {
            0.50
        };
        if font.bold { base * 1.08 } else { base }
    }
}

impl TextMeasurer for EstimateMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Point {
        let ratio = Self::em_ratio(font);
        let width: f64 = text
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() || c == 'm' || c == 'w' {
                    ratio * 1.3
                } else if matches!(c, 'i' | 'l' | 'j' | '.' | ',' | '\'' | '|' | '!') {
                    ratio * 0.55
                } else if c == ' ' {
                    ratio * 0.5
                } else {
                    ratio
                }
            })
            .sum::<f64>()
            * font.size;
        Point::new(width, font.size * LINESPACING)
    }
}

/// Splits plain label text on `\n`, `\l`, `\r` escapes and literal newlines.
pub fn label_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some('n') | Some('l') | Some('r') => {
                    chars.next();
                    lines.push(std::mem::take(&mut cur));
                }
                Some(other) => {
                    chars.next();
                    cur.push(other);
                }
                None => cur.push('\\'),
            },
            '\n' => lines.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() || lines.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Size of a multi-line plain-text label.
pub fn measure_label(measurer: &dyn TextMeasurer, text: &str, font: &FontSpec) -> Point {
    let mut size = Point::default();
    for line in label_lines(text) {
        let ls = measurer.measure(&line, font);
        size.x = size.x.max(ls.x);
        size.y += ls.y;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_split_lines() {
        assert_eq!(label_lines("a\\nb\\lc"), vec!["a", "b", "c"]);
        assert_eq!(label_lines(""), vec![""]);
        assert_eq!(label_lines("x\\\\y"), vec!["x\\y"]);
    }

    #[test]
    fn multi_line_height_stacks() {
        let f = FontSpec::default();
        let one = measure_label(&EstimateMeasurer, "abc", &f);
        let two = measure_label(&EstimateMeasurer, "abc\\nabc", &f);
        assert_eq!(two.y, 2.0 * one.y);
        assert_eq!(two.x, one.x);
    }
}
