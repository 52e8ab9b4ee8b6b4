//! Label text to label tree.
//!
//! The markup is XML with HTML-style names: element and attribute names match case-insensitively
//! and the common HTML named entities are accepted. Structural mistakes are errors; bad attribute
//! values are warnings and the attribute is ignored.

use roxmltree::{Document, Node};
use sirenia_graph::{WarningKind, Warnings, sides};

use crate::error::{Error, Result};
use crate::model::{
    CellContent, FontChange, HAlign, HtmlCell, HtmlData, HtmlImage, HtmlLabel, HtmlRow, HtmlTable,
    HtmlText, Justify, TextItem, TextSpan, VAlign, flags,
};

const KNOWN: &[&str] = &[
    "table", "tr", "td", "font", "b", "i", "u", "o", "s", "sub", "sup", "br", "hr", "vr", "img",
];

const STYLE_TAGS: &[&str] = &["font", "b", "i", "u", "o", "s", "sub", "sup"];

/// Parses the text between the outer `<` and `>` of an HTML-like label.
pub fn parse_html_label(text: &str, warnings: &mut Warnings) -> Result<HtmlLabel> {
    let source = format!("<label>{}</label>", named_entities_to_numeric(text));
    let doc = Document::parse(&source).map_err(|e| Error::Parse(e.to_string()))?;
    let mut parser = Parser { warnings };
    parser.label(doc.root_element())
}

struct Parser<'w> {
    warnings: &'w mut Warnings,
}

fn lname(node: Node<'_, '_>) -> String {
    node.tag_name().name().to_ascii_lowercase()
}

fn is_blank(node: Node<'_, '_>) -> bool {
    node.text().is_none_or(|t| t.trim().is_empty())
}

fn unexpected(name: &str, parent: &str) -> Error {
    if KNOWN.contains(&name) {
        Error::Parse(format!("<{}> cannot appear inside {parent}", name.to_ascii_uppercase()))
    } else {
        Error::UnknownElement(name.to_string())
    }
}

/// The only element child of `node`, if there is no other content.
fn sole_element<'a, 'i>(node: Node<'a, 'i>) -> Option<Node<'a, 'i>> {
    let mut found = None;
    for child in node.children() {
        if child.is_text() {
            if !is_blank(child) {
                return None;
            }
        } else if child.is_element() {
            if found.is_some() {
                return None;
            }
            found = Some(child);
        }
    }
    found
}

/// A table that is the whole content of `node`, possibly inside font tags. Returns the table and
/// the font tags around it, outermost first.
fn find_table<'a, 'i>(node: Node<'a, 'i>) -> Option<(Node<'a, 'i>, Vec<Node<'a, 'i>>)> {
    let mut wrappers = Vec::new();
    let mut cur = node;
    loop {
        let el = sole_element(cur)?;
        let name = lname(el);
        if name == "table" {
            return Some((el, wrappers));
        }
        if !STYLE_TAGS.contains(&name.as_str()) {
            return None;
        }
        wrappers.push(el);
        cur = el;
    }
}

impl Parser<'_> {
    fn label(&mut self, root: Node<'_, '_>) -> Result<HtmlLabel> {
        if let Some((table, wrappers)) = find_table(root) {
            return Ok(HtmlLabel::Table(Box::new(self.table(table, &wrappers)?)));
        }
        Ok(HtmlLabel::Text(self.text(root)?))
    }

    fn malformed(&mut self, message: String) {
        self.warnings.warn(WarningKind::MalformedAttribute, message);
    }

    fn int(&mut self, element: &str, name: &str, value: &str, lo: i64, hi: i64) -> Option<i64> {
        match value.trim().parse::<i64>() {
            Ok(v) => Some(v.clamp(lo, hi)),
            Err(_) => {
                self.malformed(format!("improper {name} value \"{value}\" on <{element}> ignored"));
                None
            }
        }
    }

    fn table(&mut self, el: Node<'_, '_>, wrappers: &[Node<'_, '_>]) -> Result<HtmlTable> {
        let mut tbl = HtmlTable {
            font: self.wrapper_font(wrappers),
            ..HtmlTable::default()
        };
        for attr in el.attributes() {
            let name = attr.name().to_ascii_lowercase();
            let value = attr.value();
            match name.as_str() {
                "cellborder" => {
                    if let Some(v) = self.int("TABLE", &name, value, 0, i64::from(u8::MAX)) {
                        tbl.cellborder = Some(v as u8);
                    }
                }
                "rows" | "columns" => {
                    if value.trim() == "*" {
                        if name == "rows" {
                            tbl.rule_rows = true;
                        } else {
                            tbl.rule_columns = true;
                        }
                    } else {
                        self.malformed(format!("improper {name} value \"{value}\" on <TABLE> ignored"));
                    }
                }
                _ => self.data_attr(&mut tbl.data, "TABLE", &name, value),
            }
        }

        let mut pending_rule = false;
        for child in el.children() {
            if child.is_text() {
                if !is_blank(child) {
                    return Err(Error::Parse("text between table rows".to_string()));
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            match lname(child).as_str() {
                "tr" => {
                    if pending_rule && let Some(prev) = tbl.rows.last_mut() {
                        prev.ruled = true;
                    }
                    pending_rule = false;
                    tbl.rows.push(self.row(child)?);
                }
                "hr" => {
                    if tbl.rows.is_empty() || pending_rule {
                        return Err(Error::Parse("<HR> must separate two rows".to_string()));
                    }
                    pending_rule = true;
                }
                other => return Err(unexpected(other, "<TABLE>")),
            }
        }
        if pending_rule {
            return Err(Error::Parse("<HR> must separate two rows".to_string()));
        }
        if tbl.rows.is_empty() {
            return Err(Error::Parse("<TABLE> has no rows".to_string()));
        }
        Ok(tbl)
    }

    fn row(&mut self, el: Node<'_, '_>) -> Result<HtmlRow> {
        for attr in el.attributes() {
            self.malformed(format!("unknown attribute {} on <TR>", attr.name()));
        }
        let mut row = HtmlRow::default();
        let mut pending_rule = false;
        for child in el.children() {
            if child.is_text() {
                if !is_blank(child) {
                    return Err(Error::Parse("text between table cells".to_string()));
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            match lname(child).as_str() {
                "td" => {
                    if pending_rule && let Some(prev) = row.cells.last_mut() {
                        prev.vruled = true;
                    }
                    pending_rule = false;
                    row.cells.push(self.cell(child)?);
                }
                "vr" => {
                    if row.cells.is_empty() || pending_rule {
                        return Err(Error::Parse("<VR> must separate two cells".to_string()));
                    }
                    pending_rule = true;
                }
                other => return Err(unexpected(other, "<TR>")),
            }
        }
        if pending_rule {
            return Err(Error::Parse("<VR> must separate two cells".to_string()));
        }
        if row.cells.is_empty() {
            return Err(Error::Parse("<TR> has no cells".to_string()));
        }
        Ok(row)
    }

    fn cell(&mut self, el: Node<'_, '_>) -> Result<HtmlCell> {
        let content = if let Some((table, wrappers)) = find_table(el) {
            CellContent::Table(Box::new(self.table(table, &wrappers)?))
        } else if let Some(img) = sole_element(el).filter(|n| lname(*n) == "img") {
            CellContent::Image(self.image(img)?)
        } else {
            CellContent::Text(self.text(el)?)
        };

        let mut cell = HtmlCell::new(content);
        for attr in el.attributes() {
            let name = attr.name().to_ascii_lowercase();
            let value = attr.value();
            match name.as_str() {
                "colspan" | "rowspan" => {
                    let Some(v) = self.int("TD", &name, value, 0, i64::from(u16::MAX)) else {
                        continue;
                    };
                    if v == 0 {
                        self.malformed(format!("{} value must be > 0 - ignored", name.to_ascii_uppercase()));
                    } else if name == "colspan" {
                        cell.colspan = v as u16;
                    } else {
                        cell.rowspan = v as u16;
                    }
                }
                _ => self.data_attr(&mut cell.data, "TD", &name, value),
            }
        }
        Ok(cell)
    }

    fn image(&mut self, el: Node<'_, '_>) -> Result<HtmlImage> {
        let mut img = HtmlImage::default();
        let mut src = None;
        for attr in el.attributes() {
            match attr.name().to_ascii_lowercase().as_str() {
                "src" => src = Some(attr.value().to_string()),
                "scale" => img.scale = Some(attr.value().to_ascii_lowercase()),
                other => self.malformed(format!("unknown attribute {other} on <IMG>")),
            }
        }
        img.src = src.ok_or_else(|| Error::Parse("<IMG> requires a SRC attribute".to_string()))?;
        Ok(img)
    }

    fn data_attr(&mut self, data: &mut HtmlData, element: &str, name: &str, value: &str) {
        match name {
            "align" => match value.trim().to_ascii_lowercase().as_str() {
                "center" => data.align = HAlign::Center,
                "left" => data.align = HAlign::Left,
                "right" => data.align = HAlign::Right,
                "text" if element == "TD" => data.align = HAlign::Text,
                _ => self.malformed(format!("illegal value {value} for ALIGN on <{element}> ignored")),
            },
            "valign" => match value.trim().to_ascii_lowercase().as_str() {
                "middle" | "center" => data.valign = VAlign::Middle,
                "top" => data.valign = VAlign::Top,
                "bottom" => data.valign = VAlign::Bottom,
                _ => self.malformed(format!("illegal value {value} for VALIGN on <{element}> ignored")),
            },
            "balign" => match parse_justify(value) {
                Some(j) => data.balign = j,
                None => self.malformed(format!("illegal value {value} for BALIGN on <{element}> ignored")),
            },
            "bgcolor" => data.bgcolor = Some(value.to_string()),
            "color" => data.pencolor = Some(value.to_string()),
            "border" => {
                if let Some(v) = self.int(element, name, value, 0, i64::from(u8::MAX)) {
                    data.border = Some(v as u8);
                }
            }
            "cellpadding" => {
                if let Some(v) = self.int(element, name, value, 0, i64::from(u8::MAX)) {
                    data.pad = Some(v as u8);
                }
            }
            "cellspacing" => {
                if let Some(v) = self.int(element, name, value, i64::from(i8::MIN), i64::from(i8::MAX)) {
                    data.space = Some(v as i8);
                }
            }
            "width" | "height" => {
                if let Some(v) = self.int(element, name, value, 0, i64::from(u16::MAX)) {
                    if name == "width" {
                        data.width = v as u16;
                    } else {
                        data.height = v as u16;
                    }
                }
            }
            "fixedsize" => match value.trim().to_ascii_lowercase().as_str() {
                "true" => data.fixed_size = true,
                "false" => data.fixed_size = false,
                _ => self.malformed(format!("illegal value {value} for FIXEDSIZE on <{element}> ignored")),
            },
            "gradientangle" => {
                if let Some(v) = self.int(element, name, value, 0, 360) {
                    data.gradient_angle = v as i32;
                }
            }
            "href" | "url" => data.href = Some(value.to_string()),
            "port" => data.port = Some(value.to_string()),
            "target" => data.target = Some(value.to_string()),
            "title" | "tooltip" => data.title = Some(value.to_string()),
            "id" => data.id = Some(value.to_string()),
            "sides" => {
                let mut mask = 0u8;
                for c in value.chars() {
                    match c.to_ascii_lowercase() {
                        'l' => mask |= sides::LEFT,
                        't' => mask |= sides::TOP,
                        'r' => mask |= sides::RIGHT,
                        'b' => mask |= sides::BOTTOM,
                        _ => {
                            self.malformed(format!("unrecognized character '{c}' in SIDES on <{element}> ignored"));
                        }
                    }
                }
                data.border_sides = Some(mask);
            }
            "style" => {
                for token in value.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()) {
                    match token.to_ascii_lowercase().as_str() {
                        "rounded" => data.style.rounded = true,
                        "radial" => data.style.radial = true,
                        "dashed" => data.style.dashed = true,
                        "dotted" => data.style.dotted = true,
                        "invis" | "invisible" => data.style.invisible = true,
                        "solid" => {
                            data.style.dashed = false;
                            data.style.dotted = false;
                        }
                        _ => self.malformed(format!("illegal value {token} for STYLE on <{element}> ignored")),
                    }
                }
            }
            _ => self.malformed(format!("unknown attribute {name} on <{element}>")),
        }
    }

    fn wrapper_font(&mut self, wrappers: &[Node<'_, '_>]) -> Option<FontChange> {
        if wrappers.is_empty() {
            return None;
        }
        let mut font = FontChange::default();
        for w in wrappers {
            font = self.font_of(*w).over(&font);
        }
        Some(font)
    }

    fn font_of(&mut self, el: Node<'_, '_>) -> FontChange {
        let name = lname(el);
        let mut font = FontChange::default();
        font.flags = match name.as_str() {
            "b" => flags::BOLD,
            "i" => flags::ITALIC,
            "u" => flags::UNDERLINE,
            "o" => flags::OVERLINE,
            "s" => flags::STRIKE,
            "sub" => flags::SUBSCRIPT,
            "sup" => flags::SUPERSCRIPT,
            _ => 0,
        };
        for attr in el.attributes() {
            let attr_name = attr.name().to_ascii_lowercase();
            let value = attr.value();
            match (name.as_str(), attr_name.as_str()) {
                ("font", "face") => font.name = Some(value.to_string()),
                ("font", "color") => font.color = Some(value.to_string()),
                ("font", "point-size") => match value.trim().parse::<f64>() {
                    Ok(size) if size.is_finite() && size > 0.0 => font.size = Some(size),
                    _ => self.malformed(format!("improper POINT-SIZE value \"{value}\" ignored")),
                },
                _ => self.malformed(format!(
                    "unknown attribute {attr_name} on <{}>",
                    name.to_ascii_uppercase()
                )),
            }
        }
        font
    }

    fn text(&mut self, node: Node<'_, '_>) -> Result<HtmlText> {
        let mut builder = TextBuilder::default();
        self.inline(node, &FontChange::default(), &mut builder)?;
        Ok(builder.finish())
    }

    fn inline(&mut self, node: Node<'_, '_>, font: &FontChange, out: &mut TextBuilder) -> Result<()> {
        for child in node.children() {
            if child.is_text() {
                out.push_text(child.text().unwrap_or_default(), font);
                continue;
            }
            if !child.is_element() {
                continue;
            }
            let name = lname(child);
            match name.as_str() {
                "br" => {
                    let mut just = None;
                    for attr in child.attributes() {
                        if attr.name().eq_ignore_ascii_case("align") {
                            just = parse_justify(attr.value());
                            if just.is_none() {
                                self.malformed(format!("illegal value {} for ALIGN on <BR> ignored", attr.value()));
                            }
                        } else {
                            self.malformed(format!("unknown attribute {} on <BR>", attr.name()));
                        }
                    }
                    out.line_break(just);
                }
                n if STYLE_TAGS.contains(&n) => {
                    let inner = self.font_of(child).over(font);
                    self.inline(child, &inner, out)?;
                }
                other => return Err(unexpected(other, "text")),
            }
        }
        Ok(())
    }
}

fn parse_justify(value: &str) -> Option<Justify> {
    match value.trim().to_ascii_lowercase().as_str() {
        "center" => Some(Justify::Center),
        "left" => Some(Justify::Left),
        "right" => Some(Justify::Right),
        _ => None,
    }
}

/// Collects text runs into lines, collapsing runs of markup whitespace to one space and dropping
/// it at line ends.
#[derive(Default)]
struct TextBuilder {
    lines: Vec<TextSpan>,
    cur: TextSpan,
}

impl TextBuilder {
    fn push_text(&mut self, raw: &str, font: &FontChange) {
        let mut last_space = self
            .cur
            .items
            .last()
            .is_none_or(|item| item.text.is_empty() || item.text.ends_with(' '));
        let mut text = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_ascii_whitespace() {
                if !last_space {
                    text.push(' ');
                    last_space = true;
                }
            } else {
                text.push(c);
                last_space = false;
            }
        }
        if text.is_empty() {
            return;
        }
        match self.cur.items.last_mut() {
            Some(item) if item.font == *font => item.text.push_str(&text),
            _ => self.cur.items.push(TextItem {
                text,
                font: font.clone(),
                color: font.color.clone(),
                ..TextItem::default()
            }),
        }
    }

    fn line_break(&mut self, just: Option<Justify>) {
        let mut line = std::mem::take(&mut self.cur);
        line.just = just;
        self.lines.push(trim_line(line));
    }

    fn finish(mut self) -> HtmlText {
        if !self.cur.items.is_empty() {
            let line = std::mem::take(&mut self.cur);
            self.lines.push(trim_line(line));
        }
        HtmlText {
            spans: self.lines,
            ..HtmlText::default()
        }
    }
}

fn trim_line(mut line: TextSpan) -> TextSpan {
    while let Some(last) = line.items.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
        if last.text.is_empty() {
            line.items.pop();
        } else {
            break;
        }
    }
    line
}

const NAMED_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("iexcl", 161),
    ("cent", 162),
    ("pound", 163),
    ("yen", 165),
    ("sect", 167),
    ("copy", 169),
    ("laquo", 171),
    ("shy", 173),
    ("reg", 174),
    ("deg", 176),
    ("plusmn", 177),
    ("para", 182),
    ("middot", 183),
    ("raquo", 187),
    ("iquest", 191),
    ("times", 215),
    ("divide", 247),
    ("Omega", 937),
    ("alpha", 945),
    ("beta", 946),
    ("gamma", 947),
    ("delta", 948),
    ("epsilon", 949),
    ("lambda", 955),
    ("mu", 956),
    ("pi", 960),
    ("sigma", 963),
    ("omega", 969),
    ("ensp", 8194),
    ("emsp", 8195),
    ("thinsp", 8201),
    ("ndash", 8211),
    ("mdash", 8212),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("bull", 8226),
    ("hellip", 8230),
    ("euro", 8364),
    ("trade", 8482),
    ("larr", 8592),
    ("uarr", 8593),
    ("rarr", 8594),
    ("darr", 8595),
    ("harr", 8596),
    ("sum", 8721),
    ("minus", 8722),
    ("infin", 8734),
    ("ne", 8800),
    ("le", 8804),
    ("ge", 8805),
];

/// Rewrites HTML named entities that XML does not predefine as numeric references.
fn named_entities_to_numeric(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let name_len = tail
            .find(|c: char| !c.is_ascii_alphanumeric())
            .filter(|&end| tail[end..].starts_with(';'));
        let code = name_len.and_then(|end| {
            NAMED_ENTITIES
                .iter()
                .find(|(name, _)| *name == &tail[..end])
                .map(|&(_, code)| (end, code))
        });
        match code {
            Some((end, code)) => {
                out.push_str(&format!("&#{code};"));
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
