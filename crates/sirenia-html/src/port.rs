use sirenia_graph::{BBox, NamedPort};

use crate::model::{CellContent, HtmlData, HtmlLabel, HtmlTable};

/// Box and outer sides of the table or cell whose `PORT` matches `name`, ignoring case. Tables
/// are searched before their cells, and cells before the tables nested in them.
pub fn html_port(label: &HtmlLabel, name: &str) -> Option<(BBox, u8)> {
    let HtmlLabel::Table(tbl) = label else {
        return None;
    };
    port_in_table(tbl, name).map(|d| (d.bbox, d.sides))
}

fn port_in_table<'a>(tbl: &'a HtmlTable, name: &str) -> Option<&'a HtmlData> {
    if tbl.data.port.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(name)) {
        return Some(&tbl.data);
    }
    tbl.cells().find_map(|cell| {
        if cell.data.port.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(name)) {
            return Some(&cell.data);
        }
        match &cell.content {
            CellContent::Table(inner) => port_in_table(inner, name),
            _ => None,
        }
    })
}

/// Every named port in lookup order. A name shadowed by an earlier match is left out.
pub fn html_ports(label: &HtmlLabel) -> Vec<NamedPort> {
    let mut out: Vec<NamedPort> = Vec::new();
    if let HtmlLabel::Table(tbl) = label {
        collect(tbl, &mut out);
    }
    out
}

fn push(data: &HtmlData, out: &mut Vec<NamedPort>) {
    let Some(name) = &data.port else {
        return;
    };
    if out.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
        return;
    }
    out.push(NamedPort {
        name: name.clone(),
        bbox: data.bbox,
        sides: data.sides,
    });
}

fn collect(tbl: &HtmlTable, out: &mut Vec<NamedPort>) {
    push(&tbl.data, out);
    for cell in tbl.cells() {
        push(&cell.data, out);
        if let CellContent::Table(inner) = &cell.content {
            collect(inner, out);
        }
    }
}
