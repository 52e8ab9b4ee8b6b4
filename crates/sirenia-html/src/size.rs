//! Bottom-up sizing.
//!
//! Every box gets its minimum size with `ll` at the origin. Tables also get their grid: cells are
//! placed into columns around earlier row-spanning cells, and minimum row and column extents are
//! derived from the cells the way CSS sizes auto-width table columns.

use rustc_hash::FxHashSet;
use sirenia_graph::{BBox, FontSpec, Point, WarningKind, Warnings};

use crate::HtmlEnv;
use crate::model::{
    CellContent, DEFAULT_BORDER, DEFAULT_CELLPADDING, DEFAULT_CELLSPACING, FontChange, HtmlCell,
    HtmlImage, HtmlLabel, HtmlTable, HtmlText, flags,
};

pub fn size_html_label(label: &mut HtmlLabel, env: &HtmlEnv<'_>, warnings: &mut Warnings) {
    let base = FontChange::default();
    match label {
        HtmlLabel::Text(text) => size_text(text, &base, env),
        HtmlLabel::Table(tbl) => size_table(tbl, &base, env, warnings),
    }
}

fn resolve_font(env: &HtmlEnv<'_>, font: &FontChange) -> FontSpec {
    FontSpec {
        name: font.name.clone().unwrap_or_else(|| env.font.name.clone()),
        size: font.size.unwrap_or(env.font.size),
        bold: env.font.bold || font.flags & flags::BOLD != 0,
        italic: env.font.italic || font.flags & flags::ITALIC != 0,
    }
}

fn size_text(text: &mut HtmlText, ctx: &FontChange, env: &HtmlEnv<'_>) {
    let mut width = 0.0f64;
    let mut top = 0.0;
    for span in &mut text.spans {
        let mut line_width = 0.0;
        let mut line_height = 0.0f64;
        let mut max_size = 0.0f64;
        for item in &mut span.items {
            let font = item.font.over(ctx);
            item.spec = resolve_font(env, &font);
            item.color = font.color.or_else(|| env.font_color.clone());
            let sz = env.measurer.measure(&item.text, &item.spec);
            item.width = sz.x;
            item.height = sz.y;
            line_width += sz.x;
            line_height = line_height.max(sz.y);
            max_size = max_size.max(item.spec.size);
        }
        if span.items.is_empty() {
            let spec = resolve_font(env, ctx);
            line_height = env.measurer.measure("", &spec).y;
            max_size = spec.size;
        }
        span.width = line_width;
        span.height = line_height;
        span.baseline = top + max_size;
        top += line_height;
        width = width.max(line_width);
    }
    text.bbox = BBox::from_coords(0.0, 0.0, width, top);
}

fn size_image(img: &mut HtmlImage, env: &HtmlEnv<'_>, warnings: &mut Warnings) {
    let size = env.images.image_size(&img.src).unwrap_or_else(|| {
        warnings.warn(
            WarningKind::ImageSize,
            format!("no or improper image file=\"{}\"", img.src),
        );
        Point::default()
    });
    img.bbox = BBox::new(Point::default(), size);
}

#[derive(Debug, Clone, Copy)]
struct CellDefaults {
    pad: u8,
    border: u8,
}

fn size_cell(
    cell: &mut HtmlCell,
    defaults: CellDefaults,
    ctx: &FontChange,
    env: &HtmlEnv<'_>,
    warnings: &mut Warnings,
) {
    cell.data.pad.get_or_insert(defaults.pad);
    cell.data.border.get_or_insert(defaults.border);

    let child = match &mut cell.content {
        CellContent::Table(tbl) => {
            size_table(tbl, ctx, env, warnings);
            tbl.data.bbox.ur
        }
        CellContent::Image(img) => {
            size_image(img, env, warnings);
            img.bbox.ur
        }
        CellContent::Text(text) => {
            size_text(text, ctx, env);
            text.bbox.ur
        }
    };

    let margin = 2.0 * (cell.data.pad() + cell.data.border());
    let mut sz = Point::new(child.x + margin, child.y + margin);
    let (width, height) = (f64::from(cell.data.width), f64::from(cell.data.height));
    if cell.data.fixed_size {
        if cell.data.width > 0 && cell.data.height > 0 {
            let is_image = matches!(cell.content, CellContent::Image(_));
            if (width < sz.x || height < sz.y) && !is_image {
                warnings.warn(WarningKind::CellTooSmall, "cell size too small for content");
            }
            sz = Point::default();
        } else {
            warnings.warn(
                WarningKind::MalformedAttribute,
                "fixed cell size with unspecified width or height",
            );
        }
    }
    cell.data.bbox = BBox::from_coords(0.0, 0.0, sz.x.max(width), sz.y.max(height));
}

/// First column at or after `col` where a `colspan` x `rowspan` block starting on `row` is free.
/// Marks the block occupied.
fn find_col(occupied: &mut FxHashSet<(u32, u32)>, row: u32, mut col: u32, colspan: u32, rowspan: u32) -> u32 {
    while let Some(c) = (col..col + colspan).rev().find(|&c| occupied.contains(&(c, row))) {
        col = c + 1;
    }
    for c in col..col + colspan {
        for r in row..row + rowspan {
            occupied.insert((c, r));
        }
    }
    col
}

/// Minimum extents of `count` tracks from `(start, span, size)` cells, plus a trailing zero entry.
/// Single-track cells set minimums first; spanning cells then widen their tracks evenly.
fn min_extents(count: usize, space: f64, cells: &[(usize, usize, f64)]) -> Vec<f64> {
    let mut ext = vec![0.0f64; count + 1];
    for &(start, span, size) in cells {
        if span == 1 {
            ext[start] = ext[start].max(size);
        }
    }
    for &(start, span, size) in cells {
        if span <= 1 {
            continue;
        }
        let current: f64 = ext[start..start + span].iter().sum();
        let spacing = (span - 1) as f64 * space;
        if current + spacing < size {
            let by = (size - spacing - current) / span as f64;
            for e in &mut ext[start..start + span] {
                *e += by;
            }
        }
    }
    ext
}

fn size_table(tbl: &mut HtmlTable, ctx: &FontChange, env: &HtmlEnv<'_>, warnings: &mut Warnings) {
    let ctx = match &tbl.font {
        Some(font) => font.over(ctx),
        None => ctx.clone(),
    };
    let defaults = CellDefaults {
        pad: tbl.data.pad.unwrap_or(DEFAULT_CELLPADDING),
        border: tbl.cellborder.or(tbl.data.border).unwrap_or(DEFAULT_BORDER),
    };

    let ruled: Vec<bool> = tbl.rows.iter().map(|r| r.ruled).collect();
    let mut occupied = FxHashSet::default();
    let (mut n_rows, mut n_cols) = (0u32, 0u32);
    for (r, row) in tbl.rows.iter_mut().enumerate() {
        let r = r as u32;
        let mut c = 0u32;
        for cell in &mut row.cells {
            size_cell(cell, defaults, &ctx, env, warnings);
            let (colspan, rowspan) = (u32::from(cell.colspan), u32::from(cell.rowspan));
            c = find_col(&mut occupied, r, c, colspan, rowspan);
            cell.row = r;
            cell.col = c;
            c += colspan;
            n_cols = n_cols.max(c);
            n_rows = n_rows.max(r + rowspan);
            let last_row = (r + rowspan).saturating_sub(1) as usize;
            cell.hruled |= tbl.rule_rows || ruled.get(last_row).copied().unwrap_or(false);
            cell.vruled |= tbl.rule_columns;
        }
    }
    tbl.row_count = n_rows as usize;
    tbl.column_count = n_cols as usize;

    let space = f64::from(*tbl.data.space.get_or_insert(DEFAULT_CELLSPACING));
    let border = f64::from(*tbl.data.border.get_or_insert(DEFAULT_BORDER));

    let xs: Vec<_> = tbl
        .cells()
        .map(|c| (c.col as usize, usize::from(c.colspan), c.data.bbox.width()))
        .collect();
    let ys: Vec<_> = tbl
        .cells()
        .map(|c| (c.row as usize, usize::from(c.rowspan), c.data.bbox.height()))
        .collect();
    let widths = min_extents(tbl.column_count, space, &xs);
    let heights = min_extents(tbl.row_count, space, &ys);
    for cell in tbl.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
        let (col, colspan) = (cell.col as usize, usize::from(cell.colspan));
        let (row, rowspan) = (cell.row as usize, usize::from(cell.rowspan));
        let w = widths[col..col + colspan].iter().sum::<f64>() + colspan.saturating_sub(1) as f64 * space;
        let h = heights[row..row + rowspan].iter().sum::<f64>() + rowspan.saturating_sub(1) as f64 * space;
        cell.data.bbox.ur.x = cell.data.bbox.ur.x.max(w);
        cell.data.bbox.ur.y = cell.data.bbox.ur.y.max(h);
    }

    let mut wd = (tbl.column_count as f64 + 1.0) * space + 2.0 * border;
    let mut ht = (tbl.row_count as f64 + 1.0) * space + 2.0 * border;
    wd += widths[..tbl.column_count].iter().sum::<f64>();
    ht += heights[..tbl.row_count].iter().sum::<f64>();
    tbl.widths = widths;
    tbl.heights = heights;

    let (width, height) = (f64::from(tbl.data.width), f64::from(tbl.data.height));
    if tbl.data.fixed_size {
        if tbl.data.width > 0 && tbl.data.height > 0 {
            if width < wd || height < ht {
                warnings.warn(WarningKind::TableTooSmall, "table size too small for content");
            }
            wd = 0.0;
            ht = 0.0;
        } else {
            warnings.warn(
                WarningKind::MalformedAttribute,
                "fixed table size with unspecified width or height",
            );
        }
    }
    tbl.data.bbox = BBox::from_coords(0.0, 0.0, wd.max(width), ht.max(height));
}
