//! Top-down positioning.
//!
//! A table receives a box at least as large as its size. Slack is spread over the columns and
//! rows (a fixed-size table is aligned inside the box instead), cell boxes come from the grid, and
//! each cell places its content by its alignment. Boxes touching the label's outer edge record
//! which [`sides`] they touch so ports on them can be routed from outside.

use sirenia_graph::{BBox, Point, sides};

use crate::model::{CellContent, HAlign, HtmlCell, HtmlData, HtmlLabel, HtmlTable, HtmlText, Justify, VAlign};

/// Places a sized label with its centre at `center`.
pub fn position_html_label(label: &mut HtmlLabel, center: Point) {
    match label {
        HtmlLabel::Text(text) => {
            let size = text.bbox;
            text.bbox = BBox::from_center(center, size.width(), size.height());
            default_justify(text, Justify::Center);
        }
        HtmlLabel::Table(tbl) => {
            let size = tbl.data.bbox;
            let pos = BBox::from_center(center, size.width(), size.height());
            pos_table(tbl, pos, sides::ALL, None);
        }
    }
}

fn default_justify(text: &mut HtmlText, just: Justify) {
    for span in &mut text.spans {
        span.just.get_or_insert(just);
    }
}

/// Shrinks `pos` to `size` along one axis: `lead` keeps the low end, `trail` the high end,
/// otherwise centred.
fn align_axis(lo: &mut f64, hi: &mut f64, size: f64, lead: bool, trail: bool) {
    let slack = *hi - *lo - size;
    if slack <= 0.0 {
        return;
    }
    if lead {
        *hi = *lo + size;
    } else if trail {
        *lo = *hi - size;
    } else {
        *lo += slack / 2.0;
        *hi -= slack / 2.0;
    }
}

fn align_fixed(data: &HtmlData, pos: &mut BBox) {
    let size = data.bbox;
    align_axis(
        &mut pos.ll.x,
        &mut pos.ur.x,
        size.width(),
        data.align == HAlign::Left,
        data.align == HAlign::Right,
    );
    align_axis(
        &mut pos.ll.y,
        &mut pos.ur.y,
        size.height(),
        data.valign == VAlign::Bottom,
        data.valign == VAlign::Top,
    );
}

/// Turns track sizes into start positions, spreading `slack` as whole points with any remainder
/// going one point at a time to the leading tracks. `dir` is +1 for columns and -1 for rows.
fn tracks_to_positions(tracks: &mut [f64], count: usize, start: f64, space: f64, slack: f64, dir: f64) {
    let (extra, plus) = if count == 0 {
        (0.0, 0)
    } else {
        let extra = (slack / count as f64).floor();
        (extra, (slack - extra * count as f64).round() as usize)
    };
    let mut at = start;
    for (i, t) in tracks.iter_mut().enumerate() {
        let size = *t + extra + if i < plus { 1.0 } else { 0.0 };
        *t = at;
        at += dir * (size + space);
    }
}

fn pos_table(tbl: &mut HtmlTable, mut pos: BBox, sides: u8, parent_pen: Option<&str>) {
    if tbl.data.pencolor.is_none() {
        tbl.data.pencolor = parent_pen.map(str::to_string);
    }
    let size = tbl.data.bbox;
    let mut delx = (pos.width() - size.width()).max(0.0);
    let mut dely = (pos.height() - size.height()).max(0.0);
    if tbl.data.fixed_size {
        align_fixed(&tbl.data, &mut pos);
        delx = 0.0;
        dely = 0.0;
    }

    let border = tbl.data.border();
    let space = tbl.data.space();
    let HtmlTable {
        data,
        rows,
        widths,
        heights,
        row_count,
        column_count,
        ..
    } = tbl;
    tracks_to_positions(widths, *column_count, pos.ll.x + border + space, space, delx, 1.0);
    tracks_to_positions(heights, *row_count, pos.ur.y - border - space, space, dely, -1.0);

    for cell in rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
        let (col, row) = (cell.col as usize, cell.row as usize);
        let (colspan, rowspan) = (usize::from(cell.colspan), usize::from(cell.rowspan));
        let mut mask = 0;
        if sides != 0 {
            if col == 0 {
                mask |= sides::LEFT;
            }
            if row == 0 {
                mask |= sides::TOP;
            }
            if col + colspan == *column_count {
                mask |= sides::RIGHT;
            }
            if row + rowspan == *row_count {
                mask |= sides::BOTTOM;
            }
        }
        let cbox = BBox::from_coords(
            widths[col],
            heights[row + rowspan] + space,
            widths[col + colspan] - space,
            heights[row],
        );
        pos_cell(cell, cbox, sides & mask, data.pencolor.as_deref());
    }

    data.sides = sides;
    data.bbox = pos;
}

fn pos_cell(cell: &mut HtmlCell, mut pos: BBox, sides: u8, parent_pen: Option<&str>) {
    let data = &mut cell.data;
    if data.pencolor.is_none() {
        data.pencolor = parent_pen.map(str::to_string);
    }
    if data.fixed_size {
        align_fixed(data, &mut pos);
    }
    data.bbox = pos;
    data.sides = sides;

    let inset = data.border() + data.pad();
    let mut cbox = pos.expand(-inset, -inset);
    match &mut cell.content {
        CellContent::Table(tbl) => pos_table(tbl, cbox, sides, data.pencolor.as_deref()),
        CellContent::Image(img) => {
            // Images only shrink towards an explicit side; centring leaves them to fill the box.
            let size = img.bbox;
            let slack_x = cbox.width() - size.width();
            if slack_x > 0.0 {
                match data.align {
                    HAlign::Left => cbox.ur.x -= slack_x,
                    HAlign::Right => cbox.ll.x += slack_x,
                    _ => {}
                }
            }
            let slack_y = cbox.height() - size.height();
            if slack_y > 0.0 {
                match data.valign {
                    VAlign::Bottom => cbox.ur.y -= slack_y,
                    VAlign::Top => cbox.ll.y += slack_y,
                    VAlign::Middle => {}
                }
            }
            img.bbox = cbox;
        }
        CellContent::Text(text) => {
            let size = text.bbox;
            if data.align != HAlign::Text {
                align_axis(
                    &mut cbox.ll.x,
                    &mut cbox.ur.x,
                    size.width(),
                    data.align == HAlign::Left,
                    data.align == HAlign::Right,
                );
            }
            align_axis(
                &mut cbox.ll.y,
                &mut cbox.ur.y,
                size.height(),
                data.valign == VAlign::Bottom,
                data.valign == VAlign::Top,
            );
            text.bbox = cbox;
            default_justify(text, data.balign);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_goes_to_leading_columns_in_whole_points() {
        let mut tracks = vec![10.0, 10.0, 10.0, 0.0];
        tracks_to_positions(&mut tracks, 3, 0.0, 2.0, 5.0, 1.0);
        // 5 over 3 columns: one point each, the remaining two to the first two columns.
        assert_eq!(tracks, vec![0.0, 14.0, 28.0, 41.0]);
    }

    #[test]
    fn rows_run_downwards() {
        let mut tracks = vec![10.0, 20.0, 0.0];
        tracks_to_positions(&mut tracks, 2, 100.0, 2.0, 0.0, -1.0);
        assert_eq!(tracks, vec![100.0, 88.0, 66.0]);
    }
}
