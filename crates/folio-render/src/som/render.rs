//! Drawing one sub-table through the driver primitives.

use super::metrics::{AxisLayout, Placed, TableMetrics};
use crate::boxes::Sides;
use crate::driver::{Extent, Font, FontSpec, OutputDriver, Pen, Rect, TextSpec};
use crate::error::Result;
use crate::table::{CellFlags, CellRef, LineStyle, Table, TextCell};

/// Remembers which joins were drawn in the current pass.
///
/// Each pass takes a fresh token; a join whose mark equals the current token
/// has already been drawn.
#[derive(Debug, Default)]
pub struct JoinHits {
    token: u64,
    marks: Vec<u64>,
}

impl JoinHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_pass(&mut self) {
        self.token += 1;
    }

    /// Mark `join` and report whether this is its first visit in the pass.
    pub fn first_visit(&mut self, join: usize) -> bool {
        if self.marks.len() <= join {
            self.marks.resize(join + 1, 0);
        }
        if self.marks[join] == self.token {
            return false;
        }
        self.marks[join] = self.token;
        true
    }
}

/// Draws the rows `rows` of columns `cols` with the top-left corner at `origin`.
pub struct SubTable<'a> {
    pub table: &'a Table,
    pub metrics: &'a TableMetrics,
    pub cols: &'a [usize],
    pub rows: &'a [usize],
}

impl SubTable<'_> {
    pub fn draw(
        &self,
        driver: &mut dyn OutputDriver,
        origin: Pen,
        hits: &mut JoinHits,
    ) -> Result<Extent> {
        let xs = self.metrics.columns_at(self.cols, origin.x);
        let ys = self.metrics.rows_at(self.rows, origin.y);

        hits.begin_pass();
        for (ri, row) in ys.cells.iter().enumerate() {
            for (ci, col) in xs.cells.iter().enumerate() {
                match self.table.cell_at(col.index, row.index) {
                    CellRef::Empty => {}
                    CellRef::Text(cell) => {
                        let rect = Rect::new(col.start, row.start, col.end(), row.end());
                        draw_cell(driver, cell, rect)?;
                    }
                    CellRef::Joined { join, span, cell } => {
                        if !hits.first_visit(join) {
                            continue;
                        }
                        let last_col = last_within(&xs, ci, span.x2);
                        let last_row = last_within(&ys, ri, span.y2);
                        let rect = Rect::new(col.start, row.start, last_col.end(), last_row.end());
                        let whole = col.index == span.x1
                            && row.index == span.y1
                            && last_col.index == span.x2
                            && last_row.index == span.y2;
                        if whole {
                            draw_cell(driver, cell, rect)?;
                        } else {
                            let skip = Pen::new(
                                self.metrics.col_offset(span.x1, col.index),
                                self.metrics.row_offset(span.y1, row.index),
                            );
                            let full = Extent::new(
                                self.metrics.span_width(span.x1, span.x2),
                                self.metrics.span_height(span.y1, span.y2),
                            );
                            draw_cut_cell(driver, cell, rect, skip, full)?;
                        }
                    }
                }
            }
        }

        self.draw_rules(driver, &xs, &ys)?;
        Ok(Extent::new(xs.extent(), ys.extent()))
    }

    /// Style of vertical boundary `bj` of `xs` beside `row`. Where the band
    /// edge cuts through a join, the join's own edge rule closes it.
    fn rule_v(&self, xs: &AxisLayout, row: usize, bj: usize) -> LineStyle {
        let style = self.table.rule_v(xs.boundaries[bj].index, row);
        if !style.is_none() {
            return style;
        }
        let left = bj.checked_sub(1).map(|j| xs.cells[j].index);
        let right = xs.cells.get(bj).map(|placed| placed.index);
        if let Some(right) = right {
            if let Some(span) = self.table.span_of(right, row) {
                if span.x1 < right && left.map_or(true, |left| left < span.x1) {
                    return self.table.rule_v(span.x1, row);
                }
            }
        }
        if let Some(left) = left {
            if let Some(span) = self.table.span_of(left, row) {
                if span.x2 > left && right.map_or(true, |right| right > span.x2) {
                    return self.table.rule_v(span.x2 + 1, row);
                }
            }
        }
        style
    }

    /// Style of horizontal boundary `bi` of `ys` above or below `col`.
    fn rule_h(&self, ys: &AxisLayout, col: usize, bi: usize) -> LineStyle {
        let style = self.table.rule_h(col, ys.boundaries[bi].index);
        if !style.is_none() {
            return style;
        }
        let above = bi.checked_sub(1).map(|i| ys.cells[i].index);
        let below = ys.cells.get(bi).map(|placed| placed.index);
        if let Some(below) = below {
            if let Some(span) = self.table.span_of(col, below) {
                if span.y1 < below && above.map_or(true, |above| above < span.y1) {
                    return self.table.rule_h(col, span.y1);
                }
            }
        }
        if let Some(above) = above {
            if let Some(span) = self.table.span_of(col, above) {
                if span.y2 > above && below.map_or(true, |below| below > span.y2) {
                    return self.table.rule_h(col, span.y2 + 1);
                }
            }
        }
        style
    }

    fn draw_rules(
        &self,
        driver: &mut dyn OutputDriver,
        xs: &AxisLayout,
        ys: &AxisLayout,
    ) -> Result<()> {
        let none = LineStyle::None;

        for (bi, boundary) in ys.boundaries.iter().enumerate() {
            if boundary.size == 0 {
                continue;
            }
            for col in &xs.cells {
                let style = self.rule_h(ys, col.index, bi);
                if !style.is_none() {
                    let rect = Rect::new(col.start, boundary.start, col.end(), boundary.end());
                    driver.line_horizontal(rect, style)?;
                }
            }
        }
        for (bj, boundary) in xs.boundaries.iter().enumerate() {
            if boundary.size == 0 {
                continue;
            }
            for row in &ys.cells {
                let style = self.rule_v(xs, row.index, bj);
                if !style.is_none() {
                    let rect = Rect::new(boundary.start, row.start, boundary.end(), row.end());
                    driver.line_vertical(rect, style)?;
                }
            }
        }

        for (bi, y) in ys.boundaries.iter().enumerate() {
            if y.size == 0 {
                continue;
            }
            for (bj, x) in xs.boundaries.iter().enumerate() {
                if x.size == 0 {
                    continue;
                }
                let top = match bi {
                    0 => none,
                    _ => self.rule_v(xs, ys.cells[bi - 1].index, bj),
                };
                let bottom = match ys.cells.get(bi) {
                    Some(row) => self.rule_v(xs, row.index, bj),
                    None => none,
                };
                let left = match bj {
                    0 => none,
                    _ => self.rule_h(ys, xs.cells[bj - 1].index, bi),
                };
                let right = match xs.cells.get(bj) {
                    Some(col) => self.rule_h(ys, col.index, bi),
                    None => none,
                };
                let sides = Sides::new(top, left, bottom, right);
                if !sides.is_empty() {
                    let rect = Rect::new(x.start, y.start, x.end(), y.end());
                    driver.line_intersection(rect, sides)?;
                }
            }
        }
        Ok(())
    }
}

/// The last visible cell at or after `from` whose index is at most
/// `last_index`.
fn last_within(axis: &AxisLayout, from: usize, last_index: usize) -> &Placed {
    axis.cells[from..]
        .iter()
        .take_while(|placed| placed.index <= last_index)
        .last()
        .unwrap_or(&axis.cells[from])
}

fn draw_cell(driver: &mut dyn OutputDriver, cell: &TextCell, rect: Rect) -> Result<()> {
    if cell.text.is_empty() {
        return Ok(());
    }
    driver.set_font(&FontSpec::Position(Font::for_flags(cell.flags)))?;
    let spec = TextSpec::new(&cell.text)
        .at(rect.x0, rect.y0)
        .width(rect.width())
        .max_height(rect.height())
        .justify(cell.justify)
        .wrap(!cell.flags.contains(CellFlags::NO_WRAP));
    driver.text_draw(&spec)?;
    Ok(())
}

/// Draw the part of a join that falls inside `rect`. The text is laid out in
/// the join's `full` extent, of which `skip` lies before the visible part.
fn draw_cut_cell(
    driver: &mut dyn OutputDriver,
    cell: &TextCell,
    rect: Rect,
    skip: Pen,
    full: Extent,
) -> Result<()> {
    if cell.text.is_empty() {
        return Ok(());
    }
    driver.set_font(&FontSpec::Position(Font::for_flags(cell.flags)))?;
    let spec = TextSpec::new(&cell.text)
        .at(rect.x0, rect.y0)
        .width(full.width)
        .max_height(full.height)
        .justify(cell.justify)
        .wrap(!cell.flags.contains(CellFlags::NO_WRAP))
        .clip(skip, Extent::new(rect.width(), rect.height()));
    driver.text_draw(&spec)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ascii::{AsciiDriver, AsciiOptions};
    use crate::table::Justify;
    use folio_pipe::MemorySink;

    /// A framed 3x2 table whose first row is one join across all columns.
    fn banner() -> Table {
        let mut table = Table::new(3, 2).unwrap();
        let rule = Some(LineStyle::Single);
        table.frame(rule, rule, rule, rule, 0, 0, 2, 1);
        table.joint_text(0, 0, 2, 0, Justify::Left, CellFlags::empty(), "alpha beta gamma");
        for (c, text) in ["aaaa", "bbbb", "cccc"].into_iter().enumerate() {
            table.text(c, 1, Justify::Left, CellFlags::empty(), text);
        }
        table
    }

    fn render(table: &Table, cols: &[usize], rows: &[usize]) -> String {
        let sink = MemorySink::new();
        let mut driver = AsciiDriver::new("test", AsciiOptions::plain(20, 10), Box::new(sink.clone()));
        driver.open().unwrap();
        driver.open_page().unwrap();
        let metrics = TableMetrics::measure(table, &driver);
        let sub = SubTable {
            table,
            metrics: &metrics,
            cols,
            rows,
        };
        sub.draw(&mut driver, Pen::default(), &mut JoinHits::new()).unwrap();
        driver.close().unwrap();
        sink.contents()
    }

    #[test]
    fn whole_join_is_drawn_across_its_span() {
        assert_eq!(
            render(&banner(), &[0, 1, 2], &[0, 1]),
            "+----------------+\n\
             |alpha beta gamma|\n\
             +-----+-----+----+\n\
             |aaaa |bbbb |cccc|\n\
             +-----+-----+----+\n"
        );
    }

    #[test]
    fn cut_join_shows_its_continuation() {
        assert_eq!(
            render(&banner(), &[1, 2], &[0, 1]),
            "+----------+\n\
             |beta gamma|\n\
             +-----+----+\n\
             |bbbb |cccc|\n\
             +-----+----+\n"
        );
    }

    #[test]
    fn cut_join_is_closed_at_the_band_edge() {
        assert_eq!(render(&banner(), &[0], &[0]), "+-----+\n|alpha|\n+-----+\n");
    }

    #[test]
    fn joins_are_visited_once_per_pass() {
        let mut hits = JoinHits::new();
        hits.begin_pass();
        assert!(hits.first_visit(3));
        assert!(!hits.first_visit(3));
        assert!(hits.first_visit(0));
        hits.begin_pass();
        assert!(hits.first_visit(3));
    }
}
