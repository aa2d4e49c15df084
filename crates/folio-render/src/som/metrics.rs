//! Cell and rule sizes of one table on one driver.

use crate::driver::{OutputDriver, TextSpec};
use crate::table::{CellFlags, CellRef, Span, Table, TextCell};

/// Sizes of every column, row and boundary, in device units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableMetrics {
    pub cols: Vec<usize>,
    pub rows: Vec<usize>,
    /// Width of each vertical boundary; `n_cols + 1` entries.
    pub rule_cols: Vec<usize>,
    /// Height of each horizontal boundary; `n_rows + 1` entries.
    pub rule_rows: Vec<usize>,
}

/// One cell or boundary placed along an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placed {
    /// Table index of the column, row or boundary.
    pub index: usize,
    pub start: usize,
    pub size: usize,
}

impl Placed {
    pub fn end(&self) -> usize {
        self.start + self.size
    }
}

/// A list of columns (or rows) placed side by side with their boundaries.
///
/// `boundaries[i]` precedes `cells[i]`; the final boundary closes the band.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxisLayout {
    pub cells: Vec<Placed>,
    pub boundaries: Vec<Placed>,
}

impl AxisLayout {
    pub fn extent(&self) -> usize {
        match (self.boundaries.first(), self.boundaries.last()) {
            (Some(first), Some(last)) => last.end() - first.start,
            _ => 0,
        }
    }
}

impl TableMetrics {
    /// Measure `table` with the fonts and rule widths of `driver`.
    pub fn measure(table: &Table, driver: &dyn OutputDriver) -> Self {
        let geometry = driver.geometry();
        let n_cols = table.n_cols();
        let n_rows = table.n_rows();

        let rule_cols = (0..=n_cols)
            .map(|x| {
                let width = (0..n_rows)
                    .map(|r| driver.line_width(table.rule_v(x, r)))
                    .max()
                    .unwrap_or(0);
                if width == 0 && x > 0 && x < n_cols {
                    geometry.em_width
                } else {
                    width
                }
            })
            .collect::<Vec<_>>();
        let rule_rows = (0..=n_rows)
            .map(|y| {
                (0..n_cols)
                    .map(|c| driver.line_height(table.rule_h(c, y)))
                    .max()
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();

        let mut joins: Vec<(Span, &TextCell)> = Vec::new();
        let mut cols = vec![0; n_cols];
        for r in 0..n_rows {
            for (c, width) in cols.iter_mut().enumerate() {
                match table.cell_at(c, r) {
                    CellRef::Text(cell) => {
                        *width = (*width).max(natural_width(driver, cell, geometry.width));
                    }
                    CellRef::Joined { span, cell, .. } if span.is_owner(c, r) => {
                        joins.push((span, cell));
                    }
                    _ => {}
                }
            }
        }
        joins.sort_by_key(|(span, _)| span.width());
        for (span, cell) in &joins {
            let needed = natural_width(driver, cell, geometry.width);
            let current = spanned(&cols, &rule_cols, span.x1, span.x2);
            if needed > current {
                distribute(&mut cols[span.x1..=span.x2], needed - current);
            }
        }

        let mut rows = vec![geometry.font_height; n_rows];
        for (r, height) in rows.iter_mut().enumerate() {
            for (c, &width) in cols.iter().enumerate() {
                if let CellRef::Text(cell) = table.cell_at(c, r) {
                    *height = (*height).max(wrapped_height(driver, cell, width));
                }
            }
        }
        joins.sort_by_key(|(span, _)| span.height());
        for (span, cell) in &joins {
            let width = spanned(&cols, &rule_cols, span.x1, span.x2);
            let needed = wrapped_height(driver, cell, width);
            let current = spanned(&rows, &rule_rows, span.y1, span.y2);
            if needed > current {
                distribute(&mut rows[span.y1..=span.y2], needed - current);
            }
        }

        TableMetrics {
            cols,
            rows,
            rule_cols,
            rule_rows,
        }
    }

    /// Width of `cols` laid side by side, outer and inner rules included.
    pub fn width_of(&self, cols: &[usize]) -> usize {
        axis_extent(cols, &self.cols, &self.rule_cols)
    }

    /// Height of `rows` stacked, outer and inner rules included.
    pub fn height_of(&self, rows: &[usize]) -> usize {
        axis_extent(rows, &self.rows, &self.rule_rows)
    }

    /// Width of columns `first..=last` and the rules between them.
    pub fn span_width(&self, first: usize, last: usize) -> usize {
        spanned(&self.cols, &self.rule_cols, first, last)
    }

    pub fn span_height(&self, first: usize, last: usize) -> usize {
        spanned(&self.rows, &self.rule_rows, first, last)
    }

    /// Distance from the start of column `from` to the start of column `to`.
    pub fn col_offset(&self, from: usize, to: usize) -> usize {
        offset(&self.cols, &self.rule_cols, from, to)
    }

    pub fn row_offset(&self, from: usize, to: usize) -> usize {
        offset(&self.rows, &self.rule_rows, from, to)
    }

    pub fn columns_at(&self, cols: &[usize], x: usize) -> AxisLayout {
        place(cols, &self.cols, &self.rule_cols, x)
    }

    pub fn rows_at(&self, rows: &[usize], y: usize) -> AxisLayout {
        place(rows, &self.rows, &self.rule_rows, y)
    }
}

fn natural_width(driver: &dyn OutputDriver, cell: &TextCell, max: usize) -> usize {
    let width = driver.text_metrics(&TextSpec::new(&cell.text)).width;
    if cell.flags.contains(CellFlags::NO_WRAP) {
        width
    } else {
        width.min(max)
    }
}

fn wrapped_height(driver: &dyn OutputDriver, cell: &TextCell, width: usize) -> usize {
    let wrap = !cell.flags.contains(CellFlags::NO_WRAP);
    driver
        .text_metrics(&TextSpec::new(&cell.text).width(width).wrap(wrap))
        .height
}

/// Size of cells `first..=last` plus the rules between them.
fn spanned(sizes: &[usize], rules: &[usize], first: usize, last: usize) -> usize {
    sizes[first..=last].iter().sum::<usize>() + rules[first + 1..=last].iter().sum::<usize>()
}

fn offset(sizes: &[usize], rules: &[usize], from: usize, to: usize) -> usize {
    (from..to).map(|i| sizes[i] + rules[i + 1]).sum()
}

/// Spread `extra` over `sizes`, the remainder going to the leading entries.
fn distribute(sizes: &mut [usize], extra: usize) {
    let n = sizes.len();
    for (i, size) in sizes.iter_mut().enumerate() {
        *size += extra / n + usize::from(i < extra % n);
    }
}

fn axis_extent(indices: &[usize], sizes: &[usize], rules: &[usize]) -> usize {
    let Some(&first) = indices.first() else {
        return 0;
    };
    let mut total = rules[first];
    for (i, &index) in indices.iter().enumerate() {
        total += sizes[index];
        total += match indices.get(i + 1) {
            Some(&next) => rules[next],
            None => rules[index + 1],
        };
    }
    total
}

fn place(indices: &[usize], sizes: &[usize], rules: &[usize], origin: usize) -> AxisLayout {
    let mut layout = AxisLayout {
        cells: Vec::with_capacity(indices.len()),
        boundaries: Vec::with_capacity(indices.len() + 1),
    };
    let Some(&last) = indices.last() else {
        return layout;
    };
    let mut at = origin;
    for &index in indices {
        let rule = Placed {
            index,
            start: at,
            size: rules[index],
        };
        at = rule.end();
        layout.boundaries.push(rule);
        let cell = Placed {
            index,
            start: at,
            size: sizes[index],
        };
        at = cell.end();
        layout.cells.push(cell);
    }
    layout.boundaries.push(Placed {
        index: last + 1,
        start: at,
        size: rules[last + 1],
    });
    layout
}
