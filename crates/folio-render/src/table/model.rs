//! The table-of-cells data structure.
//!
//! A [`Table`] is a grid of cells plus two rule grids: one for horizontal
//! boundaries (`n_rows + 1` by `n_cols`) and one for vertical boundaries
//! (`n_rows` by `n_cols + 1`). Backing storage only ever grows; shrinking a
//! table changes its logical extent and clears whatever falls outside it.

use super::types::{
    CellFlags, ColumnLayout, ColumnStyle, Headers, Justify, LineStyle, Span, TableFlags,
};
use crate::error::TableError;

/// Text content of a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextCell {
    pub text: String,
    pub justify: Justify,
    pub flags: CellFlags,
}

impl TextCell {
    pub fn new(text: impl Into<String>, justify: Justify, flags: CellFlags) -> Self {
        TextCell {
            text: text.into(),
            justify,
            flags,
        }
    }
}

/// A joined span and the text owned by its top-left cell.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Join {
    span: Span,
    cell: TextCell,
}

#[derive(Clone, Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Text(TextCell),
    Joined(usize),
}

/// What a grid position holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellRef<'a> {
    Empty,
    Text(&'a TextCell),
    /// Member of a join. `join` identifies the span within the table.
    Joined {
        join: usize,
        span: Span,
        cell: &'a TextCell,
    },
}

impl<'a> CellRef<'a> {
    /// The text shown at this position, if any.
    pub fn text(&self) -> Option<&'a TextCell> {
        match self {
            CellRef::Empty => None,
            CellRef::Text(cell) => Some(cell),
            CellRef::Joined { cell, .. } => Some(cell),
        }
    }
}

/// A table submitted for rendering.
#[derive(Clone, Debug)]
pub struct Table {
    n_cols: usize,
    n_rows: usize,
    cap_cols: usize,
    cap_rows: usize,
    slots: Vec<Slot>,
    rules_h: Vec<LineStyle>,
    rules_v: Vec<LineStyle>,
    joins: Vec<Join>,
    headers: Headers,
    columns: ColumnLayout,
    title: Option<String>,
    flags: TableFlags,
}

impl Table {
    /// Create an empty `n_cols` by `n_rows` table with no rules.
    pub fn new(n_cols: usize, n_rows: usize) -> Result<Self, TableError> {
        if n_cols == 0 || n_rows == 0 {
            return Err(TableError::EmptyDimension {
                cols: n_cols,
                rows: n_rows,
            });
        }
        Ok(Table {
            n_cols,
            n_rows,
            cap_cols: n_cols,
            cap_rows: n_rows,
            slots: vec![Slot::Empty; n_cols * n_rows],
            rules_h: vec![LineStyle::None; (n_rows + 1) * n_cols],
            rules_v: vec![LineStyle::None; n_rows * (n_cols + 1)],
            joins: Vec::new(),
            headers: Headers::default(),
            columns: ColumnLayout::default(),
            title: None,
            flags: TableFlags::empty(),
        })
    }

    /// A 1x1 table holding a plain paragraph of text.
    ///
    /// The layout engine emits such tables without title or framing.
    pub fn paragraph(text: impl Into<String>) -> Self {
        let mut table = Table {
            n_cols: 1,
            n_rows: 1,
            cap_cols: 1,
            cap_rows: 1,
            slots: vec![Slot::Empty],
            rules_h: vec![LineStyle::None; 2],
            rules_v: vec![LineStyle::None; 2],
            joins: Vec::new(),
            headers: Headers::default(),
            columns: ColumnLayout::default(),
            title: None,
            flags: TableFlags::NO_TITLE,
        };
        table.text(0, 0, Justify::Left, CellFlags::empty(), text);
        table
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// True for the 1x1 plain-text special case.
    pub fn is_paragraph(&self) -> bool {
        self.n_cols == 1 && self.n_rows == 1
    }

    pub fn headers(&self) -> Headers {
        self.headers
    }

    pub fn column_layout(&self) -> ColumnLayout {
        self.columns
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn flags(&self) -> TableFlags {
        self.flags
    }

    /// Set the frozen header counts.
    ///
    /// Header counts that fill an axis completely are accepted with a warning;
    /// counts that exceed it are rejected.
    pub fn set_headers(
        &mut self,
        left: usize,
        right: usize,
        top: usize,
        bottom: usize,
    ) -> Result<(), TableError> {
        let headers = Headers::new(left, right, top, bottom);
        check_headers(&headers, self.n_cols, self.n_rows)?;
        self.headers = headers;
        Ok(())
    }

    /// Set the column style and the row-group size for repeat-down tiling.
    pub fn set_columns(&mut self, style: ColumnStyle, group: usize) {
        self.columns = ColumnLayout {
            style,
            group: group.max(1),
        };
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_flags(&mut self, flags: TableFlags) {
        self.flags = flags;
    }

    /// Change the logical extent.
    ///
    /// Storage grows as needed and is never released. Cells and rules outside
    /// the new extent are cleared, and joins are clipped to it, so that a
    /// later grow exposes only empty cells.
    pub fn resize(&mut self, n_cols: usize, n_rows: usize) -> Result<(), TableError> {
        if n_cols == 0 || n_rows == 0 {
            return Err(TableError::EmptyDimension {
                cols: n_cols,
                rows: n_rows,
            });
        }
        check_headers(&self.headers, n_cols, n_rows)?;

        if n_cols > self.cap_cols || n_rows > self.cap_rows {
            self.reallocate(n_cols.max(self.cap_cols), n_rows.max(self.cap_rows));
        }

        if n_cols < self.n_cols || n_rows < self.n_rows {
            self.clear_outside(n_cols, n_rows);
        }
        self.n_cols = n_cols;
        self.n_rows = n_rows;
        Ok(())
    }

    fn reallocate(&mut self, cap_cols: usize, cap_rows: usize) {
        let mut slots = vec![Slot::Empty; cap_cols * cap_rows];
        let mut rules_h = vec![LineStyle::None; (cap_rows + 1) * cap_cols];
        let mut rules_v = vec![LineStyle::None; cap_rows * (cap_cols + 1)];

        for r in 0..self.n_rows {
            for c in 0..self.n_cols {
                slots[r * cap_cols + c] = std::mem::take(&mut self.slots[r * self.cap_cols + c]);
            }
        }
        for r in 0..=self.n_rows {
            for c in 0..self.n_cols {
                rules_h[r * cap_cols + c] = self.rules_h[r * self.cap_cols + c];
            }
        }
        for r in 0..self.n_rows {
            for c in 0..=self.n_cols {
                rules_v[r * (cap_cols + 1) + c] = self.rules_v[r * (self.cap_cols + 1) + c];
            }
        }

        self.slots = slots;
        self.rules_h = rules_h;
        self.rules_v = rules_v;
        self.cap_cols = cap_cols;
        self.cap_rows = cap_rows;
    }

    fn clear_outside(&mut self, n_cols: usize, n_rows: usize) {
        for r in 0..self.n_rows {
            for c in 0..self.n_cols {
                if r >= n_rows || c >= n_cols {
                    self.slots[r * self.cap_cols + c] = Slot::Empty;
                }
            }
        }
        for r in 0..=self.n_rows {
            for c in 0..self.n_cols {
                if r > n_rows || c >= n_cols {
                    self.rules_h[r * self.cap_cols + c] = LineStyle::None;
                }
            }
        }
        for r in 0..self.n_rows {
            for c in 0..=self.n_cols {
                if r >= n_rows || c > n_cols {
                    self.rules_v[r * (self.cap_cols + 1) + c] = LineStyle::None;
                }
            }
        }
        for join in &mut self.joins {
            join.span.x2 = join.span.x2.min(n_cols - 1);
            join.span.y2 = join.span.y2.min(n_rows - 1);
        }
    }

    fn slot_index(&self, col: usize, row: usize) -> usize {
        assert!(
            row < self.n_rows && col < self.n_cols,
            "cell ({col}, {row}) is outside a {}x{} table",
            self.n_cols,
            self.n_rows
        );
        row * self.cap_cols + col
    }

    /// Contents of the cell at `(col, row)`.
    pub fn cell_at(&self, col: usize, row: usize) -> CellRef<'_> {
        match &self.slots[self.slot_index(col, row)] {
            Slot::Empty => CellRef::Empty,
            Slot::Text(cell) => CellRef::Text(cell),
            Slot::Joined(join) => {
                let entry = &self.joins[*join];
                CellRef::Joined {
                    join: *join,
                    span: entry.span,
                    cell: &entry.cell,
                }
            }
        }
    }

    /// The join containing `(col, row)`, if any.
    pub fn span_of(&self, col: usize, row: usize) -> Option<Span> {
        match self.cell_at(col, row) {
            CellRef::Joined { span, .. } => Some(span),
            _ => None,
        }
    }

    /// Style of horizontal boundary `row` (0..=n_rows) above column `col`.
    pub fn rule_h(&self, col: usize, row: usize) -> LineStyle {
        assert!(row <= self.n_rows && col < self.n_cols);
        self.rules_h[row * self.cap_cols + col]
    }

    /// Style of vertical boundary `col` (0..=n_cols) beside row `row`.
    pub fn rule_v(&self, col: usize, row: usize) -> LineStyle {
        assert!(row < self.n_rows && col <= self.n_cols);
        self.rules_v[row * (self.cap_cols + 1) + col]
    }

    /// Put text in one cell. Writing into a joined cell is a contract
    /// violation.
    pub fn text(
        &mut self,
        col: usize,
        row: usize,
        justify: Justify,
        flags: CellFlags,
        text: impl Into<String>,
    ) {
        let index = self.slot_index(col, row);
        assert!(
            !matches!(self.slots[index], Slot::Joined(_)),
            "cell ({col}, {row}) belongs to a join"
        );
        self.slots[index] = Slot::Text(TextCell::new(text, justify, flags));
    }

    /// Join the inclusive rectangle `(x1, y1)-(x2, y2)` into one cell holding
    /// `text`. Rules strictly inside the rectangle are removed.
    #[allow(clippy::too_many_arguments)]
    pub fn joint_text(
        &mut self,
        x1: usize,
        y1: usize,
        x2: usize,
        y2: usize,
        justify: Justify,
        flags: CellFlags,
        text: impl Into<String>,
    ) {
        assert!(
            x1 <= x2 && y1 <= y2 && x2 < self.n_cols && y2 < self.n_rows,
            "join ({x1}, {y1})-({x2}, {y2}) is outside a {}x{} table",
            self.n_cols,
            self.n_rows
        );
        let span = Span::new(x1, y1, x2, y2);
        let id = self.joins.len();
        for r in span.rows() {
            for c in span.cols() {
                let index = r * self.cap_cols + c;
                assert!(
                    !matches!(self.slots[index], Slot::Joined(_)),
                    "join ({x1}, {y1})-({x2}, {y2}) overlaps an existing join at ({c}, {r})"
                );
                self.slots[index] = Slot::Joined(id);
            }
        }
        for r in y1 + 1..=y2 {
            for c in span.cols() {
                self.rules_h[r * self.cap_cols + c] = LineStyle::None;
            }
        }
        for r in span.rows() {
            for c in x1 + 1..=x2 {
                self.rules_v[r * (self.cap_cols + 1) + c] = LineStyle::None;
            }
        }
        self.joins.push(Join {
            span,
            cell: TextCell::new(text, justify, flags),
        });
    }

    /// Draw a horizontal rule on boundary `y` across columns `x1..=x2`.
    pub fn hline(&mut self, style: LineStyle, x1: usize, x2: usize, y: usize) {
        assert!(x1 <= x2 && x2 < self.n_cols && y <= self.n_rows);
        for c in x1..=x2 {
            self.rules_h[y * self.cap_cols + c] = style;
        }
    }

    /// Draw a vertical rule on boundary `x` down rows `y1..=y2`.
    pub fn vline(&mut self, style: LineStyle, x: usize, y1: usize, y2: usize) {
        assert!(y1 <= y2 && y2 < self.n_rows && x <= self.n_cols);
        for r in y1..=y2 {
            self.rules_v[r * (self.cap_cols + 1) + x] = style;
        }
    }

    /// Rule the rectangle `(x1, y1)-(x2, y2)`.
    ///
    /// `frame_h`/`frame_v` style the top/bottom and left/right edges,
    /// `inner_h`/`inner_v` every interior boundary. `None` leaves a set of
    /// boundaries untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn frame(
        &mut self,
        frame_h: Option<LineStyle>,
        frame_v: Option<LineStyle>,
        inner_h: Option<LineStyle>,
        inner_v: Option<LineStyle>,
        x1: usize,
        y1: usize,
        x2: usize,
        y2: usize,
    ) {
        assert!(x1 <= x2 && y1 <= y2 && x2 < self.n_cols && y2 < self.n_rows);
        if let Some(style) = frame_h {
            self.hline(style, x1, x2, y1);
            self.hline(style, x1, x2, y2 + 1);
        }
        if let Some(style) = frame_v {
            self.vline(style, x1, y1, y2);
            self.vline(style, x2 + 1, y1, y2);
        }
        if let Some(style) = inner_h {
            for y in y1 + 1..=y2 {
                self.hline(style, x1, x2, y);
            }
        }
        if let Some(style) = inner_v {
            for x in x1 + 1..=x2 {
                self.vline(style, x, y1, y2);
            }
        }
    }
}

fn check_headers(headers: &Headers, n_cols: usize, n_rows: usize) -> Result<(), TableError> {
    let axes = [
        ("column", headers.left, headers.right, n_cols),
        ("row", headers.top, headers.bottom, n_rows),
    ];
    for (axis, first, second, extent) in axes {
        if first + second > extent {
            return Err(TableError::Headers {
                axis,
                first,
                second,
                extent,
            });
        }
        if first + second == extent && extent > 0 && first + second > 0 {
            tracing::warn!(axis, first, second, extent, "headers fill the whole table axis");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: usize, rows: usize) -> Table {
        let mut table = Table::new(cols, rows).unwrap();
        for r in 0..rows {
            for c in 0..cols {
                table.text(c, r, Justify::Left, CellFlags::empty(), format!("{r}:{c}"));
            }
        }
        table
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert_eq!(
            Table::new(0, 3).unwrap_err(),
            TableError::EmptyDimension { cols: 0, rows: 3 }
        );
    }

    #[test]
    fn cell_lookup() {
        let table = grid(3, 2);
        assert_eq!(table.cell_at(2, 1).text().unwrap().text, "1:2");
        assert!(table.span_of(2, 1).is_none());
    }

    #[test]
    fn builders_and_queries_take_column_first() {
        let mut table = Table::new(3, 2).unwrap();
        table.text(2, 0, Justify::Left, CellFlags::empty(), "top right");
        table.hline(LineStyle::Single, 2, 2, 1);
        table.vline(LineStyle::Double, 3, 0, 0);
        assert_eq!(table.cell_at(2, 0).text().unwrap().text, "top right");
        assert_eq!(table.cell_at(0, 1), CellRef::Empty);
        assert_eq!(table.rule_h(2, 1), LineStyle::Single);
        assert_eq!(table.rule_v(3, 0), LineStyle::Double);
    }

    #[test]
    fn join_members_share_owner_text() {
        let mut table = grid(4, 3);
        table.joint_text(1, 0, 3, 1, Justify::Center, CellFlags::TITLE, "joined");
        let span = table.span_of(3, 1).unwrap();
        assert_eq!(span, Span::new(1, 0, 3, 1));
        assert_eq!(table.cell_at(2, 0).text().unwrap().text, "joined");
        assert_eq!(table.cell_at(2, 2).text().unwrap().text, "2:2");
    }

    #[test]
    fn join_clears_interior_rules() {
        let mut table = grid(3, 3);
        table.frame(
            Some(LineStyle::Double),
            Some(LineStyle::Double),
            Some(LineStyle::Single),
            Some(LineStyle::Single),
            0,
            0,
            2,
            2,
        );
        table.joint_text(0, 0, 1, 1, Justify::Left, CellFlags::empty(), "j");
        assert_eq!(table.rule_v(1, 0), LineStyle::None);
        assert_eq!(table.rule_h(0, 1), LineStyle::None);
        assert_eq!(table.rule_v(0, 0), LineStyle::Double);
        assert_eq!(table.rule_v(2, 0), LineStyle::Single);
        assert_eq!(table.rule_h(0, 2), LineStyle::Single);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn join_outside_extent_panics() {
        let mut table = grid(2, 2);
        table.joint_text(0, 0, 2, 0, Justify::Left, CellFlags::empty(), "bad");
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn overlapping_joins_panic() {
        let mut table = grid(3, 3);
        table.joint_text(0, 0, 1, 1, Justify::Left, CellFlags::empty(), "a");
        table.joint_text(1, 1, 2, 2, Justify::Left, CellFlags::empty(), "b");
    }

    #[test]
    fn frame_sets_outer_and_inner_rules() {
        let mut table = grid(2, 2);
        table.frame(
            Some(LineStyle::Double),
            Some(LineStyle::Single),
            None,
            Some(LineStyle::Single),
            0,
            0,
            1,
            1,
        );
        assert_eq!(table.rule_h(1, 0), LineStyle::Double);
        assert_eq!(table.rule_h(0, 2), LineStyle::Double);
        assert_eq!(table.rule_h(0, 1), LineStyle::None);
        assert_eq!(table.rule_v(0, 1), LineStyle::Single);
        assert_eq!(table.rule_v(1, 1), LineStyle::Single);
        assert_eq!(table.rule_v(2, 1), LineStyle::Single);
    }

    #[test]
    fn resize_grows_and_keeps_cells() {
        let mut table = grid(2, 2);
        table.hline(LineStyle::Single, 0, 1, 2);
        table.resize(5, 4).unwrap();
        assert_eq!(table.n_cols(), 5);
        assert_eq!(table.cell_at(1, 1).text().unwrap().text, "1:1");
        assert_eq!(table.cell_at(4, 3), CellRef::Empty);
        assert_eq!(table.rule_h(1, 2), LineStyle::Single);
        assert_eq!(table.rule_h(4, 4), LineStyle::None);
    }

    #[test]
    fn shrink_then_grow_exposes_empty_cells() {
        let mut table = grid(3, 3);
        table.joint_text(1, 1, 2, 2, Justify::Left, CellFlags::empty(), "j");
        table.resize(2, 2).unwrap();
        assert_eq!(table.span_of(1, 1), Some(Span::new(1, 1, 1, 1)));
        table.resize(3, 3).unwrap();
        assert_eq!(table.cell_at(2, 2), CellRef::Empty);
        assert_eq!(table.cell_at(0, 0).text().unwrap().text, "0:0");
    }

    #[test]
    fn headers_must_fit() {
        let mut table = grid(3, 4);
        assert!(table.set_headers(1, 1, 2, 1).is_ok());
        assert!(table.set_headers(3, 0, 0, 0).is_ok());
        assert_eq!(
            table.set_headers(2, 2, 0, 0).unwrap_err(),
            TableError::Headers {
                axis: "column",
                first: 2,
                second: 2,
                extent: 3
            }
        );
    }

    #[test]
    fn resize_rejects_header_violation() {
        let mut table = grid(4, 4);
        table.set_headers(1, 1, 1, 1).unwrap();
        assert!(table.resize(1, 4).is_err());
        assert_eq!(table.n_cols(), 4);
    }

    #[test]
    fn paragraph_is_untitled_single_cell() {
        let table = Table::paragraph("Some text.");
        assert!(table.is_paragraph());
        assert!(table.flags().contains(TableFlags::NO_TITLE));
        assert_eq!(table.cell_at(0, 0).text().unwrap().text, "Some text.");
    }
}
