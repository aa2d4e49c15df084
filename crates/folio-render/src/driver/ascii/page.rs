//! The page arena of the character-cell driver.
//!
//! One flat row-major buffer of cells, with a per-row count of initialized
//! cells. Opening a page only resets the counts; cells past a row's count are
//! filled with blanks the first time something is written beyond it.

use crate::boxes::BoxCode;
use crate::driver::Font;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    Char(char),
    /// Second column of a double-width character.
    Continuation,
    Rule(BoxCode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub glyph: Glyph,
    pub font: Font,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        glyph: Glyph::Char(' '),
        font: Font::Regular,
    };

    pub fn char(c: char, font: Font) -> Self {
        Cell {
            glyph: Glyph::Char(c),
            font,
        }
    }

    pub fn rule(code: BoxCode) -> Self {
        Cell {
            glyph: Glyph::Rule(code),
            font: Font::Regular,
        }
    }

    pub fn is_blank(&self) -> bool {
        *self == Cell::BLANK
    }
}

#[derive(Debug, Default)]
pub struct PageBuffer {
    cells: Vec<Cell>,
    width: usize,
    height: usize,
    line_len: Vec<usize>,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh `width` by `height` page.
    ///
    /// The arena is reallocated when it is too small, or when it is more than
    /// twice the size needed.
    pub fn prepare(&mut self, width: usize, height: usize) {
        let needed = width * height;
        if needed > self.cells.len() || needed < self.cells.len() / 2 {
            self.cells = vec![Cell::BLANK; needed];
        }
        self.width = width;
        self.height = height;
        self.line_len.clear();
        self.line_len.resize(height, 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn ensure_len(&mut self, y: usize, len: usize) {
        let current = self.line_len[y];
        if len > current {
            let start = y * self.width;
            self.cells[start + current..start + len].fill(Cell::BLANK);
            self.line_len[y] = len;
        }
    }

    /// Write one cell; positions off the page are ignored.
    pub fn put(&mut self, x: usize, y: usize, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.ensure_len(y, x + 1);
        self.cells[y * self.width + x] = cell;
    }

    /// Write a character of display width `w` (1 or 2). Returns false if it
    /// does not fit.
    pub fn put_char(&mut self, x: usize, y: usize, c: char, w: usize, font: Font) -> bool {
        if y >= self.height || x + w > self.width {
            return false;
        }
        self.put(x, y, Cell::char(c, font));
        for extra in 1..w {
            self.put(
                x + extra,
                y,
                Cell {
                    glyph: Glyph::Continuation,
                    font,
                },
            );
        }
        true
    }

    /// The initialized cells of row `y`.
    pub fn row(&self, y: usize) -> &[Cell] {
        let start = y * self.width;
        &self.cells[start..start + self.line_len[y]]
    }

    /// Row `y` without trailing blanks.
    pub fn trimmed_row(&self, y: usize) -> &[Cell] {
        let row = self.row(y);
        let end = row
            .iter()
            .rposition(|cell| !cell.is_blank())
            .map_or(0, |last| last + 1);
        &row[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_grow_lazily() {
        let mut page = PageBuffer::new();
        page.prepare(10, 3);
        page.put(4, 1, Cell::char('x', Font::Regular));
        assert_eq!(page.row(0).len(), 0);
        assert_eq!(page.row(1).len(), 5);
        assert!(page.row(1)[..4].iter().all(Cell::is_blank));
    }

    #[test]
    fn off_page_writes_are_ignored() {
        let mut page = PageBuffer::new();
        page.prepare(4, 2);
        page.put(4, 0, Cell::char('x', Font::Regular));
        page.put(0, 2, Cell::char('x', Font::Regular));
        assert!(page.row(0).is_empty());
        assert!(!page.put_char(3, 0, '日', 2, Font::Regular));
    }

    #[test]
    fn reopening_clears_stale_cells() {
        let mut page = PageBuffer::new();
        page.prepare(5, 2);
        page.put(2, 0, Cell::char('x', Font::Bold));
        page.prepare(5, 2);
        page.put(4, 0, Cell::char('y', Font::Regular));
        assert!(page.row(0)[2].is_blank());
    }

    #[test]
    fn reallocation_policy() {
        let mut page = PageBuffer::new();
        page.prepare(10, 10);
        assert_eq!(page.capacity(), 100);
        page.prepare(8, 8);
        assert_eq!(page.capacity(), 100);
        page.prepare(5, 5);
        assert_eq!(page.capacity(), 25);
        page.prepare(6, 6);
        assert_eq!(page.capacity(), 36);
    }

    #[test]
    fn wide_characters_take_two_cells() {
        let mut page = PageBuffer::new();
        page.prepare(6, 1);
        assert!(page.put_char(1, 0, '日', 2, Font::Regular));
        assert_eq!(page.row(0)[2].glyph, Glyph::Continuation);
        assert_eq!(page.trimmed_row(0).len(), 3);
    }
}
