//! Value types shared by the table model and the drivers.

use std::ops::RangeInclusive;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Style of a ruled line on one boundary.
///
/// The numeric value is the 2-bit code used to index the box character table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    None = 0,
    Single = 1,
    Double = 2,
    /// Driver-defined emphasis line, drawn heavier than double where possible.
    Special = 3,
}

impl LineStyle {
    pub const ALL: [LineStyle; 4] = [
        LineStyle::None,
        LineStyle::Single,
        LineStyle::Double,
        LineStyle::Special,
    ];

    pub fn bits(self) -> usize {
        self as usize
    }

    pub fn from_bits(bits: usize) -> LineStyle {
        match bits & 3 {
            0 => LineStyle::None,
            1 => LineStyle::Single,
            2 => LineStyle::Double,
            _ => LineStyle::Special,
        }
    }

    pub fn is_none(self) -> bool {
        self == LineStyle::None
    }
}

/// Horizontal placement of text within its allocated width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
}

impl Justify {
    /// Offset of text `actual` wide inside a box `allocated` wide.
    pub fn offset(self, allocated: usize, actual: usize) -> usize {
        let slack = allocated.saturating_sub(actual);
        match self {
            Justify::Left => 0,
            Justify::Right => slack,
            Justify::Center => slack / 2,
        }
    }
}

bitflags! {
    /// Per-cell rendering flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CellFlags: u8 {
        /// Title or header cell, rendered bold.
        const TITLE = 1 << 0;
        /// Emphasized cell, rendered italic.
        const EMPHASIS = 1 << 1;
        /// Never wrap; the cell claims its full unwrapped width.
        const NO_WRAP = 1 << 2;
        /// Fixed-pitch content such as numbers or code.
        const FIXED = 1 << 3;
    }
}

bitflags! {
    /// Table-level rendering flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TableFlags: u8 {
        /// Do not emit a title line before the table.
        const NO_TITLE = 1 << 0;
        /// Do not add a blank line before the table.
        const NO_SPACING = 1 << 1;
    }
}

/// How the layout engine may tile a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnStyle {
    #[default]
    None,
    /// Tile the table into side-by-side bands of rows.
    RepeatDown,
}

/// Column style together with the row-group size that bands must respect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub style: ColumnStyle,
    /// Body rows per logical group; bands break only at group boundaries.
    pub group: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            style: ColumnStyle::None,
            group: 1,
        }
    }
}

/// Counts of frozen header rows and columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl Headers {
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Headers {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// A rectangular join, inclusive on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl Span {
    pub fn new(x1: usize, y1: usize, x2: usize, y2: usize) -> Self {
        Span { x1, y1, x2, y2 }
    }

    pub fn cols(&self) -> RangeInclusive<usize> {
        self.x1..=self.x2
    }

    pub fn rows(&self) -> RangeInclusive<usize> {
        self.y1..=self.y2
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        self.rows().contains(&row) && self.cols().contains(&col)
    }

    /// The cell that owns the text.
    pub fn is_owner(&self, col: usize, row: usize) -> bool {
        row == self.y1 && col == self.x1
    }

    pub fn width(&self) -> usize {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> usize {
        self.y2 - self.y1 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_style_bits_round_trip() {
        for style in LineStyle::ALL {
            assert_eq!(LineStyle::from_bits(style.bits()), style);
        }
        assert_eq!(LineStyle::from_bits(7), LineStyle::Special);
    }

    #[test]
    fn justify_offsets() {
        assert_eq!(Justify::Left.offset(10, 4), 0);
        assert_eq!(Justify::Right.offset(10, 4), 6);
        assert_eq!(Justify::Center.offset(10, 4), 3);
        assert_eq!(Justify::Right.offset(3, 10), 0);
    }

    #[test]
    fn span_geometry() {
        let span = Span::new(1, 2, 3, 2);
        assert_eq!(span.width(), 3);
        assert_eq!(span.height(), 1);
        assert!(span.contains(3, 2));
        assert!(!span.contains(3, 3));
        assert!(span.is_owner(1, 2));
        assert!(!span.is_owner(2, 2));
    }

    #[test]
    fn column_style_serde_names() {
        let json = serde_json::to_string(&ColumnStyle::RepeatDown).unwrap();
        assert_eq!(json, "\"repeat-down\"");
    }
}
