//! Table data model.
//!
//! Procedures build a [`Table`] cell by cell, rule the boundaries they want,
//! and hand it to the layout engine. The model is pure data: it never talks
//! to a driver.
//!
//! ```rust
//! use folio_render::table::{CellFlags, Justify, LineStyle, Table};
//!
//! let mut table = Table::new(3, 2).unwrap();
//! table.set_headers(1, 0, 1, 0).unwrap();
//! table.text(1, 0, Justify::Center, CellFlags::TITLE, "Mean");
//! table.text(2, 0, Justify::Center, CellFlags::TITLE, "N");
//! table.text(0, 1, Justify::Left, CellFlags::TITLE, "Age");
//! table.text(1, 1, Justify::Right, CellFlags::empty(), "41.2");
//! table.text(2, 1, Justify::Right, CellFlags::empty(), "120");
//! table.hline(LineStyle::Double, 0, 2, 1);
//!
//! assert_eq!(table.cell_at(1, 1).text().unwrap().text, "41.2");
//! ```

mod model;
mod types;

pub use model::{CellRef, Table, TextCell};
pub use types::{
    CellFlags, ColumnLayout, ColumnStyle, Headers, Justify, LineStyle, Span, TableFlags,
};
