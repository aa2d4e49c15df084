//! # Folio Render - Paged Table Output for Statistical Reports
//!
//! `folio-render` turns device-independent tables into paged output on any
//! number of devices at once: a character-cell text listing, an HTML
//! document, a JSON Lines spool or CSV.
//!
//! ## Core Concepts
//!
//! - [`Table`]: a grid of text cells with joined spans, header rows and
//!   columns, and ruled boundaries
//! - [`OutputDriver`]: the capability set every device implements
//! - [`AsciiDriver`]: the text device, with box-drawing rules and
//!   overstrike or escape-string emphasis
//! - [`LayoutEngine`]: measures each table per device and paginates it,
//!   tiling narrow tables and cutting wide or long ones into captioned bands
//! - [`OutputConfig`]: driver definitions loaded from YAML
//!
//! ## Quick Start
//!
//! ```rust
//! use folio_pipe::MemorySink;
//! use folio_render::{AsciiDriver, AsciiOptions, CellFlags, Justify, LayoutEngine, LineStyle, Table};
//!
//! let sink = MemorySink::new();
//! let mut engine = LayoutEngine::new();
//! engine
//!     .add_driver(Box::new(AsciiDriver::new("listing", AsciiOptions::plain(40, 20), Box::new(sink.clone()))))
//!     .unwrap();
//!
//! let mut table = Table::new(2, 2).unwrap();
//! table.set_headers(0, 0, 1, 0).unwrap();
//! table.text(0, 0, Justify::Left, CellFlags::TITLE, "Group");
//! table.text(1, 0, Justify::Right, CellFlags::TITLE, "N");
//! table.text(0, 1, Justify::Left, CellFlags::empty(), "Control");
//! table.text(1, 1, Justify::Right, CellFlags::empty(), "52");
//! let rule = Some(LineStyle::Single);
//! table.frame(rule, rule, rule, rule, 0, 0, 1, 1);
//!
//! engine.new_series(Some("FREQUENCIES"));
//! engine.submit(&table);
//! engine.finish().unwrap();
//!
//! let listing = sink.contents();
//! assert!(listing.contains("1.1 FREQUENCIES."));
//! assert!(listing.contains("|Control|52|"));
//! ```

pub mod boxes;
pub mod config;
pub mod driver;
mod error;
pub mod som;
pub mod table;

pub use boxes::{BoxCode, BoxGlyphs, BoxTable, Sides};
pub use config::{DriverConfig, OutputConfig};
pub use driver::ascii::{AsciiDriver, AsciiOptions};
pub use driver::{DriverRegistry, NativeDriver, OutputDriver};
pub use error::{ConfigError, OutputError, Result, TableError};
pub use som::{LayoutEngine, Strategy, SubmitReport};
pub use table::{CellFlags, Justify, LineStyle, Table, TableFlags};
