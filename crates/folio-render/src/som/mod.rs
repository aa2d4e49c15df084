//! The layout engine: fans tables out to every active driver.
//!
//! For each submitted table and each driver the engine first offers the
//! driver's native [`submit`](crate::driver::OutputDriver::submit) path. When
//! the driver declines, the table is measured with that driver's metrics and
//! laid out with one of four strategies:
//!
//! - **paragraph**: a 1x1 table prints as bare wrapped text
//! - **repeat-down**: a narrow, long table is tiled side by side
//! - **single block**: the whole table fits the remaining page
//! - **segmented**: the table is cut into column bands and row bands, each
//!   repeating the header rows and columns and carrying its own caption
//!
//! A driver that fails is disabled for the rest of the run; the other drivers
//! keep receiving output.
//!
//! ```
//! use folio_render::driver::ascii::{AsciiDriver, AsciiOptions};
//! use folio_render::som::{LayoutEngine, Strategy};
//! use folio_render::table::{CellFlags, Justify, Table};
//! use folio_pipe::MemorySink;
//!
//! let sink = MemorySink::new();
//! let mut engine = LayoutEngine::new();
//! let driver = AsciiDriver::new("list", AsciiOptions::plain(40, 20), Box::new(sink.clone()));
//! engine.add_driver(Box::new(driver)).unwrap();
//!
//! let mut table = Table::new(2, 1).unwrap();
//! table.text(0, 0, Justify::Left, CellFlags::empty(), "n");
//! table.text(1, 0, Justify::Right, CellFlags::empty(), "42");
//! let report = engine.submit(&table);
//! assert_eq!(report.drivers[0].strategy, Some(Strategy::SingleBlock));
//!
//! engine.finish().unwrap();
//! assert!(sink.contents().contains("42"));
//! ```

mod layout;
pub mod metrics;
pub mod render;

pub use layout::{REPEAT_MIN_BODY_ROWS, REPEAT_MIN_COPIES};

use std::ops::Range;

use serde::Serialize;

use crate::driver::{
    ClassLease, DriverRegistry, DriverState, Extent, OutputDriver, Pen, SubmitContext,
};
use crate::error::Result;
use crate::table::{Table, TableFlags};
use layout::Layout;
use render::JoinHits;

/// How a table was laid out on one driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The driver rendered the table itself.
    Native,
    Paragraph,
    RepeatDown,
    SingleBlock,
    Segmented,
}

/// One band of a table drawn at one position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// `(x, y)` segment index; used in the caption.
    pub index: (usize, usize),
    /// Body columns in the band, headers excluded.
    pub cols: Range<usize>,
    /// Body rows in the band, headers excluded.
    pub rows: Range<usize>,
    pub at: Pen,
    /// Size of the band with its caption.
    pub extent: Extent,
}

/// What happened to one submission on one driver.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DriverReport {
    pub driver: String,
    pub strategy: Option<Strategy>,
    pub placements: Vec<Placement>,
    /// Pages ejected while laying out this table.
    pub ejects: usize,
    /// The driver was already disabled and received nothing.
    pub skipped: bool,
    /// The driver failed during this submission and is now disabled.
    pub disabled: bool,
    pub error: Option<String>,
    /// The failure came from the output channel rather than the driver.
    pub recoverable: bool,
}

impl DriverReport {
    fn new(driver: &str) -> Self {
        DriverReport {
            driver: driver.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub table_number: usize,
    pub subtable_number: usize,
    pub drivers: Vec<DriverReport>,
}

impl SubmitReport {
    pub fn driver(&self, name: &str) -> Option<&DriverReport> {
        self.drivers.iter().find(|report| report.driver == name)
    }
}

/// Caption for segment `(x, y)` of subtable `table.subtable`.
///
/// ```
/// use folio_render::som::caption;
///
/// assert_eq!(caption(3, 1, 0, 0, None, Some("Totals")), "3.1.  Totals");
/// assert_eq!(caption(3, 2, 1, 2, Some("FREQUENCIES"), None), "3.2(1:2) FREQUENCIES.");
/// assert_eq!(caption(3, 2, 4, 0, None, None), "3.2(4).");
/// ```
pub fn caption(
    table: usize,
    subtable: usize,
    x: usize,
    y: usize,
    command: Option<&str>,
    title: Option<&str>,
) -> String {
    let mut text = format!("{table}.{subtable}");
    if x > 0 && y > 0 {
        text.push_str(&format!("({x}:{y})"));
    } else if x > 0 {
        text.push_str(&format!("({x})"));
    }
    if let Some(command) = command {
        text.push(' ');
        text.push_str(command);
    }
    match title {
        Some(title) => {
            text.push_str(".  ");
            text.push_str(title);
        }
        None => text.push('.'),
    }
    text
}

struct DriverSlot {
    driver: Box<dyn OutputDriver>,
    // Dropped after `driver`, so the class teardown follows the instance.
    _lease: ClassLease,
    hits: JoinHits,
    disabled: bool,
    closed: bool,
}

/// Owns the active drivers and the table numbering of a run.
pub struct LayoutEngine {
    registry: DriverRegistry,
    slots: Vec<DriverSlot>,
    table_number: usize,
    subtable_number: usize,
    command: Option<String>,
    finished: bool,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        LayoutEngine {
            registry: DriverRegistry::new(),
            slots: Vec::new(),
            table_number: 0,
            subtable_number: 0,
            command: None,
            finished: false,
        }
    }

    /// Activate `driver` and start sending it output. Returns its index.
    ///
    /// A driver that fails to open is dropped and the error returned; the
    /// engine keeps its other drivers.
    pub fn add_driver(&mut self, mut driver: Box<dyn OutputDriver>) -> Result<usize> {
        let lease = self.registry.acquire(driver.class())?;
        if let Err(err) = driver.open() {
            tracing::error!(driver = %driver.name(), error = %err, "driver activation failed");
            return Err(err);
        }
        tracing::debug!(driver = %driver.name(), class = lease.class_name(), "driver activated");
        self.slots.push(DriverSlot {
            driver,
            _lease: lease,
            hits: JoinHits::new(),
            disabled: false,
            closed: false,
        });
        Ok(self.slots.len() - 1)
    }

    /// Start a new table number; subsequent submissions count subtables
    /// from 1 and carry `command` in their captions.
    pub fn new_series(&mut self, command: Option<&str>) {
        self.table_number += 1;
        self.subtable_number = 0;
        self.command = command.map(str::to_string);
    }

    /// Lay out `table` on every active driver.
    ///
    /// Driver failures never propagate: the failing driver is disabled and
    /// the error recorded in the report.
    pub fn submit(&mut self, table: &Table) -> SubmitReport {
        if self.table_number == 0 {
            self.new_series(None);
        }
        self.subtable_number += 1;

        let caption = (!table.flags().contains(TableFlags::NO_TITLE)).then(|| {
            caption(
                self.table_number,
                self.subtable_number,
                0,
                0,
                self.command.as_deref(),
                table.title(),
            )
        });
        let context = SubmitContext {
            table_number: self.table_number,
            subtable_number: self.subtable_number,
            command: self.command.clone(),
            caption,
        };

        let mut report = SubmitReport {
            table_number: self.table_number,
            subtable_number: self.subtable_number,
            drivers: Vec::with_capacity(self.slots.len()),
        };
        for slot in &mut self.slots {
            let mut outcome = DriverReport::new(slot.driver.name());
            if slot.disabled || slot.closed {
                outcome.skipped = true;
                report.drivers.push(outcome);
                continue;
            }

            let layout = Layout {
                driver: slot.driver.as_mut(),
                table,
                context: &context,
                hits: &mut slot.hits,
                report: &mut outcome,
            };
            if let Err(err) = layout.run() {
                let recoverable = err.is_recoverable();
                if recoverable {
                    tracing::warn!(
                        driver = %slot.driver.name(),
                        table = context.table_number,
                        subtable = context.subtable_number,
                        error = %err,
                        "output failed, disabling driver"
                    );
                } else {
                    tracing::error!(
                        driver = %slot.driver.name(),
                        table = context.table_number,
                        subtable = context.subtable_number,
                        error = %err,
                        "driver fault, disabling driver"
                    );
                }
                slot.disabled = true;
                outcome.disabled = true;
                outcome.recoverable = recoverable;
                outcome.error = Some(err.to_string());
            }
            report.drivers.push(outcome);
        }
        report
    }

    pub fn driver_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_disabled(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|slot| slot.disabled)
    }

    pub fn driver(&self, index: usize) -> Option<&dyn OutputDriver> {
        self.slots.get(index).map(|slot| slot.driver.as_ref())
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Close every driver and release their classes. Returns the first
    /// close error; every driver is closed regardless.
    pub fn finish(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.finished = true;
        let mut first_error = None;
        for slot in &mut self.slots {
            if slot.closed {
                continue;
            }
            slot.closed = true;
            let page = match slot.driver.state() {
                DriverState::PageOpen => slot.driver.close_page(),
                _ => Ok(()),
            };
            let closed = match slot.driver.state() {
                DriverState::Closed => Ok(()),
                _ => slot.driver.close(),
            };
            if let Err(err) = page.and(closed) {
                tracing::warn!(driver = %slot.driver.name(), error = %err, "driver close failed");
                first_error.get_or_insert(err);
            }
        }
        self.slots.clear();
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for LayoutEngine {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captions_number_segments() {
        assert_eq!(caption(1, 1, 0, 0, None, None), "1.1.");
        assert_eq!(caption(2, 3, 0, 4, None, Some("x")), "2.3.  x");
        assert_eq!(caption(1, 1, 2, 0, Some("LIST"), Some("Cases")), "1.1(2) LIST.  Cases");
        assert_eq!(caption(1, 1, 2, 3, None, None), "1.1(2:3).");
    }

    #[test]
    fn numbering_restarts_with_each_series() {
        let mut engine = LayoutEngine::new();
        let table = Table::paragraph("hello");
        let first = engine.submit(&table);
        assert_eq!((first.table_number, first.subtable_number), (1, 1));
        let second = engine.submit(&table);
        assert_eq!((second.table_number, second.subtable_number), (1, 2));
        engine.new_series(Some("DESCRIPTIVES"));
        let third = engine.submit(&table);
        assert_eq!((third.table_number, third.subtable_number), (2, 1));
        assert!(third.drivers.is_empty());
    }
}
