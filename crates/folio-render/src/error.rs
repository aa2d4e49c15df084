//! Error types for table construction, driver activation and rendering.
//!
//! Three classes of failure exist:
//!
//! - [`OutputError::Configuration`]: a driver's geometry or options are
//!   unusable. The driver is never opened.
//! - [`OutputError::Io`]: the sink could not be written. The layout engine
//!   disables the driver and keeps rendering to the others.
//! - Contract violations (drawing without an open page, joins outside the
//!   table) are programmer errors and panic.

use folio_pipe::SinkError;
use thiserror::Error;

/// Errors raised by output drivers.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Geometry or options that leave the driver unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] SinkError),

    /// A native format could not serialize a table.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The driver does not implement this operation.
    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },
}

impl OutputError {
    pub fn unsupported(driver: &'static str, operation: &'static str) -> Self {
        OutputError::Unsupported { driver, operation }
    }

    /// True for failures of the output channel, as opposed to a driver
    /// fault or a bad configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OutputError::Io(_))
    }
}

impl From<std::io::Error> for OutputError {
    fn from(err: std::io::Error) -> Self {
        OutputError::Io(SinkError::Io(err))
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(err: serde_json::Error) -> Self {
        OutputError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for OutputError {
    fn from(err: csv::Error) -> Self {
        OutputError::Serialization(err.to_string())
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for OutputError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        OutputError::Serialization(err.to_string())
    }
}

/// Errors raised while building a [`Table`](crate::table::Table).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// Tables need at least one row and one column.
    #[error("table dimensions must be at least 1x1, got {cols}x{rows}")]
    EmptyDimension { cols: usize, rows: usize },

    /// Header counts that would leave no room on an axis.
    #[error("{axis} headers {first}+{second} exceed the table extent {extent}")]
    Headers {
        axis: &'static str,
        first: usize,
        second: usize,
        extent: usize,
    },
}

/// Errors raised while loading or validating driver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("box override index {0} is outside 0..256")]
    BoxIndex(usize),

    #[error("box override {0} has an empty glyph")]
    EmptyGlyph(usize),

    #[error("{0}")]
    Invalid(String),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, OutputError>;
