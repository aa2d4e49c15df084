//! Byte sinks for rendered output.
//!
//! Every output driver writes through a [`Sink`]: an append-only byte stream
//! with an explicit `close`. The crate ships the sinks a report writer needs:
//!
//! - [`FileSink`]: a file, created lazily on the first write
//! - [`StdoutSink`]: the process standard output
//! - [`MemorySink`]: a shared in-memory buffer, handy for tests and previews
//! - [`CommandSink`]: the stdin of a shell command (`"|lpr"` style targets)
//!
//! [`open_target`] maps a configured output string onto one of them.
//!
//! ```rust
//! use folio_pipe::{MemorySink, Sink};
//!
//! let buffer = MemorySink::new();
//! let mut sink: Box<dyn Sink> = Box::new(buffer.clone());
//! sink.write(b"page one\n").unwrap();
//! sink.close().unwrap();
//! assert_eq!(buffer.contents(), "page one\n");
//! ```

pub mod shell;
pub mod sink;

pub use shell::CommandSink;
pub use sink::{open_target, FileSink, MemorySink, Sink, SinkError, StdoutSink};
