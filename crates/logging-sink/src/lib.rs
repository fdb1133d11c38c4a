#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/logging-sink/src/lib.rs
//!
//! # Overview
//!
//! `logging-sink` defines where flag-filtered log messages end up. The logging
//! engine never prints anything itself: once it decides a message should be
//! emitted (immediately or on replay), it hands the decorated text and its
//! [`Severity`] to a [`Sink`].
//!
//! # Design
//!
//! - [`Sink`] is the whole contract: one synchronous, infallible `write`.
//! - [`WriterSink`] renders `"{severity}: {message}"` lines into any
//!   [`std::io::Write`] implementor, honouring a [`LineMode`].
//! - [`TracingSink`] forwards messages as `tracing` events so an existing
//!   subscriber stack can format and route them.
//! - [`MemorySink`] keeps messages in memory for hosts that render logs
//!   themselves and for tests.
//!
//! # Invariants
//!
//! - A sink receives each message exactly once per emission; it never sees the
//!   flag mask, only the severity.
//! - `LineMode::WithNewline` is the default and prints each message on its own
//!   line.
//!
//! # Examples
//!
//! ```
//! use logging_sink::{MemorySink, Severity, Sink};
//!
//! let sink = MemorySink::new();
//! sink.write("connected", Severity::Info);
//! sink.write("retrying", Severity::Warning);
//!
//! let records = sink.snapshot();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].severity, Severity::Warning);
//! ```

mod line_mode;
mod severity;
mod sink;

pub use line_mode::LineMode;
pub use severity::{ParseSeverityError, Severity};
pub use sink::{MemorySink, NullSink, Record, SINK_TARGET, Sink, TracingSink, WriterSink};
