#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/stacktrace/src/lib.rs
//!
//! # Overview
//!
//! `stacktrace` captures the call site of a log message and turns it into a
//! readable trace block. Deferred messages may be replayed long after they
//! were logged, so the block is captured at submission time and travels with
//! the cached entry.
//!
//! # Design
//!
//! - [`TraceSource`] is the capture primitive. It returns newline-delimited
//!   frames whose first line is its own frame, and it decides per
//!   [`Severity`](logging_sink::Severity) how much trace to keep through a
//!   [`TracePolicy`].
//! - [`BacktraceSource`] captures native frames with the `backtrace` crate;
//!   [`StaticTrace`] replays host-provided text.
//! - [`TraceFormatter`] strips the capture frame, rewrites `(at file:line)`
//!   tokens with [`parse_location`], and optionally hides the logging engine's
//!   own frames.
//!
//! # Invariants
//!
//! - Under [`TracePolicy::None`] the source is never asked to capture.
//! - The first raw line is never part of the formatted block.
//!
//! # Examples
//!
//! ```
//! use logging_sink::Severity;
//! use stacktrace::{StaticTrace, TraceFormatter};
//!
//! let source = StaticTrace::new("capture\nworld::spawn (at src/world.rs:30)");
//! let decorated = TraceFormatter::new().decorate("spawned", Severity::Info, &source, false);
//! assert!(decorated.starts_with("spawned\nflaglog::log_info (message)\n"));
//! assert!(decorated.contains(">src/world.rs:30</a>"));
//! ```

mod backtrace_source;
mod formatter;
mod location;
mod source;

pub use backtrace_source::BacktraceSource;
pub use formatter::{LinkStyle, RAW_TRACE_MARKER, TraceFormatter};
pub use location::{FrameLocation, parse_location};
pub use source::{Policies, StaticTrace, TracePolicy, TraceSource};

/// Absolute paths of this crate's sources that can appear in a captured
/// trace. A logging engine registers them as self sources so the capture
/// machinery never shows up in its own output.
pub const SOURCES: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/src/backtrace_source.rs"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/src/formatter.rs"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/src/source.rs"),
];
