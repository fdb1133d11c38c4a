//! crates/stacktrace/src/backtrace_source.rs
//! Native call-stack capture through the `backtrace` crate.

use crate::source::{Policies, TracePolicy, TraceSource};
use backtrace::Backtrace;
use logging_sink::Severity;
use std::fmt::Write as _;

const CAPTURE_FRAME: &str = "capture_raw_trace";

/// Captures the native call stack of the logging thread.
///
/// Every resolved symbol becomes one line, `name (at file:line)` when debug
/// info provides a location and `name` otherwise. Frames belonging to the
/// unwinder are removed so the first line is always this type's own capture
/// frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct BacktraceSource {
    policies: Policies,
}

impl BacktraceSource {
    /// Creates a source with [`TracePolicy::Full`] for every severity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capture policy for every severity.
    #[must_use]
    pub const fn with_policy(mut self, policy: TracePolicy) -> Self {
        self.policies = Policies::uniform(policy);
        self
    }

    /// Sets the capture policy for one severity.
    #[must_use]
    pub fn with_policy_for(mut self, severity: Severity, policy: TracePolicy) -> Self {
        self.policies = self.policies.with(severity, policy);
        self
    }

    /// The configured policies.
    #[must_use]
    pub const fn policies(&self) -> Policies {
        self.policies
    }
}

impl TraceSource for BacktraceSource {
    #[inline(never)]
    fn capture_raw_trace(&self) -> String {
        render(&Backtrace::new())
    }

    fn policy_for(&self, severity: Severity) -> TracePolicy {
        self.policies.get(severity)
    }
}

fn render(backtrace: &Backtrace) -> String {
    let mut lines = Vec::new();
    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            let mut line = symbol
                .name()
                .map_or_else(|| String::from("<unknown>"), |name| format!("{name:#}"));
            if let (Some(file), Some(lineno)) = (symbol.filename(), symbol.lineno()) {
                let _ = write!(line, " (at {}:{lineno})", file.display());
            }
            lines.push(line);
        }
    }

    // Without symbols the capture frame cannot be found; keep a placeholder so
    // the formatter's first-line strip never eats a caller frame.
    match lines.iter().position(|line| line.contains(CAPTURE_FRAME)) {
        Some(own) => lines.drain(..own).for_each(drop),
        None => lines.insert(0, String::from(CAPTURE_FRAME)),
    }
    lines.join("\n")
}
