//! crates/logging/src/entry.rs
//! A log message together with the context captured when it was submitted.

use std::fmt;
use std::panic::Location;

use bitset::FlagMask;
use logging_sink::Severity;

/// An immutable log message.
///
/// The trace block is captured at submission time, so an entry replayed much
/// later still points at the code that logged it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    message: String,
    flags: FlagMask,
    severity: Severity,
    trace: Option<String>,
    location: Option<&'static Location<'static>>,
}

impl LogEntry {
    /// Creates an entry without trace or call-site information.
    #[must_use]
    pub fn new(message: impl Into<String>, flags: FlagMask, severity: Severity) -> Self {
        Self {
            message: message.into(),
            flags,
            severity,
            trace: None,
            location: None,
        }
    }

    /// Attaches a formatted trace block.
    #[must_use]
    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace;
        self
    }

    /// Attaches the call site that submitted the entry.
    #[must_use]
    pub fn with_location(mut self, location: Option<&'static Location<'static>>) -> Self {
        self.location = location;
        self
    }

    /// The message text as logged.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The flags the message was tagged with.
    #[must_use]
    pub const fn flags(&self) -> FlagMask {
        self.flags
    }

    /// The message severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// The formatted trace block, if one was captured.
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// The submitting call site, when known.
    #[must_use]
    pub const fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    /// Message followed by the trace block; this is what sinks receive.
    #[must_use]
    pub fn rendered(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(trace) = &self.trace {
            f.write_str(trace)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_appends_trace() {
        let entry = LogEntry::new("hit", FlagMask::new(1), Severity::Info)
            .with_trace(Some("\nflaglog::log_info (message)".into()));
        assert_eq!(entry.rendered(), "hit\nflaglog::log_info (message)");
        assert_eq!(entry.message(), "hit");
    }

    #[test]
    fn rendered_without_trace_is_message() {
        let entry = LogEntry::new("plain", FlagMask::NONE, Severity::Error);
        assert_eq!(entry.rendered(), "plain");
        assert!(entry.trace().is_none());
        assert!(entry.location().is_none());
    }

    #[test]
    fn location_is_kept() {
        let here = Location::caller();
        let entry = LogEntry::new("x", FlagMask::NONE, Severity::Info).with_location(Some(here));
        assert_eq!(entry.location().map(Location::file), Some(file!()));
    }
}
