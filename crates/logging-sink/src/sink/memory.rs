use super::Sink;
use crate::Severity;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A message captured by [`MemorySink`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// Severity the message was written with.
    pub severity: Severity,
    /// Message text as received by the sink.
    pub message: String,
}

/// Sink that keeps every message in memory, in write order.
///
/// Useful for hosts that render logs themselves and for tests that assert on
/// what the engine emitted and when.
///
/// # Examples
///
/// ```
/// use logging_sink::{MemorySink, Severity, Sink};
///
/// let sink = MemorySink::new();
/// sink.write("ready", Severity::Info);
///
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.take()[0].message, "ready");
/// assert!(sink.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of every record written so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        self.records().clone()
    }

    /// Returns the text of every record written so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records().iter().map(|r| r.message.clone()).collect()
    }

    /// Removes and returns every record written so far.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records())
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Reports whether no record is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Counts records whose text starts with `prefix`.
    #[must_use]
    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.message.starts_with(prefix))
            .count()
    }
}

impl Sink for MemorySink {
    fn write(&self, message: &str, severity: Severity) {
        self.records().push(Record {
            severity,
            message: message.to_owned(),
        });
    }
}
