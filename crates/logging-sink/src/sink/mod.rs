//! crates/logging-sink/src/sink/mod.rs
//! The [`Sink`] contract and its blanket implementations.

mod memory;
mod tracing_sink;
mod writer;

pub use memory::{MemorySink, Record};
pub use tracing_sink::{SINK_TARGET, TracingSink};
pub use writer::WriterSink;

use crate::Severity;
use std::sync::Arc;

/// Destination for emitted log messages.
///
/// A sink receives fully decorated messages (text plus any formatted trace)
/// together with their severity. Writes are synchronous and infallible from
/// the caller's point of view: a sink that can fail reports the failure
/// through its own channel rather than to the logging call.
///
/// Sinks are shared between the thread that submits a message and the thread
/// that applies a configuration change and replays cached messages, hence the
/// `Send + Sync` bound.
pub trait Sink: Send + Sync {
    /// Writes one message.
    fn write(&self, message: &str, severity: Severity);
}

impl<S> Sink for &S
where
    S: Sink + ?Sized,
{
    fn write(&self, message: &str, severity: Severity) {
        (**self).write(message, severity);
    }
}

impl<S> Sink for Box<S>
where
    S: Sink + ?Sized,
{
    fn write(&self, message: &str, severity: Severity) {
        (**self).write(message, severity);
    }
}

impl<S> Sink for Arc<S>
where
    S: Sink + ?Sized,
{
    fn write(&self, message: &str, severity: Severity) {
        (**self).write(message, severity);
    }
}

/// Sink that discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    #[inline]
    fn write(&self, _message: &str, _severity: Severity) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_sinks_forward_writes() {
        let memory = Arc::new(MemorySink::new());
        let boxed: Box<dyn Sink> = Box::new(Arc::clone(&memory));

        boxed.write("boxed", Severity::Info);
        (&*memory).write("borrowed", Severity::Error);

        assert_eq!(memory.messages(), vec!["boxed", "borrowed"]);
    }

    #[test]
    fn null_sink_accepts_anything() {
        NullSink.write("ignored", Severity::Warning);
    }
}
