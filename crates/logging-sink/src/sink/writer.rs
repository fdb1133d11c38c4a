use super::{SINK_TARGET, Sink};
use crate::{LineMode, Severity};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Sink that renders messages into an [`io::Write`] target.
///
/// Each message is rendered as `"{severity}: {message}"`, followed by a newline
/// when the configured [`LineMode`] asks for one. The writer sits behind a
/// mutex so concurrent writes never interleave within a message.
///
/// I/O failures cannot travel back to the logging call, so
/// [`Sink::write`] reports them through `tracing` and drops the message. Use
/// [`try_write`](Self::try_write) to observe the error directly.
///
/// # Examples
///
/// ```
/// use logging_sink::{LineMode, Severity, Sink, WriterSink};
///
/// let sink = WriterSink::new(Vec::new());
/// sink.write("vanished", Severity::Warning);
/// sink.write("partial", Severity::Error);
///
/// let output = String::from_utf8(sink.into_inner()).unwrap();
/// assert_eq!(output, "warning: vanished\nerror: partial\n");
///
/// let sink = WriterSink::with_line_mode(Vec::new(), LineMode::WithoutNewline);
/// sink.write("ready", Severity::Info);
/// assert_eq!(sink.into_inner(), b"info: ready".to_vec());
/// ```
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
    line_mode: LineMode,
    show_severity: bool,
}

impl<W> WriterSink<W> {
    /// Creates a sink that appends a newline after each rendered message.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_line_mode(writer, LineMode::WithNewline)
    }

    /// Creates a sink with the provided [`LineMode`].
    #[must_use]
    pub fn with_line_mode(writer: W, line_mode: LineMode) -> Self {
        Self {
            writer: Mutex::new(writer),
            line_mode,
            show_severity: true,
        }
    }

    /// Disables the severity prefix, writing messages verbatim.
    #[must_use]
    pub fn without_severity(mut self) -> Self {
        self.show_severity = false;
        self
    }

    /// Returns the current [`LineMode`].
    #[must_use]
    pub const fn line_mode(&self) -> LineMode {
        self.line_mode
    }

    /// Updates the [`LineMode`] used for subsequent writes.
    pub fn set_line_mode(&mut self, line_mode: LineMode) {
        self.line_mode = line_mode;
    }

    /// Consumes the sink and returns the wrapped writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> WriterSink<W>
where
    W: Write,
{
    /// Writes a single message, surfacing I/O errors to the caller.
    pub fn try_write(&self, message: &str, severity: Severity) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.show_severity {
            writer.write_all(severity.prefix().as_bytes())?;
        }
        writer.write_all(message.as_bytes())?;
        if self.line_mode.append_newline() {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&self) -> io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

impl<W> Sink for WriterSink<W>
where
    W: Write + Send,
{
    fn write(&self, message: &str, severity: Severity) {
        if let Err(error) = self.try_write(message, severity) {
            tracing::error!(
                target: SINK_TARGET,
                %error,
                %severity,
                "failed to write log message"
            );
        }
    }
}

impl WriterSink<io::Stderr> {
    /// Creates a sink writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl WriterSink<io::Stdout> {
    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_appends_newlines_by_default() {
        let sink = WriterSink::new(Vec::new());
        sink.write("vanished", Severity::Warning);
        sink.write("partial", Severity::Error);

        let output = String::from_utf8(sink.into_inner()).expect("utf-8");
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("warning: vanished"));
        assert_eq!(lines.next(), Some("error: partial"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn sink_without_newline_preserves_output() {
        let sink = WriterSink::with_line_mode(Vec::new(), LineMode::WithoutNewline);
        sink.write("ready", Severity::Info);
        assert_eq!(sink.into_inner(), b"info: ready".to_vec());
    }

    #[test]
    fn without_severity_writes_verbatim() {
        let sink = WriterSink::new(Vec::new()).without_severity();
        sink.write("plain", Severity::Error);
        assert_eq!(sink.into_inner(), b"plain\n".to_vec());
    }

    #[test]
    fn multi_line_messages_are_written_whole() {
        let sink = WriterSink::new(Vec::new());
        sink.write("head\nframe one\nframe two", Severity::Info);
        let output = String::from_utf8(sink.into_inner()).expect("utf-8");
        assert_eq!(output, "info: head\nframe one\nframe two\n");
    }

    #[test]
    fn set_line_mode_applies_to_later_writes() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write("first", Severity::Info);
        sink.set_line_mode(LineMode::WithoutNewline);
        assert_eq!(sink.line_mode(), LineMode::WithoutNewline);
        sink.write("second", Severity::Info);
        assert_eq!(sink.into_inner(), b"info: first\ninfo: second".to_vec());
    }

    #[test]
    fn try_write_surfaces_io_errors() {
        let sink = WriterSink::new(FailingWriter);
        let err = sink.try_write("lost", Severity::Info).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        // The infallible path swallows the same failure.
        sink.write("lost", Severity::Info);
    }
}
