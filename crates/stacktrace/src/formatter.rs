//! crates/stacktrace/src/formatter.rs
//! Rendering raw traces into decorated, clickable, optionally filtered text.

use crate::location::{FrameLocation, parse_location};
use crate::source::{TracePolicy, TraceSource};
use logging_sink::Severity;

/// Separates the formatted trace from the raw trace echo.
pub const RAW_TRACE_MARKER: &str = "\n.\n.\n.\nOriginal stack trace:";

/// How a frame's `<file>:<line>` token is turned into a clickable reference.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LinkStyle {
    /// `<a href="file" line="n">file:n</a>`, understood by rich-text consoles.
    #[default]
    Markup,
    /// An OSC 8 terminal hyperlink pointing at `file://file#Ln`.
    Hyperlink,
}

/// Turns raw call stacks into the trace block appended to log messages.
///
/// The formatter drops the first raw line (the capture primitive's own frame),
/// rewrites every `(at <file>:<line>)` token as a clickable reference, and can
/// hide frames that originate from the logging engine itself. The block starts
/// with a header naming the public entry point for the message's severity, so
/// replayed messages read as if they had just been logged from their original
/// call site.
///
/// # Examples
///
/// ```
/// use logging_sink::Severity;
/// use stacktrace::{TraceFormatter, TracePolicy};
///
/// let raw = "capture\n\
///            app::tick (at src/app.rs:12)\n\
///            flaglog::log_info (at crates/logging/src/engine.rs:80)";
/// let formatter = TraceFormatter::new().with_self_source("crates/logging/src/engine.rs");
///
/// let block = formatter.format(Severity::Info, raw, true, TracePolicy::ScriptOnly);
/// assert_eq!(
///     block,
///     "\nflaglog::log_info (message)\n\
///      app::tick (at <a href=\"src/app.rs\" line=\"12\">src/app.rs:12</a>)"
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct TraceFormatter {
    self_sources: Vec<String>,
    self_symbols: Vec<String>,
    link_style: LinkStyle,
    echo_raw: bool,
}

impl TraceFormatter {
    /// Creates a formatter with markup links and no self frames or raw echo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source file whose frames are hidden when self-suppression is on.
    ///
    /// A frame matches when its file equals `path` or ends with it at a `/`
    /// boundary, so `crates/logging/src/engine.rs` matches an absolute path
    /// ending in that relative path but `src/lib.rs` does not match
    /// `mysrc/lib.rs`. Register absolute paths to match exactly one file.
    #[must_use]
    pub fn with_self_source(mut self, path: impl Into<String>) -> Self {
        self.self_sources.push(normalize_separators(&path.into()));
        self
    }

    /// Registers several self sources at once.
    #[must_use]
    pub fn with_self_sources<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.self_sources
            .extend(paths.into_iter().map(|p| normalize_separators(&p.into())));
        self
    }

    /// Registers a symbol path prefix whose frames are hidden when
    /// self-suppression is on.
    ///
    /// `tracing_core::` matches `tracing_core::event::Event::dispatch` as well
    /// as trait impl frames such as `<tracing_core::X as Y>::call`. Frames
    /// match whether or not they carry a location.
    #[must_use]
    pub fn with_self_symbol(mut self, prefix: impl Into<String>) -> Self {
        self.self_symbols.push(prefix.into());
        self
    }

    /// Registers several self symbol prefixes at once.
    #[must_use]
    pub fn with_self_symbols<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.self_symbols.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Selects how locations are rendered.
    #[must_use]
    pub fn with_link_style(mut self, link_style: LinkStyle) -> Self {
        self.link_style = link_style;
        self
    }

    /// Appends [`RAW_TRACE_MARKER`] and the untouched raw trace after the formatted block.
    #[must_use]
    pub fn with_raw_echo(mut self, echo_raw: bool) -> Self {
        self.echo_raw = echo_raw;
        self
    }

    /// Files treated as the logging engine's own sources.
    #[must_use]
    pub fn self_sources(&self) -> &[String] {
        &self.self_sources
    }

    /// Symbol prefixes treated as the logging engine's own frames.
    #[must_use]
    pub fn self_symbols(&self) -> &[String] {
        &self.self_symbols
    }

    /// The configured link style.
    #[must_use]
    pub const fn link_style(&self) -> LinkStyle {
        self.link_style
    }

    /// Reports whether `file` is one of the registered self sources.
    #[must_use]
    pub fn is_self_source(&self, file: &str) -> bool {
        let file = normalize_separators(file);
        self.self_sources.iter().any(|own| {
            file.strip_suffix(own.as_str())
                .is_some_and(|head| head.is_empty() || head.ends_with('/'))
        })
    }

    /// Reports whether the symbol of the raw frame `line` starts with one of
    /// the registered self symbol prefixes.
    #[must_use]
    pub fn is_self_symbol(&self, line: &str) -> bool {
        let symbol = line.split_once(" (at ").map_or(line, |(symbol, _)| symbol).trim();
        let inner = symbol.strip_prefix('<').unwrap_or(symbol);
        self.self_symbols
            .iter()
            .any(|prefix| inner.starts_with(prefix.as_str()))
    }

    /// Reports whether the raw frame `line` belongs to the logging engine.
    #[must_use]
    pub fn is_self_frame(&self, line: &str) -> bool {
        parse_location(line).is_some_and(|location| self.is_self_source(location.file))
            || self.is_self_symbol(line)
    }

    /// Formats `raw_trace` into a trace block.
    ///
    /// Frames without a location token pass through unchanged, unless the
    /// policy is [`TracePolicy::ScriptOnly`], which keeps located frames only.
    /// Under [`TracePolicy::None`] the block is empty.
    #[must_use]
    pub fn format(
        &self,
        severity: Severity,
        raw_trace: &str,
        suppress_self: bool,
        policy: TracePolicy,
    ) -> String {
        if !policy.captures() {
            return String::new();
        }

        let mut block = String::with_capacity(raw_trace.len() + 64);
        block.push('\n');
        block.push_str(severity.entry_point());
        block.push_str(" (message)");

        // A trace without a newline has no capture frame to strip.
        let frames = raw_trace
            .split_once('\n')
            .map_or(raw_trace, |(_, rest)| rest);

        for line in frames.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if suppress_self && self.is_self_symbol(line) {
                continue;
            }
            match parse_location(line) {
                Some(location) => {
                    if suppress_self && self.is_self_source(location.file) {
                        continue;
                    }
                    block.push('\n');
                    block.push_str(&line[..location.span.start]);
                    self.push_link(&mut block, line, &location);
                    block.push_str(&line[location.span.end..]);
                }
                None if policy == TracePolicy::ScriptOnly => {}
                None => {
                    block.push('\n');
                    block.push_str(line);
                }
            }
        }

        if self.echo_raw {
            block.push_str(RAW_TRACE_MARKER);
            block.push('\n');
            block.push_str(raw_trace.trim_end());
        }

        block
    }

    /// Captures and formats a trace for a message of `severity`.
    ///
    /// Returns `None` without touching `source`'s capture primitive when its
    /// policy for `severity` is [`TracePolicy::None`].
    pub fn capture<T>(&self, severity: Severity, source: &T, suppress_self: bool) -> Option<String>
    where
        T: TraceSource + ?Sized,
    {
        let policy = source.policy_for(severity);
        if !policy.captures() {
            return None;
        }
        let raw = source.capture_raw_trace();
        Some(self.format(severity, &raw, suppress_self, policy))
    }

    /// Returns `message` with the formatted trace appended.
    ///
    /// When tracing is disabled for `severity` the message comes back unchanged.
    pub fn decorate<T>(
        &self,
        message: &str,
        severity: Severity,
        source: &T,
        suppress_self: bool,
    ) -> String
    where
        T: TraceSource + ?Sized,
    {
        match self.capture(severity, source, suppress_self) {
            Some(trace) => {
                let mut decorated = String::with_capacity(message.len() + trace.len());
                decorated.push_str(message);
                decorated.push_str(&trace);
                decorated
            }
            None => message.to_owned(),
        }
    }

    fn push_link(&self, block: &mut String, line: &str, location: &FrameLocation<'_>) {
        let text = location.link_text(line);
        match self.link_style {
            LinkStyle::Markup => {
                block.push_str("<a href=\"");
                block.push_str(location.file);
                block.push_str("\" line=\"");
                block.push_str(&location.line.to_string());
                block.push_str("\">");
                block.push_str(text);
                block.push_str("</a>");
            }
            LinkStyle::Hyperlink => {
                block.push_str("\x1b]8;;file://");
                block.push_str(location.file);
                block.push_str("#L");
                block.push_str(&location.line.to_string());
                block.push_str("\x1b\\");
                block.push_str(text);
                block.push_str("\x1b]8;;\x1b\\");
            }
        }
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
