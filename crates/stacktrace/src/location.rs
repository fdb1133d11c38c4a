//! crates/stacktrace/src/location.rs
//! Parsing of `(at <file>:<line>)` location tokens in raw trace lines.

use std::ops::Range;

const TOKEN_OPEN: &str = "(at ";

/// A source location found inside a trace line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameLocation<'a> {
    /// Byte range of `<file>:<line>` inside the trace line.
    pub span: Range<usize>,
    /// The file part of the token.
    pub file: &'a str,
    /// The line part of the token.
    pub line: u32,
}

impl FrameLocation<'_> {
    /// The `<file>:<line>` text the span covers.
    #[must_use]
    pub fn link_text<'l>(&self, trace_line: &'l str) -> &'l str {
        &trace_line[self.span.clone()]
    }
}

/// Locates the `(at <file>:<line>)` token of a raw trace line.
///
/// The token starts at the first `(at ` and ends at the last `)` of the line.
/// The line number is everything after the last `:` inside the token, so paths
/// that contain a drive letter (`C:/src/app.rs:12`) still split correctly.
/// Returns `None` when the line has no token, the token is empty, or the line
/// number is not a decimal integer.
///
/// # Examples
///
/// ```
/// use stacktrace::parse_location;
///
/// let line = "app::run (at src/app.rs:42)";
/// let location = parse_location(line).unwrap();
/// assert_eq!(location.file, "src/app.rs");
/// assert_eq!(location.line, 42);
/// assert_eq!(location.link_text(line), "src/app.rs:42");
///
/// assert!(parse_location("app::run").is_none());
/// assert!(parse_location("app::run (at src/app.rs)").is_none());
/// ```
#[must_use]
pub fn parse_location(trace_line: &str) -> Option<FrameLocation<'_>> {
    let open = trace_line.find(TOKEN_OPEN)?;
    let close = trace_line.rfind(')')?;
    let start = open + TOKEN_OPEN.len();
    if close <= start {
        return None;
    }

    let link = &trace_line[start..close];
    let colon = link.rfind(':')?;
    let file = &link[..colon];
    let line_text = &link[colon + 1..];
    if file.is_empty() || line_text.is_empty() || !line_text.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let line = line_text.parse().ok()?;

    Some(FrameLocation {
        span: start..close,
        file,
        line,
    })
}
