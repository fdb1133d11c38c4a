//! crates/stacktrace/src/source.rs
//! Trace capture policies and the [`TraceSource`] contract.

use logging_sink::Severity;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How much call-site trace to attach to messages of a given severity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum TracePolicy {
    /// Attach nothing; the trace is not even captured.
    None,
    /// Keep only frames that carry a source location.
    ScriptOnly,
    /// Keep every frame, passing unlocated frames through unchanged.
    #[default]
    Full,
}

impl TracePolicy {
    /// Reports whether a trace should be captured at all.
    #[must_use]
    pub const fn captures(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The stack-capture primitive.
///
/// `capture_raw_trace` returns newline-delimited frames, innermost first. The
/// first line is the capture primitive's own frame and is discarded by the
/// formatter. Frames with a known source location carry an
/// `(at <file>:<line>)` token.
pub trait TraceSource: Send + Sync {
    /// Captures the current call stack.
    fn capture_raw_trace(&self) -> String;

    /// Returns the capture policy for messages of `severity`.
    fn policy_for(&self, severity: Severity) -> TracePolicy;
}

impl<T> TraceSource for &T
where
    T: TraceSource + ?Sized,
{
    fn capture_raw_trace(&self) -> String {
        (**self).capture_raw_trace()
    }

    fn policy_for(&self, severity: Severity) -> TracePolicy {
        (**self).policy_for(severity)
    }
}

impl<T> TraceSource for Box<T>
where
    T: TraceSource + ?Sized,
{
    fn capture_raw_trace(&self) -> String {
        (**self).capture_raw_trace()
    }

    fn policy_for(&self, severity: Severity) -> TracePolicy {
        (**self).policy_for(severity)
    }
}

impl<T> TraceSource for Arc<T>
where
    T: TraceSource + ?Sized,
{
    fn capture_raw_trace(&self) -> String {
        (**self).capture_raw_trace()
    }

    fn policy_for(&self, severity: Severity) -> TracePolicy {
        (**self).policy_for(severity)
    }
}

/// Per-severity capture policies, indexed by [`Severity::index`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Policies([TracePolicy; 3]);

impl Policies {
    /// Uses `policy` for every severity.
    #[must_use]
    pub const fn uniform(policy: TracePolicy) -> Self {
        Self([policy; 3])
    }

    /// Returns the policy for `severity`.
    #[must_use]
    pub const fn get(&self, severity: Severity) -> TracePolicy {
        self.0[severity.index()]
    }

    /// Overrides the policy for `severity`.
    #[must_use]
    pub fn with(mut self, severity: Severity, policy: TracePolicy) -> Self {
        self.0[severity.index()] = policy;
        self
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self::uniform(TracePolicy::Full)
    }
}

/// A trace source that replays a fixed raw trace.
///
/// Hosts that capture stacks themselves (an embedding runtime, a scripting
/// layer) hand the text over through this type; tests use it to make trace
/// output deterministic. Every capture is counted.
///
/// # Examples
///
/// ```
/// use logging_sink::Severity;
/// use stacktrace::{StaticTrace, TracePolicy, TraceSource};
///
/// let source = StaticTrace::new("capture\nmain (at src/main.rs:4)");
/// assert_eq!(source.policy_for(Severity::Info), TracePolicy::Full);
/// assert!(source.capture_raw_trace().starts_with("capture"));
/// assert_eq!(source.captures(), 1);
/// ```
#[derive(Debug, Default)]
pub struct StaticTrace {
    raw: String,
    policies: Policies,
    captures: AtomicUsize,
}

impl StaticTrace {
    /// Creates a source that always returns `raw`.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            policies: Policies::default(),
            captures: AtomicUsize::new(0),
        }
    }

    /// Sets the capture policy for every severity.
    #[must_use]
    pub fn with_policy(mut self, policy: TracePolicy) -> Self {
        self.policies = Policies::uniform(policy);
        self
    }

    /// Sets the capture policy for one severity.
    #[must_use]
    pub fn with_policy_for(mut self, severity: Severity, policy: TracePolicy) -> Self {
        self.policies = self.policies.with(severity, policy);
        self
    }

    /// Number of times the trace has been captured.
    #[must_use]
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::Relaxed)
    }
}

impl TraceSource for StaticTrace {
    fn capture_raw_trace(&self) -> String {
        self.captures.fetch_add(1, Ordering::Relaxed);
        self.raw.clone()
    }

    fn policy_for(&self, severity: Severity) -> TracePolicy {
        self.policies.get(severity)
    }
}
