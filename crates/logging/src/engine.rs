//! crates/logging/src/engine.rs
//! Flag-filtered emission and deferred replay.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bitset::FlagMask;
use logging_sink::{Severity, Sink};
use stacktrace::{BacktraceSource, TraceFormatter, TraceSource};

use crate::cache::{EntryId, FlagCache};
use crate::entry::LogEntry;
use crate::observer::{Settings, Subscription};
use crate::settings::LogSettings;

/// Tracing target for engine diagnostics.
pub const ENGINE_TARGET: &str = "flaglog::engine";

/// Source file of the engine, hidden from traces when self-suppression is on.
pub const ENGINE_SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/engine.rs");

/// What happened to a submitted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Written to the sink right away.
    Emitted,
    /// Cached until one of its flags becomes active.
    Deferred(EntryId),
}

struct EngineState {
    /// Active flags as of the last processed change; new activations are
    /// diffed against this.
    active: FlagMask,
    cache: FlagCache,
}

/// The flag-filtering log engine.
///
/// A message whose flags are 0 or intersect the active set is written to the
/// sink immediately. Any other message is cached under each of its flags,
/// together with the trace captured at the call. When a change activates new
/// flags and replay is enabled, every cached message under those flags is
/// written once, in submission order.
///
/// Sink writes always happen after the engine lock is released, so a sink may
/// log through the same engine.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bitset::FlagMask;
/// use logging::{LogEngine, LogSettings, Submission};
/// use logging_sink::{MemorySink, Severity};
/// use stacktrace::{StaticTrace, TracePolicy};
///
/// let sink = Arc::new(MemorySink::new());
/// let engine = LogEngine::new(Arc::clone(&sink), &LogSettings::new().with_replay_on_activate(true))
///     .with_trace_source(StaticTrace::new("").with_policy(TracePolicy::None));
///
/// let network = FlagMask::new(1);
/// assert!(matches!(engine.log_info("queued", network), Submission::Deferred(_)));
/// assert_eq!(engine.log_info("always", FlagMask::NONE), Submission::Emitted);
/// assert_eq!(sink.messages(), ["always"]);
///
/// engine.on_config_changed(&LogSettings::new().with_active_flags(network).with_replay_on_activate(true));
/// assert_eq!(sink.messages(), ["always", "queued"]);
/// ```
pub struct LogEngine {
    state: Mutex<EngineState>,
    suppress_self: AtomicBool,
    sink: Box<dyn Sink>,
    trace_source: Box<dyn TraceSource>,
    formatter: TraceFormatter,
    subscription: Mutex<Option<Subscription>>,
}

impl LogEngine {
    /// Creates an engine writing to `sink`, initialised from `settings`.
    ///
    /// Traces are captured with [`BacktraceSource`]. The engine's own
    /// sources, the capture machinery's sources and the `tracing` dispatch
    /// path used by [`FlagLayer`](crate::FlagLayer) are registered as self
    /// frames.
    #[must_use]
    pub fn new<S>(sink: S, settings: &LogSettings) -> Self
    where
        S: Sink + 'static,
    {
        Self {
            state: Mutex::new(EngineState {
                active: settings.active_flags,
                cache: FlagCache::with_capacity(settings.cache_capacity),
            }),
            suppress_self: AtomicBool::new(settings.suppress_self_in_trace),
            sink: Box::new(sink),
            trace_source: Box::new(BacktraceSource::new()),
            formatter: default_formatter(),
            subscription: Mutex::new(None),
        }
    }

    /// Replaces the trace capture primitive.
    #[must_use]
    pub fn with_trace_source<T>(mut self, source: T) -> Self
    where
        T: TraceSource + 'static,
    {
        self.trace_source = Box::new(source);
        self
    }

    /// Replaces the trace formatter. The engine's own frames are added to
    /// its self sources and symbols.
    #[must_use]
    pub fn with_formatter(mut self, formatter: TraceFormatter) -> Self {
        self.formatter = register_self_frames(formatter);
        self
    }

    /// Adds a file whose frames are hidden when self-suppression is on.
    #[must_use]
    pub fn with_self_source(mut self, path: impl Into<String>) -> Self {
        self.formatter = self.formatter.with_self_source(path);
        self
    }

    /// Creates an engine and attaches it to `settings` in one step.
    #[must_use]
    pub fn attached<S>(sink: S, settings: &Arc<Settings>) -> Arc<Self>
    where
        S: Sink + 'static,
    {
        let engine = Arc::new(Self::new(sink, &settings.snapshot()));
        engine.attach(settings);
        engine
    }

    /// Subscribes to `settings` so every change reaches
    /// [`on_config_changed`](Self::on_config_changed).
    ///
    /// The current settings are applied immediately. Attaching again replaces
    /// the previous subscription.
    pub fn attach(self: &Arc<Self>, settings: &Arc<Settings>) {
        let engine = Arc::downgrade(self);
        let source = Arc::downgrade(settings);
        // Read the live settings rather than the notified snapshot so
        // out-of-order notifications still converge on the latest state.
        let subscription = settings.subscribe(move |_| {
            if let (Some(engine), Some(settings)) = (engine.upgrade(), source.upgrade()) {
                engine.on_config_changed(&settings.snapshot());
            }
        });
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        self.on_config_changed(&settings.snapshot());
        tracing::debug!(target: ENGINE_TARGET, "attached to settings");
    }

    /// Drops the settings subscription. Returns `false` when not attached.
    pub fn detach(&self) -> bool {
        let detached = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if detached {
            tracing::debug!(target: ENGINE_TARGET, "detached from settings");
        }
        detached
    }

    /// Reports whether the engine is subscribed to a [`Settings`].
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Submits a message.
    ///
    /// Flags `0` mean unconditional: the message is emitted and never cached.
    #[track_caller]
    pub fn submit(
        &self,
        message: impl Into<String>,
        flags: FlagMask,
        severity: Severity,
    ) -> Submission {
        self.submit_at(message.into(), flags, severity, Some(Location::caller()))
    }

    /// Submits an informational message.
    #[track_caller]
    pub fn log_info(&self, message: impl Into<String>, flags: FlagMask) -> Submission {
        self.submit(message, flags, Severity::Info)
    }

    /// Submits a warning.
    #[track_caller]
    pub fn log_warning(&self, message: impl Into<String>, flags: FlagMask) -> Submission {
        self.submit(message, flags, Severity::Warning)
    }

    /// Submits an error.
    #[track_caller]
    pub fn log_error(&self, message: impl Into<String>, flags: FlagMask) -> Submission {
        self.submit(message, flags, Severity::Error)
    }

    pub(crate) fn submit_at(
        &self,
        message: String,
        flags: FlagMask,
        severity: Severity,
        location: Option<&'static Location<'static>>,
    ) -> Submission {
        // Captured before locking: both outcomes need the trace.
        let suppress_self = self.suppress_self.load(Ordering::Relaxed);
        let trace = self
            .formatter
            .capture(severity, &*self.trace_source, suppress_self);
        let entry = LogEntry::new(message, flags, severity)
            .with_trace(trace)
            .with_location(location);

        let mut state = self.lock_state();
        if flags.is_empty() || state.active.contains_any(flags) {
            drop(state);
            self.sink.write(&entry.rendered(), severity);
            return Submission::Emitted;
        }

        let inserted = state.cache.insert(entry);
        let pending = state.cache.len();
        drop(state);

        tracing::trace!(
            target: ENGINE_TARGET,
            id = inserted.id.get(),
            %flags,
            pending,
            "deferred log entry"
        );
        if let Some(evicted) = inserted.evicted {
            report_eviction(&evicted);
        }
        Submission::Deferred(inserted.id)
    }

    /// Applies a configuration change and returns how many entries were replayed.
    ///
    /// Newly activated flags are those set in `settings` but not in the
    /// previously applied set. With replay disabled the new set is recorded
    /// and the cache is left untouched.
    pub fn on_config_changed(&self, settings: &LogSettings) -> usize {
        self.suppress_self
            .store(settings.suppress_self_in_trace, Ordering::Relaxed);

        let mut state = self.lock_state();
        let current = settings.active_flags;
        let added = current - state.active;
        state.active = current;
        let evicted = state.cache.set_capacity(settings.cache_capacity);
        let replay = if settings.replay_on_activate && !added.is_empty() {
            state.cache.flush_many(added)
        } else {
            Vec::new()
        };
        let pending = state.cache.len();
        drop(state);

        for entry in &evicted {
            report_eviction(entry);
        }
        for entry in &replay {
            self.sink.write(&entry.rendered(), entry.severity());
        }
        if !added.is_empty() {
            tracing::debug!(
                target: ENGINE_TARGET,
                active = %current,
                %added,
                replayed = replay.len(),
                pending,
                "applied logging settings"
            );
        }
        replay.len()
    }

    /// Flags active as of the last processed change.
    #[must_use]
    pub fn active_flags(&self) -> FlagMask {
        self.lock_state().active
    }

    /// Number of cached entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock_state().cache.len()
    }

    /// Number of cached entries registered under the single-bit `flag`.
    #[must_use]
    pub fn pending_for(&self, flag: FlagMask) -> usize {
        self.lock_state().cache.pending_for(flag)
    }

    /// Reports whether a cache bucket exists for `flag`.
    #[must_use]
    pub fn has_bucket(&self, flag: FlagMask) -> bool {
        self.lock_state().cache.has_bucket(flag)
    }

    /// Reports whether the entry behind `id` is still cached.
    #[must_use]
    pub fn is_pending(&self, id: EntryId) -> bool {
        self.lock_state().cache.contains(id)
    }

    /// Copies of the cached entries in submission order.
    #[must_use]
    pub fn pending_entries(&self) -> Vec<LogEntry> {
        self.lock_state()
            .cache
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Drops every cached entry without emitting it.
    pub fn discard_pending(&self) -> usize {
        self.lock_state().cache.clear()
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for LogEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("LogEngine")
            .field("active", &state.active)
            .field("pending", &state.cache.len())
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

fn register_self_frames(formatter: TraceFormatter) -> TraceFormatter {
    formatter
        .with_self_sources(crate::SOURCES.iter().chain(stacktrace::SOURCES).copied())
        .with_self_symbols(crate::bridge::DISPATCH_SYMBOLS.iter().copied())
}

fn default_formatter() -> TraceFormatter {
    register_self_frames(TraceFormatter::new())
}

fn report_eviction(entry: &LogEntry) {
    tracing::warn!(
        target: ENGINE_TARGET,
        flags = %entry.flags(),
        severity = %entry.severity(),
        "cache capacity reached; dropped oldest deferred log entry"
    );
}
