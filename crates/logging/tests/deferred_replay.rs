//! Integration tests for flag filtering and deferred replay.
//!
//! Every scenario drives the engine through live `Settings`, the way a host
//! toggles flags at runtime.

use std::sync::Arc;

use logging::{FlagMask, FlagRegistry, LogEngine, LogSettings, Settings, Submission};
use logging_sink::{MemorySink, Severity, Sink};
use stacktrace::{StaticTrace, TracePolicy};

const A: FlagMask = FlagMask::new(1);
const B: FlagMask = FlagMask::new(2);

struct Fixture {
    settings: Arc<Settings>,
    engine: Arc<LogEngine>,
    sink: Arc<MemorySink>,
}

fn fixture(initial: LogSettings) -> Fixture {
    let registry = FlagRegistry::from_names(["a", "b"]).unwrap();
    let settings = Arc::new(Settings::new(initial.clone(), registry));
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(
        LogEngine::new(Arc::clone(&sink), &initial)
            .with_trace_source(StaticTrace::new("").with_policy(TracePolicy::None)),
    );
    engine.attach(&settings);
    Fixture {
        settings,
        engine,
        sink,
    }
}

fn replaying() -> LogSettings {
    LogSettings::new().with_replay_on_activate(true)
}

// ============================================================================
// Immediate emission
// ============================================================================

/// Flag 0 is emitted whatever the active set, and never cached.
#[test]
fn unconditional_messages_never_cache() {
    for active in [FlagMask::NONE, A, A | B] {
        let f = fixture(replaying().with_active_flags(active));
        assert_eq!(f.engine.log_error("boom", FlagMask::NONE), Submission::Emitted);
        assert_eq!(f.engine.pending(), 0);
        assert_eq!(f.sink.len(), 1);
    }
}

/// Any overlap with the active set is enough.
#[test]
fn partial_overlap_emits_immediately() {
    let f = fixture(replaying().with_active_flags(A));
    assert_eq!(f.engine.log_info("ab", A | B), Submission::Emitted);
    assert_eq!(f.sink.messages(), ["ab"]);
    assert!(!f.engine.has_bucket(B));
}

// ============================================================================
// Deferral and replay
// ============================================================================

/// A compound entry fires once, on the first of its flags to activate.
#[test]
fn compound_entry_replays_exactly_once() {
    let f = fixture(replaying());
    assert!(matches!(f.engine.log_info("ab", A | B), Submission::Deferred(_)));
    assert_eq!(f.engine.pending_for(A), 1);
    assert_eq!(f.engine.pending_for(B), 1);

    f.settings.enable_named("a").unwrap();
    assert_eq!(f.sink.messages(), ["ab"]);
    assert_eq!(f.engine.pending_for(B), 0);

    f.settings.enable_named("b").unwrap();
    assert_eq!(f.sink.len(), 1);
}

/// Replayed entries keep their severity and submission order.
#[test]
fn replay_preserves_order_and_severity() {
    let f = fixture(replaying());
    f.engine.log_warning("first", B);
    f.engine.log_error("second", A);
    f.engine.log_info("third", A | B);

    f.settings.set_active_flags(A | B);
    let records = f.sink.snapshot();
    let seen: Vec<(&str, Severity)> = records
        .iter()
        .map(|record| (record.message.as_str(), record.severity))
        .collect();
    assert_eq!(
        seen,
        [
            ("first", Severity::Warning),
            ("second", Severity::Error),
            ("third", Severity::Info),
        ]
    );
    assert_eq!(f.engine.pending(), 0);
}

/// Without replay, activation records the new set but keeps the cache.
#[test]
fn disabled_replay_retains_entries_until_reactivation() {
    let f = fixture(LogSettings::new());
    f.engine.log_info("held", A);

    f.settings.enable(A);
    assert!(f.sink.is_empty());
    assert_eq!(f.engine.pending(), 1);
    assert_eq!(f.engine.active_flags(), A);

    // Messages logged while A is active go straight out.
    f.engine.log_info("live", A);
    assert_eq!(f.sink.messages(), ["live"]);

    f.settings.set_replay_on_activate(true);
    f.settings.disable(A);
    f.settings.enable(A);
    assert_eq!(f.sink.messages(), ["live", "held"]);
    assert_eq!(f.engine.pending(), 0);
}

/// Re-enabling an already active flag is not an activation.
#[test]
fn unchanged_flags_do_not_replay() {
    let f = fixture(replaying().with_active_flags(A));
    f.engine.log_info("b only", B);
    f.settings.enable(A);
    f.settings.set_suppress_self_in_trace(true);
    assert!(f.sink.is_empty());
    assert_eq!(f.engine.pending(), 1);
}

/// Deactivating flags never emits anything.
#[test]
fn deactivation_is_silent() {
    let f = fixture(replaying().with_active_flags(A | B));
    f.settings.disable(A | B);
    f.engine.log_info("later", A);
    assert!(f.sink.is_empty());
    assert_eq!(f.engine.pending(), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

/// A detached engine ignores settings changes.
#[test]
fn detach_stops_notifications() {
    let f = fixture(replaying());
    f.engine.log_info("parked", A);
    assert!(f.engine.detach());
    assert!(!f.engine.is_attached());
    assert_eq!(f.settings.subscriber_count(), 0);

    f.settings.enable(A);
    assert!(f.sink.is_empty());
    assert!(!f.engine.detach());
}

/// Attaching applies the settings' current state against the engine's.
#[test]
fn attach_replays_flags_activated_while_detached() {
    let f = fixture(replaying());
    f.engine.log_info("parked", B);
    f.engine.detach();
    f.settings.enable(B);
    assert!(f.sink.is_empty());

    f.engine.attach(&f.settings);
    assert_eq!(f.sink.messages(), ["parked"]);
}

/// Dropping the engine leaves the settings usable.
#[test]
fn dropped_engine_is_not_kept_alive_by_settings() {
    let f = fixture(replaying());
    let weak = Arc::downgrade(&f.engine);
    drop(f.engine);
    assert!(weak.upgrade().is_none());
    f.settings.enable(A);
}

// ============================================================================
// Re-entrancy
// ============================================================================

/// A sink may log through the engine while it is being written to.
#[test]
fn sink_may_reenter_engine() {
    struct Echo {
        engine: std::sync::OnceLock<std::sync::Weak<LogEngine>>,
        inner: Arc<MemorySink>,
    }

    impl Sink for Echo {
        fn write(&self, message: &str, severity: Severity) {
            self.inner.write(message, severity);
            if message == "replayed" {
                if let Some(engine) = self.engine.get().and_then(std::sync::Weak::upgrade) {
                    engine.log_info("echo", FlagMask::NONE);
                }
            }
        }
    }

    let inner = Arc::new(MemorySink::new());
    let echo = Arc::new(Echo {
        engine: std::sync::OnceLock::new(),
        inner: Arc::clone(&inner),
    });
    let settings = Arc::new(Settings::new(replaying(), FlagRegistry::new()));
    let engine = Arc::new(
        LogEngine::new(Arc::clone(&echo), &replaying())
            .with_trace_source(StaticTrace::new("").with_policy(TracePolicy::None)),
    );
    engine.attach(&settings);
    echo.engine.set(Arc::downgrade(&engine)).unwrap();

    engine.log_info("replayed", A);
    settings.enable(A);
    assert_eq!(inner.messages(), ["replayed", "echo"]);
}

/// Concurrent submitters and a toggling thread never lose or duplicate entries.
#[test]
fn concurrent_submissions_emit_each_entry_once() {
    let f = fixture(replaying());
    let threads: Vec<_> = (0..4)
        .map(|worker| {
            let engine = Arc::clone(&f.engine);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let flags = if i % 2 == 0 { A } else { A | B };
                    engine.log_info(format!("{worker}-{i}"), flags);
                }
            })
        })
        .collect();
    let toggler = {
        let settings = Arc::clone(&f.settings);
        std::thread::spawn(move || {
            for _ in 0..20 {
                settings.enable(A);
                settings.disable(A);
            }
        })
    };
    for thread in threads {
        thread.join().unwrap();
    }
    toggler.join().unwrap();

    f.settings.enable(A);
    let mut messages = f.sink.messages();
    assert_eq!(messages.len(), 200);
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), 200);
    assert_eq!(f.engine.pending(), 0);
}
