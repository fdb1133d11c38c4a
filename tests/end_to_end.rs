//! End-to-end scenario through the process-wide call surface.
//!
//! The installed engine is global, so the whole scenario lives in one test.

use std::sync::Arc;

use flaglog::{
    FlagMask, FlagRegistry, InstallError, LogSettings, MemorySink, Severity, Settings,
    Submission, install,
};

#[test]
fn deferred_messages_replay_once_in_order() {
    let registry = FlagRegistry::from_values([("a", 1), ("b", 2)]).unwrap();
    let a = registry.get("a").unwrap();
    let b = registry.get("b").unwrap();
    let settings = Arc::new(Settings::new(
        LogSettings::new()
            .with_replay_on_activate(true)
            .with_suppress_self_in_trace(true),
        registry,
    ));
    let sink = Arc::new(MemorySink::new());

    assert!(!flaglog::is_installed());
    let engine = flaglog::init(Arc::clone(&sink), &settings).unwrap();
    assert!(flaglog::is_installed());
    assert!(Arc::ptr_eq(flaglog::engine(), &engine));

    let second = flaglog::build_engine(flaglog::NullSink, &settings);
    assert_eq!(install(second), Err(InstallError::AlreadyInstalled));

    assert!(matches!(flaglog::log_info("msg1", a), Submission::Deferred(_)));
    assert!(matches!(flaglog::log_warning("msg2", a | b), Submission::Deferred(_)));
    assert_eq!(flaglog::log_error("msg3", 0u32), Submission::Emitted);
    assert_eq!(engine.pending(), 2);

    settings.enable_named("a").unwrap();

    let records = sink.snapshot();
    let heads: Vec<(&str, Severity)> = records
        .iter()
        .map(|record| (record.message.lines().next().unwrap_or(""), record.severity))
        .collect();
    assert_eq!(
        heads,
        [
            ("msg3", Severity::Error),
            ("msg1", Severity::Info),
            ("msg2", Severity::Warning),
        ]
    );
    assert_eq!(engine.pending(), 0);
    assert!(!engine.has_bucket(a));
    assert!(!engine.has_bucket(b));

    settings.enable_named("b").unwrap();
    assert_eq!(sink.len(), 3);

    // Replayed traces open with the entry point for their severity.
    assert!(records[2].message.contains("\nflaglog::log_warning (message)"));

    // The macros route through the same engine.
    flaglog::log_info!(flags: FlagMask::new(4), "deferred {}", "macro");
    flaglog::log_error!("count = {}", 3);
    assert_eq!(engine.pending(), 1);
    assert_eq!(sink.len(), 4);
    assert!(sink.messages()[3].starts_with("count = 3"));
}
