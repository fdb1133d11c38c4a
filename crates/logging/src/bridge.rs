//! crates/logging/src/bridge.rs
//! Bridge from `tracing` events to the flag-filtered engine.
//!
//! [`FlagLayer`] lets code that already logs through `tracing` take part in
//! flag filtering and deferred replay. An event is routed when it either
//! carries a numeric `flags` field or uses a `flags::<name>` target:
//!
//! ```rust,ignore
//! tracing::warn!(flags = 4u32, "path blocked");
//! tracing::info!(target: "flags::network", "socket opened");
//! ```
//!
//! Events without either are left to the other layers.
//!
//! A bridged event reaches the engine through `tracing_core` and
//! `tracing_subscriber` dispatch frames. Those frames are listed in
//! [`DISPATCH_SYMBOLS`] and hidden together with the engine's own frames when
//! self-suppression is on, so the trace starts at the event's call site.

use std::fmt;
use std::sync::Arc;

use bitset::FlagMask;
use logging_sink::Severity;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::engine::LogEngine;
use crate::settings::FlagRegistry;

/// Source file of the bridge, hidden from traces when self-suppression is on.
pub const BRIDGE_SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/bridge.rs");

/// Symbol prefixes of the `tracing` dispatch path between an event's call
/// site and [`FlagLayer::on_event`](Layer::on_event).
pub const DISPATCH_SYMBOLS: &[&str] = &["tracing_core::", "tracing_subscriber::"];

/// Target prefix naming a flag by its registry name.
pub const FLAG_TARGET_PREFIX: &str = "flags::";

const SELF_TARGET: &str = "flaglog";

/// A tracing layer that submits flagged events to a [`LogEngine`].
pub struct FlagLayer {
    engine: Arc<LogEngine>,
    registry: FlagRegistry,
}

impl FlagLayer {
    /// Creates a layer resolving target flag names through `registry`.
    #[must_use]
    pub fn new(engine: Arc<LogEngine>, registry: FlagRegistry) -> Self {
        Self { engine, registry }
    }

    /// Resolves a `flags::<name>` target; the last path segment is the name.
    fn target_to_flags(&self, target: &str) -> Option<FlagMask> {
        let path = target.strip_prefix(FLAG_TARGET_PREFIX)?;
        let name = path.rsplit("::").next()?;
        self.registry.get(name)
    }

    const fn level_to_severity(level: &Level) -> Severity {
        match *level {
            Level::ERROR => Severity::Error,
            Level::WARN => Severity::Warning,
            _ => Severity::Info,
        }
    }

    fn is_own_target(target: &str) -> bool {
        target == SELF_TARGET
            || target
                .strip_prefix(SELF_TARGET)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

impl fmt::Debug for FlagLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagLayer")
            .field("engine", &self.engine)
            .field("flags", &self.registry.len())
            .finish()
    }
}

impl<S> Layer<S> for FlagLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if Self::is_own_target(target) {
            return;
        }

        let mut visitor = FlagVisitor::default();
        event.record(&mut visitor);
        let Some(flags) = visitor.flags.or_else(|| self.target_to_flags(target)) else {
            return;
        };
        let Some(message) = visitor.message else {
            return;
        };

        let severity = Self::level_to_severity(metadata.level());
        self.engine.submit_at(message, flags, severity, None);
    }
}

/// Collects the `message` and `flags` fields of an event.
#[derive(Default)]
struct FlagVisitor {
    message: Option<String>,
    flags: Option<FlagMask>,
}

impl FlagVisitor {
    fn record_flags(&mut self, field: &Field, value: Option<u32>) {
        if field.name() == "flags" {
            if let Some(value) = value {
                self.flags = Some(FlagMask::new(value));
            }
        }
    }
}

impl Visit for FlagVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_flags(field, u32::try_from(value).ok());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_flags(field, u32::try_from(value).ok());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Installs a global subscriber that routes flagged events into `engine`.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_tracing(engine: Arc<LogEngine>, registry: FlagRegistry) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(FlagLayer::new(engine, registry))
        .init();
}

/// Like [`init_tracing`], with an additional filter layer such as
/// `tracing_subscriber::EnvFilter`.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_tracing_with_filter<F>(engine: Arc<LogEngine>, registry: FlagRegistry, filter: F)
where
    F: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(filter)
        .with(FlagLayer::new(engine, registry))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LogSettings;
    use logging_sink::MemorySink;
    use stacktrace::{StaticTrace, TracePolicy};
    use tracing_subscriber::layer::SubscriberExt;

    fn setup(settings: &LogSettings) -> (FlagLayer, Arc<LogEngine>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let engine = Arc::new(
            LogEngine::new(Arc::clone(&sink), settings)
                .with_trace_source(StaticTrace::new("").with_policy(TracePolicy::None)),
        );
        let registry = FlagRegistry::from_names(["network", "physics"]).unwrap();
        (FlagLayer::new(Arc::clone(&engine), registry), engine, sink)
    }

    #[test]
    fn level_to_severity_mapping() {
        assert_eq!(FlagLayer::level_to_severity(&Level::ERROR), Severity::Error);
        assert_eq!(FlagLayer::level_to_severity(&Level::WARN), Severity::Warning);
        assert_eq!(FlagLayer::level_to_severity(&Level::INFO), Severity::Info);
        assert_eq!(FlagLayer::level_to_severity(&Level::DEBUG), Severity::Info);
        assert_eq!(FlagLayer::level_to_severity(&Level::TRACE), Severity::Info);
    }

    #[test]
    fn own_targets_are_recognised() {
        assert!(FlagLayer::is_own_target("flaglog"));
        assert!(FlagLayer::is_own_target("flaglog::engine"));
        assert!(!FlagLayer::is_own_target("flaglogger"));
        assert!(!FlagLayer::is_own_target("app::net"));
    }

    #[test]
    fn target_names_resolve_through_registry() {
        let (layer, _, _) = setup(&LogSettings::new());
        assert_eq!(layer.target_to_flags("flags::physics"), Some(FlagMask::new(2)));
        assert_eq!(layer.target_to_flags("flags::game::network"), Some(FlagMask::new(1)));
        assert_eq!(layer.target_to_flags("flags::audio"), None);
        assert_eq!(layer.target_to_flags("network"), None);
    }

    #[test]
    fn flagged_events_are_filtered_and_replayed() {
        let settings = LogSettings::new()
            .with_active_flags(FlagMask::new(1))
            .with_replay_on_activate(true);
        let (layer, engine, sink) = setup(&settings);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(flags = 1u32, "net up");
            tracing::warn!(target: "flags::physics", "body asleep");
            tracing::error!(flags = 0u32, "always");
            tracing::info!("unflagged");
            tracing::info!(target: "flaglog::engine", flags = 2u32, "own");
        });

        assert_eq!(sink.messages(), ["net up", "always"]);
        assert_eq!(engine.pending(), 1);

        engine.on_config_changed(&settings.with_active_flags(FlagMask::new(3)));
        let records = sink.snapshot();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].message, "body asleep");
        assert_eq!(records[2].severity, Severity::Warning);
    }

    #[test]
    fn bridged_entries_have_no_call_site() {
        let (layer, engine, _) = setup(&LogSettings::new());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(flags = 2u32, "later");
        });
        let entries = engine.pending_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].location().is_none());
    }
}
