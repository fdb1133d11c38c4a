use super::Sink;
use crate::Severity;

/// Target used for every event emitted by [`TracingSink`].
pub const SINK_TARGET: &str = "flaglog::sink";

/// Sink that forwards messages to the `tracing` ecosystem.
///
/// Info messages become `INFO` events, warnings `WARN`, errors `ERROR`, all on
/// the [`SINK_TARGET`] target. Whatever subscriber the host installed decides
/// where they end up.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates the sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn write(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(target: SINK_TARGET, "{message}"),
            Severity::Warning => tracing::warn!(target: SINK_TARGET, "{message}"),
            Severity::Error => tracing::error!(target: SINK_TARGET, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(tracing::Level, String)>>>);

    struct CaptureLayer(Captured);

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Visitor(Option<String>);
            impl tracing::field::Visit for Visitor {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{value:?}"));
                    }
                }
            }

            let mut visitor = Visitor(None);
            event.record(&mut visitor);
            assert_eq!(event.metadata().target(), SINK_TARGET);
            (self.0).0.lock().unwrap().push((
                *event.metadata().level(),
                visitor.0.unwrap_or_default(),
            ));
        }
    }

    #[test]
    fn severities_map_to_tracing_levels() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(CaptureLayer(captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let sink = TracingSink::new();
            sink.write("one", Severity::Info);
            sink.write("two", Severity::Warning);
            sink.write("three", Severity::Error);
        });

        let events = captured.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (tracing::Level::INFO, "one".to_owned()),
                (tracing::Level::WARN, "two".to_owned()),
                (tracing::Level::ERROR, "three".to_owned()),
            ]
        );
    }
}
