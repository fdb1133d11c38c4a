#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/logging/src/lib.rs
//!
//! # Overview
//!
//! `logging` is the flag-filtering core. Log calls carry a [`FlagMask`] of
//! named categories; a [`LogEngine`] writes a message immediately when its
//! flags are unconditional (`0`) or intersect the active set, and otherwise
//! parks it in a [`FlagCache`]. When the live [`Settings`] activate new flags,
//! the parked messages under those flags are replayed with the trace captured
//! at the original call.
//!
//! # Design
//!
//! - [`FlagRegistry`] is the closed set of named single-bit flags, declared in
//!   a TOML or JSON settings file ([`SettingsFile`]).
//! - [`Settings`] holds the runtime [`LogSettings`] and notifies subscribers
//!   on every edit; [`LogEngine::attach`] subscribes the engine.
//! - [`FlagCache`] owns each deferred [`LogEntry`] once and indexes it under
//!   every bit of its mask.
//! - [`FlagLayer`] routes `tracing` events that carry flags into the engine.
//!
//! # Invariants
//!
//! - An entry is emitted at most once, however many of its flags activate.
//! - Replayed entries reach the sink in submission order.
//! - Flags `0` never reach the cache.
//! - Sinks are called without any engine lock held.
//!
//! # Errors
//!
//! Only settings loading and flag-name resolution fail, with
//! [`SettingsError`]. Submitting and replaying are infallible.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use logging::{FlagRegistry, LogEngine, LogSettings, Settings};
//! use logging_sink::MemorySink;
//!
//! let registry = FlagRegistry::from_names(["network", "physics"]).unwrap();
//! let network = registry.get("network").unwrap();
//! let settings = Arc::new(Settings::new(
//!     LogSettings::new().with_replay_on_activate(true),
//!     registry,
//! ));
//!
//! let sink = Arc::new(MemorySink::new());
//! let engine = LogEngine::attached(Arc::clone(&sink), &settings);
//!
//! engine.log_info("handshake done", network);
//! assert!(sink.is_empty());
//!
//! settings.enable_named("network").unwrap();
//! assert_eq!(sink.len(), 1);
//! assert!(sink.messages()[0].starts_with("handshake done"));
//! ```

mod bridge;
mod cache;
mod engine;
mod entry;
mod error;
mod observer;
mod settings;

pub use bitset::FlagMask;
pub use bridge::{
    BRIDGE_SOURCE, DISPATCH_SYMBOLS, FLAG_TARGET_PREFIX, FlagLayer, init_tracing,
    init_tracing_with_filter,
};
pub use cache::{EntryId, FlagCache, Inserted};
pub use engine::{ENGINE_SOURCE, ENGINE_TARGET, LogEngine, Submission};
pub use entry::LogEntry;
pub use error::{SettingsError, SettingsResult};
pub use observer::{Settings, Subscription, SubscriptionId};
pub use settings::{
    FlagDeclarations, FlagRegistry, LogSettings, SETTINGS_TARGET, SettingsFile, load_settings,
};

/// Absolute paths of this crate's sources that can appear in a captured
/// trace.
pub const SOURCES: &[&str] = &[ENGINE_SOURCE, BRIDGE_SOURCE];
