#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `flaglog` is flag-filtered logging with deferred replay. Every log call is
//! tagged with a [`FlagMask`] of named categories. A message whose flags
//! intersect the active set is written right away; any other message is held
//! back, together with the call-site trace captured when it was logged, and
//! replayed the moment one of its flags is switched on.
//!
//! This crate is the public call surface. It installs one [`LogEngine`] for
//! the process and exposes [`log_info`], [`log_warning`] and [`log_error`]
//! plus the matching macros. Flags `0` ([`FlagMask::NONE`]) mean
//! unconditional.
//!
//! # Initialisation
//!
//! Nothing is created implicitly. Build an engine, attach it to live
//! [`Settings`], and [`install`] it once; [`init`] does all three. Logging
//! before installation panics; [`try_engine`] is the non-panicking lookup.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use flaglog::{FlagRegistry, LogSettings, MemorySink, Settings};
//!
//! let registry = FlagRegistry::from_names(["network", "physics"]).unwrap();
//! let physics = registry.get("physics").unwrap();
//! let settings = Arc::new(Settings::new(
//!     LogSettings::new().with_replay_on_activate(true),
//!     registry,
//! ));
//! let sink = Arc::new(MemorySink::new());
//! flaglog::init(Arc::clone(&sink), &settings).unwrap();
//!
//! flaglog::log_info!(flags: physics, "{} bodies asleep", 12);
//! flaglog::log_warning!("frame took {}ms", 40);
//! assert_eq!(sink.len(), 1);
//!
//! settings.enable_named("physics").unwrap();
//! assert_eq!(sink.len(), 2);
//! assert!(sink.messages()[1].starts_with("12 bodies asleep"));
//! ```
//!
//! # See also
//!
//! - [`logging`] for the engine, cache and settings.
//! - [`stacktrace`] for trace capture and formatting.
//! - [`logging_sink`] for output destinations.

use std::sync::{Arc, OnceLock};

use thiserror::Error;

pub use bitset::{self, FlagMask};
pub use logging::{
    self, EntryId, FlagCache, FlagLayer, FlagRegistry, LogEngine, LogEntry, LogSettings, Settings,
    SettingsError, SettingsFile, Submission, Subscription, init_tracing, load_settings,
};
pub use logging_sink::{
    self, LineMode, MemorySink, NullSink, Record, Severity, Sink, TracingSink, WriterSink,
};
pub use stacktrace::{
    self, BacktraceSource, LinkStyle, StaticTrace, TraceFormatter, TracePolicy, TraceSource,
};

/// Source file of the call surface, hidden from traces when self-suppression is on.
pub const FACADE_SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs");

static ENGINE: OnceLock<Arc<LogEngine>> = OnceLock::new();

/// Errors from installing or looking up the process-wide engine.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InstallError {
    /// [`install`] was called a second time.
    #[error("a flaglog engine is already installed")]
    AlreadyInstalled,
    /// The engine was requested before [`install`].
    #[error("no flaglog engine is installed; call flaglog::install or flaglog::init first")]
    NotInstalled,
}

/// Builds an engine writing to `sink` and attaches it to `settings`.
///
/// The engine hides this crate's frames along with its own when
/// self-suppression is on.
#[must_use]
pub fn build_engine<S>(sink: S, settings: &Arc<Settings>) -> Arc<LogEngine>
where
    S: Sink + 'static,
{
    let engine =
        Arc::new(LogEngine::new(sink, &settings.snapshot()).with_self_source(FACADE_SOURCE));
    engine.attach(settings);
    engine
}

/// Installs the process-wide engine.
///
/// # Errors
///
/// Returns [`InstallError::AlreadyInstalled`] if an engine is installed.
pub fn install(engine: Arc<LogEngine>) -> Result<(), InstallError> {
    ENGINE
        .set(engine)
        .map_err(|_| InstallError::AlreadyInstalled)?;
    tracing::debug!(target: logging::ENGINE_TARGET, "installed process-wide engine");
    Ok(())
}

/// Builds, attaches and installs an engine in one step.
///
/// # Errors
///
/// Returns [`InstallError::AlreadyInstalled`] if an engine is installed; the
/// new engine is dropped and detached.
pub fn init<S>(sink: S, settings: &Arc<Settings>) -> Result<Arc<LogEngine>, InstallError>
where
    S: Sink + 'static,
{
    let engine = build_engine(sink, settings);
    install(Arc::clone(&engine))?;
    Ok(engine)
}

/// The installed engine.
///
/// # Errors
///
/// Returns [`InstallError::NotInstalled`] before [`install`].
pub fn try_engine() -> Result<&'static Arc<LogEngine>, InstallError> {
    ENGINE.get().ok_or(InstallError::NotInstalled)
}

/// Reports whether an engine is installed.
#[must_use]
pub fn is_installed() -> bool {
    ENGINE.get().is_some()
}

/// The installed engine.
///
/// # Panics
///
/// Panics when no engine is installed.
#[must_use]
#[track_caller]
pub fn engine() -> &'static Arc<LogEngine> {
    match try_engine() {
        Ok(engine) => engine,
        Err(error) => panic!("{error}"),
    }
}

/// Logs an informational message.
///
/// # Panics
///
/// Panics when no engine is installed.
#[track_caller]
pub fn log_info(message: impl Into<String>, flags: impl Into<FlagMask>) -> Submission {
    engine().submit(message, flags.into(), Severity::Info)
}

/// Logs a warning.
///
/// # Panics
///
/// Panics when no engine is installed.
#[track_caller]
pub fn log_warning(message: impl Into<String>, flags: impl Into<FlagMask>) -> Submission {
    engine().submit(message, flags.into(), Severity::Warning)
}

/// Logs an error.
///
/// # Panics
///
/// Panics when no engine is installed.
#[track_caller]
pub fn log_error(message: impl Into<String>, flags: impl Into<FlagMask>) -> Submission {
    engine().submit(message, flags.into(), Severity::Error)
}

/// Logs a formatted informational message through the installed engine.
///
/// An optional leading `flags: <mask>,` tags the message; without it the
/// message is unconditional.
///
/// ```ignore
/// flaglog::log_info!(flags: network, "peer {} joined", peer);
/// flaglog::log_info!("started");
/// ```
#[macro_export]
macro_rules! log_info {
    (flags: $flags:expr, $($arg:tt)+) => {
        $crate::log_info(::std::format!($($arg)+), $flags)
    };
    ($($arg:tt)+) => {
        $crate::log_info(::std::format!($($arg)+), $crate::FlagMask::NONE)
    };
}

/// Logs a formatted warning; see [`log_info!`].
#[macro_export]
macro_rules! log_warning {
    (flags: $flags:expr, $($arg:tt)+) => {
        $crate::log_warning(::std::format!($($arg)+), $flags)
    };
    ($($arg:tt)+) => {
        $crate::log_warning(::std::format!($($arg)+), $crate::FlagMask::NONE)
    };
}

/// Logs a formatted error; see [`log_info!`].
#[macro_export]
macro_rules! log_error {
    (flags: $flags:expr, $($arg:tt)+) => {
        $crate::log_error(::std::format!($($arg)+), $flags)
    };
    ($($arg:tt)+) => {
        $crate::log_error(::std::format!($($arg)+), $crate::FlagMask::NONE)
    };
}
