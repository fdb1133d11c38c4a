//! crates/logging/src/error.rs
//!
//! Errors raised while loading and validating logging settings.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors that can occur while building a [`FlagRegistry`](crate::FlagRegistry)
/// or loading a settings file.
///
/// These surface at load time only; logging calls themselves never fail.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The settings document is not valid TOML for the settings schema.
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
    /// The settings document is not valid JSON for the settings schema.
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
    /// The settings file extension is neither `.toml` nor `.json`.
    #[error("unsupported settings format for {}: expected .toml or .json", path.display())]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
    },
    /// A flag was declared with an empty name.
    #[error("flag names must not be empty")]
    EmptyName,
    /// Two flags share a name.
    #[error("flag `{0}` is declared more than once")]
    DuplicateName(String),
    /// A flag was given the reserved value 0.
    #[error("flag `{0}` uses the reserved value 0")]
    ZeroValue(String),
    /// A flag value has more than one bit set.
    #[error("flag `{name}` has value {value:#x}, which is not a single bit")]
    NotSingleBit {
        /// Flag name.
        name: String,
        /// Offending value.
        value: u32,
    },
    /// Two flags share a bit.
    #[error("flags `{first}` and `{second}` share the value {value:#x}")]
    DuplicateValue {
        /// Flag declared first.
        first: String,
        /// Flag declared second.
        second: String,
        /// Shared value.
        value: u32,
    },
    /// More flags were declared than bits are available.
    #[error("{0} flags declared; at most 32 fit in a flag mask")]
    TooManyFlags(usize),
    /// A flag name is not in the registry.
    #[error("unknown flag `{0}`")]
    UnknownFlag(String),
}
