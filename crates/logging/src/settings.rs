//! crates/logging/src/settings.rs
//! Settings schema, flag registry and settings-file loading.

use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use bitset::{FlagMask, MAX_FLAGS};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};

/// Tracing target for settings diagnostics.
pub const SETTINGS_TARGET: &str = "flaglog::settings";

/// Runtime logging configuration.
///
/// Replay and self-suppression default to off.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Flags whose messages are emitted immediately.
    pub active_flags: FlagMask,
    /// Replay cached messages when one of their flags becomes active.
    pub replay_on_activate: bool,
    /// Hide the logging engine's own frames from captured traces.
    pub suppress_self_in_trace: bool,
    /// Upper bound on cached messages; oldest entries are evicted first.
    pub cache_capacity: Option<NonZeroUsize>,
}

impl LogSettings {
    /// Settings with nothing active, replay and suppression off, unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active flags.
    #[must_use]
    pub const fn with_active_flags(mut self, flags: FlagMask) -> Self {
        self.active_flags = flags;
        self
    }

    /// Enables or disables replay on activation.
    #[must_use]
    pub const fn with_replay_on_activate(mut self, replay: bool) -> Self {
        self.replay_on_activate = replay;
        self
    }

    /// Enables or disables hiding of the engine's own trace frames.
    #[must_use]
    pub const fn with_suppress_self_in_trace(mut self, suppress: bool) -> Self {
        self.suppress_self_in_trace = suppress;
        self
    }

    /// Bounds the number of cached messages.
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: Option<NonZeroUsize>) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// The closed set of named flags a program logs with.
///
/// Every flag is a distinct single bit. Names are kept in declaration order.
#[derive(Clone, Debug, Default)]
pub struct FlagRegistry {
    flags: Vec<(String, FlagMask)>,
    by_name: FxHashMap<String, FlagMask>,
}

impl FlagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry assigning bit `i` to the `i`-th name.
    ///
    /// # Errors
    ///
    /// Fails on more than 32 names, on an empty name, or on a repeated name.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitset::FlagMask;
    /// use logging::FlagRegistry;
    ///
    /// let registry = FlagRegistry::from_names(["network", "physics"]).unwrap();
    /// assert_eq!(registry.get("physics"), Some(FlagMask::new(2)));
    /// ```
    pub fn from_names<I, S>(names: I) -> SettingsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > MAX_FLAGS as usize {
            return Err(SettingsError::TooManyFlags(names.len()));
        }
        let mut registry = Self::new();
        for (position, name) in (0..MAX_FLAGS).zip(names) {
            registry.push(name, FlagMask::bit(position).get())?;
        }
        Ok(registry)
    }

    /// Builds a registry from explicit name/value pairs.
    ///
    /// # Errors
    ///
    /// Fails on an empty or repeated name, on the reserved value 0, on values
    /// with more than one bit set, and on two names sharing a value.
    pub fn from_values<I, S>(pairs: I) -> SettingsResult<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (name, value) in pairs {
            registry.push(name.into(), value)?;
        }
        Ok(registry)
    }

    fn push(&mut self, name: String, value: u32) -> SettingsResult<()> {
        if name.trim().is_empty() {
            return Err(SettingsError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            return Err(SettingsError::DuplicateName(name));
        }
        let flag = FlagMask::new(value);
        if flag.is_empty() {
            return Err(SettingsError::ZeroValue(name));
        }
        if !flag.is_single_bit() {
            return Err(SettingsError::NotSingleBit { name, value });
        }
        if let Some(first) = self.name_of(flag) {
            return Err(SettingsError::DuplicateValue {
                first: first.to_owned(),
                second: name,
                value,
            });
        }
        self.by_name.insert(name.clone(), flag);
        self.flags.push((name, flag));
        Ok(())
    }

    /// Looks up a flag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<FlagMask> {
        self.by_name.get(name).copied()
    }

    /// Looks up a flag by name, failing on unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownFlag`] when `name` is not registered.
    pub fn resolve(&self, name: &str) -> SettingsResult<FlagMask> {
        self.get(name)
            .ok_or_else(|| SettingsError::UnknownFlag(name.to_owned()))
    }

    /// Resolves several names into one mask.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownFlag`] for the first unknown name.
    pub fn resolve_all<I, S>(&self, names: I) -> SettingsResult<FlagMask>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(FlagMask::NONE, |mask, name| Ok(mask | self.resolve(name.as_ref())?))
    }

    /// Returns the name registered for a single-bit `flag`.
    #[must_use]
    pub fn name_of(&self, flag: FlagMask) -> Option<&str> {
        self.flags
            .iter()
            .find(|(_, value)| *value == flag)
            .map(|(name, _)| name.as_str())
    }

    /// Names of every registered flag set in `mask`, in bit order.
    #[must_use]
    pub fn names_in(&self, mask: FlagMask) -> Vec<&str> {
        mask.bits().filter_map(|bit| self.name_of(bit)).collect()
    }

    /// Union of every registered flag.
    #[must_use]
    pub fn all(&self) -> FlagMask {
        self.flags.iter().map(|(_, flag)| *flag).collect()
    }

    /// Number of registered flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Reports whether no flags are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterates over `(name, flag)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FlagMask)> + '_ {
        self.flags.iter().map(|(name, flag)| (name.as_str(), *flag))
    }
}

impl PartialEq for FlagRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags
    }
}

impl Eq for FlagRegistry {}

/// How a settings file declares its flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagDeclarations {
    /// `flags = ["a", "b"]`: bit `i` for the `i`-th name.
    Ordered(Vec<String>),
    /// `[flags] a = 1`: explicit single-bit values.
    Explicit(BTreeMap<String, u32>),
}

impl Default for FlagDeclarations {
    fn default() -> Self {
        Self::Ordered(Vec::new())
    }
}

impl FlagDeclarations {
    /// Validates the declarations into a registry.
    ///
    /// # Errors
    ///
    /// See [`FlagRegistry::from_names`] and [`FlagRegistry::from_values`].
    pub fn to_registry(&self) -> SettingsResult<FlagRegistry> {
        match self {
            Self::Ordered(names) => FlagRegistry::from_names(names.iter().cloned()),
            Self::Explicit(values) => {
                FlagRegistry::from_values(values.iter().map(|(name, value)| (name.clone(), *value)))
            }
        }
    }
}

/// On-disk settings document, in TOML or JSON.
///
/// ```toml
/// replay_on_activate = true
/// suppress_self_in_trace = true
/// active = ["network"]
/// cache_capacity = 4096
/// flags = ["network", "physics"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Replay cached messages when their flag becomes active.
    pub replay_on_activate: bool,
    /// Hide the logging engine's own frames from traces.
    pub suppress_self_in_trace: bool,
    /// Names of the initially active flags.
    pub active: Vec<String>,
    /// Optional bound on cached messages.
    pub cache_capacity: Option<NonZeroUsize>,
    /// Flag declarations.
    pub flags: FlagDeclarations,
}

impl SettingsFile {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Toml`] when the document does not match the schema.
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] when the document does not match the schema.
    pub fn from_json_str(text: &str) -> SettingsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a settings file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has neither a `.toml` nor a
    /// `.json` extension, or does not parse.
    pub fn read(path: &Path) -> SettingsResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> SettingsResult<Self> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("json") => Self::from_json_str,
            _ => {
                return Err(SettingsError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&text)
    }

    /// Validates the document into runtime settings and a flag registry.
    ///
    /// # Errors
    ///
    /// Fails on invalid flag declarations and on `active` names that are not declared.
    pub fn resolve(&self) -> SettingsResult<(LogSettings, FlagRegistry)> {
        let registry = self.flags.to_registry()?;
        let active_flags = registry.resolve_all(&self.active)?;
        let settings = LogSettings {
            active_flags,
            replay_on_activate: self.replay_on_activate,
            suppress_self_in_trace: self.suppress_self_in_trace,
            cache_capacity: self.cache_capacity,
        };
        Ok((settings, registry))
    }

    /// Builds a document describing `settings` under `registry`.
    ///
    /// Active bits without a registered name are dropped.
    #[must_use]
    pub fn describe(settings: &LogSettings, registry: &FlagRegistry) -> Self {
        Self {
            replay_on_activate: settings.replay_on_activate,
            suppress_self_in_trace: settings.suppress_self_in_trace,
            active: registry
                .names_in(settings.active_flags)
                .into_iter()
                .map(str::to_owned)
                .collect(),
            cache_capacity: settings.cache_capacity,
            flags: FlagDeclarations::Explicit(
                registry
                    .iter()
                    .map(|(name, flag)| (name.to_owned(), flag.get()))
                    .collect(),
            ),
        }
    }
}

/// Reads and validates a settings file.
///
/// # Errors
///
/// See [`SettingsFile::read`] and [`SettingsFile::resolve`].
pub fn load_settings(path: &Path) -> SettingsResult<(LogSettings, FlagRegistry)> {
    let (settings, registry) = SettingsFile::read(path)?.resolve()?;
    tracing::debug!(
        target: SETTINGS_TARGET,
        path = %path.display(),
        flags = registry.len(),
        active = %settings.active_flags,
        "loaded logging settings"
    );
    Ok((settings, registry))
}
