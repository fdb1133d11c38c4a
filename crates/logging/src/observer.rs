//! crates/logging/src/observer.rs
//! Observable settings with change notification.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use bitset::FlagMask;

use crate::error::SettingsResult;
use crate::settings::{FlagRegistry, LogSettings, SETTINGS_TARGET, load_settings};

type ChangeHandler = Arc<dyn Fn(&LogSettings) + Send + Sync>;

/// Identifies a change handler registered with [`Settings::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The live logging configuration.
///
/// Every edit fires a change notification to all subscribers. Handlers run
/// after the settings locks are released and receive a snapshot taken right
/// after the edit, so they may freely read or even edit the settings.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use logging::{FlagRegistry, LogSettings, Settings};
///
/// let registry = FlagRegistry::from_names(["network", "physics"]).unwrap();
/// let settings = Arc::new(Settings::new(LogSettings::new(), registry));
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// let subscription = settings.subscribe(move |snapshot| {
///     counter.store(snapshot.active_flags.get() as usize, Ordering::SeqCst);
/// });
///
/// settings.enable_named("physics").unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// drop(subscription);
/// ```
pub struct Settings {
    current: RwLock<LogSettings>,
    registry: RwLock<FlagRegistry>,
    handlers: Mutex<Vec<(SubscriptionId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl Settings {
    /// Creates settings with the given initial values and flag registry.
    #[must_use]
    pub fn new(settings: LogSettings, registry: FlagRegistry) -> Self {
        Self {
            current: RwLock::new(settings),
            registry: RwLock::new(registry),
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Loads settings from a TOML or JSON file.
    ///
    /// # Errors
    ///
    /// See [`load_settings`].
    pub fn from_file(path: &Path) -> SettingsResult<Self> {
        let (settings, registry) = load_settings(path)?;
        Ok(Self::new(settings, registry))
    }

    /// A copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> LogSettings {
        self.read().clone()
    }

    /// The currently active flags.
    #[must_use]
    pub fn active_flags(&self) -> FlagMask {
        self.read().active_flags
    }

    /// Whether cached messages replay when their flag activates.
    #[must_use]
    pub fn replay_on_activate(&self) -> bool {
        self.read().replay_on_activate
    }

    /// Whether the engine's own frames are hidden from traces.
    #[must_use]
    pub fn suppress_self_in_trace(&self) -> bool {
        self.read().suppress_self_in_trace
    }

    /// A copy of the flag registry.
    #[must_use]
    pub fn registry(&self) -> FlagRegistry {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current values and the registry, read together.
    ///
    /// A concurrent [`reload`](Self::reload) is observed entirely or not at
    /// all, so the active flags always belong to the returned registry.
    #[must_use]
    pub fn snapshot_with_registry(&self) -> (LogSettings, FlagRegistry) {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let current = self.read();
        (current.clone(), registry.clone())
    }

    /// Looks up a flag by name.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<FlagMask> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    /// Replaces the active flags.
    pub fn set_active_flags(&self, flags: FlagMask) {
        self.update(|settings| settings.active_flags = flags);
    }

    /// Adds `flags` to the active set.
    pub fn enable(&self, flags: FlagMask) {
        self.update(|settings| settings.active_flags |= flags);
    }

    /// Removes `flags` from the active set.
    pub fn disable(&self, flags: FlagMask) {
        self.update(|settings| settings.active_flags -= flags);
    }

    /// Activates a flag by name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownFlag`](crate::SettingsError::UnknownFlag)
    /// without notifying when `name` is not registered.
    pub fn enable_named(&self, name: &str) -> SettingsResult<()> {
        let flag = self.resolve(name)?;
        self.enable(flag);
        Ok(())
    }

    /// Deactivates a flag by name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownFlag`](crate::SettingsError::UnknownFlag)
    /// without notifying when `name` is not registered.
    pub fn disable_named(&self, name: &str) -> SettingsResult<()> {
        let flag = self.resolve(name)?;
        self.disable(flag);
        Ok(())
    }

    /// Turns replay on activation on or off.
    pub fn set_replay_on_activate(&self, replay: bool) {
        self.update(|settings| settings.replay_on_activate = replay);
    }

    /// Turns self-frame suppression on or off.
    pub fn set_suppress_self_in_trace(&self, suppress: bool) {
        self.update(|settings| settings.suppress_self_in_trace = suppress);
    }

    /// Replaces every value at once.
    pub fn replace(&self, settings: LogSettings) {
        self.update(|current| *current = settings);
    }

    /// Reloads values and registry from a file, notifying once.
    ///
    /// Both are swapped in one critical section, registry lock first, and
    /// handlers run after the locks are released.
    ///
    /// # Errors
    ///
    /// See [`load_settings`]. On error nothing changes and nobody is notified.
    pub fn reload(&self, path: &Path) -> SettingsResult<()> {
        let (settings, registry) = load_settings(path)?;
        let snapshot = {
            let mut installed = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *installed = registry;
            *current = settings;
            current.clone()
        };
        self.notify(&snapshot);
        Ok(())
    }

    /// Registers a change handler, returning a guard that unsubscribes on drop.
    pub fn subscribe<F>(self: &Arc<Self>, handler: F) -> Subscription
    where
        F: Fn(&LogSettings) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        Subscription {
            id,
            settings: Arc::downgrade(self),
        }
    }

    /// Removes a handler. Returns `false` when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn resolve(&self, name: &str) -> SettingsResult<FlagMask> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(name)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LogSettings> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, edit: impl FnOnce(&mut LogSettings)) {
        let snapshot = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            edit(&mut current);
            current.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &LogSettings) {
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        tracing::debug!(
            target: SETTINGS_TARGET,
            active = %snapshot.active_flags,
            replay = snapshot.replay_on_activate,
            handlers = handlers.len(),
            "logging settings changed"
        );
        for handler in handlers {
            handler(snapshot);
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(LogSettings::default(), FlagRegistry::default())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("current", &*self.read())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Keeps a change handler registered; dropping it unsubscribes.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    settings: Weak<Settings>,
}

impl Subscription {
    /// The handler's identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(settings) = self.settings.upgrade() {
            settings.unsubscribe(self.id);
        }
    }
}
