//! crates/logging/src/cache.rs
//! Per-flag storage of deferred log entries.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use bitset::FlagMask;
use rustc_hash::FxHashMap;

use crate::entry::LogEntry;

/// Handle of a pending entry. Handles grow with submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Outcome of [`FlagCache::insert`].
#[derive(Debug)]
pub struct Inserted {
    /// Handle of the new entry.
    pub id: EntryId,
    /// Oldest entry pushed out by the capacity bound, if any.
    pub evicted: Option<LogEntry>,
}

/// A stored entry and every bucket it is registered in.
#[derive(Debug)]
struct Pending {
    entry: LogEntry,
    registered: FlagMask,
}

/// Deferred entries, bucketed by single-bit flag.
///
/// Each entry is owned once by an arena keyed by [`EntryId`]; the buckets only
/// hold handles. An entry tagged with several flags sits in several buckets
/// and leaves all of them the first time any of its flags is flushed, so it
/// is returned exactly once.
///
/// # Examples
///
/// ```
/// use bitset::FlagMask;
/// use logging::{FlagCache, LogEntry};
/// use logging_sink::Severity;
///
/// let (a, b) = (FlagMask::new(1), FlagMask::new(2));
/// let mut cache = FlagCache::new();
/// cache.insert(LogEntry::new("both", a | b, Severity::Info));
///
/// assert_eq!(cache.flush_and_remove(a).len(), 1);
/// assert!(cache.flush_and_remove(b).is_empty());
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct FlagCache {
    entries: BTreeMap<EntryId, Pending>,
    buckets: FxHashMap<FlagMask, Vec<EntryId>>,
    next_id: u64,
    capacity: Option<NonZeroUsize>,
}

impl FlagCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// The configured bound.
    #[must_use]
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Changes the bound, returning entries evicted to satisfy it, oldest first.
    pub fn set_capacity(&mut self, capacity: Option<NonZeroUsize>) -> Vec<LogEntry> {
        self.capacity = capacity;
        let mut evicted = Vec::new();
        while let Some(entry) = self.evict_over(0) {
            evicted.push(entry);
        }
        evicted
    }

    /// Stores `entry` and registers it under every bit of its flags.
    ///
    /// An entry with no flags is stored but reachable only by [`clear`](Self::clear)
    /// or eviction.
    pub fn insert(&mut self, entry: LogEntry) -> Inserted {
        let evicted = self.evict_over(1);
        let id = EntryId(self.next_id);
        self.next_id += 1;
        let flags = entry.flags();
        for flag in flags {
            self.buckets.entry(flag).or_default().push(id);
        }
        self.entries.insert(
            id,
            Pending {
                entry,
                registered: flags,
            },
        );
        Inserted { id, evicted }
    }

    /// Appends `id` to the bucket of `flag`, creating the bucket if needed.
    ///
    /// The extra registration is remembered, so the entry still leaves every
    /// bucket once it is flushed or evicted. Returns `false` and does nothing
    /// when `id` is not pending.
    pub fn enqueue(&mut self, flag: FlagMask, id: EntryId) -> bool {
        debug_assert!(flag.is_single_bit(), "buckets are keyed by single bits");
        let Some(pending) = self.entries.get_mut(&id) else {
            return false;
        };
        pending.registered |= flag;
        self.buckets.entry(flag).or_default().push(id);
        true
    }

    /// Removes the bucket of `flag` and returns its pending entries in
    /// submission order.
    ///
    /// Returned entries are also removed from every other bucket; buckets left
    /// empty are dropped. Flushing a flag with no bucket returns nothing.
    pub fn flush_and_remove(&mut self, flag: FlagMask) -> Vec<LogEntry> {
        let mut flushed = self.take_bucket(flag);
        flushed.sort_unstable_by_key(|(id, _)| *id);
        flushed.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Flushes several flags, returning each entry once in submission order.
    pub fn flush_many<I>(&mut self, flags: I) -> Vec<LogEntry>
    where
        I: IntoIterator<Item = FlagMask>,
    {
        let mut flushed = Vec::new();
        for flag in flags {
            flushed.extend(self.take_bucket(flag));
        }
        flushed.sort_unstable_by_key(|(id, _)| *id);
        flushed.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Number of pending entries registered under `flag`.
    #[must_use]
    pub fn pending_for(&self, flag: FlagMask) -> usize {
        self.buckets.get(&flag).map_or(0, |ids| {
            ids.iter().filter(|id| self.entries.contains_key(id)).count()
        })
    }

    /// Reports whether a bucket exists for `flag`.
    #[must_use]
    pub fn has_bucket(&self, flag: FlagMask) -> bool {
        self.buckets.contains_key(&flag)
    }

    /// Number of buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Reports whether `id` is still pending.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns a pending entry.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&LogEntry> {
        self.entries.get(&id).map(|pending| &pending.entry)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &LogEntry)> + '_ {
        self.entries.iter().map(|(id, pending)| (*id, &pending.entry))
    }

    /// Drops every pending entry, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.buckets.clear();
        count
    }

    fn take_bucket(&mut self, flag: FlagMask) -> Vec<(EntryId, LogEntry)> {
        let Some(ids) = self.buckets.remove(&flag) else {
            return Vec::new();
        };
        let mut taken = Vec::with_capacity(ids.len());
        for id in ids {
            // Stale handles belong to entries that already fired.
            let Some(pending) = self.entries.remove(&id) else {
                continue;
            };
            self.deregister(id, pending.registered - flag);
            taken.push((id, pending.entry));
        }
        taken
    }

    fn deregister(&mut self, id: EntryId, flags: FlagMask) {
        for flag in flags {
            if let Some(ids) = self.buckets.get_mut(&flag) {
                ids.retain(|queued| *queued != id);
                if ids.is_empty() {
                    self.buckets.remove(&flag);
                }
            }
        }
    }

    /// Evicts the oldest entry when `len + incoming` would exceed capacity.
    fn evict_over(&mut self, incoming: usize) -> Option<LogEntry> {
        let capacity = self.capacity?.get();
        if self.entries.len() + incoming <= capacity {
            return None;
        }
        let (id, pending) = self.entries.pop_first()?;
        self.deregister(id, pending.registered);
        Some(pending.entry)
    }
}
