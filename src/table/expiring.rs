//! A key-value store whose entries expire.
//!
//! Every table in the crate is an [`ExpiringTable`] plus the bookkeeping specific to it. Changes
//! to the set of live keys are reported through a single callback injected at construction.

use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};

use crate::core::clock::Clock;

/// Callback invoked after the set of live keys changed.
///
/// It runs while the table lock is held so it observes a consistent view, it must therefore never
/// call back into the table that invoked it.
pub type OnChange<K, V> = Box<dyn Fn(LiveEntries<'_, K, V>) + Send + Sync>;

struct Slot<V> {
    value: V,
    expires_at: OffsetDateTime,
}

impl<V> Slot<V> {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// The outcome of inserting into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Put {
    /// The key was not live before the insert.
    Inserted,
    /// The key was live, its value and expiry were replaced.
    Refreshed,
}

/// A read-only view of the unexpired entries, handed to the change callback.
pub struct LiveEntries<'a, K, V> {
    entries: &'a HashMap<K, Slot<V>>,
    now: OffsetDateTime,
}

impl<'a, K, V> LiveEntries<'a, K, V> {
    pub fn iter(&self) -> impl Iterator<Item = (&'a K, &'a V)> + '_ {
        let now = self.now;
        self.entries
            .iter()
            .filter(move |(_, slot)| slot.is_live(now))
            .map(|(key, slot)| (key, &slot.value))
    }
}

fn expiry(now: OffsetDateTime, ttl_millis: u64) -> OffsetDateTime {
    // Capped so the addition can't leave the representable date range.
    now + Duration::milliseconds(ttl_millis.min(u64::from(u32::MAX)) as i64)
}

/// Read-modify-write access to a table under its lock, see [`ExpiringTable::transaction`].
pub struct Transaction<'a, K, V> {
    entries: &'a mut HashMap<K, Slot<V>>,
    now: OffsetDateTime,
    changed: bool,
}

impl<'a, K: Eq + Hash, V> Transaction<'a, K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|slot| slot.is_live(self.now))
            .map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let now = self.now;
        self.entries
            .get_mut(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| &mut slot.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: K, value: V, ttl_millis: u64) -> Put {
        let expires_at = expiry(self.now, ttl_millis);
        let put = match self.entries.insert(key, Slot { value, expires_at }) {
            Some(old) if old.is_live(self.now) => Put::Refreshed,
            _ => Put::Inserted,
        };

        if put == Put::Inserted {
            self.changed = true;
        }

        put
    }

    /// Extends the lifetime of a live entry, returns `false` if there is none.
    pub fn refresh(&mut self, key: &K, ttl_millis: u64) -> bool {
        let expires_at = expiry(self.now, ttl_millis);
        match self.get_slot_mut(key) {
            Some(slot) => {
                slot.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        if !slot.is_live(self.now) {
            return None;
        }

        self.changed = true;
        Some(slot.value)
    }

    /// Drops the live entries for which the predicate returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let now = self.now;
        let before = self.entries.len();
        self.entries
            .retain(|key, slot| !slot.is_live(now) || keep(key, &slot.value));
        let removed = before - self.entries.len();

        if removed > 0 {
            self.changed = true;
        }

        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let now = self.now;
        self.entries
            .iter()
            .filter(move |(_, slot)| slot.is_live(now))
            .map(|(key, slot)| (key, &slot.value))
    }

    /// Forces the change callback to run when the transaction ends.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    fn get_slot_mut(&mut self, key: &K) -> Option<&mut Slot<V>> {
        let now = self.now;
        self.entries.get_mut(key).filter(|slot| slot.is_live(now))
    }
}

/// A map of keys to values with a per-entry time to live.
///
/// Expired entries are invisible to every lookup and are physically removed by
/// [`sweep`](Self::sweep). All methods take the table's single lock; none of them hold it across
/// anything but in-memory work.
pub struct ExpiringTable<K, V> {
    entries: Mutex<HashMap<K, Slot<V>>>,
    clock: Arc<dyn Clock>,
    on_change: Option<OnChange<K, V>>,
}

impl<K, V> fmt::Debug for ExpiringTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringTable")
            .field("entries", &self.entries.lock().len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> ExpiringTable<K, V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            on_change: None,
        }
    }

    /// Creates a table that reports every change of its live key set to the callback.
    pub fn with_on_change(
        clock: Arc<dyn Clock>,
        on_change: impl Fn(LiveEntries<'_, K, V>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            on_change: Some(Box::new(on_change)),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Runs a read-modify-write sequence under the table lock.
    ///
    /// The change callback runs at most once, after the closure returns, if the closure changed
    /// the set of live keys.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction<'_, K, V>) -> R) -> R {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let mut txn = Transaction {
            entries: &mut *entries,
            now,
            changed: false,
        };
        let res = f(&mut txn);
        let changed = txn.changed;

        if changed {
            self.fire(&entries, now);
        }

        res
    }

    pub fn put(&self, key: K, value: V, ttl_millis: u64) -> Put {
        self.transaction(|txn| txn.insert(key, value, ttl_millis))
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(key)
            .map_or(false, |slot| slot.is_live(now))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.transaction(|txn| txn.remove(key))
    }

    /// Mutates a live value in place without touching its expiry or firing the callback.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get_mut(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| f(&mut slot.value))
    }

    /// Returns a copy of the live keys, safe to iterate while the table keeps changing.
    pub fn keys(&self) -> Vec<K> {
        let now = self.clock.now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, slot)| slot.is_live(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns a copy of the live entries.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        let now = self.clock.now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, slot)| slot.is_live(now))
            .map(|(key, slot)| (key.clone(), slot.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically removes expired entries and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, slot| slot.is_live(now));
        let removed = before - entries.len();

        if removed > 0 {
            self.fire(&entries, now);
        }

        removed
    }

    /// Runs the change callback as if the live key set had changed.
    pub fn notify_changed(&self) {
        let now = self.clock.now();
        let entries = self.entries.lock();
        self.fire(&entries, now);
    }

    fn fire(&self, entries: &HashMap<K, Slot<V>>, now: OffsetDateTime) {
        if let Some(on_change) = &self.on_change {
            on_change(LiveEntries { entries, now });
        }
    }
}
