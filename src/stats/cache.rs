//! Expiry-only memo for parsed results.
//!
//! Entries are never invalidated by file changes; a hit may serve data
//! up to `ttl_secs` old.

use crate::stats::util::Clock;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at_epoch_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl_secs: u64,
    entries: BTreeMap<K, Entry<V>>,
}

impl<K: Ord, V: Clone> TtlCache<K, V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &K, clock: &dyn Clock) -> Option<V> {
        let entry = self.entries.get(key)?;
        if clock.epoch_secs() >= entry.expires_at_epoch_secs {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V, clock: &dyn Clock) {
        let expires_at_epoch_secs = clock.epoch_secs().saturating_add(self.ttl_secs);
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at_epoch_secs,
            },
        );
    }

    /// Cached value for `key`, or the result of `load` stored for `ttl_secs`.
    /// Errors are returned without being cached. A miss also drops every
    /// expired entry, so per-item keys do not accumulate.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        clock: &dyn Clock,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(&key, clock) {
            return Ok(hit);
        }
        let value = load()?;
        self.purge_expired(clock);
        self.insert(key, value.clone(), clock);
        Ok(value)
    }

    fn purge_expired(&mut self, clock: &dyn Clock) -> usize {
        let now = clock.epoch_secs();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at_epoch_secs);
        before - self.entries.len()
    }
}
