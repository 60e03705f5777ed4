//! In-memory entry storage with per-family generations.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::traits::{CachedValue, EntryStatus};
use crate::backend::cache::{QueryFamily, QueryKey};

/// A single stored value.
#[derive(Clone)]
pub struct CacheEntry {
  pub value: CachedValue,
  /// When the entry was stored
  pub updated_at: DateTime<Utc>,
  /// Family generation the value was fetched at
  pub generation: u64,
}

/// Key-value store behind the query client.
///
/// Each family carries a generation counter. Invalidating a family bumps it,
/// which turns every entry fetched at an older generation stale, including
/// values of fetches that are still in flight.
#[derive(Default)]
pub struct CacheStore {
  entries: HashMap<QueryKey, CacheEntry>,
  generations: HashMap<QueryFamily, u64>,
}

impl CacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current generation of a family
  pub fn generation(&self, family: QueryFamily) -> u64 {
    self.generations.get(&family).copied().unwrap_or(0)
  }

  pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// Freshness of an entry stored under `key`
  pub fn status(&self, key: &QueryKey, entry: &CacheEntry, stale_time: Duration) -> EntryStatus {
    if entry.generation < self.generation(key.family) || Utc::now() - entry.updated_at > stale_time {
      EntryStatus::Stale
    } else {
      EntryStatus::Fresh
    }
  }

  /// Value under `key` if it can be served without a remote call
  pub fn fresh(&self, key: &QueryKey, stale_time: Duration) -> Option<CachedValue> {
    let entry = self.entries.get(key)?;
    match self.status(key, entry, stale_time) {
      EntryStatus::Fresh => Some(entry.value.clone()),
      EntryStatus::Stale => None,
    }
  }

  /// Store a fetched value.
  ///
  /// A value fetched at an older generation never replaces one fetched at a
  /// newer generation. Returns whether the value was stored.
  pub fn insert(&mut self, key: QueryKey, value: CachedValue, generation: u64) -> bool {
    if let Some(existing) = self.entries.get(&key) {
      if existing.generation > generation {
        return false;
      }
    }

    self.entries.insert(
      key,
      CacheEntry {
        value,
        updated_at: Utc::now(),
        generation,
      },
    );
    true
  }

  /// Mark every entry of `family` stale
  pub fn invalidate(&mut self, family: QueryFamily) {
    *self.generations.entry(family).or_insert(0) += 1;
  }

  /// Drop all entries
  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  fn value(n: u32) -> CachedValue {
    Arc::new(n)
  }

  #[test]
  fn test_fresh_until_invalidated() {
    let mut store = CacheStore::new();
    let key = QueryFamily::InviteCodes.key();
    store.insert(key.clone(), value(1), 0);

    assert!(store.fresh(&key, Duration::minutes(5)).is_some());

    store.invalidate(QueryFamily::InviteCodes);
    assert!(store.fresh(&key, Duration::minutes(5)).is_none());
    let entry = store.get(&key).unwrap();
    assert_eq!(
      store.status(&key, entry, Duration::minutes(5)),
      EntryStatus::Stale
    );
  }

  #[test]
  fn test_expired_entry_is_stale() {
    let mut store = CacheStore::new();
    let key = QueryFamily::Rsvps.key();
    store.insert(key.clone(), value(1), 0);

    assert!(store.fresh(&key, Duration::seconds(-1)).is_none());
  }

  #[test]
  fn test_invalidation_is_per_family() {
    let mut store = CacheStore::new();
    let codes = QueryFamily::InviteCodes.key();
    let rsvps = QueryFamily::Rsvps.key();
    store.insert(codes.clone(), value(1), 0);
    store.insert(rsvps.clone(), value(2), 0);

    store.invalidate(QueryFamily::Rsvps);

    assert!(store.fresh(&codes, Duration::minutes(5)).is_some());
    assert!(store.fresh(&rsvps, Duration::minutes(5)).is_none());
  }

  #[test]
  fn test_older_generation_does_not_overwrite_newer() {
    let mut store = CacheStore::new();
    let key = QueryFamily::AttendanceByDay.key_for_time(10);
    store.invalidate(QueryFamily::AttendanceByDay);

    assert!(store.insert(key.clone(), value(2), 1));
    assert!(!store.insert(key.clone(), value(1), 0));

    let stored = store.get(&key).unwrap().value.downcast_ref::<u32>().copied();
    assert_eq!(stored, Some(2));
  }
}
