//! Core types for the caching system.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;

use crate::backend::cache::{QueryFamily, QueryKey};

/// Type-erased cached value; each read family stores its own payload type.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Freshness of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  /// Served without a remote call
  Fresh,
  /// Invalidated or expired; the next access refetches
  Stale,
}

/// A cached value together with metadata about its freshness.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  pub status: EntryStatus,
  /// When the value was stored
  pub cached_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  pub fn is_stale(&self) -> bool {
    self.status == EntryStatus::Stale
  }
}

/// Notifications broadcast to every subscriber of a `QueryClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
  /// A fetch settled and its value was stored
  Updated(QueryKey),
  /// Every key of this family was marked stale
  Invalidated(QueryFamily),
  /// All entries were dropped
  Cleared,
}

impl CacheEvent {
  /// Whether a view watching `families` should refetch
  pub fn concerns(&self, families: &[QueryFamily]) -> bool {
    match self {
      CacheEvent::Updated(_) => false,
      CacheEvent::Invalidated(family) => families.contains(family),
      CacheEvent::Cleared => true,
    }
  }
}
