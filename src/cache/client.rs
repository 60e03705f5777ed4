//! Query client that coordinates cached reads, coalescing and invalidation.

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::store::CacheStore;
use super::traits::{CacheEvent, CacheResult, CachedValue};
use crate::backend::cache::{QueryFamily, QueryKey};
use crate::backend::error::BackendError;

type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, BackendError>>>;

struct InFlight {
  generation: u64,
  future: SharedFetch,
}

struct State {
  store: CacheStore,
  in_flight: HashMap<QueryKey, InFlight>,
  /// Bumped on every clear; fetches from an older epoch are discarded
  epoch: u64,
}

struct Inner {
  state: Mutex<State>,
  events: broadcast::Sender<CacheEvent>,
  stale_time: Duration,
}

/// What to do for a fetch, decided under the lock
enum Plan {
  Hit(CachedValue),
  Wait(SharedFetch),
}

/// Process-wide cache coordinator.
///
/// Cloning is cheap and every clone shares the same entries. At most one
/// fetch per key is in flight; later callers await the same result.
#[derive(Clone)]
pub struct QueryClient {
  inner: Arc<Inner>,
}

impl QueryClient {
  /// Create a client whose entries expire after `stale_time`.
  pub fn new(stale_time: Duration) -> Self {
    let (events, _) = broadcast::channel(256);
    Self {
      inner: Arc::new(Inner {
        state: Mutex::new(State {
          store: CacheStore::new(),
          in_flight: HashMap::new(),
          epoch: 0,
        }),
        events,
        stale_time,
      }),
    }
  }

  /// Read through the cache.
  ///
  /// Serves a fresh entry without calling `fetcher`. Otherwise joins the
  /// fetch already in flight for `key`, or spawns a new one. The spawned
  /// task outlives the caller, so its result is stored even if nobody
  /// awaits it. A failed fetch leaves any previous entry untouched.
  pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, BackendError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    self.read(key, fetcher, false).await
  }

  /// Read from the backend even if the cached entry is fresh.
  ///
  /// A fetch already in flight for `key` is joined rather than duplicated.
  pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, BackendError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    self.read(key, fetcher, true).await
  }

  async fn read<T, F, Fut>(&self, key: QueryKey, fetcher: F, force: bool) -> Result<T, BackendError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    let value = match self.plan(&key, fetcher, force) {
      Plan::Hit(value) => value,
      Plan::Wait(future) => future.await?,
    };
    downcast(&key, &value)
  }

  fn plan<T, F, Fut>(&self, key: &QueryKey, fetcher: F, force: bool) -> Plan
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    let mut state = self.lock();

    if !force {
      if let Some(value) = state.store.fresh(key, self.inner.stale_time) {
        return Plan::Hit(value);
      }
    }

    let generation = state.store.generation(key.family);
    if let Some(pending) = state.in_flight.get(key) {
      if pending.generation == generation {
        return Plan::Wait(pending.future.clone());
      }
    }

    let epoch = state.epoch;
    let call = fetcher();
    let client = self.clone();
    let task_key = key.clone();
    let handle = tokio::spawn(async move {
      let result = call.await.map(|v| Arc::new(v) as CachedValue);
      client.settle(task_key, generation, epoch, &result);
      result
    });

    let client = self.clone();
    let task_key = key.clone();
    let future = async move {
      match handle.await {
        Ok(result) => result,
        Err(e) => {
          // The task never settled, so nobody else will drop its slot
          tracing::warn!(key = %task_key.encode(), error = %e, "fetch task died");
          client.forget(&task_key, generation, epoch);
          Err(BackendError::Cancelled)
        }
      }
    }
    .boxed()
    .shared();

    state.in_flight.insert(
      key.clone(),
      InFlight {
        generation,
        future: future.clone(),
      },
    );
    Plan::Wait(future)
  }

  /// Store the outcome of a fetch started at `generation` in `epoch`
  fn settle(
    &self,
    key: QueryKey,
    generation: u64,
    epoch: u64,
    result: &Result<CachedValue, BackendError>,
  ) {
    let mut state = self.lock();
    if state.epoch != epoch {
      return;
    }

    if state
      .in_flight
      .get(&key)
      .is_some_and(|pending| pending.generation == generation)
    {
      state.in_flight.remove(&key);
    }

    if let Ok(value) = result {
      if state.store.insert(key.clone(), value.clone(), generation) {
        drop(state);
        let _ = self.inner.events.send(CacheEvent::Updated(key));
      }
    }
  }

  /// Drop the in-flight slot of a fetch that ended without settling
  fn forget(&self, key: &QueryKey, generation: u64, epoch: u64) {
    let mut state = self.lock();
    if state.epoch != epoch {
      return;
    }
    if state
      .in_flight
      .get(key)
      .is_some_and(|pending| pending.generation == generation)
    {
      state.in_flight.remove(key);
    }
  }

  /// Cached value under `key`, fresh or stale, without fetching
  pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> Option<CacheResult<T>> {
    let state = self.lock();
    let entry = state.store.get(key)?;
    let data = entry.value.downcast_ref::<T>()?.clone();
    Some(CacheResult {
      data,
      status: state.store.status(key, entry, self.inner.stale_time),
      cached_at: entry.updated_at,
    })
  }

  /// Mark every key of the given families stale.
  ///
  /// Fetches in flight for those families still store their result, but
  /// as stale, and are no longer joined by new callers.
  pub fn invalidate(&self, families: &[QueryFamily]) {
    if families.is_empty() {
      return;
    }

    {
      let mut state = self.lock();
      for family in families {
        state.store.invalidate(*family);
      }
    }

    for family in families {
      let _ = self.inner.events.send(CacheEvent::Invalidated(*family));
    }
  }

  /// Drop every entry and pending fetch. Results of fetches started before
  /// the clear are discarded.
  pub fn clear(&self) {
    {
      let mut state = self.lock();
      state.store.clear();
      state.in_flight.clear();
      state.epoch += 1;
    }
    let _ = self.inner.events.send(CacheEvent::Cleared);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
    self.inner.events.subscribe()
  }

  /// Number of stored entries
  pub fn len(&self) -> usize {
    self.lock().store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().store.is_empty()
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl std::fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryClient")
      .field("stale_time", &self.inner.stale_time)
      .finish_non_exhaustive()
  }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &CachedValue) -> Result<T, BackendError> {
  value
    .downcast_ref::<T>()
    .cloned()
    .ok_or_else(|| BackendError::Decode {
      method: key.encode(),
      message: "cached value has an unexpected type".to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration as StdDuration;
  use tokio::sync::Notify;

  fn client() -> QueryClient {
    QueryClient::new(Duration::minutes(5))
  }

  fn counting(
    calls: &Arc<AtomicUsize>,
    value: u32,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, BackendError>> {
    let calls = calls.clone();
    move || {
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        Ok(value)
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_call() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryFamily::AttendanceByWeek.key_for_time(1_735_516_800_000_000_000);

    let (a, b) = tokio::join!(
      client.fetch(key.clone(), counting(&calls, 7)),
      client.fetch(key.clone(), counting(&calls, 8)),
    );

    assert_eq!(a, Ok(7));
    assert_eq!(b, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_served_without_call() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryFamily::InviteCodes.key();

    client.fetch(key.clone(), counting(&calls, 1)).await.unwrap();
    let second = client.fetch(key.clone(), counting(&calls, 2)).await.unwrap();

    assert_eq!(second, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_skips_fresh_entry() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryFamily::InviteCodes.key();

    client.fetch(key.clone(), counting(&calls, 1)).await.unwrap();
    let refreshed = client.refetch(key.clone(), counting(&calls, 2)).await.unwrap();

    assert_eq!(refreshed, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.peek::<u32>(&key).unwrap().data, 2);
    assert!(!client.peek::<u32>(&key).unwrap().is_stale());
  }

  #[tokio::test]
  async fn test_refetch_joins_fetch_in_flight() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryFamily::Rsvps.key();

    let (a, b) = tokio::join!(
      client.fetch(key.clone(), counting(&calls, 1)),
      client.refetch(key.clone(), counting(&calls, 2)),
    );

    assert_eq!(a, Ok(1));
    assert_eq!(b, Ok(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_dead_fetch_task_frees_its_key() {
    let client = client();
    let key = QueryFamily::MyAttendanceRecords.key();
    let broken = true;

    let failed = client
      .fetch(key.clone(), move || async move {
        if broken {
          panic!("fetch task died");
        }
        Ok::<u32, BackendError>(0)
      })
      .await;
    assert_eq!(failed, Err(BackendError::Cancelled));

    let recovered = client
      .fetch(key.clone(), || async { Ok::<_, BackendError>(4u32) })
      .await;
    assert_eq!(recovered, Ok(4));
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryFamily::MyHolidayRequests.key();
    let mut events = client.subscribe();

    client.fetch(key.clone(), counting(&calls, 1)).await.unwrap();
    client.invalidate(&[QueryFamily::MyHolidayRequests]);

    assert!(client.peek::<u32>(&key).unwrap().is_stale());
    let refreshed = client.fetch(key.clone(), counting(&calls, 2)).await.unwrap();
    assert_eq!(refreshed, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key.clone()));
    assert_eq!(
      events.recv().await.unwrap(),
      CacheEvent::Invalidated(QueryFamily::MyHolidayRequests)
    );
  }

  #[tokio::test]
  async fn test_invalidate_only_touches_named_families() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let codes = QueryFamily::InviteCodes.key();

    client.fetch(codes.clone(), counting(&calls, 1)).await.unwrap();
    client.invalidate(&[QueryFamily::Rsvps]);

    assert!(!client.peek::<u32>(&codes).unwrap().is_stale());
  }

  #[tokio::test]
  async fn test_fetch_in_flight_across_invalidation_stores_stale() {
    let client = client();
    let gate = Arc::new(Notify::new());
    let key = QueryFamily::AttendanceByDay.key_for_time(0);

    let pending = {
      let gate = gate.clone();
      let client = client.clone();
      let key = key.clone();
      tokio::spawn(async move {
        client
          .fetch(key, move || async move {
            gate.notified().await;
            Ok::<_, BackendError>(1u32)
          })
          .await
      })
    };

    tokio::time::sleep(StdDuration::from_millis(10)).await;
    client.invalidate(&[QueryFamily::AttendanceByDay]);
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), Ok(1));
    let cached = client.peek::<u32>(&key).unwrap();
    assert_eq!(cached.data, 1);
    assert!(cached.is_stale());
  }

  #[tokio::test]
  async fn test_failed_fetch_keeps_previous_entry() {
    let client = QueryClient::new(Duration::seconds(-1));
    let key = QueryFamily::Rsvps.key();

    client
      .fetch(key.clone(), || async { Ok::<_, BackendError>(5u32) })
      .await
      .unwrap();
    let failed = client
      .fetch(key.clone(), || async {
        Err::<u32, _>(BackendError::Transport("offline".to_string()))
      })
      .await;

    assert_eq!(failed, Err(BackendError::Transport("offline".to_string())));
    assert_eq!(client.peek::<u32>(&key).unwrap().data, 5);
  }

  #[tokio::test]
  async fn test_clear_drops_entries_and_late_results() {
    let client = client();
    let gate = Arc::new(Notify::new());
    let done = client.clone();
    let calls = Arc::new(AtomicUsize::new(0));

    client
      .fetch(QueryFamily::InviteCodes.key(), counting(&calls, 1))
      .await
      .unwrap();

    let late_key = QueryFamily::Rsvps.key();
    let pending = {
      let gate = gate.clone();
      let key = late_key.clone();
      tokio::spawn(async move {
        done
          .fetch(key, move || async move {
            gate.notified().await;
            Ok::<_, BackendError>(9u32)
          })
          .await
      })
    };

    tokio::time::sleep(StdDuration::from_millis(10)).await;
    client.clear();
    gate.notify_one();
    let _ = pending.await;

    assert!(client.is_empty());
    assert!(client.peek::<u32>(&late_key).is_none());
  }

  #[tokio::test]
  async fn test_type_mismatch_is_decode_error() {
    let client = client();
    let key = QueryFamily::TotalHours.key_for_period(0, 1);

    client
      .fetch(key.clone(), || async { Ok::<_, BackendError>(3u64) })
      .await
      .unwrap();
    let wrong = client
      .fetch(key, || async { Ok::<_, BackendError>("x".to_string()) })
      .await;

    assert!(matches!(wrong, Err(BackendError::Decode { .. })));
  }
}
