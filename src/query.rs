//! Async query abstraction for data fetching in views.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! encapsulates async data fetching, loading states, and error handling.
//! Caching itself lives in [`crate::cache::QueryClient`]; a query only tracks
//! what one screen is showing and refetches when the families it watches are
//! invalidated.
//!
//! # Example
//!
//! ```ignore
//! let backend = backend.clone();
//! let mut query = Query::new(move || {
//!     let backend = backend.clone();
//!     async move { backend.my_holiday_requests().await.map_err(|e| e.to_string()) }
//! })
//! .watching(cache.subscribe(), &[QueryFamily::MyHolidayRequests]);
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{broadcast, mpsc};

use crate::backend::cache::QueryFamily;
use crate::cache::CacheEvent;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn(FetchMode) -> BoxFuture<T> + Send + Sync>;

/// How a fetch treats data the cache already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Fresh cache entries are served as they are
  Cached,
  /// Go to the backend even when the cache entry is fresh
  Fresh,
}

/// Cache families a query follows
struct Watch {
  events: broadcast::Receiver<CacheEvent>,
  families: Vec<QueryFamily>,
}

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states
/// - Async result handling via channels
/// - Optional refetch on cache invalidation
///
/// The same type drives one-shot writes from forms: build it with the
/// mutation as fetcher and call `fetch()` on submit.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  watch: Option<Watch>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self::with_mode(move |_| fetcher())
  }

  /// Like [`Query::new`], but the fetcher is told whether the cache may
  /// answer. `refetch()` asks for [`FetchMode::Fresh`]; every other fetch
  /// uses [`FetchMode::Cached`].
  pub fn with_mode<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(FetchMode) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move |mode| Box::pin(fetcher(mode))),
      receiver: None,
      watch: None,
    }
  }

  /// Refetch whenever one of `families` is invalidated or the cache is
  /// cleared. Events are only acted on once the query has been started.
  pub fn watching(mut self, events: broadcast::Receiver<CacheEvent>, families: &[QueryFamily]) -> Self {
    self.watch = Some(Watch {
      events,
      families: families.to_vec(),
    });
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if a fetch is in flight, including background refreshes of
  /// data already shown.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if a fetch is already in flight.
  pub fn fetch(&mut self) {
    if self.is_fetching() {
      return;
    }
    self.start_fetch(FetchMode::Cached);
  }

  /// Force a refetch from the backend, even if already loading or data
  /// exists.
  pub fn refetch(&mut self) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch(FetchMode::Fresh);
  }

  /// Poll for results from a pending fetch and for cache events.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred or
  /// a refetch started). Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    if self.invalidated() {
      // Invalidated entries are already stale, so the cache refetches them
      self.receiver = None;
      self.start_fetch(FetchMode::Cached);
      changed = true;
    }

    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return changed,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => changed,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Drain pending cache events; true if any concerns this query
  fn invalidated(&mut self) -> bool {
    let started = !matches!(self.state, QueryState::Idle);
    let Some(watch) = &mut self.watch else {
      return false;
    };

    let mut hit = false;
    loop {
      match watch.events.try_recv() {
        Ok(event) => hit |= event.concerns(&watch.families),
        // Missed events may have included an invalidation
        Err(broadcast::error::TryRecvError::Lagged(_)) => hit = true,
        Err(_) => break,
      }
    }
    hit && started
  }

  /// Internal: start the fetch operation. Data already shown stays until
  /// the new result arrives.
  fn start_fetch(&mut self, mode: FetchMode) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)(mode);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("watching", &self.watch.as_ref().map(|w| &w.families))
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryClient;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch should have completed and been received
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_only_refetch_asks_for_fresh_data() {
    let modes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let cache = QueryClient::new(chrono::Duration::minutes(5));
    let seen = modes.clone();
    let mut query = Query::with_mode(move |mode| {
      seen.lock().unwrap().push(mode);
      async { Ok::<_, String>(1) }
    })
    .watching(cache.subscribe(), &[QueryFamily::Rsvps]);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    cache.invalidate(&[QueryFamily::Rsvps]);
    query.poll();

    assert_eq!(
      *modes.lock().unwrap(),
      vec![FetchMode::Cached, FetchMode::Fresh, FetchMode::Cached]
    );
  }

  fn counting_query(counter: &Arc<AtomicU32>) -> Query<u32> {
    let counter = counter.clone();
    Query::new(move || {
      let counter = counter.clone();
      async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst)) }
    })
  }

  #[tokio::test]
  async fn test_watched_family_invalidation_refetches() {
    let cache = QueryClient::new(chrono::Duration::minutes(5));
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&counter)
      .watching(cache.subscribe(), &[QueryFamily::MyPermissionRequests]);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    cache.invalidate(&[QueryFamily::MyPermissionRequests]);
    assert!(query.poll());
    assert!(query.is_fetching());
    // Previous data stays visible during the refresh
    assert_eq!(query.data(), Some(&0));

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_unrelated_invalidation_is_ignored() {
    let cache = QueryClient::new(chrono::Duration::minutes(5));
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&counter).watching(cache.subscribe(), &[QueryFamily::Rsvps]);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    cache.invalidate(&[QueryFamily::InviteCodes]);
    assert!(!query.poll());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_idle_query_ignores_events() {
    let cache = QueryClient::new(chrono::Duration::minutes(5));
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&counter).watching(cache.subscribe(), &[QueryFamily::Rsvps]);

    cache.clear();
    assert!(!query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
  }
}
