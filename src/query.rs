//! Per-view query state for async data fetching.
//!
//! A `Query<T>` owns one fetchable piece of data for a view: a marketplace
//! operation wrapped in a closure, the result of its last run, and whether
//! a run is currently in flight. Errors land in the query state for the UI
//! to render; nothing is thrown into the rendering path, and an
//! authentication rejection stays distinguishable so hosts can pair it
//! with their login redirect.
//!
//! Previously loaded data is kept while a refetch is in flight and after a
//! failed refetch, so a view can keep rendering the old list next to a
//! spinner or an error banner.
//!
//! # Example
//!
//! ```ignore
//! let client = Arc::clone(&marketplace);
//! let mut professionals = Query::new(move || {
//!     let client = Arc::clone(&client);
//!     async move { client.search_professionals(&filter).await }
//! });
//!
//! professionals.fetch();
//!
//! // In the event loop tick
//! if professionals.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render: data() and error() are independent of each other
//! if professionals.is_loading() { render_spinner(); }
//! if let Some(list) = professionals.data() { render_results(list); }
//! if let Some(e) = professionals.error() { render_error_banner(e); }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Where a query currently stands. The phase carries no payload; data and
/// error are tracked separately so both can outlive a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
  /// Never fetched
  Idle,
  /// A fetch is in flight
  Loading,
  /// The last fetch succeeded
  Ready,
  /// The last fetch failed
  Failed,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// One view's handle on an async operation and its latest outcome.
pub struct Query<T> {
  phase: QueryPhase,
  /// Last successful result. Survives refetches and failed refetches.
  data: Option<T>,
  /// Error from the last fetch, cleared by the next success.
  error: Option<Error>,
  fetcher: FetcherFn<T>,
  pending: Option<oneshot::Receiver<Result<T>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query around a fetcher closure. The closure is invoked once
  /// per `fetch`/`refetch` and typically wraps a `MarketplaceClient`
  /// operation, so the cache layer sits underneath every run.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self {
      phase: QueryPhase::Idle,
      data: None,
      error: None,
      fetcher: Box::new(move || Box::pin(fetcher())),
      pending: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  /// After this duration, `is_stale` reports true and `ensure_fresh`
  /// refetches.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn phase(&self) -> QueryPhase {
    self.phase
  }

  /// Last successful result, if any. Also available while a refetch is in
  /// flight or after one failed.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  /// Error from the last fetch, if it failed.
  pub fn error(&self) -> Option<&Error> {
    self.error.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.phase == QueryPhase::Loading
  }

  pub fn is_ready(&self) -> bool {
    self.phase == QueryPhase::Ready
  }

  pub fn is_failed(&self) -> bool {
    self.phase == QueryPhase::Failed
  }

  /// Whether the last fetch failed because the backend rejected our
  /// credentials. Hosts pair this with their login redirect.
  pub fn is_auth_error(&self) -> bool {
    matches!(self.error, Some(Error::Auth))
  }

  /// Whether the loaded data has outlived its stale time.
  pub fn is_stale(&self) -> bool {
    match (self.phase, self.fetched_at) {
      (QueryPhase::Ready, Some(at)) => at.elapsed() > self.stale_time,
      (QueryPhase::Ready, None) => true,
      _ => false,
    }
  }

  /// Start fetching unless a fetch is already in flight.
  pub fn fetch(&mut self) {
    if self.phase == QueryPhase::Loading {
      return;
    }
    self.start_fetch();
  }

  /// Fetch only when there is nothing usable: never fetched, last fetch
  /// failed, or the data has gone stale.
  pub fn ensure_fresh(&mut self) {
    if self.phase == QueryPhase::Loading {
      return;
    }
    if self.phase == QueryPhase::Ready && !self.is_stale() {
      return;
    }
    self.start_fetch();
  }

  /// Force a new fetch. A pending result, if any, is discarded; the
  /// underlying network call is not cancelled.
  pub fn refetch(&mut self) {
    self.pending = None;
    self.start_fetch();
  }

  /// Drain the pending result, if one has arrived. Returns `true` when the
  /// state changed; call from the host's event loop tick.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.pending else {
      return false;
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.data = Some(data);
        self.error = None;
        self.phase = QueryPhase::Ready;
        self.fetched_at = Some(Instant::now());
        self.pending = None;
        true
      }
      Ok(Err(error)) => {
        self.error = Some(error);
        self.phase = QueryPhase::Failed;
        self.pending = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.error = Some(Error::Unknown("fetch task dropped its result".into()));
        self.phase = QueryPhase::Failed;
        self.pending = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = oneshot::channel();
    self.pending = Some(rx);
    self.phase = QueryPhase::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      // The receiver may have been dropped by a refetch; nothing to do then
      let _ = tx.send(future.await);
    });
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("phase", &self.phase)
      .field("has_data", &self.data.is_some())
      .field("error", &self.error)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
