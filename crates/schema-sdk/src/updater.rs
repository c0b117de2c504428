//! Schema fetch scheduling and version-change detection.
//!
//! `SchemaUpdater` decides when to fetch, guarantees a single fetch in
//! flight, and applies fetched documents:
//!
//! ```text
//! UNINITIALIZED ──refresh/start_polling──▶ HYDRATING ──success──▶ READY
//!       ▲                                      │                  │  ▲
//!       └───────────────failure────────────────┘                  └──┘
//!                                                          every later fetch
//! ```
//!
//! Polling is orthogonal to the state: a timer re-runs the fetch/compare
//! sequence every TTL while [`SchemaUpdater::is_polling`] is true.
//!
//! On a version change the document is swapped, the cache cleared and the
//! version recorded under one lock, then listeners are notified. An
//! unchanged version leaves document, cache and listeners untouched. A
//! failed fetch leaves everything untouched: stale data beats no data.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::cache::Cache;
use crate::config::{SdkOptions, UpdateMode, millis};
use crate::document::SchemaDocument;
use crate::error::{FetchError, Result, SchemaError};
use crate::events::{ChangeListeners, SchemaChange};
use crate::raw_data::RawDataWrapper;
use crate::source::SchemaSource;

/// Lifecycle state of the updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// No document yet and no fetch running.
    Uninitialized,
    /// The first fetch is in flight.
    Hydrating,
    /// A document is being served.
    Ready,
}

/// What caused a fetch. Recorded on the fetch span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Refresh,
    Poll,
    Startup,
    Ready,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTrigger::Refresh => "refresh",
            RefreshTrigger::Poll => "poll",
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Ready => "ready",
        }
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and policy of an updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterSettings {
    pub mode: UpdateMode,
    pub ttl: Duration,
    pub fetch_timeout: Duration,
}

impl From<&SdkOptions> for UpdaterSettings {
    fn from(options: &SdkOptions) -> Self {
        Self {
            mode: options.update_mode,
            ttl: options.ttl(),
            fetch_timeout: options.fetch_timeout(),
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<()>>>;

#[derive(Debug, Clone)]
enum Readiness {
    Pending,
    Ready,
    Failed(SchemaError),
}

struct Bookkeeping {
    state: UpdaterState,
    current_version: Option<String>,
    last_fetch: Option<Instant>,
    pending: Option<SharedFetch>,
}

#[derive(Default)]
struct PollState {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct UpdaterInner {
    settings: UpdaterSettings,
    source: Option<Arc<dyn SchemaSource>>,
    raw: Arc<RawDataWrapper>,
    cache: Arc<Cache>,
    listeners: Arc<ChangeListeners>,
    book: Mutex<Bookkeeping>,
    poll: Mutex<PollState>,
    ready: watch::Sender<Readiness>,
    fetches: AtomicU64,
}

/// Fetch scheduler and version-change detector.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SchemaUpdater {
    inner: Arc<UpdaterInner>,
}

impl SchemaUpdater {
    /// Creates an updater over `raw` and `cache`.
    ///
    /// If `raw` is already hydrated the updater starts `Ready`, with the
    /// pre-seeded document counting as fetched now.
    pub fn new(
        settings: UpdaterSettings,
        source: Option<Arc<dyn SchemaSource>>,
        raw: Arc<RawDataWrapper>,
        cache: Arc<Cache>,
        listeners: Arc<ChangeListeners>,
    ) -> Result<Self> {
        let seeded = match raw.snapshot() {
            Ok(document) => Some(document.effective_version()?),
            Err(_) => None,
        };

        let (state, readiness, last_fetch) = match &seeded {
            Some(_) => (UpdaterState::Ready, Readiness::Ready, Some(Instant::now())),
            None => (UpdaterState::Uninitialized, Readiness::Pending, None),
        };
        let (ready, _) = watch::channel(readiness);

        Ok(Self {
            inner: Arc::new(UpdaterInner {
                settings,
                source,
                raw,
                cache,
                listeners,
                book: Mutex::new(Bookkeeping {
                    state,
                    current_version: seeded,
                    last_fetch,
                    pending: None,
                }),
                poll: Mutex::new(PollState::default()),
                ready,
                fetches: AtomicU64::new(0),
            }),
        })
    }

    /// Fetches the schema if it is due.
    ///
    /// In stale mode nothing is fetched while the last successful fetch is
    /// younger than the TTL. In poll mode an explicit refresh always
    /// fetches. Either way a caller arriving while a fetch is in flight
    /// shares that fetch and its outcome.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the current document stays in place and the
    /// next call retries.
    pub async fn refresh(&self) -> Result<()> {
        let force = self.inner.settings.mode == UpdateMode::Poll;
        let result = Arc::clone(&self.inner)
            .refresh(RefreshTrigger::Refresh, force)
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "Schema refresh failed; serving current document");
        }
        result
    }

    /// Resolves once a document has been hydrated.
    ///
    /// Starts the first fetch itself unless polling is already taking care
    /// of it.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed first fetch, or `NotHydrated` when
    /// no source is configured and no document was pre-seeded.
    pub async fn ready(&self) -> Result<()> {
        let mut rx = self.inner.ready.subscribe();
        loop {
            if self.inner.raw.is_hydrated() {
                return Ok(());
            }

            let pending = self.inner.book.lock().pending.clone();
            if let Some(pending) = pending {
                pending.await?;
                continue;
            }

            if self.is_polling() {
                if rx.changed().await.is_err() {
                    return Err(SchemaError::NotHydrated);
                }
                if let Readiness::Failed(err) = &*rx.borrow_and_update() {
                    return Err(err.clone());
                }
                continue;
            }

            Arc::clone(&self.inner)
                .refresh(RefreshTrigger::Ready, false)
                .await?;
            return if self.inner.raw.is_hydrated() {
                Ok(())
            } else {
                Err(SchemaError::NotHydrated)
            };
        }
    }

    /// Starts polling: fetches now, then every TTL.
    ///
    /// Resolves with the outcome of the first fetch. Calling it while
    /// already polling starts no second timer and resolves once the schema
    /// is ready.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` outside poll mode, or the error of
    /// the first fetch. Polling keeps running after a failed first fetch.
    pub async fn start_polling(&self) -> Result<()> {
        if self.inner.settings.mode != UpdateMode::Poll {
            return Err(SchemaError::invalid_configuration(
                "start_polling requires update_mode `poll`",
            ));
        }
        if self.inner.source.is_none() {
            debug!("No schema source configured; polling not started");
            return Ok(());
        }

        let started = {
            let mut poll = self.inner.poll.lock();
            if poll.task.is_some() {
                false
            } else {
                poll.generation += 1;
                let task = tokio::spawn(poll_loop(
                    Arc::downgrade(&self.inner),
                    poll.generation,
                    self.inner.settings.ttl,
                ));
                poll.task = Some(task);
                true
            }
        };

        if !started {
            debug!("Schema polling already running");
            return self.ready().await;
        }

        info!(
            interval_ms = millis(self.inner.settings.ttl),
            "Started schema polling"
        );
        Arc::clone(&self.inner)
            .refresh(RefreshTrigger::Startup, true)
            .await
    }

    /// Stops polling. No tick that has not fired yet will fetch.
    ///
    /// A fetch already in flight completes and is applied. No-op when not
    /// polling.
    pub fn stop_polling(&self) {
        let mut poll = self.inner.poll.lock();
        if let Some(task) = poll.task.take() {
            poll.generation += 1;
            task.abort();
            info!("Stopped schema polling");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poll.lock().task.is_some()
    }

    pub fn state(&self) -> UpdaterState {
        self.inner.book.lock().state
    }

    /// Version of the document being served.
    pub fn current_version(&self) -> Option<String> {
        self.inner.book.lock().current_version.clone()
    }

    pub fn mode(&self) -> UpdateMode {
        self.inner.settings.mode
    }

    /// Number of fetches issued against the source so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for SchemaUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaUpdater")
            .field("mode", &self.inner.settings.mode)
            .field("state", &self.state())
            .field("current_version", &self.current_version())
            .field("polling", &self.is_polling())
            .finish()
    }
}

impl UpdaterInner {
    async fn refresh(self: Arc<Self>, trigger: RefreshTrigger, force: bool) -> Result<()> {
        let Some(source) = self.source.clone() else {
            debug!(%trigger, "No schema source configured; nothing to fetch");
            return Ok(());
        };

        match self.begin_fetch(source, trigger, force) {
            Some(fetch) => fetch.await,
            None => Ok(()),
        }
    }

    /// Returns the fetch to wait on, joining the in-flight one if any;
    /// `None` when the current document is still fresh.
    fn begin_fetch(
        self: &Arc<Self>,
        source: Arc<dyn SchemaSource>,
        trigger: RefreshTrigger,
        force: bool,
    ) -> Option<SharedFetch> {
        let mut book = self.book.lock();

        if let Some(pending) = &book.pending {
            debug!(%trigger, "Joining in-flight schema fetch");
            return Some(pending.clone());
        }

        if !force
            && let Some(last_fetch) = book.last_fetch
            && last_fetch.elapsed() < self.settings.ttl
        {
            debug!(%trigger, "Schema within TTL; serving current document");
            return None;
        }

        let fetch = self.spawn_fetch(source, trigger);
        book.pending = Some(fetch.clone());
        if book.state == UpdaterState::Uninitialized {
            book.state = UpdaterState::Hydrating;
        }
        Some(fetch)
    }

    /// Runs the fetch on its own task so it completes even if every
    /// caller stops waiting.
    fn spawn_fetch(self: &Arc<Self>, source: Arc<dyn SchemaSource>, trigger: RefreshTrigger) -> SharedFetch {
        let span = info_span!(
            "schema_fetch",
            source = source.name(),
            trigger = trigger.as_str()
        );
        let inner = Arc::clone(self);
        let task = tokio::spawn(
            async move {
                let result = inner.fetch_and_apply(source.as_ref()).await;
                inner.finish_fetch(&result);
                result
            }
            .instrument(span),
        );

        let weak = Arc::downgrade(self);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    let err = SchemaError::from(FetchError::Network(format!(
                        "schema fetch task failed: {join_error}"
                    )));
                    if let Some(inner) = weak.upgrade() {
                        inner.finish_fetch(&Err(err.clone()));
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn fetch_and_apply(&self, source: &dyn SchemaSource) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let timeout = self.settings.fetch_timeout;

        let document = match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(timeout).into()),
        };
        let version = document.effective_version()?;
        self.apply(document, version);
        Ok(())
    }

    fn apply(&self, document: SchemaDocument, version: String) {
        let change = {
            let mut book = self.book.lock();
            book.last_fetch = Some(Instant::now());

            if book.current_version.as_deref() == Some(version.as_str()) {
                debug!(%version, "Fetched schema version unchanged");
                None
            } else {
                let document = Arc::new(document);
                self.raw.hydrate(Arc::clone(&document));
                self.cache.clear();
                let old_version = book.current_version.replace(version.clone());
                book.state = UpdaterState::Ready;
                Some(SchemaChange {
                    old_version,
                    new_version: version,
                    schema_data: document,
                })
            }
        };

        if let Some(change) = change {
            info!(
                old_version = ?change.old_version,
                new_version = %change.new_version,
                "Schema version changed"
            );
            self.ready.send_replace(Readiness::Ready);
            self.listeners.emit(&change);
        }
    }

    fn finish_fetch(&self, result: &Result<()>) {
        let mut book = self.book.lock();
        book.pending = None;

        if let Err(err) = result {
            debug!(error = %err, "Schema fetch failed");
            if book.current_version.is_none() {
                book.state = UpdaterState::Uninitialized;
                self.ready.send_replace(Readiness::Failed(err.clone()));
            }
        }
    }
}

impl Drop for UpdaterInner {
    fn drop(&mut self) {
        if let Some(task) = self.poll.get_mut().task.take() {
            task.abort();
        }
    }
}

/// Fetches every `period` until stopped or until the updater is dropped.
///
/// Failures are logged and swallowed; the next tick retries.
async fn poll_loop(inner: Weak<UpdaterInner>, generation: u64, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.poll.lock().generation != generation {
            break;
        }

        if let Err(err) = Arc::clone(&inner).refresh(RefreshTrigger::Poll, true).await {
            error!(error = %err, "Scheduled schema fetch failed; retrying on next tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Replays scripted responses; repeats the last one when exhausted.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<SchemaDocument>>>,
        last: Mutex<Option<Result<SchemaDocument>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<SchemaDocument>>) -> Arc<Self> {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(responses: Vec<Result<SchemaDocument>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SchemaSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<SchemaDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.responses.lock().pop_front();
            match next {
                Some(response) => {
                    *self.last.lock() = Some(response.clone());
                    response
                }
                None => self
                    .last
                    .lock()
                    .clone()
                    .unwrap_or(Err(SchemaError::NotHydrated)),
            }
        }
    }

    fn doc(version: &str) -> SchemaDocument {
        SchemaDocument {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    fn network_error() -> SchemaError {
        FetchError::Network("connection refused".into()).into()
    }

    struct Harness {
        updater: SchemaUpdater,
        raw: Arc<RawDataWrapper>,
        cache: Arc<Cache>,
        listeners: Arc<ChangeListeners>,
    }

    fn harness(mode: UpdateMode, ttl_ms: u64, source: Arc<ScriptedSource>) -> Harness {
        harness_with_raw(mode, ttl_ms, source, RawDataWrapper::new())
    }

    fn harness_with_raw(
        mode: UpdateMode,
        ttl_ms: u64,
        source: Arc<ScriptedSource>,
        raw: RawDataWrapper,
    ) -> Harness {
        let raw = Arc::new(raw);
        let cache = Arc::new(Cache::new());
        let listeners = Arc::new(ChangeListeners::new());
        let settings = UpdaterSettings {
            mode,
            ttl: Duration::from_millis(ttl_ms),
            fetch_timeout: Duration::from_secs(1),
        };
        let updater = SchemaUpdater::new(
            settings,
            Some(source as Arc<dyn SchemaSource>),
            Arc::clone(&raw),
            Arc::clone(&cache),
            Arc::clone(&listeners),
        )
        .unwrap();
        Harness {
            updater,
            raw,
            cache,
            listeners,
        }
    }

    fn count_changes(listeners: &ChangeListeners) -> Arc<AtomicUsize> {
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        listeners.add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        changes
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_single_fetch() {
        let source = ScriptedSource::with_delay(vec![Ok(doc("v1"))], Duration::from_millis(20));
        let h = harness(UpdateMode::Stale, 100, Arc::clone(&source));

        let results = futures_util::future::join_all((0..8).map(|_| h.updater.refresh())).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(source.calls(), 1);
        assert_eq!(h.updater.current_version().as_deref(), Some("v1"));
        assert_eq!(h.updater.state(), UpdaterState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_mode_respects_ttl() {
        let source = ScriptedSource::new(vec![Ok(doc("v1"))]);
        let h = harness(UpdateMode::Stale, 100, Arc::clone(&source));

        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_millis(50)).await;
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_millis(51)).await;
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_version_is_noop() {
        let source = ScriptedSource::new(vec![Ok(doc("v1")), Ok(doc("v1"))]);
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));
        let changes = count_changes(&h.listeners);

        h.updater.refresh().await.unwrap();
        let snapshot = h.raw.snapshot().unwrap();
        let epoch = h.cache.epoch();
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(20)).await;
        h.updater.refresh().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(h.cache.epoch(), epoch);
        assert!(Arc::ptr_eq(&snapshot, &h.raw.snapshot().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_version_swaps_and_notifies() {
        let source = ScriptedSource::new(vec![Ok(doc("v1")), Ok(doc("v2"))]);
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));
        let mut rx = h.listeners.subscribe();

        h.updater.refresh().await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.old_version, None);
        assert_eq!(first.new_version, "v1");

        tokio::time::advance(Duration::from_millis(20)).await;
        h.updater.refresh().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.old_version.as_deref(), Some("v1"));
        assert_eq!(second.new_version, "v2");
        assert_eq!(second.schema_data.version.as_deref(), Some("v2"));
        assert_eq!(h.raw.get_version().as_deref(), Some("v2"));
        assert_eq!(h.cache.epoch(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_data_and_retries() {
        let source = ScriptedSource::new(vec![Ok(doc("v1")), Err(network_error()), Ok(doc("v2"))]);
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));

        h.updater.refresh().await.unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;

        let err = h.updater.refresh().await.unwrap_err();
        assert_eq!(err, network_error());
        assert_eq!(h.raw.get_version().as_deref(), Some("v1"));
        assert_eq!(h.updater.current_version().as_deref(), Some("v1"));
        assert_eq!(h.updater.state(), UpdaterState::Ready);

        // The failure released the in-flight slot and did not reset the TTL.
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 3);
        assert_eq!(h.raw.get_version().as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_failure() {
        let source =
            ScriptedSource::with_delay(vec![Err(network_error())], Duration::from_millis(5));
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));

        let (a, b) = tokio::join!(h.updater.refresh(), h.updater.refresh());
        assert_eq!(a.unwrap_err(), network_error());
        assert_eq!(b.unwrap_err(), network_error());
        assert_eq!(source.calls(), 1);
        assert_eq!(h.updater.state(), UpdaterState::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_releases_slot() {
        let source = ScriptedSource::with_delay(vec![Ok(doc("v1"))], Duration::from_secs(3600));
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));

        let err = h.updater.refresh().await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(Duration::from_secs(1)).into());

        let err = h.updater.refresh().await.unwrap_err();
        assert!(matches!(err, SchemaError::Fetch(FetchError::Timeout(_))));
        assert_eq!(source.calls(), 2);
        assert!(!h.raw.is_hydrated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_rejects_failed_first_fetch() {
        let source = ScriptedSource::new(vec![Err(network_error()), Ok(doc("v1"))]);
        let h = harness(UpdateMode::Stale, 10, Arc::clone(&source));

        assert_eq!(h.updater.ready().await.unwrap_err(), network_error());
        h.updater.ready().await.unwrap();
        assert_eq!(h.updater.current_version().as_deref(), Some("v1"));
        assert_eq!(source.calls(), 2);

        // Already hydrated: resolves without fetching.
        h.updater.ready().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_data_is_ready() {
        let source = ScriptedSource::new(vec![Ok(doc("v2"))]);
        let h = harness_with_raw(
            UpdateMode::Stale,
            100,
            Arc::clone(&source),
            RawDataWrapper::with_document(doc("v1")),
        );

        assert_eq!(h.updater.state(), UpdaterState::Ready);
        h.updater.ready().await.unwrap();
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 0);
        assert_eq!(h.updater.current_version().as_deref(), Some("v1"));

        tokio::time::advance(Duration::from_millis(101)).await;
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(h.updater.current_version().as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polling_requires_poll_mode() {
        let source = ScriptedSource::new(vec![Ok(doc("v1"))]);
        let h = harness(UpdateMode::Stale, 100, Arc::clone(&source));

        let err = h.updater.start_polling().await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfiguration(_)));
        assert!(!h.updater.is_polling());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_single_timer() {
        let source = ScriptedSource::new(vec![Ok(doc("v1"))]);
        let h = harness(UpdateMode::Poll, 100, Arc::clone(&source));

        h.updater.start_polling().await.unwrap();
        assert_eq!(source.calls(), 1);
        h.updater.start_polling().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert!(h.updater.is_polling());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_polling_halts_fetches() {
        let source = ScriptedSource::new(vec![Ok(doc("v1"))]);
        let h = harness(UpdateMode::Poll, 100, Arc::clone(&source));

        h.updater.stop_polling();
        h.updater.start_polling().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(source.calls(), 2);

        h.updater.stop_polling();
        h.updater.stop_polling();
        assert!(!h.updater.is_polling());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_do_not_stop_loop() {
        let source = ScriptedSource::new(vec![
            Ok(doc("v1")),
            Err(network_error()),
            Err(network_error()),
            Ok(doc("v2")),
        ]);
        let h = harness(UpdateMode::Poll, 100, Arc::clone(&source));
        let changes = count_changes(&h.listeners);

        h.updater.start_polling().await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(source.calls(), 4);
        assert!(h.updater.is_polling());
        assert_eq!(h.updater.current_version().as_deref(), Some("v2"));
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polling_surfaces_first_failure() {
        let source = ScriptedSource::new(vec![Err(network_error()), Ok(doc("v1"))]);
        let h = harness(UpdateMode::Poll, 100, Arc::clone(&source));

        assert_eq!(h.updater.start_polling().await.unwrap_err(), network_error());
        assert!(h.updater.is_polling());

        // The next tick hydrates and satisfies a waiting ready().
        h.updater.ready().await.unwrap();
        assert_eq!(h.updater.current_version().as_deref(), Some("v1"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_mode_refresh_fetches_immediately() {
        let source = ScriptedSource::new(vec![Ok(doc("v1")), Ok(doc("v2"))]);
        let h = harness(UpdateMode::Poll, 60_000, Arc::clone(&source));

        h.updater.refresh().await.unwrap();
        h.updater.refresh().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(h.updater.current_version().as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_updater_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(doc("v1"))]);
        let h = harness(UpdateMode::Poll, 100, Arc::clone(&source));

        h.updater.start_polling().await.unwrap();
        drop(h);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_no_source_ready_fails() {
        tokio_test::block_on(async {
            let updater = SchemaUpdater::new(
                UpdaterSettings {
                    mode: UpdateMode::Stale,
                    ttl: Duration::from_secs(1),
                    fetch_timeout: Duration::from_secs(1),
                },
                None,
                Arc::new(RawDataWrapper::new()),
                Arc::new(Cache::new()),
                Arc::new(ChangeListeners::new()),
            )
            .unwrap();

            updater.refresh().await.unwrap();
            assert_eq!(updater.ready().await.unwrap_err(), SchemaError::NotHydrated);
        });
    }
}
