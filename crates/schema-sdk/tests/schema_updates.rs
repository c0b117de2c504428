mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{CountingSource, document, network_error, versioned};
use parking_lot::Mutex;
use schema_sdk::{
    SchemaError, SchemaSdk, SchemaSource, TypeOptions, UpdateMode, UpdaterState,
};

fn sdk(mode: UpdateMode, ttl_ms: u64, source: &Arc<CountingSource>) -> SchemaSdk {
    SchemaSdk::builder()
        .update_mode(mode)
        .ttl(Duration::from_millis(ttl_ms))
        .source(Arc::clone(source) as Arc<dyn SchemaSource>)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_issue_one_fetch() {
    let source = CountingSource::with_delay(vec![Ok(versioned("v1"))], Duration::from_millis(50));
    let sdk = sdk(UpdateMode::Stale, 1_000, &source);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let sdk = sdk.clone();
            tokio::spawn(async move { sdk.refresh().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(source.fetches(), 1);
    assert_eq!(sdk.version().as_deref(), Some("v1"));
}

#[tokio::test(start_paused = true)]
async fn stale_mode_ttl_scenario() {
    let source = CountingSource::new(vec![Ok(versioned("v1"))]);
    let sdk = sdk(UpdateMode::Stale, 100, &source);

    sdk.refresh().await.unwrap();
    assert_eq!(source.fetches(), 1);

    tokio::time::advance(Duration::from_millis(50)).await;
    sdk.refresh().await.unwrap();
    assert_eq!(source.fetches(), 1);

    tokio::time::advance(Duration::from_millis(51)).await;
    sdk.refresh().await.unwrap();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn poll_mode_same_version_fires_no_change() {
    let first = document(r#"{"version":"v1","schema":{"types":[{"name":"It"}]}}"#);
    let source = CountingSource::new(vec![Ok(first.clone()), Ok(first)]);
    let sdk = sdk(UpdateMode::Poll, 100, &source);

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    sdk.on_change(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    sdk.start_polling().await.unwrap();
    let it = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert_eq!(it.name, "It");
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(source.fetches(), 2);
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    // The cache survived the unchanged fetch.
    let again = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert!(Arc::ptr_eq(&it, &again));
    sdk.stop_polling();
}

#[tokio::test(start_paused = true)]
async fn unversioned_change_in_undeclared_field_is_signalled() {
    let source = CountingSource::new(vec![
        Ok(document(r#"{"schema":{"types":[{"name":"It","createPermissions":["a"]}]}}"#)),
        Ok(document(r#"{"schema":{"types":[{"name":"It","createPermissions":["b"]}]}}"#)),
    ]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    sdk.on_change(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    sdk.ready().await.unwrap();
    let first = sdk.version().unwrap();
    let before = sdk.get_type("It", TypeOptions::default()).unwrap();

    tokio::time::advance(Duration::from_millis(20)).await;
    sdk.refresh().await.unwrap();

    assert_eq!(source.fetches(), 2);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    assert_ne!(sdk.version().unwrap(), first);
    let after = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
}

#[tokio::test(start_paused = true)]
async fn panicking_handler_does_not_fail_the_refresh() {
    let source = CountingSource::new(vec![Ok(versioned("v1"))]);
    let sdk = sdk(UpdateMode::Stale, 1_000, &source);
    let mut rx = sdk.subscribe();

    sdk.on_change(|_| panic!("handler bug"), false);
    let later_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&later_calls);
    sdk.on_change(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    sdk.refresh().await.unwrap();

    assert_eq!(sdk.version().as_deref(), Some("v1"));
    assert_eq!(later_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rx.recv().await.unwrap().new_version, "v1");
    assert_eq!(sdk.state(), UpdaterState::Ready);
}

#[tokio::test(start_paused = true)]
async fn new_version_recomputes_and_rememoizes() {
    let source = CountingSource::new(vec![
        Ok(document(r#"{"version":"v1","schema":{"types":[{"name":"It","description":"old"}]}}"#)),
        Ok(document(r#"{"version":"v2","schema":{"types":[{"name":"It","description":"new"}]}}"#)),
    ]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);

    sdk.ready().await.unwrap();
    let before = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert_eq!(before.description.as_deref(), Some("old"));

    tokio::time::advance(Duration::from_millis(20)).await;
    sdk.refresh().await.unwrap();

    let after = sdk.get_type("It", TypeOptions::default()).unwrap();
    let again = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert_eq!(after.description.as_deref(), Some("new"));
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&after, &again));
}

#[tokio::test(start_paused = true)]
async fn change_handler_sees_new_data() {
    let source = CountingSource::new(vec![Ok(versioned("v1")), Ok(versioned("v2"))]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);
    sdk.ready().await.unwrap();
    // Warm the cache with v1 data.
    sdk.get_type("It", TypeOptions::default()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = sdk.clone();
    let log = Arc::clone(&seen);
    sdk.on_change(
        move |change| {
            let version_in_view = observer.version();
            let fresh = observer.raw_data().get_version();
            log.lock().push((
                change.old_version.clone(),
                change.new_version.clone(),
                version_in_view,
                fresh,
            ));
        },
        false,
    );

    tokio::time::advance(Duration::from_millis(20)).await;
    sdk.refresh().await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let (old, new, current, raw) = &seen[0];
    assert_eq!(old.as_deref(), Some("v1"));
    assert_eq!(new, "v2");
    assert_eq!(current.as_deref(), Some("v2"));
    assert_eq!(raw.as_deref(), Some("v2"));
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_is_caught_up() {
    let source = CountingSource::new(vec![Ok(versioned("v3"))]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);
    sdk.ready().await.unwrap();

    let replayed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&replayed);
    sdk.on_change(move |change| *slot.lock() = Some(change.new_version.clone()), true);
    assert_eq!(replayed.lock().as_deref(), Some("v3"));
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_serving_old_schema() {
    let source = CountingSource::new(vec![Ok(versioned("v1")), Err(network_error())]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);
    sdk.ready().await.unwrap();
    let before = sdk.get_type("It", TypeOptions::default()).unwrap();

    tokio::time::advance(Duration::from_millis(20)).await;
    assert_eq!(sdk.refresh().await.unwrap_err(), network_error());

    let after = sdk.get_type("It", TypeOptions::default()).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(sdk.version().as_deref(), Some("v1"));
    assert_eq!(sdk.state(), UpdaterState::Ready);
}

#[tokio::test(start_paused = true)]
async fn ready_rejects_when_first_fetch_fails() {
    let source = CountingSource::new(vec![Err(network_error())]);
    let sdk = sdk(UpdateMode::Stale, 10, &source);

    assert_eq!(sdk.ready().await.unwrap_err(), network_error());
    assert_eq!(
        sdk.get_type("It", TypeOptions::default()).unwrap_err(),
        SchemaError::NotHydrated
    );

    // A later success satisfies refresh callers.
    source.push(Ok(versioned("v1")));
    sdk.refresh().await.unwrap();
    sdk.ready().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn polling_twice_keeps_one_timer() {
    let source = CountingSource::new(vec![Ok(versioned("v1"))]);
    let sdk = sdk(UpdateMode::Poll, 100, &source);

    let (a, b) = tokio::join!(sdk.start_polling(), sdk.start_polling());
    a.unwrap();
    b.unwrap();
    assert_eq!(source.fetches(), 1);

    // Check halfway between ticks.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for tick in 1..=3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.fetches(), 1 + tick);
    }
    sdk.stop_polling();
}

#[tokio::test(start_paused = true)]
async fn stop_polling_halts_future_ticks() {
    let source = CountingSource::new(vec![Ok(versioned("v1"))]);
    let sdk = sdk(UpdateMode::Poll, 100, &source);

    sdk.init().await.unwrap();
    assert!(sdk.is_polling());
    sdk.stop_polling();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.fetches(), 1);
    assert!(!sdk.is_polling());
}

#[tokio::test(start_paused = true)]
async fn poll_tick_failures_are_swallowed() {
    let source = CountingSource::new(vec![
        Ok(versioned("v1")),
        Err(network_error()),
        Ok(versioned("v2")),
    ]);
    let sdk = sdk(UpdateMode::Poll, 100, &source);
    let mut changes = sdk.subscribe();

    sdk.start_polling().await.unwrap();
    assert_eq!(changes.recv().await.unwrap().new_version, "v1");

    let change = changes.recv().await.unwrap();
    assert_eq!(change.old_version.as_deref(), Some("v1"));
    assert_eq!(change.new_version, "v2");
    assert_eq!(source.fetches(), 3);
    assert!(sdk.is_polling());
    sdk.stop_polling();
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_and_frees_the_slot() {
    let source = CountingSource::with_delay(vec![Ok(versioned("v1"))], Duration::from_secs(60));
    let sdk = SchemaSdk::builder()
        .fetch_timeout(Duration::from_secs(2))
        .source(Arc::clone(&source) as Arc<dyn SchemaSource>)
        .build()
        .unwrap();

    let err = sdk.refresh().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("timed out"));

    sdk.refresh().await.unwrap_err();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn start_polling_in_stale_mode_is_rejected() {
    let source = CountingSource::new(vec![Ok(versioned("v1"))]);
    let sdk = sdk(UpdateMode::Stale, 100, &source);
    assert!(matches!(
        sdk.start_polling().await,
        Err(SchemaError::InvalidConfiguration(_))
    ));
}
