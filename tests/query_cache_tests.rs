// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Behavioural tests for the coalescing query cache
//!
//! Every test runs on a paused tokio clock so TTL and timeout boundaries are
//! exact.

use futures::future::join_all;
use ledger_gateway::cache::LATE_RESULT_WAIT_FACTOR;
use ledger_gateway::{CacheError, CacheKey, CacheSettings, CacheStatus, QueryCache};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{advance, sleep, Instant};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("node unavailable: {0}")]
struct NodeDown(&'static str);

type TestCache = QueryCache<String, NodeDown>;

fn cache(ttl: Duration, timeout: Duration) -> TestCache {
    QueryCache::new(CacheSettings {
        ttl,
        generation_timeout: timeout,
        max_entries: None,
    })
}

fn counter_key() -> CacheKey {
    CacheKey::view("counter.testnet", "get_num", &json!({}))
}

/// Fetch that counts its invocations, waits `delay`, then returns `value`.
fn counted(
    calls: &Arc<AtomicUsize>,
    delay: Duration,
    value: &'static str,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<String, NodeDown>> {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            sleep(delay).await;
            Ok(value.to_string())
        })
    }
}

/// Concurrent identical reads share one upstream request.
#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_coalesce() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    let reads = (0..50).map(|_| {
        cache.get(
            counter_key(),
            counted(&calls, Duration::from_millis(100), "42"),
        )
    });
    let results = join_all(reads).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1, "one upstream fetch for 50 callers");

    let mut misses = 0;
    for result in results {
        let cached = result.expect("fetch succeeded");
        assert_eq!(cached.value, "42");
        if cached.status == CacheStatus::Miss {
            misses += 1;
        } else {
            assert_eq!(cached.status, CacheStatus::Coalesced);
        }
    }
    assert_eq!(misses, 1, "exactly one caller started the fetch");

    let stats = cache.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced, 49);
    assert_eq!(stats.in_flight, 0);
}

/// An entry stays fresh until its TTL has fully elapsed.
#[tokio::test(start_paused = true)]
async fn test_ttl_boundary() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    let first = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v1"))
        .await
        .unwrap();
    assert_eq!(first.status, CacheStatus::Miss);

    advance(Duration::from_millis(9_900)).await;
    let hit = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v2"))
        .await
        .unwrap();
    assert_eq!(hit.status, CacheStatus::Hit);
    assert_eq!(hit.value, "v1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    advance(Duration::from_millis(200)).await;
    let refreshed = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v2"))
        .await
        .unwrap();
    assert_eq!(refreshed.status, CacheStatus::Miss);
    assert_eq!(refreshed.value, "v2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().await.expirations, 1);
}

/// The instant `created_at + ttl` still counts as fresh.
#[tokio::test(start_paused = true)]
async fn test_entry_fresh_at_exact_ttl() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v1"))
        .await
        .unwrap();

    advance(Duration::from_secs(10)).await;
    let at_ttl = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v2"))
        .await
        .unwrap();
    assert_eq!(at_ttl.status, CacheStatus::Hit);
    assert_eq!(at_ttl.value, "v1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    advance(Duration::from_millis(1)).await;
    let past_ttl = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "v2"))
        .await
        .unwrap();
    assert_eq!(past_ttl.status, CacheStatus::Miss);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// A hung fetch releases every waiter at the generation timeout and frees
/// the key for the next caller.
#[tokio::test(start_paused = true)]
async fn test_hung_fetch_times_out_and_frees_key() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(1));
    let started = Instant::now();

    let waiters = (0..5).map(|_| {
        cache.get(counter_key(), || async {
            std::future::pending::<Result<String, NodeDown>>().await
        })
    });
    let results = join_all(waiters).await;

    let waited = started.elapsed();
    assert!(
        waited >= Duration::from_secs(1) && waited < Duration::from_millis(1_050),
        "waiters released at the generation timeout, waited {waited:?}"
    );
    for result in results {
        assert!(matches!(
            result,
            Err(CacheError::FetchTimeout { after }) if after == Duration::from_secs(1)
        ));
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let next = cache
        .get(counter_key(), counted(&calls, Duration::from_millis(10), "fresh"))
        .await
        .unwrap();
    assert_eq!(next.status, CacheStatus::Miss);
    assert_eq!(next.value, "fresh");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats().await;
    assert_eq!(stats.timeouts, 1);
}

/// Every waiter on a failed fetch sees the same error and nothing is cached.
#[tokio::test(start_paused = true)]
async fn test_failures_fan_out_and_are_not_cached() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    let waiters = (0..10).map(|_| {
        let calls = Arc::clone(&calls);
        cache.get(counter_key(), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                sleep(Duration::from_millis(50)).await;
                Err::<String, _>(NodeDown("connection refused"))
            }
        })
    });

    for result in join_all(waiters).await {
        let err = result.expect_err("fetch failed");
        assert_eq!(err.upstream(), Some(&NodeDown("connection refused")));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let retry = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "recovered"))
        .await
        .unwrap();
    assert_eq!(retry.status, CacheStatus::Miss);
    assert_eq!(retry.value, "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = cache.stats().await;
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.entries, 1);
}

/// A fetch that finishes after its timeout still fills an empty slot.
#[tokio::test(start_paused = true)]
async fn test_late_result_fills_empty_slot() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(1));
    let calls = Arc::new(AtomicUsize::new(0));

    let timed_out = cache
        .get(counter_key(), counted(&calls, Duration::from_secs(3), "late"))
        .await;
    assert!(matches!(timed_out, Err(CacheError::FetchTimeout { .. })));

    sleep(Duration::from_millis(2_500)).await;

    let cached = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "unused"))
        .await
        .unwrap();
    assert_eq!(cached.status, CacheStatus::Hit);
    assert_eq!(cached.value, "late");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().await.late_fills, 1);
}

/// A late result never replaces a fresh entry written by a newer fetch.
#[tokio::test(start_paused = true)]
async fn test_late_result_does_not_overwrite_fresh_entry() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(1));
    let calls = Arc::new(AtomicUsize::new(0));

    let timed_out = cache
        .get(counter_key(), counted(&calls, Duration::from_secs(3), "stale"))
        .await;
    assert!(timed_out.is_err());

    let fresh = cache
        .get(counter_key(), counted(&calls, Duration::from_millis(100), "fresh"))
        .await
        .unwrap();
    assert_eq!(fresh.value, "fresh");

    sleep(Duration::from_secs(3)).await;

    let cached = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "unused"))
        .await
        .unwrap();
    assert_eq!(cached.status, CacheStatus::Hit);
    assert_eq!(cached.value, "fresh");
    assert_eq!(cache.stats().await.late_fills, 0);
}

/// A late result is discarded once the key has been invalidated.
#[tokio::test(start_paused = true)]
async fn test_late_result_discarded_after_invalidate() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(1));
    let calls = Arc::new(AtomicUsize::new(0));

    let timed_out = cache
        .get(counter_key(), counted(&calls, Duration::from_secs(3), "stale"))
        .await;
    assert!(timed_out.is_err());

    cache.invalidate(&counter_key()).await;
    sleep(Duration::from_secs(3)).await;

    let refetched = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "current"))
        .await
        .unwrap();
    assert_eq!(refetched.status, CacheStatus::Miss);
    assert_eq!(refetched.value, "current");
}

/// Invalidating one key leaves another key's late result alone.
#[tokio::test(start_paused = true)]
async fn test_invalidating_other_key_keeps_late_fill() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(1));
    let calls = Arc::new(AtomicUsize::new(0));
    let other = CacheKey::view("nft.testnet", "nft_token", &json!({ "token_id": "1" }));

    let timed_out = cache
        .get(counter_key(), counted(&calls, Duration::from_secs(3), "late"))
        .await;
    assert!(matches!(timed_out, Err(CacheError::FetchTimeout { .. })));

    cache.invalidate(&other).await;
    sleep(Duration::from_millis(2_500)).await;

    let cached = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "unused"))
        .await
        .unwrap();
    assert_eq!(cached.status, CacheStatus::Hit);
    assert_eq!(cached.value, "late");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().await.late_fills, 1);
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A fetch that never resolves is dropped once the late window closes.
#[tokio::test(start_paused = true)]
async fn test_never_resolving_fetch_is_dropped_after_late_window() {
    let timeout = Duration::from_secs(1);
    let cache = cache(Duration::from_secs(10), timeout);
    let dropped = Arc::new(AtomicBool::new(false));

    let flag = DropFlag(Arc::clone(&dropped));
    let timed_out = cache
        .get(counter_key(), move || async move {
            let _flag = flag;
            std::future::pending::<Result<String, NodeDown>>().await
        })
        .await;
    assert!(matches!(timed_out, Err(CacheError::FetchTimeout { .. })));

    let stats = cache.stats().await;
    assert_eq!(stats.detached, 1);
    assert_eq!(stats.in_flight, 0);
    assert!(!dropped.load(Ordering::SeqCst));

    sleep(timeout * LATE_RESULT_WAIT_FACTOR + Duration::from_millis(100)).await;

    let stats = cache.stats().await;
    assert_eq!(stats.detached, 0);
    assert_eq!(stats.late_fills, 0);
    assert!(dropped.load(Ordering::SeqCst), "fetch future was dropped");
}

/// Dropping the caller that started a fetch does not cancel it.
#[tokio::test(start_paused = true)]
async fn test_abandoned_caller_does_not_cancel_fetch() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        cache.get(counter_key(), counted(&calls, Duration::from_secs(1), "kept")),
    )
    .await;
    assert!(abandoned.is_err(), "caller gave up before the fetch finished");

    sleep(Duration::from_secs(1)).await;

    let cached = cache
        .get(counter_key(), counted(&calls, Duration::ZERO, "unused"))
        .await
        .unwrap();
    assert_eq!(cached.status, CacheStatus::Hit);
    assert_eq!(cached.value, "kept");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Different keys never share a fetch or an entry.
#[tokio::test(start_paused = true)]
async fn test_distinct_keys_are_independent() {
    let cache = cache(Duration::from_secs(10), Duration::from_secs(5));
    let calls = Arc::new(AtomicUsize::new(0));

    let a = CacheKey::view("counter.testnet", "get_num", &json!({"id": 1}));
    let b = CacheKey::view("counter.testnet", "get_num", &json!({"id": 2}));

    let (ra, rb) = tokio::join!(
        cache.get(a, counted(&calls, Duration::from_millis(10), "a")),
        cache.get(b, counted(&calls, Duration::from_millis(10), "b")),
    );

    assert_eq!(ra.unwrap().value, "a");
    assert_eq!(rb.unwrap().value, "b");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
