// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Coalescing TTL cache for upstream reads
//!
//! [`QueryCache::get`] serves a fresh entry if one exists, otherwise joins the
//! fetch already in flight for the same key, otherwise starts one. At most
//! one fetch per key is in flight at any time and every caller waiting on it
//! receives the same outcome.
//!
//! Fetches run on their own task. A caller that stops waiting (a client
//! disconnect, for instance) does not cancel the fetch other callers share.
//!
//! Only successes are stored. Upstream errors and generation timeouts are
//! handed to the waiters and forgotten, so the next call fetches again.
//!
//! # Late results
//!
//! When a fetch exceeds the generation timeout, its waiters are released with
//! [`CacheError::FetchTimeout`] and the key becomes free for a new fetch. The
//! timed-out fetch keeps running, detached, for up to
//! [`LATE_RESULT_WAIT_FACTOR`] more generation timeouts. If it succeeds in
//! that window, the key was not invalidated since, and no fresh entry has
//! appeared for the key in the meantime, its value is installed. A detached
//! fetch still pending when the window closes is dropped.
//!
//! # Examples
//!
//! ```rust,ignore
//! use ledger_gateway::cache::{CacheKey, CacheSettings, QueryCache};
//!
//! let cache: QueryCache<serde_json::Value, LedgerError> = QueryCache::new(CacheSettings::default());
//! let key = CacheKey::view("nft.testnet", "nft_token", &args);
//!
//! let cached = cache.get(key, || async move { ledger.view(&contract, "nft_token", &args).await }).await?;
//! println!("{} (from cache: {})", cached.value, cached.served_from_cache());
//! ```

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use crate::config::constants::defaults;
use crate::errors::CacheError;
use crate::spans;

mod key;

pub use key::{canonical_json, CacheKey, QueryKind};

/// Multiple of the generation timeout a detached fetch may keep running.
pub const LATE_RESULT_WAIT_FACTOR: u32 = 4;

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a successful result stays fresh
    pub ttl: Duration,
    /// How long one upstream fetch may run before its waiters are released
    pub generation_timeout: Duration,
    /// Upper bound on stored entries. `None` means unbounded.
    pub max_entries: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: defaults::CACHE_TTL,
            generation_timeout: defaults::GENERATION_TIMEOUT,
            max_entries: None,
        }
    }
}

/// How a [`Cached`] value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a fresh entry
    Hit,
    /// Joined a fetch another caller started
    Coalesced,
    /// This call started the fetch
    Miss,
}

impl CacheStatus {
    /// Value used for the `x-cache-status` response header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Coalesced => "COALESCED",
            Self::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header_value())
    }
}

/// A value returned by [`QueryCache::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub status: CacheStatus,
}

impl<V> Cached<V> {
    /// True when no upstream fetch was involved in producing this value.
    pub fn served_from_cache(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a fresh entry
    pub hits: u64,
    /// Calls that started an upstream fetch
    pub misses: u64,
    /// Calls that joined an in-flight fetch
    pub coalesced: u64,
    /// Entries found stale on lookup
    pub expirations: u64,
    /// Fetches that ended in an upstream error
    pub failures: u64,
    /// Fetches that exceeded the generation timeout
    pub timeouts: u64,
    /// Timed-out fetches whose late success was installed
    pub late_fills: u64,
    /// Entries removed to respect `max_entries`
    pub evictions: u64,
    /// Entries currently stored (fresh or not yet purged)
    pub entries: usize,
    /// Fetches currently in flight
    pub in_flight: usize,
    /// Timed-out fetches still running in the hope of a late result
    pub detached: usize,
}

impl CacheStats {
    /// Share of lookups that did not need their own upstream fetch, as a
    /// percentage (0.0 to 100.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            ((self.hits + self.coalesced) as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, misses={}, coalesced={}, expirations={}, failures={}, timeouts={}, entries={}, in_flight={}, detached={}, hit_rate={:.1}%",
            self.hits,
            self.misses,
            self.coalesced,
            self.expirations,
            self.failures,
            self.timeouts,
            self.entries,
            self.in_flight,
            self.detached,
            self.hit_rate()
        )
    }
}

type Outcome<V, E> = Result<V, CacheError<E>>;
type SharedOutcome<V, E> = Shared<oneshot::Receiver<Outcome<V, E>>>;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) <= self.ttl
    }
}

struct PendingFetch<V, E> {
    generation: u64,
    outcome: SharedOutcome<V, E>,
}

struct CacheState<V, E> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    pending: HashMap<CacheKey, PendingFetch<V, E>>,
    stats: CacheStats,
    next_generation: u64,
    /// Timed-out generations per key still allowed to install a late result
    detached: HashMap<CacheKey, HashSet<u64>>,
}

impl<V, E> Default for CacheState<V, E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashMap::new(),
            stats: CacheStats::default(),
            next_generation: 0,
            detached: HashMap::new(),
        }
    }
}

impl<V, E> CacheState<V, E> {
    /// Removes the pending fetch for `key` if it belongs to `generation`.
    fn release(&mut self, key: &CacheKey, generation: u64) -> bool {
        if self
            .pending
            .get(key)
            .is_some_and(|p| p.generation == generation)
        {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }

    fn detach(&mut self, key: CacheKey, generation: u64) {
        self.detached.entry(key).or_default().insert(generation);
    }

    /// Forgets a detached generation, returning whether it was still eligible
    /// to install its result.
    fn take_detached(&mut self, key: &CacheKey, generation: u64) -> bool {
        let Some(generations) = self.detached.get_mut(key) else {
            return false;
        };
        let eligible = generations.remove(&generation);
        if generations.is_empty() {
            self.detached.remove(key);
        }
        eligible
    }

    fn install(&mut self, key: CacheKey, value: V, ttl: Duration, max_entries: Option<usize>) {
        if let Some(max_entries) = max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
                self.make_room(max_entries);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    fn make_room(&mut self, max_entries: usize) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        self.stats.expirations += (before - self.entries.len()) as u64;

        while self.entries.len() >= max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| *key);

            match oldest {
                Some(key) => {
                    debug!(key = %key, "Evicting oldest cache entry");
                    self.entries.remove(&key);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }
}

/// Coalescing TTL cache over an upstream read of type `V` failing with `E`.
///
/// All state sits behind one mutex. It is held only for map updates, never
/// across an upstream call.
pub struct QueryCache<V, E> {
    settings: CacheSettings,
    state: Arc<Mutex<CacheState<V, E>>>,
}

impl<V, E> fmt::Debug for QueryCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<V, E> QueryCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Returns the value for `key`, calling `fetch` only if no fresh entry
    /// exists and no fetch for `key` is in flight.
    ///
    /// `fetch` is invoked at most once per call, and not at all when the
    /// call is served from cache or joins an in-flight fetch.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Upstream`] when the fetch failed
    /// - [`CacheError::FetchTimeout`] when it exceeded the generation timeout
    /// - [`CacheError::FetchAborted`] when the fetch task died
    pub async fn get<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached<V>, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get_with_ttl(key, self.settings.ttl, fetch).await
    }

    /// Like [`get`](Self::get), storing a successful result for `ttl`
    /// instead of the configured default.
    ///
    /// The TTL of the caller that starts a fetch applies. Callers joining
    /// that fetch share its entry as stored.
    pub async fn get_with_ttl<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<Cached<V>, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (generation, outcome, status, sender) = {
            let mut state = self.state.lock().await;
            let now = Instant::now();

            match state.entries.get(&key) {
                Some(entry) if entry.is_fresh(now) => {
                    let value = entry.value.clone();
                    state.stats.hits += 1;
                    debug!(key = %key, "Cache hit");
                    return Ok(Cached {
                        value,
                        status: CacheStatus::Hit,
                    });
                }
                Some(_) => {
                    state.entries.remove(&key);
                    state.stats.expirations += 1;
                    debug!(key = %key, "Cache entry expired");
                }
                None => {}
            }

            if let Some(pending) = state.pending.get(&key) {
                let joined = (pending.generation, pending.outcome.clone());
                state.stats.coalesced += 1;
                debug!(key = %key, generation = joined.0, "Joining in-flight fetch");
                (joined.0, joined.1, CacheStatus::Coalesced, None)
            } else {
                let generation = state.next_generation;
                state.next_generation += 1;

                let (tx, rx) = oneshot::channel();
                let outcome = rx.shared();
                state.pending.insert(
                    key,
                    PendingFetch {
                        generation,
                        outcome: outcome.clone(),
                    },
                );
                state.stats.misses += 1;
                debug!(key = %key, generation, "Cache miss, starting fetch");
                (generation, outcome, CacheStatus::Miss, Some(tx))
            }
        };

        if let Some(tx) = sender {
            self.spawn_fetch(key, generation, ttl, fetch(), tx);
        }

        match outcome.await {
            Ok(Ok(value)) => Ok(Cached { value, status }),
            Ok(Err(e)) => Err(e),
            Err(oneshot::Canceled) => {
                // The fetch task dropped its sender without answering.
                let mut state = self.state.lock().await;
                state.release(&key, generation);
                Err(CacheError::FetchAborted)
            }
        }
    }

    fn spawn_fetch<Fut>(
        &self,
        key: CacheKey,
        generation: u64,
        ttl: Duration,
        fetch: Fut,
        tx: oneshot::Sender<Outcome<V, E>>,
    ) where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let settings = self.settings;
        let span = spans::cache_fetch(&key, generation);

        tokio::spawn(
            async move {
                let mut fetch = Box::pin(fetch);

                match tokio::time::timeout(settings.generation_timeout, &mut fetch).await {
                    Ok(result) => {
                        let outcome = {
                            let mut state = state.lock().await;
                            let current = state.release(&key, generation);
                            match result {
                                Ok(value) => {
                                    if current {
                                        state.install(key, value.clone(), ttl, settings.max_entries);
                                    }
                                    Ok(value)
                                }
                                Err(e) => {
                                    state.stats.failures += 1;
                                    Err(CacheError::Upstream(Arc::new(e)))
                                }
                            }
                        };

                        if let Err(e) = &outcome {
                            debug!(key = %key, error = %DisplayOutcome(e), "Upstream fetch failed");
                        }
                        let _ = tx.send(outcome);
                    }
                    Err(_) => {
                        {
                            let mut state = state.lock().await;
                            if state.release(&key, generation) {
                                state.detach(key, generation);
                            }
                            state.stats.timeouts += 1;
                        }
                        warn!(
                            key = %key,
                            generation,
                            timeout_ms = settings.generation_timeout.as_millis() as u64,
                            "Upstream fetch exceeded generation timeout"
                        );
                        let _ = tx.send(Err(CacheError::FetchTimeout {
                            after: settings.generation_timeout,
                        }));

                        let late_window = settings
                            .generation_timeout
                            .saturating_mul(LATE_RESULT_WAIT_FACTOR);
                        let late = tokio::time::timeout(late_window, fetch).await;

                        let mut state = state.lock().await;
                        let eligible = state.take_detached(&key, generation);
                        match late {
                            Ok(Ok(value)) => {
                                let now = Instant::now();
                                let fresh_exists = state
                                    .entries
                                    .get(&key)
                                    .is_some_and(|e| e.is_fresh(now));

                                if eligible && !fresh_exists {
                                    state.install(key, value, ttl, settings.max_entries);
                                    state.stats.late_fills += 1;
                                    debug!(key = %key, generation, "Installed late fetch result");
                                }
                            }
                            Ok(Err(_)) => {
                                debug!(key = %key, generation, "Detached fetch failed");
                            }
                            Err(_) => {
                                warn!(
                                    key = %key,
                                    generation,
                                    window_ms = late_window.as_millis() as u64,
                                    "Dropping detached fetch that never resolved"
                                );
                            }
                        }
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Drops the entry for `key` and disowns any fetch still running for it.
    ///
    /// Callers already waiting on a disowned fetch still receive its outcome,
    /// but the result is not stored. Other keys are untouched.
    pub async fn invalidate(&self, key: &CacheKey) {
        let mut state = self.state.lock().await;
        state.entries.remove(key);
        state.pending.remove(key);
        state.detached.remove(key);
        debug!(key = %key, "Invalidated cache entry");
    }

    /// Drops every entry and disowns every running fetch.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        debug!(entries = state.entries.len(), "Clearing query cache");
        state.entries.clear();
        state.pending.clear();
        state.detached.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.pending.len(),
            detached: state.detached.values().map(HashSet::len).sum(),
            ..state.stats.clone()
        }
    }
}

/// Formats a cache error without requiring `E: Display` on the cache itself.
struct DisplayOutcome<'a, E>(&'a CacheError<E>);

impl<E> fmt::Display for DisplayOutcome<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            CacheError::Upstream(_) => f.write_str("upstream error"),
            CacheError::FetchTimeout { after } => write!(f, "timed out after {after:?}"),
            CacheError::FetchAborted => f.write_str("aborted"),
        }
    }
}
