// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Token bucket limiting for outbound ledger RPC requests.
//!
//! Public RPC nodes throttle aggressively. Every request packet sent through
//! [`RateLimitService`] takes one token from a shared bucket and waits for a
//! refill when the bucket is empty. Clones of the layer share one bucket.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tower::Layer;
use tracing::trace;

/// A Tower layer limiting requests to `requests` per `period`.
///
/// Idle capacity accumulates up to `requests`, so a quiet client may burst.
///
/// # Example
///
/// ```rust,ignore
/// use ledger_gateway::transport::RateLimitLayer;
/// use alloy_rpc_client::ClientBuilder;
///
/// let client = ClientBuilder::default()
///     .layer(RateLimitLayer::per_second(10))
///     .http(rpc_url);
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    bucket: Arc<Mutex<TokenBucket>>,
}

impl RateLimitLayer {
    /// Allows `requests` per `period`. A zero request count is treated as one.
    ///
    /// ```rust
    /// use ledger_gateway::transport::RateLimitLayer;
    /// use std::time::Duration;
    ///
    /// let layer = RateLimitLayer::new(100, Duration::from_secs(60));
    /// ```
    pub fn new(requests: u32, period: Duration) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket::new(requests.max(1), period))),
        }
    }

    /// Allows `requests` per second.
    pub fn per_second(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(1))
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            bucket: Arc::clone(&self.bucket),
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    available: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(requests: u32, period: Duration) -> Self {
        let capacity = f64::from(requests);
        Self {
            capacity,
            available: capacity,
            refill_rate: capacity / period.as_secs_f64().max(f64::MIN_POSITIVE),
            last_refill: Instant::now(),
        }
    }

    /// Takes a token, or returns how long until one is available.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.available = (self.available + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.available;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }
}

/// Service produced by [`RateLimitLayer`].
#[derive(Clone, Debug)]
pub struct RateLimitService<S> {
    inner: S,
    bucket: Arc<Mutex<TokenBucket>>,
}

impl<S, Request> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request> + Clone + Send + 'static,
    S::Future: Send,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let bucket = Arc::clone(&self.bucket);
        // Take the readied service and leave a fresh clone in its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            loop {
                let taken = bucket.lock().await.take(Instant::now());
                match taken {
                    Ok(()) => break,
                    Err(wait) => {
                        trace!(wait_ms = wait.as_millis() as u64, "RPC rate limit reached, waiting");
                        tokio::time::sleep(wait).await;
                    }
                }
            }

            inner.call(request).await
        })
    }
}
