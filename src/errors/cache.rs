// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the coalescing query cache.

use std::sync::Arc;
use std::time::Duration;

/// Outcome of a cache fetch that did not produce a value.
///
/// Every waiter on the same in-flight fetch receives a clone of the same
/// error, so the upstream error is held behind an [`Arc`].
///
/// None of these outcomes are ever stored in the cache: the next caller for
/// the same key always starts a fresh fetch.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_gateway::{CacheError, QueryCache};
///
/// match cache.get(key, || fetch_view()).await {
///     Ok(cached) => println!("{}", cached.value),
///     Err(CacheError::FetchTimeout { after }) => {
///         eprintln!("upstream did not answer within {after:?}, retry later");
///     }
///     Err(CacheError::Upstream(e)) => eprintln!("upstream failed: {e}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E> {
    /// The upstream fetch failed. The error is propagated verbatim.
    #[error("{0}")]
    Upstream(Arc<E>),

    /// The fetch did not resolve within the generation timeout.
    ///
    /// This is retryable: the pending fetch has been dropped and the next
    /// call for the same key starts a new one.
    #[error("upstream fetch timed out after {after:?}")]
    FetchTimeout {
        /// The configured generation timeout
        after: Duration,
    },

    /// The task driving the fetch ended without reporting an outcome
    /// (it panicked or the runtime is shutting down).
    #[error("upstream fetch was aborted before completing")]
    FetchAborted,
}

impl<E> CacheError<E> {
    /// Returns true if a later call for the same key may succeed without any
    /// change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. } | Self::FetchAborted)
    }

    /// Returns the upstream error, if this is an upstream failure.
    pub fn upstream(&self) -> Option<&E> {
        match self {
            Self::Upstream(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

// Manual impl: derive would demand `E: Clone`, but the error is shared via Arc.
impl<E> Clone for CacheError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Upstream(e) => Self::Upstream(Arc::clone(e)),
            Self::FetchTimeout { after } => Self::FetchTimeout { after: *after },
            Self::FetchAborted => Self::FetchAborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_clone_shares_upstream_error() {
        let err: CacheError<Boom> = CacheError::Upstream(Arc::new(Boom));
        let cloned = err.clone();

        match (&err, &cloned) {
            (CacheError::Upstream(a), CacheError::Upstream(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected upstream errors"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        let timeout: CacheError<Boom> = CacheError::FetchTimeout {
            after: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(CacheError::<Boom>::FetchAborted.is_retryable());
        assert!(!CacheError::Upstream(Arc::new(Boom)).is_retryable());
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err: CacheError<Boom> = CacheError::Upstream(Arc::new(Boom));
        assert_eq!(err.to_string(), "boom");
        assert!(err.upstream().is_some());
    }
}
