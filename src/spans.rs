// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for gateway operations.
//!
//! Instrumented operations do not carry `#[instrument]` attributes. Each has
//! a span helper here instead, and the operation body runs inside it:
//!
//! ```rust,ignore
//! pub async fn my_operation(&self, param: Type) -> Result<T> {
//!     let span = spans::my_operation(&param);
//!     async move {
//!         // Business logic here
//!     }
//!     .instrument(span)
//!     .await
//! }
//! ```

use tracing::{Level, Span};

use crate::cache::CacheKey;
use crate::types::AccountId;

/// Span for one upstream fetch owned by the query cache.
///
/// Parent: none (the fetch runs on its own task)
/// Children: ledger_view
#[inline]
pub(crate) fn cache_fetch(key: &CacheKey, generation: u64) -> Span {
    tracing::debug_span!("gateway.cache_fetch", key = %key, generation = generation)
}

/// Span for choosing the signing identity of a mutating call.
///
/// Parent: the gateway operation span
#[inline]
pub(crate) fn resolve_signer(account_id: Option<&AccountId>, explicit_key: bool) -> Span {
    tracing::debug_span!(
        "gateway.resolve_signer",
        account_id = account_id.map(AccountId::as_str).unwrap_or(""),
        explicit_key = explicit_key,
    )
}

/// Span for a `call_function` query.
///
/// Parent: cache_fetch
/// Children: rpc_call
#[inline]
pub(crate) fn ledger_view(contract: &AccountId, method: &str) -> Span {
    tracing::debug_span!("ledger.view", contract = %contract, method = method)
}

/// Span for signing and broadcasting a function call.
///
/// Parent: the gateway operation span
/// Children: rpc_call (access key lookup, broadcast)
#[inline]
pub(crate) fn ledger_submit(signer: &AccountId, contract: &AccountId, method: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "ledger.submit",
        signer = %signer,
        contract = %contract,
        method = method,
    )
}

/// Span for creating and funding a sub-account.
#[inline]
pub(crate) fn ledger_create_account(funder: &AccountId, new_account: &AccountId) -> Span {
    tracing::span!(
        Level::INFO,
        "ledger.create_account",
        funder = %funder,
        new_account = %new_account,
    )
}

/// Span for a cached contract view requested through the gateway.
///
/// Parent: None (root span for this operation)
#[inline]
pub(crate) fn gateway_view(contract: &AccountId, method: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "gateway.view",
        contract = %contract,
        method = method,
        cache_status = tracing::field::Empty,
    )
}

/// Span for a signed function call requested through the gateway.
#[inline]
pub(crate) fn gateway_call(contract: &AccountId, method: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "gateway.call",
        contract = %contract,
        method = method,
        tx_hash = tracing::field::Empty,
    )
}

/// Span for minting an NFT.
#[inline]
pub(crate) fn mint_nft(contract: &AccountId, token_id: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "gateway.mint_nft",
        contract = %contract,
        token_id = token_id,
        tx_hash = tracing::field::Empty,
    )
}

/// Span for transferring an NFT.
#[inline]
pub(crate) fn transfer_nft(contract: &AccountId, token_id: &str, receiver: &AccountId) -> Span {
    tracing::span!(
        Level::INFO,
        "gateway.transfer_nft",
        contract = %contract,
        token_id = token_id,
        receiver = %receiver,
        tx_hash = tracing::field::Empty,
    )
}

/// Span for creating a server-managed user account.
#[inline]
pub(crate) fn create_user(account_id: &AccountId) -> Span {
    tracing::span!(Level::INFO, "gateway.create_user", account_id = %account_id)
}
