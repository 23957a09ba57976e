// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the ledger gateway.
//!
//! Each module has its own error type for fine-grained handling:
//!
//! - [`CacheError`] - outcomes of a coalesced cache fetch that produced no value
//! - [`ResolveError`] / [`KeyError`] - signer resolution and key parsing
//! - [`LedgerError`] - upstream JSON-RPC failures
//! - [`StoreError`] - account store I/O
//! - [`ConfigError`] - configuration loading
//! - [`AccountIdError`] - account id validation
//!
//! [`GatewayError`] unifies them for the gateway operations and the HTTP layer.
//! All module-specific errors convert into it via `From`, so `?` works
//! throughout [`LedgerGateway`](crate::LedgerGateway).

mod account;
mod cache;
mod config;
mod ledger;
mod signer;
mod store;

pub use account::AccountIdError;
pub use cache::CacheError;
pub use config::ConfigError;
pub use ledger::LedgerError;
pub use signer::{KeyError, ResolveError};
pub use store::StoreError;

/// Unified error type for gateway operations.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_gateway::{GatewayError, ResolveError};
///
/// match gateway.transfer_nft(request).await {
///     Ok(token) => println!("{token}"),
///     Err(GatewayError::Resolve(ResolveError::UnknownAccount { account_id })) => {
///         eprintln!("{account_id} has no stored key");
///     }
///     Err(GatewayError::TransactionFailed { tx_hash, .. }) => {
///         eprintln!("transaction {tx_hash} was not applied");
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A cached read failed or timed out.
    #[error(transparent)]
    Cache(#[from] CacheError<LedgerError>),

    /// No signing identity could be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An uncached upstream call failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The account store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Caller-supplied key material could not be used.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// A caller-supplied account id is invalid.
    #[error("invalid account id: {0}")]
    InvalidAccountId(#[from] AccountIdError),

    /// The request needs a default NFT contract but none is configured.
    #[error("no NFT contract given and none configured")]
    NftContractNotConfigured,

    /// The request needs the master account but none is configured.
    #[error("master account is not configured")]
    MasterAccountNotConfigured,

    /// The NFT contract has no token with this id.
    #[error("token {token_id} not found on {contract}")]
    TokenNotFound {
        /// Token id that was looked up
        token_id: String,
        /// Contract that was queried
        contract: String,
    },

    /// The transaction was included but its execution failed.
    #[error("transaction {tx_hash} was not applied: {failure}")]
    TransactionFailed {
        /// Hash of the failed transaction
        tx_hash: String,
        /// Failure payload reported by the node
        failure: String,
    },

    /// The request itself is malformed.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What is wrong with it
        reason: String,
    },
}
