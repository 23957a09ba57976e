// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! # ledger-gateway
//!
//! A REST gateway over a NEAR JSON-RPC node.
//!
//! Reads go through a coalescing TTL cache: concurrent identical views share
//! one upstream request and a successful result is reused until it expires.
//! Writes go through a signer resolver that picks exactly one signing
//! identity per call from an explicit key, the configured master account, or
//! a stored child-account key.
//!
//! ## Modules
//!
//! - [`cache`]: [`QueryCache`] and [`CacheKey`]
//! - [`signer`]: [`SignerResolver`], key parsing
//! - [`store`]: account key storage ([`DiskAccountStore`], [`MemoryAccountStore`])
//! - [`ledger`]: the [`Ledger`] capability and [`NearRpcLedger`]
//! - [`gateway`]: [`LedgerGateway`], the operations behind the HTTP routes
//! - [`api`]: axum router
//! - [`transport`]: Tower layers for the RPC client
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ledger_gateway::{bootstrap, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! let gateway = std::sync::Arc::new(bootstrap::build_gateway(&config));
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! ledger_gateway::api::serve_api(listener, gateway).await?;
//! ```

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod ledger;
pub mod signer;
pub mod store;
pub mod transport;
pub mod types;

mod spans;

pub use cache::{CacheKey, CacheSettings, CacheStats, CacheStatus, Cached, QueryCache, QueryKind};
pub use config::{GatewayConfig, GatewayConfigBuilder, MasterAccount};
pub use errors::{
    AccountIdError, CacheError, ConfigError, GatewayError, KeyError, LedgerError, ResolveError,
    StoreError,
};
pub use gateway::{
    CallRequest, CreatedUser, LedgerGateway, MintRequest, MintedToken, SeedPhraseKeys,
    TransferRequest, ViewNftRequest, ViewRequest,
};
pub use ledger::{FunctionCall, Ledger, NearRpcLedger, RpcSettings, TxOutcome};
pub use signer::{
    IdentitySource, NetworkBinding, PublicKey, SecretKey, SignerResolver, SigningIdentity,
};
pub use store::{AccountRecord, AccountStore, DiskAccountStore, MemoryAccountStore};
pub use types::{AccountId, Balance, FeeBudget, Gas};
