// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the ledger gateway
//!
//! This module provides the process configuration: which RPC node to talk to,
//! which master account administers the deployment, how long view results are
//! cached, and where child-account keys are stored.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use ledger_gateway::GatewayConfig;
//!
//! // Public testnet RPC, no master account, 5s cache TTL
//! let config = GatewayConfig::default();
//! assert!(config.master.is_none());
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust
//! use ledger_gateway::GatewayConfigBuilder;
//! use std::time::Duration;
//!
//! let config = GatewayConfigBuilder::new()
//!     .cache_ttl(Duration::from_secs(10))
//!     .generation_timeout(Duration::from_secs(2))
//!     .rpc_rate_limit(20)
//!     .build();
//! assert_eq!(config.cache.ttl, Duration::from_secs(10));
//! ```
//!
//! # Example: From the environment
//!
//! ```rust,no_run
//! use ledger_gateway::GatewayConfig;
//!
//! // Reads `.env` if present, then RPC_NODE, MASTER_ACCOUNT_ID, ...
//! let config = GatewayConfig::from_env()?;
//! # Ok::<(), ledger_gateway::ConfigError>(())
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::cache::CacheSettings;
use crate::errors::ConfigError;
use crate::signer::SecretKey;
use crate::types::AccountId;

pub mod constants;

use constants::defaults;

/// Environment variable names read by [`GatewayConfig::from_env`].
pub mod env {
    /// RPC node URL
    pub const RPC_NODE: &str = "RPC_NODE";
    /// Network id (`testnet`, `mainnet`, ...)
    pub const NETWORK_ID: &str = "NETWORK_ID";
    /// Master account id
    pub const MASTER_ACCOUNT_ID: &str = "MASTER_ACCOUNT_ID";
    /// Master account private key (`ed25519:...`)
    pub const MASTER_KEY: &str = "MASTER_KEY";
    /// Default NFT contract
    pub const NFT_CONTRACT: &str = "NFT_CONTRACT";
    /// HTTP bind host
    pub const SERVER_HOST: &str = "SERVER_HOST";
    /// HTTP bind port
    pub const SERVER_PORT: &str = "SERVER_PORT";
    /// View cache TTL in seconds (fractions allowed)
    pub const CACHE_TTL_SECS: &str = "CACHE_TTL_SECS";
    /// Upstream fetch timeout in seconds (fractions allowed)
    pub const CACHE_GENERATION_TIMEOUT_SECS: &str = "CACHE_GENERATION_TIMEOUT_SECS";
    /// Maximum number of cached view results
    pub const CACHE_MAX_ENTRIES: &str = "CACHE_MAX_ENTRIES";
    /// Directory for stored account keys
    pub const ACCOUNT_STORAGE_DIR: &str = "ACCOUNT_STORAGE_DIR";
    /// Upstream requests per second
    pub const RPC_RATE_LIMIT: &str = "RPC_RATE_LIMIT";
    /// Log every RPC call (`true`/`false`)
    pub const RPC_LOGGING: &str = "RPC_LOGGING";
}

/// The operator-controlled master account.
///
/// The key is kept as configured and parsed when an identity is resolved.
/// `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterAccount {
    /// Master account id
    pub account_id: AccountId,
    /// Master private key, `ed25519:<base58>`
    pub key: String,
}

impl MasterAccount {
    /// Pairs an account id with its key.
    pub fn new(account_id: AccountId, key: impl Into<String>) -> Self {
        Self {
            account_id,
            key: key.into(),
        }
    }
}

impl fmt::Debug for MasterAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterAccount")
            .field("account_id", &self.account_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Configuration for the gateway process
///
/// Use [`GatewayConfigBuilder`] for a fluent API, or [`GatewayConfig::from_env`]
/// to load from environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// JSON-RPC endpoint of the ledger node
    pub rpc_url: Url,

    /// Network id bound into every signing identity
    pub network_id: String,

    /// Master account, if this deployment has one
    pub master: Option<MasterAccount>,

    /// NFT contract used when a request names none
    pub nft_contract: Option<AccountId>,

    /// HTTP bind host
    pub server_host: String,

    /// HTTP bind port
    pub server_port: u16,

    /// View cache lifetime and fetch timeout
    pub cache: CacheSettings,

    /// Directory holding stored child-account keys
    pub account_storage_dir: PathBuf,

    /// Upstream requests per second, `None` for unlimited
    pub rpc_rate_limit: Option<u32>,

    /// Whether every RPC call is logged
    pub rpc_logging: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse(defaults::RPC_URL).expect("default RPC URL is valid"),
            network_id: defaults::NETWORK_ID.to_string(),
            master: None,
            nft_contract: None,
            server_host: defaults::SERVER_HOST.to_string(),
            server_port: defaults::SERVER_PORT,
            cache: CacheSettings::default(),
            account_storage_dir: PathBuf::from(defaults::ACCOUNT_STORAGE_DIR),
            rpc_rate_limit: None,
            rpc_logging: true,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from the environment, reading `.env` first if present.
    ///
    /// Unset variables fall back to the defaults in [`constants::defaults`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any variable fails to parse, or if only
    /// one of `MASTER_ACCOUNT_ID` / `MASTER_KEY` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| dotenvy::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// This is the parsing half of [`from_env`](Self::from_env), usable in tests
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut builder = GatewayConfigBuilder::new();

        if let Some(raw) = get(env::RPC_NODE) {
            let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
                value: raw.clone(),
                source,
            })?;
            builder = builder.rpc_url(url);
        }
        if let Some(network) = get(env::NETWORK_ID) {
            builder = builder.network_id(network.trim());
        }

        match (get(env::MASTER_ACCOUNT_ID), get(env::MASTER_KEY)) {
            (Some(id), Some(key)) => {
                let account_id = parse_account_id(env::MASTER_ACCOUNT_ID, &id)?;
                builder = builder.master(MasterAccount::new(account_id, key.trim()));
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteMaster),
        }

        if let Some(raw) = get(env::NFT_CONTRACT) {
            builder = builder.nft_contract(parse_account_id(env::NFT_CONTRACT, &raw)?);
        }
        if let Some(host) = get(env::SERVER_HOST) {
            builder = builder.server_host(host.trim());
        }
        if let Some(raw) = get(env::SERVER_PORT) {
            builder = builder.server_port(parse_number(env::SERVER_PORT, &raw)?);
        }
        if let Some(raw) = get(env::CACHE_TTL_SECS) {
            builder = builder.cache_ttl(parse_seconds(env::CACHE_TTL_SECS, &raw)?);
        }
        if let Some(raw) = get(env::CACHE_GENERATION_TIMEOUT_SECS) {
            builder = builder.generation_timeout(parse_seconds(
                env::CACHE_GENERATION_TIMEOUT_SECS,
                &raw,
            )?);
        }
        if let Some(raw) = get(env::CACHE_MAX_ENTRIES) {
            builder = builder.max_cache_entries(parse_number(env::CACHE_MAX_ENTRIES, &raw)?);
        }
        if let Some(dir) = get(env::ACCOUNT_STORAGE_DIR) {
            builder = builder.account_storage_dir(dir.trim());
        }
        if let Some(raw) = get(env::RPC_RATE_LIMIT) {
            builder = builder.rpc_rate_limit(parse_number(env::RPC_RATE_LIMIT, &raw)?);
        }
        if let Some(raw) = get(env::RPC_LOGGING) {
            builder = builder.rpc_logging(parse_number(env::RPC_LOGGING, &raw)?);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that cannot be enforced by the types alone.
    ///
    /// Currently this verifies that the master key parses, so a bad key is
    /// reported at start-up rather than on the first master-signed call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(master) = &self.master {
            SecretKey::from_str(&master.key).map_err(ConfigError::InvalidMasterKey)?;
        }
        Ok(())
    }

    /// Returns the master account id, if configured.
    pub fn master_account_id(&self) -> Option<&AccountId> {
        self.master.as_ref().map(|m| &m.account_id)
    }

    /// Returns the `host:port` the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_account_id(var: &'static str, raw: &str) -> Result<AccountId, ConfigError> {
    AccountId::new(raw.trim()).map_err(|source| ConfigError::InvalidAccountId { var, source })
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_seconds(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_number(var, raw)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Builder for [`GatewayConfig`]
///
/// # Example
///
/// ```rust
/// use ledger_gateway::{AccountId, GatewayConfigBuilder, MasterAccount};
///
/// let master: AccountId = "master.testnet".parse().unwrap();
/// let config = GatewayConfigBuilder::new()
///     .master(MasterAccount::new(master.clone(), "ed25519:..."))
///     .nft_contract("nft.master.testnet".parse().unwrap())
///     .build();
/// assert_eq!(config.master_account_id(), Some(&master));
/// ```
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the RPC node URL
    pub fn rpc_url(mut self, url: Url) -> Self {
        self.config.rpc_url = url;
        self
    }

    /// Set the network id
    pub fn network_id(mut self, network_id: impl Into<String>) -> Self {
        self.config.network_id = network_id.into();
        self
    }

    /// Set the master account
    pub fn master(mut self, master: MasterAccount) -> Self {
        self.config.master = Some(master);
        self
    }

    /// Set the default NFT contract
    pub fn nft_contract(mut self, contract: AccountId) -> Self {
        self.config.nft_contract = Some(contract);
        self
    }

    /// Set the HTTP bind host
    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.config.server_host = host.into();
        self
    }

    /// Set the HTTP bind port
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Set how long view results are cached
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache.ttl = ttl;
        self
    }

    /// Set how long one upstream fetch may run
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.cache.generation_timeout = timeout;
        self
    }

    /// Bound the number of cached view results
    pub fn max_cache_entries(mut self, max: usize) -> Self {
        self.config.cache.max_entries = Some(max);
        self
    }

    /// Set the account key storage directory
    pub fn account_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.account_storage_dir = dir.into();
        self
    }

    /// Limit upstream requests per second
    pub fn rpc_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.config.rpc_rate_limit = Some(requests_per_second);
        self
    }

    /// Enable or disable per-call RPC logging
    pub fn rpc_logging(mut self, enabled: bool) -> Self {
        self.config.rpc_logging = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
