// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Signing identity resolution for mutating calls
//!
//! Every mutating gateway operation asks [`SignerResolver::resolve`] for
//! exactly one [`SigningIdentity`] before anything is submitted. The first
//! matching rule wins:
//!
//! 1. explicit key and account id: the key is bound to that account, no lookup
//! 2. account id equal to the configured master: the master key
//! 3. account id alone: the record in the [`AccountStore`]
//! 4. nothing usable: [`ResolveError::MissingSigner`]
//!
//! A key supplied without an account id cannot be bound to anything and is
//! rejected as [`ResolveError::MissingSigner`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ledger_gateway::signer::{NetworkBinding, SignerResolver};
//! use ledger_gateway::store::MemoryAccountStore;
//!
//! let resolver = SignerResolver::new(Arc::new(MemoryAccountStore::new()), config.master.clone(), network);
//! let identity = resolver.resolve(None, config.master_account_id()).await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, Instrument};
use url::Url;

use crate::config::MasterAccount;
use crate::errors::ResolveError;
use crate::spans;
use crate::store::AccountStore;
use crate::types::AccountId;

mod key;

pub use key::{normalize_seed_phrase, PublicKey, SecretKey, NEAR_DERIVATION_PATH};

/// Which resolution rule produced a [`SigningIdentity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentitySource {
    /// Caller supplied the key alongside the account id
    Explicit,
    /// The process-configured master account
    Master,
    /// A record loaded from the account store
    Stored,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::Master => "master",
            Self::Stored => "stored",
        })
    }
}

/// Network an identity signs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBinding {
    /// Network id, e.g. `testnet`
    pub network_id: String,
    /// JSON-RPC endpoint transactions are submitted to
    pub rpc_url: Url,
}

impl NetworkBinding {
    pub fn new(network_id: impl Into<String>, rpc_url: Url) -> Self {
        Self {
            network_id: network_id.into(),
            rpc_url,
        }
    }
}

/// Account, key and network for one mutating call.
///
/// Built per call and dropped after use. Never persisted by the resolver.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    account_id: AccountId,
    key: SecretKey,
    network: NetworkBinding,
    source: IdentitySource,
}

impl SigningIdentity {
    pub fn new(
        account_id: AccountId,
        key: SecretKey,
        network: NetworkBinding,
        source: IdentitySource,
    ) -> Self {
        Self {
            account_id,
            key,
            network,
            source,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn network(&self) -> &NetworkBinding {
        &self.network
    }

    pub fn source(&self) -> IdentitySource {
        self.source
    }
}

/// Selects the signing identity for a mutating call.
///
/// Holds no mutable state. The account store is only read.
#[derive(Clone)]
pub struct SignerResolver {
    store: Arc<dyn AccountStore>,
    master: Option<MasterAccount>,
    network: NetworkBinding,
}

impl fmt::Debug for SignerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerResolver")
            .field("store", &self.store.name())
            .field("master", &self.master)
            .field("network", &self.network)
            .finish()
    }
}

impl SignerResolver {
    pub fn new(
        store: Arc<dyn AccountStore>,
        master: Option<MasterAccount>,
        network: NetworkBinding,
    ) -> Self {
        Self {
            store,
            master,
            network,
        }
    }

    /// Returns the configured master account id, if any.
    pub fn master_account_id(&self) -> Option<&AccountId> {
        self.master.as_ref().map(|m| &m.account_id)
    }

    pub fn network(&self) -> &NetworkBinding {
        &self.network
    }

    /// Resolves the identity for a call.
    ///
    /// A blank `explicit_key` counts as absent.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::MissingSigner`] without an account id
    /// - [`ResolveError::UnknownAccount`] when the store has no record
    /// - [`ResolveError::MalformedKey`] when the chosen key fails to parse
    /// - [`ResolveError::Store`] when the store cannot be read
    pub async fn resolve(
        &self,
        explicit_key: Option<&str>,
        account_id: Option<&AccountId>,
    ) -> Result<SigningIdentity, ResolveError> {
        let explicit_key = explicit_key.map(str::trim).filter(|k| !k.is_empty());
        let span = spans::resolve_signer(account_id, explicit_key.is_some());

        async move {
            let Some(account_id) = account_id else {
                return Err(ResolveError::MissingSigner);
            };

            let identity = if let Some(raw) = explicit_key {
                let key = SecretKey::from_str(raw)
                    .map_err(|e| ResolveError::malformed(IdentitySource::Explicit, e))?;
                self.identity(account_id.clone(), key, IdentitySource::Explicit)
            } else if let Some(master) = self
                .master
                .as_ref()
                .filter(|m| &m.account_id == account_id)
            {
                let key = SecretKey::from_str(&master.key)
                    .map_err(|e| ResolveError::malformed(IdentitySource::Master, e))?;
                self.identity(account_id.clone(), key, IdentitySource::Master)
            } else {
                let record = self.store.load(account_id).await?.ok_or_else(|| {
                    ResolveError::UnknownAccount {
                        account_id: account_id.clone(),
                    }
                })?;
                let key = record
                    .secret_key()
                    .map_err(|e| ResolveError::malformed(IdentitySource::Stored, e))?;
                self.identity(account_id.clone(), key, IdentitySource::Stored)
            };

            debug!(
                account_id = %identity.account_id,
                source = %identity.source,
                "Resolved signing identity"
            );
            Ok(identity)
        }
        .instrument(span)
        .await
    }

    /// Resolves the master identity.
    ///
    /// Returns `None` when no master account is configured.
    pub async fn resolve_master(&self) -> Option<Result<SigningIdentity, ResolveError>> {
        let master_id = self.master_account_id()?.clone();
        Some(self.resolve(None, Some(&master_id)).await)
    }

    fn identity(
        &self,
        account_id: AccountId,
        key: SecretKey,
        source: IdentitySource,
    ) -> SigningIdentity {
        SigningIdentity::new(account_id, key, self.network.clone(), source)
    }
}
