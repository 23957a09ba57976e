// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Account key storage
//!
//! Child accounts created through the gateway have their keypairs generated
//! server-side and persisted so later mutating calls can name the account
//! without supplying a key. Two backends are provided:
//!
//! - [`DiskAccountStore`]: one `<account_id>.json` file per account (default)
//! - [`MemoryAccountStore`]: process-local map, for tests and ephemeral setups
//!
//! # Examples
//!
//! ```rust,ignore
//! use ledger_gateway::store::{AccountRecord, AccountStore, DiskAccountStore};
//!
//! let store = DiskAccountStore::new("storage");
//! let record = AccountRecord::generate("alice.master.testnet".parse()?);
//! store.save(&record).await?;
//! assert!(store.load(&record.account_id).await?.is_some());
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{KeyError, StoreError};
use crate::signer::SecretKey;
use crate::types::AccountId;

mod disk;
mod memory;

pub use disk::DiskAccountStore;
pub use memory::MemoryAccountStore;

/// A persisted account keypair.
///
/// The JSON layout (`account_id`, `public_key`, `private_key`, keys prefixed
/// with `ed25519:`) is the format existing storage directories already use.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account the keys belong to
    pub account_id: AccountId,
    /// `ed25519:<base58>` public key
    pub public_key: String,
    /// `ed25519:<base58>` 64-byte keypair
    pub private_key: String,
}

impl AccountRecord {
    /// Generates a fresh ed25519 keypair for `account_id`.
    pub fn generate(account_id: AccountId) -> Self {
        Self::from_secret(account_id, &SecretKey::generate())
    }

    /// Builds a record from an existing secret key.
    pub fn from_secret(account_id: AccountId, secret: &SecretKey) -> Self {
        Self {
            account_id,
            public_key: secret.public_key().to_string(),
            private_key: secret.to_encoded(),
        }
    }

    /// Parses the stored private key.
    pub fn secret_key(&self) -> Result<SecretKey, KeyError> {
        SecretKey::from_str(&self.private_key)
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Trait for account key storage backends
///
/// # Thread Safety
///
/// Implementations must support concurrent access from many request handlers.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Loads the record for `account_id`.
    ///
    /// Returns `Ok(None)` if no record exists. Errors are reserved for I/O
    /// failures and unreadable records.
    async fn load(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError>;

    /// Persists a record, replacing any existing record for the same account.
    async fn save(&self, record: &AccountRecord) -> Result<(), StoreError>;

    /// Returns a human-readable name for this backend, used in logs.
    fn name(&self) -> &'static str;
}
