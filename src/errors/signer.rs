// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for key parsing and signer resolution.

use crate::signer::IdentitySource;
use crate::types::AccountId;

use super::StoreError;

/// Errors that can occur while parsing ed25519 key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key names a curve other than ed25519.
    #[error("unsupported key type `{curve}`")]
    UnsupportedCurve {
        /// The prefix found before the `:` separator
        curve: String,
    },

    /// The key body is not valid base58.
    #[error("key is not valid base58")]
    Base58(#[from] bs58::decode::Error),

    /// The decoded key is neither a 32-byte seed nor a 64-byte keypair.
    #[error("expected a 32 or 64 byte key, got {len} bytes")]
    InvalidLength {
        /// Decoded byte length
        len: usize,
    },

    /// The public half of a 64-byte keypair does not match its secret half.
    #[error("keypair halves do not match")]
    Mismatch(#[source] ed25519_dalek::SignatureError),

    /// The seed phrase is not a valid BIP39 mnemonic.
    #[error("invalid seed phrase")]
    SeedPhrase(#[from] bip39::Error),

    /// The derivation path is not of the form `m/44'/397'/0'`.
    #[error("invalid derivation path `{path}`, expected hardened segments like m/44'/397'/0'")]
    InvalidDerivationPath {
        /// The path as given
        path: String,
    },

    /// HMAC initialisation failed during key derivation.
    #[error("key derivation failed")]
    Derivation(#[from] hmac::digest::InvalidLength),
}

/// Reasons a mutating call cannot be given a signing identity.
///
/// All variants are terminal for the call; the resolver never retries.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_gateway::{ResolveError, SignerResolver};
///
/// match resolver.resolve(None, Some(&account_id)).await {
///     Ok(identity) => submit(identity).await,
///     Err(ResolveError::UnknownAccount { account_id }) => {
///         eprintln!("no stored key for {account_id}");
///     }
///     Err(e) => eprintln!("cannot sign: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No key was supplied and the account store has no record for the account.
    #[error("no stored signing key for account {account_id}")]
    UnknownAccount {
        /// The account that was looked up
        account_id: AccountId,
    },

    /// Neither a key nor an account identifier was supplied.
    #[error("a signer account id is required")]
    MissingSigner,

    /// Key material from the given source failed to parse.
    #[error("malformed {origin} key")]
    MalformedKey {
        /// Where the key material came from
        origin: IdentitySource,
        /// The parse failure
        #[source]
        source: KeyError,
    },

    /// The account store could not be read.
    #[error("account store lookup failed")]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub(crate) fn malformed(origin: IdentitySource, source: KeyError) -> Self {
        Self::MalformedKey { origin, source }
    }
}
