// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! ed25519 key parsing and encoding
//!
//! Keys travel as `ed25519:<base58>` strings. Secret keys are accepted in the
//! 64-byte keypair form (secret followed by public half) written by wallets
//! and by [`AccountRecord`](crate::store::AccountRecord), or as a bare 32-byte
//! seed.
//!
//! Keys can also be recovered from a BIP39 seed phrase. The phrase is turned
//! into a 64-byte seed and the account key is derived from it with SLIP-10
//! ed25519 at [`NEAR_DERIVATION_PATH`], the path NEAR wallets use.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;

use crate::errors::KeyError;

const CURVE_PREFIX: &str = "ed25519";

/// BIP44 path for NEAR keys (coin type 397).
pub const NEAR_DERIVATION_PATH: &str = "m/44'/397'/0'";

const HARDENED_OFFSET: u32 = 0x8000_0000;

type HmacSha512 = Hmac<Sha512>;

/// Lowercases a seed phrase and collapses its whitespace to single spaces.
pub fn normalize_seed_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses `m/44'/397'/0'` into child indices. SLIP-10 ed25519 only
/// defines hardened children, so every segment must end in `'`.
fn parse_derivation_path(path: &str) -> Result<Vec<u32>, KeyError> {
    let invalid = || KeyError::InvalidDerivationPath {
        path: path.to_string(),
    };

    let mut segments = path.trim().split('/');
    if segments.next() != Some("m") {
        return Err(invalid());
    }

    segments
        .map(|segment| {
            let index: u32 = segment
                .strip_suffix('\'')
                .and_then(|n| n.parse().ok())
                .ok_or_else(invalid)?;
            if index >= HARDENED_OFFSET {
                return Err(invalid());
            }
            Ok(index)
        })
        .collect()
}

/// HMAC-SHA512 over the concatenated `parts`, split into key and chain code.
fn hmac_halves(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), KeyError> {
    let mut mac = HmacSha512::new_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    let digest = mac.finalize().into_bytes();

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&digest[..32]);
    right.copy_from_slice(&digest[32..]);
    Ok((left, right))
}

/// SLIP-10 ed25519 derivation of the private key at `path` from `seed`.
fn derive_slip10(seed: &[u8], path: &str) -> Result<[u8; 32], KeyError> {
    let indices = parse_derivation_path(path)?;
    let (mut key, mut chain_code) = hmac_halves(b"ed25519 seed", &[seed])?;

    for index in indices {
        let child = (index | HARDENED_OFFSET).to_be_bytes();
        (key, chain_code) = hmac_halves(&chain_code, &[&[0u8], &key, &child])?;
    }
    Ok(key)
}

/// Strips quotes and whitespace and the optional curve prefix, then decodes base58.
fn decode_key_body(raw: &str) -> Result<Vec<u8>, KeyError> {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();

    let body = match trimmed.split_once(':') {
        Some((curve, body)) if curve.eq_ignore_ascii_case(CURVE_PREFIX) => body,
        Some((curve, _)) => {
            return Err(KeyError::UnsupportedCurve {
                curve: curve.to_string(),
            })
        }
        None => trimmed,
    };

    Ok(bs58::decode(body).into_vec()?)
}

/// An ed25519 signing key.
///
/// `Debug` never prints key material. Use [`SecretKey::to_encoded`] when the
/// key must be written out.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generates a key from the operating system RNG.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Recovers the account key for a BIP39 seed phrase at
    /// [`NEAR_DERIVATION_PATH`].
    ///
    /// Case and extra whitespace in the phrase are ignored. No BIP39
    /// passphrase is applied.
    ///
    /// # Errors
    ///
    /// [`KeyError::SeedPhrase`] when the phrase is not a valid English
    /// mnemonic (unknown word, bad length or checksum).
    pub fn from_seed_phrase(phrase: &str) -> Result<Self, KeyError> {
        Self::from_seed_phrase_at(phrase, NEAR_DERIVATION_PATH)
    }

    /// Like [`from_seed_phrase`](Self::from_seed_phrase), deriving at `path`.
    pub fn from_seed_phrase_at(phrase: &str, path: &str) -> Result<Self, KeyError> {
        let mnemonic = bip39::Mnemonic::parse_normalized(&normalize_seed_phrase(phrase))?;
        let seed = mnemonic.to_seed_normalized("");
        Self::from_slip10_seed(&seed, path)
    }

    /// Derives the key at `path` from a raw BIP32 seed.
    pub fn from_slip10_seed(seed: &[u8], path: &str) -> Result<Self, KeyError> {
        let secret = derive_slip10(seed, path)?;
        Ok(Self(SigningKey::from_bytes(&secret)))
    }

    /// Returns the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Signs `message`, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }

    /// Encodes the full keypair as `ed25519:<base58>`.
    pub fn to_encoded(&self) -> String {
        format!(
            "{CURVE_PREFIX}:{}",
            bs58::encode(self.0.to_keypair_bytes()).into_string()
        )
    }
}

impl FromStr for SecretKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_key_body(s)?;

        let key = match bytes.len() {
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(KeyError::Mismatch)?
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            len => return Err(KeyError::InvalidLength { len }),
        };

        Ok(Self(key))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey")
            .field(&format_args!("public={}", self.public_key()))
            .finish()
    }
}

/// An ed25519 public key, displayed as `ed25519:<base58>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Returns the raw 32 key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Verifies a raw 64-byte signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let signature = ed25519_dalek::Signature::from_bytes(signature);
        self.0.verify_strict(message, &signature).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CURVE_PREFIX}:{}",
            bs58::encode(self.0.as_bytes()).into_string()
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_key_body(s)?;
        let raw: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength { len: bytes.len() })?;
        VerifyingKey::from_bytes(&raw)
            .map(Self)
            .map_err(KeyError::Mismatch)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
