// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Borsh wire encoding of NEAR transactions
//!
//! Only the actions the gateway submits are modelled. Action and key-type
//! tags follow the protocol's enum ordering, so they are written by hand
//! rather than derived.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use std::io;

use crate::signer::{PublicKey, SecretKey};
use crate::types::{AccountId, Balance, Gas};

const ED25519_TAG: u8 = 0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WirePublicKey([u8; 32]);

impl From<&PublicKey> for WirePublicKey {
    fn from(key: &PublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

impl BorshSerialize for WirePublicKey {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        ED25519_TAG.serialize(writer)?;
        self.0.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    CreateAccount,
    FunctionCall {
        method_name: String,
        args: Vec<u8>,
        gas: Gas,
        deposit: Balance,
    },
    Transfer {
        deposit: Balance,
    },
    /// Adds a full-access key.
    AddKey {
        public_key: WirePublicKey,
    },
}

impl Action {
    fn tag(&self) -> u8 {
        match self {
            Self::CreateAccount => 0,
            Self::FunctionCall { .. } => 2,
            Self::Transfer { .. } => 3,
            Self::AddKey { .. } => 5,
        }
    }
}

impl BorshSerialize for Action {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Self::CreateAccount => Ok(()),
            Self::FunctionCall {
                method_name,
                args,
                gas,
                deposit,
            } => {
                method_name.serialize(writer)?;
                args.serialize(writer)?;
                gas.as_u64().serialize(writer)?;
                deposit.as_yocto().serialize(writer)
            }
            Self::Transfer { deposit } => deposit.as_yocto().serialize(writer),
            Self::AddKey { public_key } => {
                public_key.serialize(writer)?;
                // AccessKey { nonce: 0, permission: FullAccess }
                0u64.serialize(writer)?;
                1u8.serialize(writer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, BorshSerialize)]
pub(crate) struct Transaction {
    signer_id: String,
    public_key: WirePublicKey,
    nonce: u64,
    receiver_id: String,
    block_hash: [u8; 32],
    actions: Vec<Action>,
}

/// A signed transaction ready for `broadcast_tx_commit`.
#[derive(Debug, Clone)]
pub(crate) struct SignedTransaction {
    /// Borsh bytes of the transaction followed by its signature
    pub bytes: Vec<u8>,
    /// sha256 of the unsigned transaction bytes
    pub hash: [u8; 32],
}

impl SignedTransaction {
    /// Transaction hash as the ledger displays it.
    pub fn hash_base58(&self) -> String {
        bs58::encode(self.hash).into_string()
    }
}

impl Transaction {
    pub fn new(
        signer_id: &AccountId,
        public_key: &PublicKey,
        nonce: u64,
        receiver_id: &AccountId,
        block_hash: [u8; 32],
        actions: Vec<Action>,
    ) -> Self {
        Self {
            signer_id: signer_id.to_string(),
            public_key: public_key.into(),
            nonce,
            receiver_id: receiver_id.to_string(),
            block_hash,
            actions,
        }
    }

    /// Signs the sha256 digest of the encoded transaction.
    pub fn sign(&self, key: &SecretKey) -> io::Result<SignedTransaction> {
        let mut bytes = borsh::to_vec(self)?;
        let hash: [u8; 32] = Sha256::digest(&bytes).into();
        let signature = key.sign(&hash);

        ED25519_TAG.serialize(&mut bytes)?;
        signature.serialize(&mut bytes)?;

        Ok(SignedTransaction { bytes, hash })
    }
}
