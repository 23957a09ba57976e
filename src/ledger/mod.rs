// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream ledger capability
//!
//! The gateway talks to the chain only through the [`Ledger`] trait: a
//! read-only `view`, a signed function call `submit`, and sub-account
//! creation. [`NearRpcLedger`] implements it over NEAR JSON-RPC; tests
//! substitute an in-process fake.

use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::errors::LedgerError;
use crate::signer::{PublicKey, SigningIdentity};
use crate::types::{AccountId, Balance, FeeBudget};

mod rpc;
mod transaction;

pub use rpc::{NearRpcLedger, RpcSettings};

/// A contract function call to be signed and submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Contract account receiving the call
    pub contract: AccountId,
    /// Contract method name
    pub method: String,
    /// JSON arguments
    pub args: Value,
    /// Gas and deposit attached to the call
    pub budget: FeeBudget,
}

impl FunctionCall {
    pub fn new(contract: AccountId, method: impl Into<String>, args: Value, budget: FeeBudget) -> Self {
        Self {
            contract,
            method: method.into(),
            args,
            budget,
        }
    }
}

/// Final outcome of a submitted transaction.
///
/// `status` is the ledger's execution status object, for example
/// `{"SuccessValue": ""}` or `{"Failure": {...}}`. `outcome` holds the full
/// response for callers that want receipts and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxOutcome {
    pub tx_hash: String,
    pub status: Value,
    pub outcome: Value,
}

impl TxOutcome {
    /// Builds an outcome from a raw `broadcast_tx_commit` result.
    pub fn from_raw(tx_hash: impl Into<String>, outcome: Value) -> Self {
        let status = outcome.get("status").cloned().unwrap_or(Value::Null);
        Self {
            tx_hash: tx_hash.into(),
            status,
            outcome,
        }
    }

    /// Returns the failure payload if the transaction failed.
    pub fn failure(&self) -> Option<&Value> {
        self.status.get("Failure")
    }

    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// Decodes the `SuccessValue` returned by the called method.
    ///
    /// Returns `None` when the transaction did not succeed with a value, and
    /// `Some(Value::Null)` for an empty return.
    pub fn success_value(&self) -> Option<Value> {
        let encoded = self.status.get("SuccessValue")?.as_str()?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()?;
        if bytes.is_empty() {
            return Some(Value::Null);
        }
        serde_json::from_slice(&bytes).ok()
    }
}

/// Read and write access to the ledger.
///
/// Implementations never retry: every error is returned to the caller.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Calls a read-only contract method and returns its JSON result.
    async fn view(&self, contract: &AccountId, method: &str, args: &Value) -> Result<Value, LedgerError>;

    /// Signs `call` with `signer` and waits for its final outcome.
    async fn submit(&self, signer: &SigningIdentity, call: FunctionCall) -> Result<TxOutcome, LedgerError>;

    /// Has `funder` create `new_account`, fund it with `balance`, and give it
    /// full access via `public_key`.
    async fn create_account(
        &self,
        funder: &SigningIdentity,
        new_account: &AccountId,
        public_key: &PublicKey,
        balance: Balance,
    ) -> Result<TxOutcome, LedgerError>;

    /// Returns a human-readable name for this ledger, used in logs.
    fn name(&self) -> &'static str;
}
