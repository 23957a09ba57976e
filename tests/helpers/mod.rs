// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for ledger-gateway integration tests
//!
//! Provides an in-process [`Ledger`] so gateway flows can be exercised
//! without a NEAR node.

#![allow(dead_code)]

use async_trait::async_trait;
use ledger_gateway::{
    AccountId, Balance, FunctionCall, GatewayConfig, GatewayConfigBuilder, IdentitySource, Ledger,
    LedgerError, LedgerGateway, MasterAccount, MemoryAccountStore, PublicKey, SecretKey,
    SigningIdentity, TxOutcome,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MASTER_ID: &str = "master.testnet";
pub const NFT_CONTRACT: &str = "nft.testnet";

pub fn account(id: &str) -> AccountId {
    id.parse().expect("valid account id")
}

/// A function call the mock received.
#[derive(Debug, Clone)]
pub struct SubmittedCall {
    pub signer: AccountId,
    pub source: IdentitySource,
    pub public_key: PublicKey,
    pub call: FunctionCall,
}

/// An account creation the mock received.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub funder: AccountId,
    pub account_id: AccountId,
    pub public_key: PublicKey,
    pub balance: Balance,
}

/// In-memory ledger with a minimal NFT contract.
///
/// - `nft_token` views return the token minted through `nft_mint`, or `null`
/// - other views return `with_view` values, or echo their inputs
/// - `fail_submissions` makes every later transaction end in `Failure`
///
/// # Example
///
/// ```rust,ignore
/// let ledger = MockLedger::new().with_view_delay(Duration::from_millis(100));
/// ledger.set_view("counter.testnet", "get_num", json!(3));
/// ```
#[derive(Default)]
pub struct MockLedger {
    views: Mutex<HashMap<(String, String), Value>>,
    tokens: Mutex<HashMap<String, Value>>,
    view_error: Mutex<Option<String>>,
    view_calls: AtomicUsize,
    view_delay: Duration,
    failure: Mutex<Option<Value>>,
    submitted: Mutex<Vec<SubmittedCall>>,
    created: Mutex<Vec<CreatedAccount>>,
    tx_counter: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every view by `delay`.
    pub fn with_view_delay(mut self, delay: Duration) -> Self {
        self.view_delay = delay;
        self
    }

    pub fn set_view(&self, contract: &str, method: &str, value: Value) {
        self.views
            .lock()
            .unwrap()
            .insert((contract.to_string(), method.to_string()), value);
    }

    /// Make views fail with a contract error until cleared with `None`.
    pub fn set_view_error(&self, message: Option<&str>) {
        *self.view_error.lock().unwrap() = message.map(str::to_string);
    }

    pub fn insert_token(&self, token_id: &str, owner: &str) {
        self.tokens.lock().unwrap().insert(
            token_id.to_string(),
            json!({"token_id": token_id, "owner_id": owner, "metadata": {}}),
        );
    }

    pub fn fail_submissions(&self, failure: Value) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn view_calls(&self) -> usize {
        self.view_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SubmittedCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreatedAccount> {
        self.created.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> TxOutcome {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let tx_hash = format!("tx{n}");
        let status = match self.failure.lock().unwrap().clone() {
            Some(failure) => json!({ "Failure": failure }),
            None => json!({ "SuccessValue": "" }),
        };
        TxOutcome::from_raw(
            tx_hash.clone(),
            json!({ "status": status, "transaction": { "hash": tx_hash } }),
        )
    }

    fn apply_nft_call(&self, signer: &AccountId, call: &FunctionCall) {
        let token_id = call.args["token_id"].as_str().unwrap_or_default().to_string();
        let mut tokens = self.tokens.lock().unwrap();
        match call.method.as_str() {
            "nft_mint" => {
                tokens.insert(
                    token_id.clone(),
                    json!({
                        "token_id": token_id,
                        "owner_id": signer.as_str(),
                        "metadata": call.args["metadata"].clone(),
                    }),
                );
            }
            "nft_transfer" => {
                if let Some(token) = tokens.get_mut(&token_id) {
                    token["owner_id"] = call.args["receiver_id"].clone();
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn view(&self, contract: &AccountId, method: &str, args: &Value) -> Result<Value, LedgerError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        if !self.view_delay.is_zero() {
            tokio::time::sleep(self.view_delay).await;
        }

        if let Some(message) = self.view_error.lock().unwrap().clone() {
            return Err(LedgerError::Contract {
                contract: contract.to_string(),
                method: method.to_string(),
                message,
            });
        }

        if method == "nft_token" {
            let token_id = args["token_id"].as_str().unwrap_or_default();
            return Ok(self
                .tokens
                .lock()
                .unwrap()
                .get(token_id)
                .cloned()
                .unwrap_or(Value::Null));
        }

        let configured = self
            .views
            .lock()
            .unwrap()
            .get(&(contract.to_string(), method.to_string()))
            .cloned();
        Ok(configured.unwrap_or_else(|| {
            json!({ "contract": contract.as_str(), "method": method, "args": args })
        }))
    }

    async fn submit(&self, signer: &SigningIdentity, call: FunctionCall) -> Result<TxOutcome, LedgerError> {
        let outcome = self.next_outcome();
        if !outcome.is_failure() {
            self.apply_nft_call(signer.account_id(), &call);
        }
        self.submitted.lock().unwrap().push(SubmittedCall {
            signer: signer.account_id().clone(),
            source: signer.source(),
            public_key: signer.public_key(),
            call,
        });
        Ok(outcome)
    }

    async fn create_account(
        &self,
        funder: &SigningIdentity,
        new_account: &AccountId,
        public_key: &PublicKey,
        balance: Balance,
    ) -> Result<TxOutcome, LedgerError> {
        self.created.lock().unwrap().push(CreatedAccount {
            funder: funder.account_id().clone(),
            account_id: new_account.clone(),
            public_key: *public_key,
            balance,
        });
        Ok(self.next_outcome())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A gateway over [`MockLedger`] and [`MemoryAccountStore`] with a master
/// account and default NFT contract configured.
pub struct Fixture {
    pub gateway: Arc<LedgerGateway>,
    pub ledger: Arc<MockLedger>,
    pub store: Arc<MemoryAccountStore>,
    pub master_key: SecretKey,
}

pub fn config(master_key: &SecretKey) -> GatewayConfig {
    GatewayConfigBuilder::new()
        .master(MasterAccount::new(account(MASTER_ID), master_key.to_encoded()))
        .nft_contract(account(NFT_CONTRACT))
        .cache_ttl(Duration::from_secs(60))
        .build()
}

pub fn fixture() -> Fixture {
    fixture_with(MockLedger::new(), MemoryAccountStore::new())
}

pub fn fixture_with(ledger: MockLedger, store: MemoryAccountStore) -> Fixture {
    let master_key = SecretKey::generate();
    let ledger = Arc::new(ledger);
    let store = Arc::new(store);
    let gateway = LedgerGateway::new(
        &config(&master_key),
        Arc::clone(&ledger) as Arc<dyn Ledger>,
        Arc::clone(&store) as Arc<dyn ledger_gateway::AccountStore>,
    );

    Fixture {
        gateway: Arc::new(gateway),
        ledger,
        store,
        master_key,
    }
}
