// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! NEAR JSON-RPC implementation of [`Ledger`]

use alloy_rpc_client::{ClientBuilder, RpcClient};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, Instrument};
use url::Url;

use super::transaction::{Action, Transaction};
use super::{FunctionCall, Ledger, TxOutcome};
use crate::errors::LedgerError;
use crate::signer::{PublicKey, SigningIdentity};
use crate::spans;
use crate::transport::{LoggingLayer, RateLimitLayer};
use crate::types::{AccountId, Balance};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Connection settings for [`NearRpcLedger`].
#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub url: Url,
    /// Requests per second, unlimited when `None`
    pub rate_limit: Option<u32>,
    /// Trace each RPC request
    pub logging: bool,
}

impl RpcSettings {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            rate_limit: None,
            logging: true,
        }
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.rate_limit = Some(requests_per_second);
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }
}

/// Access key state needed to build a transaction.
#[derive(Debug, Deserialize)]
struct AccessKeyView {
    nonce: u64,
    block_hash: String,
}

/// Raw `call_function` query result.
#[derive(Debug, Deserialize)]
struct CallResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<String>,
}

/// [`Ledger`] backed by a NEAR JSON-RPC node.
///
/// Views use `final` finality. Submissions fetch the signer's access key
/// nonce and a recent block hash, sign locally, and wait for
/// `broadcast_tx_commit`.
#[derive(Clone)]
pub struct NearRpcLedger {
    client: RpcClient,
    url: Url,
}

impl std::fmt::Debug for NearRpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearRpcLedger")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl NearRpcLedger {
    /// Builds an HTTP client with the configured transport layers.
    pub fn connect(settings: RpcSettings) -> Self {
        let url = settings.url.clone();
        let client = match (settings.rate_limit, settings.logging) {
            (Some(rps), true) => ClientBuilder::default()
                .layer(LoggingLayer::new())
                .layer(RateLimitLayer::per_second(rps))
                .http(settings.url),
            (Some(rps), false) => ClientBuilder::default()
                .layer(RateLimitLayer::per_second(rps))
                .http(settings.url),
            (None, true) => ClientBuilder::default()
                .layer(LoggingLayer::new())
                .http(settings.url),
            (None, false) => ClientBuilder::default().http(settings.url),
        };

        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn query(&self, params: Value) -> Result<Value, LedgerError> {
        self.client
            .request::<_, Value>("query", params)
            .await
            .map_err(|e| LedgerError::rpc("query", e))
    }

    async fn access_key(&self, signer: &SigningIdentity) -> Result<(u64, [u8; 32]), LedgerError> {
        let raw = self
            .query(json!({
                "request_type": "view_access_key",
                "finality": "final",
                "account_id": signer.account_id().as_str(),
                "public_key": signer.public_key().to_string(),
            }))
            .await?;

        if let Some(error) = raw.get("error").and_then(Value::as_str) {
            return Err(LedgerError::Unavailable {
                reason: format!("access key for {}: {error}", signer.account_id()),
            });
        }

        let view: AccessKeyView =
            serde_json::from_value(raw).map_err(|e| LedgerError::decode("access key", e))?;
        let block_hash = bs58::decode(&view.block_hash)
            .into_vec()
            .map_err(|e| LedgerError::decode("block hash", e))?;
        let block_hash: [u8; 32] = block_hash
            .try_into()
            .map_err(|v: Vec<u8>| LedgerError::decode("block hash", format!("{} bytes", v.len())))?;

        Ok((view.nonce, block_hash))
    }

    async fn sign_and_send(
        &self,
        signer: &SigningIdentity,
        receiver: &AccountId,
        actions: Vec<Action>,
    ) -> Result<TxOutcome, LedgerError> {
        let (nonce, block_hash) = self.access_key(signer).await?;

        let signed = Transaction::new(
            signer.account_id(),
            &signer.public_key(),
            nonce + 1,
            receiver,
            block_hash,
            actions,
        )
        .sign(signer.key())
        .map_err(|e| LedgerError::encode("transaction", e))?;

        let tx_hash = signed.hash_base58();
        debug!(tx_hash = %tx_hash, nonce = nonce + 1, "Broadcasting transaction");

        let raw = self
            .client
            .request::<_, Value>("broadcast_tx_commit", [BASE64.encode(&signed.bytes)])
            .await
            .map_err(|e| LedgerError::rpc("broadcast_tx_commit", e))?;

        let outcome = TxOutcome::from_raw(tx_hash, raw);
        info!(
            tx_hash = %outcome.tx_hash,
            failed = outcome.is_failure(),
            "Transaction finalized"
        );
        Ok(outcome)
    }
}

/// Decodes the byte array returned by `call_function`.
///
/// Empty output is `null`. Output that is not JSON but is UTF-8 is returned
/// as a string.
fn decode_view_result(bytes: &[u8]) -> Result<Value, LedgerError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(e) => match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Value::String(text.to_owned())),
            Err(_) => Err(LedgerError::decode("view result", e)),
        },
    }
}

#[async_trait]
impl Ledger for NearRpcLedger {
    async fn view(&self, contract: &AccountId, method: &str, args: &Value) -> Result<Value, LedgerError> {
        let span = spans::ledger_view(contract, method);

        async move {
            let args = serde_json::to_vec(args).map_err(|e| LedgerError::encode("view args", e))?;
            let raw = self
                .query(json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract.as_str(),
                    "method_name": method,
                    "args_base64": BASE64.encode(args),
                }))
                .await?;

            let result: CallResult =
                serde_json::from_value(raw).map_err(|e| LedgerError::decode("view", e))?;

            if let Some(message) = result.error {
                return Err(LedgerError::Contract {
                    contract: contract.to_string(),
                    method: method.to_string(),
                    message,
                });
            }

            decode_view_result(result.result.as_deref().unwrap_or_default())
        }
        .instrument(span)
        .await
    }

    async fn submit(&self, signer: &SigningIdentity, call: FunctionCall) -> Result<TxOutcome, LedgerError> {
        let span = spans::ledger_submit(signer.account_id(), &call.contract, &call.method);

        async move {
            let args =
                serde_json::to_vec(&call.args).map_err(|e| LedgerError::encode("call args", e))?;
            let actions = vec![Action::FunctionCall {
                method_name: call.method,
                args,
                gas: call.budget.gas,
                deposit: call.budget.deposit,
            }];

            self.sign_and_send(signer, &call.contract, actions).await
        }
        .instrument(span)
        .await
    }

    async fn create_account(
        &self,
        funder: &SigningIdentity,
        new_account: &AccountId,
        public_key: &PublicKey,
        balance: Balance,
    ) -> Result<TxOutcome, LedgerError> {
        let span = spans::ledger_create_account(funder.account_id(), new_account);

        async move {
            let actions = vec![
                Action::CreateAccount,
                Action::Transfer { deposit: balance },
                Action::AddKey {
                    public_key: public_key.into(),
                },
            ];

            self.sign_and_send(funder, new_account, actions).await
        }
        .instrument(span)
        .await
    }

    fn name(&self) -> &'static str {
        "near-jsonrpc"
    }
}
