// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Gateway operations
//!
//! [`LedgerGateway`] is what the HTTP layer calls. Reads go through the
//! [`QueryCache`]; writes go through the [`SignerResolver`] and are never
//! cached. NFT helpers follow the NEP-171 method names (`nft_token`,
//! `nft_mint`, `nft_transfer`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument, Span};

use crate::cache::{CacheKey, CacheStats, Cached, QueryCache};
use crate::config::constants::{DEFAULT_CALL_GAS, NEW_ACCOUNT_BALANCE, NFT_MINT_DEPOSIT, NFT_TRANSFER_DEPOSIT};
use crate::config::GatewayConfig;
use crate::errors::{GatewayError, LedgerError};
use crate::ledger::{FunctionCall, Ledger, TxOutcome};
use crate::signer::{normalize_seed_phrase, NetworkBinding, SecretKey, SignerResolver, SigningIdentity};
use crate::spans;
use crate::store::{AccountRecord, AccountStore};
use crate::types::{AccountId, Balance, FeeBudget, Gas};

/// Body of `POST /view`.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRequest {
    pub contract: AccountId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Body of `POST /call`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallRequest {
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub private_key: Option<String>,
    pub contract: AccountId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub attached_gas: Option<Gas>,
    #[serde(default)]
    pub attached_tokens: Option<Balance>,
}

/// Body of `POST /view_nft`.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewNftRequest {
    pub token_id: String,
    #[serde(default)]
    pub contract: Option<AccountId>,
}

/// Body of `POST /mint_nft`.
#[derive(Debug, Clone, Deserialize)]
pub struct MintRequest {
    pub token_id: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub contract: Option<AccountId>,
    /// Minting account. Defaults to the master account. A named account
    /// without `private_key` signs with its stored key.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub private_key: Option<String>,
}

/// Body of `POST /transfer_nft`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub token_id: String,
    pub receiver_id: AccountId,
    /// Current owner. Also the signer of the transfer.
    pub enforce_owner_id: AccountId,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub contract: Option<AccountId>,
    #[serde(default)]
    pub owner_private_key: Option<String>,
}

/// Result of a successful mint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MintedToken {
    /// The token as the contract reports it after the mint
    pub token: Value,
    /// Mint transaction hash
    pub tx: String,
}

/// Result of a successful `create_user`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedUser {
    pub account_id: AccountId,
    pub public_key: String,
    pub tx: String,
    pub text: String,
}

/// Keys recovered from a seed phrase.
#[derive(Clone, PartialEq, Serialize)]
pub struct SeedPhraseKeys {
    /// The phrase after case and whitespace normalization
    pub seed_phrase: String,
    pub public_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for SeedPhraseKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedPhraseKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// The operations exposed over HTTP.
pub struct LedgerGateway {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn AccountStore>,
    resolver: SignerResolver,
    cache: QueryCache<Value, LedgerError>,
    nft_contract: Option<AccountId>,
}

impl std::fmt::Debug for LedgerGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerGateway")
            .field("ledger", &self.ledger.name())
            .field("store", &self.store.name())
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .field("nft_contract", &self.nft_contract)
            .finish()
    }
}

impl LedgerGateway {
    pub fn new(config: &GatewayConfig, ledger: Arc<dyn Ledger>, store: Arc<dyn AccountStore>) -> Self {
        let network = NetworkBinding::new(config.network_id.clone(), config.rpc_url.clone());
        let resolver = SignerResolver::new(Arc::clone(&store), config.master.clone(), network);

        Self {
            ledger,
            store,
            resolver,
            cache: QueryCache::new(config.cache),
            nft_contract: config.nft_contract.clone(),
        }
    }

    pub fn resolver(&self) -> &SignerResolver {
        &self.resolver
    }

    pub fn master_account_id(&self) -> Option<&AccountId> {
        self.resolver.master_account_id()
    }

    /// Greeting for `GET /`.
    pub fn welcome(&self) -> String {
        match self.master_account_id() {
            Some(master) => format!("Welcome to the ledger gateway! Master Account: {master}"),
            None => "Welcome to the ledger gateway! Configure a master account to use the NFT mint and transfer methods".to_string(),
        }
    }

    /// Recovers the NEAR keypair for a BIP39 seed phrase. Nothing is stored
    /// and the ledger is not contacted.
    pub fn parse_seed_phrase(&self, seed_phrase: &str) -> Result<SeedPhraseKeys, GatewayError> {
        let key = SecretKey::from_seed_phrase(seed_phrase)?;
        let public_key = key.public_key().to_string();
        debug!(public_key = %public_key, "Recovered key from seed phrase");

        Ok(SeedPhraseKeys {
            seed_phrase: normalize_seed_phrase(seed_phrase),
            public_key,
            secret_key: key.to_encoded(),
        })
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Cached contract view. Missing params are sent as `{}`.
    pub async fn view(
        &self,
        contract: &AccountId,
        method: &str,
        params: &Value,
    ) -> Result<Cached<Value>, GatewayError> {
        let span = spans::gateway_view(contract, method);
        let params = function_args(params.clone());

        async move {
            let key = CacheKey::view(contract.as_str(), method, &params);
            let ledger = Arc::clone(&self.ledger);
            let (contract, method) = (contract.clone(), method.to_string());

            let cached = self
                .cache
                .get(key, move || async move { ledger.view(&contract, &method, &params).await })
                .await?;

            Span::current().record("cache_status", cached.status.as_header_value());
            Ok(cached)
        }
        .instrument(span)
        .await
    }

    /// Signed function call with the caller's budget, defaulting to 100 Tgas
    /// and no deposit. Missing params are sent as `{}`.
    pub async fn call(&self, request: CallRequest) -> Result<TxOutcome, GatewayError> {
        let span = spans::gateway_call(&request.contract, &request.method);

        async move {
            let signer = self
                .resolver
                .resolve(request.private_key.as_deref(), request.account_id.as_ref())
                .await?;

            let budget = FeeBudget::new(DEFAULT_CALL_GAS, Balance::ZERO)
                .with_overrides(request.attached_gas, request.attached_tokens);
            let call = FunctionCall::new(
                request.contract,
                request.method,
                function_args(request.params),
                budget,
            );

            let outcome = self.ledger.submit(&signer, call).await?;
            Span::current().record("tx_hash", outcome.tx_hash.as_str());
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Cached `nft_token` view on `contract` or the configured NFT contract.
    ///
    /// # Errors
    ///
    /// [`GatewayError::TokenNotFound`] when the contract returns `null`.
    pub async fn view_nft(
        &self,
        token_id: &str,
        contract: Option<&AccountId>,
    ) -> Result<Cached<Value>, GatewayError> {
        let contract = self.nft_contract(contract)?;
        let cached = self.view(&contract, "nft_token", &nft_token_args(token_id)).await?;

        if cached.value.is_null() {
            return Err(GatewayError::TokenNotFound {
                token_id: token_id.to_string(),
                contract: contract.to_string(),
            });
        }
        Ok(cached)
    }

    /// Mints a token. The master account signs unless another account is named,
    /// in which case the usual signer precedence applies to that account.
    pub async fn mint_nft(&self, request: MintRequest) -> Result<MintedToken, GatewayError> {
        let contract = self.nft_contract(request.contract.as_ref())?;
        let span = spans::mint_nft(&contract, &request.token_id);

        async move {
            let account_id = match request.account_id.as_ref() {
                Some(account_id) => account_id,
                None => self
                    .master_account_id()
                    .ok_or(GatewayError::MasterAccountNotConfigured)?,
            };
            let signer = self
                .resolver
                .resolve(request.private_key.as_deref(), Some(account_id))
                .await?;

            let call = FunctionCall::new(
                contract.clone(),
                "nft_mint",
                json!({
                    "token_id": request.token_id,
                    "metadata": request.metadata,
                }),
                FeeBudget::new(DEFAULT_CALL_GAS, NFT_MINT_DEPOSIT),
            );
            let outcome = self.submit_checked(&signer, call).await?;
            Span::current().record("tx_hash", outcome.tx_hash.as_str());

            let key = CacheKey::view(contract.as_str(), "nft_token", &nft_token_args(&request.token_id));
            self.cache.invalidate(&key).await;

            let token = match self.view_nft(&request.token_id, Some(&contract)).await {
                Ok(cached) => cached.value,
                Err(e) => {
                    warn!(error = %e, "Minted token could not be read back");
                    Value::Null
                }
            };

            info!(token_id = %request.token_id, "Minted NFT");
            Ok(MintedToken {
                token,
                tx: outcome.tx_hash,
            })
        }
        .instrument(span)
        .await
    }

    /// Transfers a token on behalf of `enforce_owner_id` and returns the
    /// token as read after the transfer, with a `tx` field added.
    pub async fn transfer_nft(&self, request: TransferRequest) -> Result<Value, GatewayError> {
        let contract = self.nft_contract(request.contract.as_ref())?;
        let span = spans::transfer_nft(&contract, &request.token_id, &request.receiver_id);

        async move {
            let signer = self
                .resolver
                .resolve(
                    request.owner_private_key.as_deref(),
                    Some(&request.enforce_owner_id),
                )
                .await?;

            let call = FunctionCall::new(
                contract.clone(),
                "nft_transfer",
                json!({
                    "token_id": request.token_id,
                    "receiver_id": request.receiver_id,
                    "enforce_owner_id": request.enforce_owner_id,
                    "memo": request.memo,
                }),
                FeeBudget::new(DEFAULT_CALL_GAS, NFT_TRANSFER_DEPOSIT),
            );
            let outcome = self.submit_checked(&signer, call).await?;
            Span::current().record("tx_hash", outcome.tx_hash.as_str());

            let key = CacheKey::view(contract.as_str(), "nft_token", &nft_token_args(&request.token_id));
            self.cache.invalidate(&key).await;

            let token = self.view_nft(&request.token_id, Some(&contract)).await?.value;
            Ok(with_tx(token, outcome.tx_hash))
        }
        .instrument(span)
        .await
    }

    /// Creates `<name>.<master>` funded by the master account and stores its
    /// generated key. The key is stored only after the account exists.
    pub async fn create_user(&self, name: &str) -> Result<CreatedUser, GatewayError> {
        let master_id = self
            .master_account_id()
            .ok_or(GatewayError::MasterAccountNotConfigured)?;
        let account_id = master_id.sub_account(name)?;
        let span = spans::create_user(&account_id);

        async move {
            let master = self
                .resolver
                .resolve_master()
                .await
                .ok_or(GatewayError::MasterAccountNotConfigured)??;

            let record = AccountRecord::generate(account_id.clone());
            let secret = record.secret_key().map_err(|e| GatewayError::InvalidRequest {
                reason: format!("generated key is unusable: {e}"),
            })?;

            let outcome = self
                .ledger
                .create_account(&master, &account_id, &secret.public_key(), NEW_ACCOUNT_BALANCE)
                .await?;
            ensure_applied(&outcome)?;

            self.store.save(&record).await?;
            info!(account_id = %account_id, tx_hash = %outcome.tx_hash, "Created user account");

            Ok(CreatedUser {
                text: format!("Account {account_id} created. Public key: {}", record.public_key),
                account_id,
                public_key: record.public_key,
                tx: outcome.tx_hash,
            })
        }
        .instrument(span)
        .await
    }

    fn nft_contract(&self, requested: Option<&AccountId>) -> Result<AccountId, GatewayError> {
        requested
            .or(self.nft_contract.as_ref())
            .cloned()
            .ok_or(GatewayError::NftContractNotConfigured)
    }

    async fn submit_checked(
        &self,
        signer: &SigningIdentity,
        call: FunctionCall,
    ) -> Result<TxOutcome, GatewayError> {
        let outcome = self.ledger.submit(signer, call).await?;
        ensure_applied(&outcome)?;
        Ok(outcome)
    }
}

/// Contract methods take an args object, so absent params become `{}`.
fn function_args(params: Value) -> Value {
    if params.is_null() {
        json!({})
    } else {
        params
    }
}

fn nft_token_args(token_id: &str) -> Value {
    json!({ "token_id": token_id })
}

fn ensure_applied(outcome: &TxOutcome) -> Result<(), GatewayError> {
    match outcome.failure() {
        Some(failure) => Err(GatewayError::TransactionFailed {
            tx_hash: outcome.tx_hash.clone(),
            failure: failure.to_string(),
        }),
        None => Ok(()),
    }
}

fn with_tx(token: Value, tx: String) -> Value {
    match token {
        Value::Object(mut fields) => {
            fields.insert("tx".to_string(), Value::String(tx));
            Value::Object(fields)
        }
        other => {
            let mut fields = Map::new();
            fields.insert("token".to_string(), other);
            fields.insert("tx".to_string(), Value::String(tx));
            Value::Object(fields)
        }
    }
}
