// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::serve_api;
use crate::config::GatewayConfig;
use crate::gateway::LedgerGateway;
use crate::ledger::{NearRpcLedger, RpcSettings};
use crate::store::DiskAccountStore;

/// Builds the gateway described by `config`.
pub fn build_gateway(config: &GatewayConfig) -> LedgerGateway {
    let mut rpc = RpcSettings::new(config.rpc_url.clone()).with_logging(config.rpc_logging);
    if let Some(rps) = config.rpc_rate_limit {
        rpc = rpc.with_rate_limit(rps);
    }

    let ledger = Arc::new(NearRpcLedger::connect(rpc));
    let store = Arc::new(DiskAccountStore::new(&config.account_storage_dir));

    LedgerGateway::new(config, ledger, store)
}

/// Main entry point for the application.
pub async fn run() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;

    info!(
        rpc_url = %config.rpc_url,
        network_id = %config.network_id,
        master = ?config.master_account_id().map(|id| id.as_str()),
        nft_contract = ?config.nft_contract.as_ref().map(|id| id.as_str()),
        cache_ttl_ms = config.cache.ttl.as_millis() as u64,
        generation_timeout_ms = config.cache.generation_timeout.as_millis() as u64,
        "Loaded gateway configuration"
    );
    if config.master.is_none() {
        warn!("No master account configured; mint and create_user are unavailable");
    }

    let gateway = Arc::new(build_gateway(&config));
    let listener = TcpListener::bind(config.bind_address()).await?;

    serve_api(listener, gateway).await
}
