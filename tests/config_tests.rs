// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for configuration loading
//!
//! These tests go through [`GatewayConfig::from_lookup`] so the process
//! environment is never touched.

use ledger_gateway::config::constants::defaults;
use ledger_gateway::{ConfigError, GatewayConfig, SecretKey};
use std::collections::HashMap;
use std::time::Duration;

fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
    let map: HashMap<&str, &str> = vars.iter().copied().collect();
    GatewayConfig::from_lookup(|name| map.get(name).map(|v| v.to_string()))
}

/// A complete master account enables master-signed operations
#[test]
fn test_master_account_is_loaded() {
    let key = SecretKey::generate();
    let config = load(&[
        ("MASTER_ACCOUNT_ID", "master.testnet"),
        ("MASTER_KEY", &key.to_encoded()),
    ])
    .unwrap();

    assert_eq!(
        config.master_account_id().map(|id| id.as_str()),
        Some("master.testnet"),
        "master account id should be taken from MASTER_ACCOUNT_ID"
    );
}

/// Quoted keys, as some `.env` files write them, are accepted
#[test]
fn test_quoted_master_key_is_accepted() {
    let key = format!("\"{}\"", SecretKey::generate().to_encoded());
    let config = load(&[
        ("MASTER_ACCOUNT_ID", "master.testnet"),
        ("MASTER_KEY", &key),
    ]);

    assert!(config.is_ok(), "quoted key should parse: {config:?}");
}

/// A key without an account id is a configuration error
#[test]
fn test_master_key_without_account_is_rejected() {
    let key = SecretKey::generate().to_encoded();
    let err = load(&[("MASTER_KEY", &key)]).unwrap_err();

    assert!(matches!(err, ConfigError::IncompleteMaster));
}

/// Blank variables fall back to defaults
#[test]
fn test_blank_values_use_defaults() {
    let config = load(&[("CACHE_TTL_SECS", "  "), ("SERVER_PORT", "")]).unwrap();

    assert_eq!(config.cache.ttl, defaults::CACHE_TTL);
    assert_eq!(config.server_port, defaults::SERVER_PORT);
}

/// Outbound rate limiting is off unless configured
#[test]
fn test_rpc_rate_limit_is_opt_in() {
    assert_eq!(load(&[]).unwrap().rpc_rate_limit, None);
    assert_eq!(
        load(&[("RPC_RATE_LIMIT", "8")]).unwrap().rpc_rate_limit,
        Some(8)
    );
}

/// Fractional seconds are honoured for cache timings
#[test]
fn test_fractional_cache_timings() {
    let config = load(&[
        ("CACHE_TTL_SECS", "0.25"),
        ("CACHE_GENERATION_TIMEOUT_SECS", "1.5"),
    ])
    .unwrap();

    assert_eq!(config.cache.ttl, Duration::from_millis(250));
    assert_eq!(config.cache.generation_timeout, Duration::from_millis(1500));
}
