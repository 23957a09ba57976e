//! Protocol amounts and configuration defaults
//!
//! This module centralizes magic constants used throughout the gateway,
//! improving discoverability and maintainability.

use std::time::Duration;

use crate::types::{Balance, Gas};

/// One NEAR in yoctoNEAR (10^24).
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Gas attached to function calls when the caller does not specify any (100 Tgas).
pub const DEFAULT_CALL_GAS: Gas = Gas::from_tgas(100);

/// Storage deposit attached to `nft_mint` (0.01 NEAR).
pub const NFT_MINT_DEPOSIT: Balance = Balance::from_millinear(10);

/// Deposit attached to `nft_transfer`. NEP-171 requires exactly one yoctoNEAR.
pub const NFT_TRANSFER_DEPOSIT: Balance = Balance::from_yocto(1);

/// Initial balance the master account funds new sub-accounts with (0.2 NEAR).
pub const NEW_ACCOUNT_BALANCE: Balance = Balance::from_millinear(200);

/// Configuration defaults.
pub mod defaults {
    use super::*;

    /// Public testnet RPC endpoint
    pub const RPC_URL: &str = "https://rpc.testnet.near.org";

    /// Network id bound into signing identities
    pub const NETWORK_ID: &str = "testnet";

    /// Host the HTTP server binds to
    pub const SERVER_HOST: &str = "127.0.0.1";

    /// Port the HTTP server binds to
    pub const SERVER_PORT: u16 = 3000;

    /// How long a successful view result is served from cache
    pub const CACHE_TTL: Duration = Duration::from_secs(5);

    /// How long one upstream fetch may run before waiters are released
    pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Directory holding `<account_id>.json` key records
    pub const ACCOUNT_STORAGE_DIR: &str = "storage";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_amounts() {
        assert_eq!(DEFAULT_CALL_GAS.as_u64(), 100_000_000_000_000);
        assert_eq!(NFT_MINT_DEPOSIT.as_yocto(), 10_000_000_000_000_000_000_000);
        assert_eq!(NFT_TRANSFER_DEPOSIT.as_yocto(), 1);
        assert_eq!(NEW_ACCOUNT_BALANCE.as_yocto(), 200_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_generation_timeout_exceeds_ttl() {
        assert!(defaults::GENERATION_TIMEOUT >= defaults::CACHE_TTL);
    }
}
