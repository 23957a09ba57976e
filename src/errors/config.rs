// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for gateway configuration.

use super::{AccountIdError, KeyError};

/// Errors raised while building or loading a [`GatewayConfig`](crate::GatewayConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The RPC node URL is not a valid URL.
    #[error("invalid RPC node URL `{value}`")]
    InvalidUrl {
        /// Raw value
        value: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// An account id setting is not a valid account id.
    #[error("invalid account id in {var}")]
    InvalidAccountId {
        /// Variable name
        var: &'static str,
        /// Validation failure
        #[source]
        source: AccountIdError,
    },

    /// The master key does not parse.
    #[error("invalid master key")]
    InvalidMasterKey(#[source] KeyError),

    /// Only one of master account id and master key was provided.
    #[error("master account id and master key must be configured together")]
    IncompleteMaster,
}
