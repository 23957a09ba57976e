// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for upstream ledger calls.
//!
//! Every variant here is an upstream failure in the sense of the query cache:
//! it is surfaced to the caller verbatim and never retried by the gateway.

use alloy_transport::TransportError;

/// Errors returned by a [`Ledger`](crate::ledger::Ledger) implementation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The JSON-RPC request failed in transport or returned an error object.
    #[error("RPC request `{method}` failed: {source}")]
    Rpc {
        /// JSON-RPC method name
        method: &'static str,
        /// The underlying transport error
        #[source]
        source: TransportError,
    },

    /// The node executed the view but the contract reported an error.
    #[error("{contract}.{method} failed: {message}")]
    Contract {
        /// Contract account that was queried
        contract: String,
        /// Method that was called
        method: String,
        /// Error text reported by the node
        message: String,
    },

    /// A request could not be encoded for the wire.
    #[error("failed to encode {what}: {reason}")]
    Encode {
        /// What was being encoded
        what: &'static str,
        /// Why encoding failed
        reason: String,
    },

    /// A response did not have the expected shape.
    #[error("unexpected {what} response: {reason}")]
    Decode {
        /// What was being decoded
        what: &'static str,
        /// Why decoding failed
        reason: String,
    },

    /// The ledger could not be reached at all.
    #[error("ledger unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason
        reason: String,
    },
}

impl LedgerError {
    /// Helper to create an `Rpc` error for a given method.
    pub fn rpc(method: &'static str, source: TransportError) -> Self {
        Self::Rpc { method, source }
    }

    /// Helper to create a `Decode` error from any displayable reason.
    pub fn decode(what: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    /// Helper to create an `Encode` error from any displayable reason.
    pub fn encode(what: &'static str, reason: impl ToString) -> Self {
        Self::Encode {
            what,
            reason: reason.to_string(),
        }
    }
}
