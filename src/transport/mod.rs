// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower middleware for the ledger JSON-RPC client.
//!
//! [`RateLimitLayer`] keeps outbound traffic under a node's request quota and
//! [`LoggingLayer`] traces each request. Both plug into
//! [`alloy_rpc_client::ClientBuilder::layer`].
//!
//! Upstream failures reach the caller unchanged. Nothing here retries.
//!
//! ```rust,ignore
//! use ledger_gateway::transport::{LoggingLayer, RateLimitLayer};
//! use alloy_rpc_client::ClientBuilder;
//!
//! let client = ClientBuilder::default()
//!     .layer(LoggingLayer::new())
//!     .layer(RateLimitLayer::per_second(10))
//!     .http(rpc_url);
//! ```

mod logging;
mod rate_limit;

pub use logging::{LoggingLayer, LoggingService};
pub use rate_limit::{RateLimitLayer, RateLimitService};
