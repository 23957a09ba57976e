// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower-based logging layer for ledger JSON-RPC requests.
//!
//! Each request packet runs inside an `rpc_call` span carrying the JSON-RPC
//! method and, for `query` calls, the ledger request type (`call_function`,
//! `view_access_key`, ...). Duration is recorded on the span when the
//! response arrives.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::TransportError;
use serde_json::Value;
use tower::Layer;
use tracing::{debug, trace, warn, Instrument};

/// A Tower layer that wraps every RPC request in a tracing span.
///
/// Payload logging is off by default since transaction payloads are large
/// and base64 encoded.
#[derive(Clone, Debug, Default)]
pub struct LoggingLayer {
    log_payloads: bool,
}

impl LoggingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log request and response packets at `trace` level.
    pub fn with_payloads(mut self) -> Self {
        self.log_payloads = true;
        self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        LoggingService {
            inner: service,
            log_payloads: self.log_payloads,
        }
    }
}

/// Service produced by [`LoggingLayer`].
#[derive(Clone, Debug)]
pub struct LoggingService<S> {
    inner: S,
    log_payloads: bool,
}

impl<S> tower::Service<RequestPacket> for LoggingService<S>
where
    S: tower::Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let log_payloads = self.log_payloads;
        let label = describe(&request);
        let span = tracing::info_span!(
            "rpc_call",
            method = %label.method,
            request_type = label.request_type.as_deref().unwrap_or(""),
            duration_ms = tracing::field::Empty,
        );

        if log_payloads {
            trace!(parent: &span, request = ?request, "RPC request");
        }
        let future = self.inner.call(request);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = future.await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::Span::current().record("duration_ms", elapsed_ms);

                match &result {
                    Ok(response) if log_payloads => {
                        trace!(response = ?response, elapsed_ms, "RPC response");
                    }
                    Ok(_) => debug!(elapsed_ms, "RPC response"),
                    Err(e) => warn!(error = %e, elapsed_ms, "RPC request failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}

#[derive(Debug, PartialEq)]
struct RequestLabel {
    method: String,
    request_type: Option<String>,
}

/// Names a request packet for logging.
fn describe(request: &RequestPacket) -> RequestLabel {
    match request {
        RequestPacket::Single(req) => RequestLabel {
            method: req.method().to_string(),
            request_type: query_request_type(req.params()),
        },
        RequestPacket::Batch(reqs) if reqs.len() == 1 => RequestLabel {
            method: reqs[0].method().to_string(),
            request_type: query_request_type(reqs[0].params()),
        },
        RequestPacket::Batch(reqs) => RequestLabel {
            method: format!("batch({})", reqs.len()),
            request_type: None,
        },
    }
}

/// Extracts `request_type` from the params of a `query` call.
fn query_request_type(params: Option<&serde_json::value::RawValue>) -> Option<String> {
    let params: Value = serde_json::from_str(params?.get()).ok()?;
    params
        .get("request_type")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
