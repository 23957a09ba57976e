// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Query cache keys
//!
//! A [`CacheKey`] is the keccak-256 digest of a canonical JSON encoding of
//! `[kind, target, method, params]`. Object keys inside `params` are sorted
//! recursively before hashing, so two requests that differ only in the order
//! their arguments were written produce the same key.

use alloy_primitives::{keccak256, B256};
use serde_json::Value;
use std::fmt::{self, Write as _};

/// Kind of read a key describes.
///
/// Part of the hashed material so that different query kinds with the same
/// target and method never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// A read-only contract function call
    View,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-length digest identifying one logical read.
///
/// # Examples
///
/// ```
/// use ledger_gateway::cache::CacheKey;
/// use serde_json::json;
///
/// let a = CacheKey::view("nft.testnet", "nft_token", &json!({"token_id": "1", "extra": true}));
/// let b = CacheKey::view("nft.testnet", "nft_token", &json!({"extra": true, "token_id": "1"}));
/// assert_eq!(a, b);
///
/// let c = CacheKey::view("nft.testnet", "nft_token", &json!({"token_id": "2", "extra": true}));
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(B256);

impl CacheKey {
    /// Computes the key for a read of `method` on `target` with `params`.
    pub fn new(kind: QueryKind, target: &str, method: &str, params: &Value) -> Self {
        let mut canonical = String::with_capacity(64);
        canonical.push('[');
        write_json_string(&mut canonical, kind.as_str());
        canonical.push(',');
        write_json_string(&mut canonical, target);
        canonical.push(',');
        write_json_string(&mut canonical, method);
        canonical.push(',');
        write_canonical(&mut canonical, params);
        canonical.push(']');

        Self(keccak256(canonical.as_bytes()))
    }

    /// Key for a contract view call.
    pub fn view(target: &str, method: &str, params: &Value) -> Self {
        Self::new(QueryKind::View, target, method, params)
    }

    /// Returns the raw digest.
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializes `value` as JSON with object keys in sorted order and no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_json_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, item)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(out, name);
                out.push(':');
                write_canonical(out, item);
            }
            out.push('}');
        }
    }
}

fn write_json_string(out: &mut String, s: &str) {
    // Serializing a str through serde_json cannot fail.
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        Err(_) => out.push_str("\"\""),
    }
}
