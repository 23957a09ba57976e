// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types for the fee budget attached to a mutating call
//!
//! HTTP clients send gas and deposits either as JSON numbers or as decimal
//! strings (deposits routinely exceed 2^53), so both forms are accepted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::constants::{DEFAULT_CALL_GAS, ONE_NEAR};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Text(String),
    Number(u64),
}

fn parse_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match NumberRepr::deserialize(deserializer)? {
        NumberRepr::Number(n) => Ok(u128::from(n)),
        NumberRepr::Text(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount `{s}`: {e}"))),
    }
}

/// Prepaid gas for a transaction, in gas units.
///
/// # Examples
///
/// ```
/// use ledger_gateway::Gas;
///
/// assert_eq!(Gas::from_tgas(100).as_u64(), 100_000_000_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Gas(u64);

impl Gas {
    /// Wraps a raw gas amount.
    pub const fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Converts teragas (10^12 gas) to gas.
    pub const fn from_tgas(tgas: u64) -> Self {
        Self(tgas * 1_000_000_000_000)
    }

    /// Returns the raw gas amount.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Gas {
    fn default() -> Self {
        DEFAULT_CALL_GAS
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Gas {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = parse_decimal(deserializer)?;
        u64::try_from(raw)
            .map(Self)
            .map_err(|_| serde::de::Error::custom(format!("gas amount {raw} exceeds u64")))
    }
}

/// A token amount in yoctoNEAR (10^-24 NEAR).
///
/// Serializes as a decimal string.
///
/// # Examples
///
/// ```
/// use ledger_gateway::Balance;
///
/// let deposit: Balance = serde_json::from_str("\"10000000000000000000000\"").unwrap();
/// assert_eq!(deposit, Balance::from_millinear(10));
/// assert_eq!(serde_json::to_string(&Balance::from_yocto(1)).unwrap(), "\"1\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Balance(u128);

impl Balance {
    /// Zero deposit
    pub const ZERO: Self = Self(0);

    /// Wraps a raw yoctoNEAR amount.
    pub const fn from_yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    /// Converts milliNEAR to yoctoNEAR.
    pub const fn from_millinear(millinear: u128) -> Self {
        Self(millinear * (ONE_NEAR / 1_000))
    }

    /// Returns the raw yoctoNEAR amount.
    pub const fn as_yocto(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_decimal(deserializer).map(Self)
    }
}

/// Gas and deposit attached to a function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBudget {
    /// Prepaid gas
    #[serde(default)]
    pub gas: Gas,
    /// Tokens attached to the call
    #[serde(default)]
    pub deposit: Balance,
}

impl FeeBudget {
    /// Creates a budget from gas and deposit.
    pub const fn new(gas: Gas, deposit: Balance) -> Self {
        Self { gas, deposit }
    }

    /// Replaces the gas and/or deposit when provided.
    pub fn with_overrides(self, gas: Option<Gas>, deposit: Option<Balance>) -> Self {
        Self {
            gas: gas.unwrap_or(self.gas),
            deposit: deposit.unwrap_or(self.deposit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_accepts_string_and_number() {
        let from_str: Gas = serde_json::from_str("\"100000000000000\"").unwrap();
        let from_num: Gas = serde_json::from_str("100000000000000").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str, Gas::from_tgas(100));
    }

    #[test]
    fn test_gas_rejects_overflow() {
        let too_big = format!("\"{}\"", u128::from(u64::MAX) + 1);
        assert!(serde_json::from_str::<Gas>(&too_big).is_err());
    }

    #[test]
    fn test_balance_handles_values_above_u64() {
        let deposit: Balance = serde_json::from_str("\"200000000000000000000000\"").unwrap();
        assert_eq!(deposit.as_yocto(), 200_000_000_000_000_000_000_000);
        assert_eq!(
            serde_json::to_value(deposit).unwrap(),
            serde_json::json!("200000000000000000000000")
        );
    }

    #[test]
    fn test_balance_rejects_garbage() {
        assert!(serde_json::from_str::<Balance>("\"ten\"").is_err());
        assert!(serde_json::from_str::<Balance>("-1").is_err());
    }

    #[test]
    fn test_fee_budget_defaults() {
        let budget: FeeBudget = serde_json::from_str("{}").unwrap();
        assert_eq!(budget.gas, DEFAULT_CALL_GAS);
        assert_eq!(budget.deposit, Balance::ZERO);

        let overridden = budget.with_overrides(None, Some(Balance::from_yocto(1)));
        assert_eq!(overridden.gas, DEFAULT_CALL_GAS);
        assert_eq!(overridden.deposit, Balance::from_yocto(1));
    }
}
