// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong type for ledger account identifiers

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AccountIdError;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 64;

/// A validated NEAR account id, such as `alice.testnet` or a 64-char implicit id.
///
/// Valid ids are 2 to 64 characters of `[a-z0-9]` joined by single `.`, `-`
/// or `_` separators. Uppercase input is rejected rather than folded; use
/// [`AccountId::normalized`] when deriving ids from user input.
///
/// # Examples
///
/// ```
/// use ledger_gateway::AccountId;
///
/// let id: AccountId = "alice.testnet".parse().unwrap();
/// assert_eq!(id.as_str(), "alice.testnet");
/// assert!("Alice.testnet".parse::<AccountId>().is_err());
/// assert!("a..b".parse::<AccountId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Validates and wraps an account id.
    pub fn new(id: impl Into<String>) -> Result<Self, AccountIdError> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// Lowercases the input before validating it.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_gateway::AccountId;
    ///
    /// let id = AccountId::normalized("Bob.Master.testnet").unwrap();
    /// assert_eq!(id.as_str(), "bob.master.testnet");
    /// ```
    pub fn normalized(id: &str) -> Result<Self, AccountIdError> {
        Self::new(id.to_lowercase())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the sub-account id `<name>.<self>`, lowercased.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_gateway::AccountId;
    ///
    /// let master: AccountId = "master.testnet".parse().unwrap();
    /// let child = master.sub_account("Alice").unwrap();
    /// assert_eq!(child.as_str(), "alice.master.testnet");
    /// ```
    pub fn sub_account(&self, name: &str) -> Result<Self, AccountIdError> {
        Self::normalized(&format!("{name}.{}", self.0))
    }
}

fn is_separator(b: u8) -> bool {
    matches!(b, b'.' | b'-' | b'_')
}

fn validate(id: &str) -> Result<(), AccountIdError> {
    let len = id.len();
    if len < MIN_LEN {
        return Err(AccountIdError::TooShort { len });
    }
    if len > MAX_LEN {
        return Err(AccountIdError::TooLong { len });
    }

    let mut prev_separator = true; // a leading separator is misplaced
    for (index, ch) in id.char_indices() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if !ch.is_ascii() || !is_separator(ch as u8) {
            return Err(AccountIdError::InvalidChar { ch, index });
        }
        if prev_separator {
            return Err(AccountIdError::MisplacedSeparator { index });
        }
        prev_separator = true;
    }

    if prev_separator {
        return Err(AccountIdError::MisplacedSeparator { index: len - 1 });
    }
    Ok(())
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
