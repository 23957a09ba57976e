// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types for type safety across the gateway.
//!
//! This module provides newtype wrappers for domain concepts:
//! - Ledger account ids
//! - Gas and yoctoNEAR amounts, combined into a fee budget

pub mod account;
pub mod budget;

pub use account::AccountId;
pub use budget::{Balance, FeeBudget, Gas};
