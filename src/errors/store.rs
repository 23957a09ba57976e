// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the account store.

use std::path::PathBuf;

/// Errors that can occur while reading or writing account records.
///
/// A missing record is not an error: [`AccountStore::load`] returns `Ok(None)`.
///
/// [`AccountStore::load`]: crate::store::AccountStore::load
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("account store I/O failed at {}", path.display())]
    Io {
        /// File or directory being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be parsed.
    #[error("account record at {} is corrupt", path.display())]
    Corrupt {
        /// Path of the unreadable record
        path: PathBuf,
        /// The JSON parse failure
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize account record for {account_id}")]
    Encode {
        /// Account whose record failed to serialize
        account_id: String,
        /// The serialization failure
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
