//! Error types for account id validation.

/// Reasons a string is not a valid ledger account id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountIdError {
    /// Shorter than the 2-character minimum.
    #[error("account id is too short ({len} chars, minimum 2)")]
    TooShort {
        /// Actual length
        len: usize,
    },

    /// Longer than the 64-character maximum.
    #[error("account id is too long ({len} chars, maximum 64)")]
    TooLong {
        /// Actual length
        len: usize,
    },

    /// Contains a character outside `[a-z0-9._-]`.
    #[error("invalid character {ch:?} at position {index}")]
    InvalidChar {
        /// Offending character
        ch: char,
        /// Byte position
        index: usize,
    },

    /// Starts or ends with a separator, or has two separators in a row.
    #[error("misplaced separator at position {index}")]
    MisplacedSeparator {
        /// Byte position
        index: usize,
    },
}
