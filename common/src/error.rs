//! Error types for shared value types.

use thiserror::Error;

/// Error raised when a currency code cannot be normalised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The code was empty after trimming.
    #[error("Currency code is empty")]
    Empty,

    /// The code was not 3 or 4 characters long.
    #[error("Currency code {0:?} must be 3 or 4 letters")]
    InvalidLength(String),

    /// The code contained something other than ASCII letters.
    #[error("Currency code {0:?} must contain only ASCII letters")]
    InvalidCharacters(String),
}
