//! Error types for the aes256 filter

use std::fmt;
use thiserror::Error;

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Error kinds produced by the filter, one per row of the disposition table.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Compile-time and runtime cipher library major versions differ. Fatal at `prepare`.
    #[error("cipher library version mismatch: compiled {compiled:#x}, runtime {runtime:#x}")]
    LibraryMismatch {
        /// Version word captured at compile time
        compiled: u32,
        /// Version word observed at runtime
        runtime: u32,
    },

    /// Configuration blob had an unrecognized length, or a malformed `salt:` option. Fatal at `prepare`.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    /// Password shorter than 8 characters, or confirmation mismatch. Recoverable: caller re-prompts.
    #[error("password policy violation: {0}")]
    PasswordPolicy(String),

    /// Interactive password input unavailable. Fatal at `prepare`.
    #[error("could not obtain password: {0}")]
    PasswordAbort(String),

    /// Fingerprint verification failed against the derived key. Fatal at `prepare`.
    #[error("invalid password")]
    InvalidPassword,

    /// HMAC tag mismatch or CBC padding rejected on decrypt. Fatal at `process`; `decrypt_failed` is set.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Key-cache file read/write/close failed. Non-fatal; caller proceeds without the cache.
    #[error("key cache I/O warning: {0}")]
    IoWarning(String),

    /// Allocation failure. Fatal.
    #[error("out of memory: {0}")]
    Oom(String),

    /// Underlying I/O error, wrapped.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error for conditions that must not happen in correct use.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FilterError {
    /// Build a [`FilterError::ConfigurationError`] from a formattable message.
    pub fn configuration(msg: impl fmt::Display) -> Self {
        Self::ConfigurationError(msg.to_string())
    }

    /// Build a [`FilterError::PasswordPolicy`] from a formattable message.
    pub fn password_policy(msg: impl fmt::Display) -> Self {
        Self::PasswordPolicy(msg.to_string())
    }

    /// Build a [`FilterError::PasswordAbort`] from a formattable message.
    pub fn password_abort(msg: impl fmt::Display) -> Self {
        Self::PasswordAbort(msg.to_string())
    }

    /// Build a [`FilterError::AuthenticationFailure`] from a formattable message.
    pub fn authentication_failure(msg: impl fmt::Display) -> Self {
        Self::AuthenticationFailure(msg.to_string())
    }

    /// Build a [`FilterError::IoWarning`] from a formattable message.
    pub fn io_warning(msg: impl fmt::Display) -> Self {
        Self::IoWarning(msg.to_string())
    }

    /// Build an [`FilterError::Internal`] from a formattable message.
    pub fn internal(msg: impl fmt::Display) -> Self {
        Self::Internal(msg.to_string())
    }
}

impl From<argon2::password_hash::Error> for FilterError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Internal(format!("argon2 error: {err}"))
    }
}
