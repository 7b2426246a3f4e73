//! Error types for command processing

use crate::address::Address;
use thiserror::Error;

/// Result type for command processing
pub type Result<T> = std::result::Result<T, Error>;

/// Command processing errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command: bad body, bad address, missing declared address
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Read or write outside the declared address set
    #[error("Access violation: {operation} of undeclared address {address}")]
    AccessViolation {
        /// `GetState` or `SetState`
        operation: &'static str,
        /// Offending address
        address: Address,
    },

    /// Business rule violated (price, authorization, state conflict)
    #[error("Validation error: {0}")]
    Validation(String),

    /// External ledger unavailable or refused a call
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Record encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant broken while applying updates
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may resubmit the same command unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Ledger(_) | Error::Io(_))
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Protocol(_) => "protocol",
            Error::AccessViolation { .. } => "access_violation",
            Error::Validation(_) => "validation",
            Error::Ledger(_) => "ledger",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}

/// Shorthand for a validation rejection.
pub(crate) fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Validation(msg.into()))
}

/// Shorthand for a protocol rejection.
pub(crate) fn protocol<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Protocol(msg.into()))
}
