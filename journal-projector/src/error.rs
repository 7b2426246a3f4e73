//! Error types for the read side

use thiserror::Error;

/// Result type for projection
pub type Result<T> = std::result::Result<T, Error>;

/// Projection errors
#[derive(Error, Debug)]
pub enum Error {
    /// Event stream corrupt: duplicate or out-of-range sequence number
    #[error("Reassembly error in transaction {transaction_id}: {reason}")]
    Reassembly {
        /// Transaction the offending event belongs to
        transaction_id: String,
        /// What was wrong
        reason: String,
    },

    /// Event lacks or garbles an attribute, or has an unknown type
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Database error (SQLite)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Consumer stopped after an earlier failure
    #[error("Consumer halted: {0}")]
    Halted(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the ledger model
    #[error(transparent)]
    Ledger(#[from] journal_ledger::Error),
}

impl Error {
    /// Whether the consumer must stop after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::Concurrency(_))
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Reassembly { .. } => "reassembly",
            Error::MalformedEvent(_) => "malformed_event",
            Error::Database(_) => "database",
            Error::Halted(_) => "halted",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Ledger(_) => "ledger",
        }
    }

    pub(crate) fn reassembly(transaction_id: &str, reason: impl Into<String>) -> Self {
        Error::Reassembly {
            transaction_id: transaction_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_transaction() {
        let err = Error::reassembly("tx-9", "duplicate eventSeq 2");
        assert_eq!(
            err.to_string(),
            "Reassembly error in transaction tx-9: duplicate eventSeq 2"
        );
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "reassembly");
    }

    #[test]
    fn test_ledger_errors_convert() {
        let err: Error = journal_ledger::Error::Protocol("bad".into()).into();
        assert_eq!(err.kind(), "ledger");
        assert!(!Error::Concurrency("closed".into()).is_fatal());
    }
}
