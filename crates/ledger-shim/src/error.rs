use thiserror::Error;

/// Failures reported by the ledger host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StubError {
    #[error("invalid composite key attribute {attribute:?}: {reason}")]
    InvalidCompositeKey {
        attribute: String,
        reason: &'static str,
    },

    #[error("key must not be empty")]
    EmptyKey,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid bookmark {0:?}")]
    InvalidBookmark(String),

    #[error("no transaction in progress")]
    NoTransaction,

    #[error("a transaction is already in progress: {0}")]
    TransactionInProgress(String),

    #[error("iterator failure: {0}")]
    Iterator(String),

    #[error("identity failure: {0}")]
    Identity(String),
}

pub type StubResult<T> = Result<T, StubError>;
