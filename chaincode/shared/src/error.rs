//! Error taxonomy shared by every chaincode operation

use ledger_shim::StubError;
use thiserror::Error;

use crate::types::DocType;

#[derive(Debug, Error)]
pub enum ChaincodeError {
    /// Malformed arguments or field validation failure
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller credential could not be resolved
    #[error("credential error: {0}")]
    Credential(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("entity {id} of kind {doc_type} is inactive")]
    EntityInactive { id: String, doc_type: DocType },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The operation does not accept this kind of target
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid consent transition: {0}")]
    InvalidConsentTransition(String),

    #[error("store error: {0}")]
    Store(#[from] StubError),

    #[error("no results: {0}")]
    NoResults(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChaincodeError {
    /// Stable machine-readable code reported by the contract surface
    pub fn code(&self) -> &'static str {
        match self {
            ChaincodeError::InvalidInput(_) => "INVALID_INPUT",
            ChaincodeError::Credential(_) => "CREDENTIAL_ERROR",
            ChaincodeError::Unauthorized(_) => "UNAUTHORIZED",
            ChaincodeError::NotFound(_) => "NOT_FOUND",
            ChaincodeError::EntityInactive { .. } => "ENTITY_INACTIVE",
            ChaincodeError::AlreadyExists(_) => "ALREADY_EXISTS",
            ChaincodeError::InvalidTarget(_) => "INVALID_TARGET",
            ChaincodeError::InvalidConsentTransition(_) => "INVALID_CONSENT_TRANSITION",
            ChaincodeError::Store(_) => "STORE_ERROR",
            ChaincodeError::NoResults(_) => "NO_RESULTS",
            ChaincodeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Parse failure on caller-supplied JSON
    pub fn invalid_json(what: &str, err: serde_json::Error) -> Self {
        ChaincodeError::InvalidInput(format!("malformed {}: {}", what, err))
    }
}

pub type ChaincodeResult<T> = Result<T, ChaincodeError>;
