//! Hospital Chaincode Shared Utilities
//!
//! This crate provides the pieces every chaincode module builds on:
//! - Error taxonomy and configuration
//! - Closed role and record-kind enums
//! - Identity resolution from the caller credential
//! - The composite-key entity index
//! - The rich-query engine with cursor release
//! - The authorization policy
//! - Input validation

pub mod access_control;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod index;
pub mod query;
pub mod types;
pub mod validation;

pub use access_control::{ConsentState, Decision, DenyReason, Operation, Policy, TargetSummary};
pub use config::{ContractConfig, GrantPolicy};
pub use context::Context;
pub use error::{ChaincodeError, ChaincodeResult};
pub use identity::{CallerAttributes, IdentityResolver};
pub use index::EntityIndex;
pub use query::{QueryBuilder, QueryPage, QueryRecord};
pub use types::{DocType, Role, UserRole};
pub use validation::{ValidationError, ValidationErrorCode, ValidationResult};
