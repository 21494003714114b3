//! Identity resolution
//!
//! Turns the caller credential into a canonical identity (the subject CN)
//! plus the role and organization attributes. No authorization happens
//! here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ledger_shim::ClientIdentity;
use tracing::debug;

use crate::config::ContractConfig;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::types::Role;

const SUBJECT_PREFIX: &str = "x509::CN=";

/// Resolved caller facts used by the authorization policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerAttributes {
    pub identity: String,
    pub role: Option<Role>,
    pub organization: Option<String>,
}

impl CallerAttributes {
    pub fn require_role(&self) -> ChaincodeResult<Role> {
        self.role
            .ok_or_else(|| ChaincodeError::Credential("caller has no recognised role".to_string()))
    }

    pub fn require_organization(&self) -> ChaincodeResult<&str> {
        self.organization
            .as_deref()
            .ok_or_else(|| ChaincodeError::Credential("caller has no organization".to_string()))
    }
}

/// Extract the subject CN from a base64 identity blob
pub fn canonical_identity(encoded_id: &str) -> ChaincodeResult<String> {
    let decoded = STANDARD
        .decode(encoded_id)
        .map_err(|e| ChaincodeError::Credential(format!("identity does not decode: {}", e)))?;
    let subject = String::from_utf8(decoded)
        .map_err(|_| ChaincodeError::Credential("identity is not UTF-8".to_string()))?;

    let rest = subject.strip_prefix(SUBJECT_PREFIX).ok_or_else(|| {
        ChaincodeError::Credential("identity subject does not start with x509::CN=".to_string())
    })?;
    let end = rest.find([',', ':']).unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() {
        return Err(ChaincodeError::Credential("identity CN is empty".to_string()));
    }
    Ok(name.to_string())
}

pub struct IdentityResolver<'a> {
    identity: &'a dyn ClientIdentity,
    config: &'a ContractConfig,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(identity: &'a dyn ClientIdentity, config: &'a ContractConfig) -> Self {
        Self { identity, config }
    }

    pub fn identity_name(&self) -> ChaincodeResult<String> {
        let raw = self
            .identity
            .get_id()
            .map_err(|e| ChaincodeError::Credential(e.to_string()))?;
        canonical_identity(&raw)
    }

    pub fn attribute(&self, name: &str) -> ChaincodeResult<Option<String>> {
        self.identity
            .get_attribute_value(name)
            .map_err(|e| ChaincodeError::Credential(e.to_string()))
    }

    pub fn caller(&self) -> ChaincodeResult<CallerAttributes> {
        let identity = self.identity_name()?;
        let role = self
            .attribute(&self.config.role_attribute)?
            .and_then(|value| Role::from_attribute(&value));
        let organization = self
            .attribute(&self.config.organization_attribute)?
            .filter(|value| !value.is_empty());

        debug!(identity = %identity, role = ?role, organization = ?organization, "resolved caller");

        Ok(CallerAttributes {
            identity,
            role,
            organization,
        })
    }
}
