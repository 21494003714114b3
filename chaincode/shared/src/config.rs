//! Contract configuration
//!
//! Loaded from the chaincode init argument. Every field has a default, so
//! `{}` (or an empty argument) yields the standard deployment.

use serde::{Deserialize, Serialize};

use crate::error::{ChaincodeError, ChaincodeResult};

/// Who may change a patient's consent grants
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum GrantPolicy {
    /// Only the patient, acting as themselves
    #[default]
    PatientOnly,
    /// Any caller whose organization is the patient's hospital
    HospitalScoped,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractConfig {
    /// Identity name of the super-admin
    pub super_admin_id: String,
    /// Certificate attribute carrying the caller role
    pub role_attribute: String,
    /// Certificate attribute carrying the caller hospital id
    pub organization_attribute: String,
    /// Composite-key namespace of the entity index
    pub entity_index_namespace: String,
    /// Prescriptions embedded in patient views
    pub recent_prescription_limit: usize,
    pub max_page_size: u32,
    pub grant_policy: GrantPolicy,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            super_admin_id: "admin".to_string(),
            role_attribute: "userRole".to_string(),
            organization_attribute: "organization".to_string(),
            entity_index_namespace: "id~doctype".to_string(),
            recent_prescription_limit: 3,
            max_page_size: 100,
            grant_policy: GrantPolicy::PatientOnly,
        }
    }
}

impl ContractConfig {
    /// Parse an init argument; blank input means defaults
    pub fn from_json(raw: &str) -> ChaincodeResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ChaincodeError::invalid_json("config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChaincodeResult<()> {
        if self.super_admin_id.is_empty() {
            return Err(ChaincodeError::InvalidInput(
                "superAdminId must not be empty".to_string(),
            ));
        }
        if self.role_attribute.is_empty() || self.organization_attribute.is_empty() {
            return Err(ChaincodeError::InvalidInput(
                "attribute names must not be empty".to_string(),
            ));
        }
        if self.entity_index_namespace.is_empty() || self.entity_index_namespace.contains('\u{0}')
        {
            return Err(ChaincodeError::InvalidInput(
                "entityIndexNamespace must be a non-empty string without U+0000".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(ChaincodeError::InvalidInput(
                "maxPageSize must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_super_admin_id(mut self, id: impl Into<String>) -> Self {
        self.super_admin_id = id.into();
        self
    }

    pub fn with_grant_policy(mut self, policy: GrantPolicy) -> Self {
        self.grant_policy = policy;
        self
    }

    pub fn with_recent_prescription_limit(mut self, limit: usize) -> Self {
        self.recent_prescription_limit = limit;
        self
    }

    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }
}
