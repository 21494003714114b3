//! Consent Integrity
//!
//! An access grant is an edge from a patient to a grantee, which may be an
//! individual (doctor, druggist, ...) or a whole hospital. At most one edge
//! exists per (patient, grantee) pair.

use std::fmt;

use hospital_shared::{DocType, ValidationResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    /// The granting patient
    pub id: String,
    /// The grantee: an individual or organization id
    pub doctor_id: String,
    pub doc_type: DocType,
}

impl AccessGrant {
    pub fn new(patient_id: &str, grantee_id: &str) -> Self {
        Self {
            id: patient_id.to_string(),
            doctor_id: grantee_id.to_string(),
            doc_type: DocType::Access,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Grant,
    Revoke,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Grant => write!(f, "GRANT"),
            AccessType::Revoke => write!(f, "REVOKE"),
        }
    }
}

/// `{fromUserId, toUserId, toUserIdRole, accessType}`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessRightsInput {
    pub from_user_id: String,
    pub to_user_id: String,
    pub to_user_id_role: DocType,
    pub access_type: AccessType,
}

/// `{pageSize?, bookmark?}`; an absent argument lists the first full page
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrantListInput {
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

pub fn validate_access_rights(input: &AccessRightsInput) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("fromUserId", &input.from_user_id);
    result.check_identifier("toUserId", &input.to_user_id);
    result
}
