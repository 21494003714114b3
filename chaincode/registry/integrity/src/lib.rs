//! Registry Integrity
//!
//! Record types for the tenancy hierarchy (hospitals, their admins and
//! users) and the field rules every stored record must satisfy.

use hospital_shared::{DocType, UserRole, ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_active() -> bool {
    true
}

/// Root of the tenancy hierarchy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub registration_num: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Administrator of exactly one hospital
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HospitalAdmin {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub middle_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dob: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact_no: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub emergency_no: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub permanent_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub blood_group: String,
    pub doc_type: DocType,
    /// Employment type
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub employment_type: String,
    pub hospital_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Patient, doctor, druggist or pathologist
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub middle_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact_no: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub emergency_no: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub local_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub permanent_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dob: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub blood_group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hospital_id: String,
    /// Role tag, doubling as the record kind
    pub doc_type: UserRole,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registration_num: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Free-form metadata, stored as given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annexture: Option<Value>,
}

/// Payload of a lifecycle change
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveInput {
    pub id: String,
    pub doc_type: DocType,
    pub active: bool,
}

/// Identifies one entity for an audit read
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,
    pub doc_type: DocType,
}

pub fn validate_hospital(hospital: &Hospital) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", &hospital.id);
    result.check_equals("docType", hospital.doc_type, DocType::Hospital);
    if hospital.name.trim().is_empty() {
        result.add_error("name", "is required", ValidationErrorCode::Required);
    }
    result
}

pub fn validate_hospital_admin(admin: &HospitalAdmin) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", &admin.id);
    result.check_identifier("hospitalId", &admin.hospital_id);
    result.check_equals("docType", admin.doc_type, DocType::HospitalAdmin);
    result
}

/// `hospitalId` is checked only when the caller supplies it; the admin
/// path fills it from the caller organization afterwards.
pub fn validate_user(user: &User, require_hospital: bool) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", &user.id);
    if require_hospital || !user.hospital_id.is_empty() {
        result.check_identifier("hospitalId", &user.hospital_id);
    }
    result
}

pub fn validate_entity_ref(id: &str, doc_type: DocType) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", id);
    if !doc_type.is_indexed_entity() {
        result.add_error(
            "docType",
            &format!("{} is not an indexed entity kind", doc_type),
            ValidationErrorCode::InvalidReference,
        );
    }
    result
}
