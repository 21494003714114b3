//! Records Integrity
//!
//! Prescription and billing records. Both are append-only and stored under
//! the id of the transaction that created them.

use hospital_shared::{DocType, ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// A prescribed item; empty fields are omitted on the wire
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dosage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remarks: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub amount: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub doc_type: DocType,
    pub doctor_id: String,
    /// The patient id
    pub id: String,
    pub desc: String,
    pub medicine: Vec<Medicine>,
}

/// What a doctor submits; the prescriber comes from the credential
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionInput {
    pub id: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub medicine: Vec<Medicine>,
    /// Defaults to the transaction timestamp
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    /// The patient id
    pub id: String,
    pub doc_type: DocType,
    pub prescription_id: String,
    pub doctor_id: String,
    pub healthcare_provider_id: String,
    /// Smallest currency unit
    pub total_bill: i64,
    pub timestamp: i64,
    pub medicine: Vec<Medicine>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BillingInput {
    pub id: String,
    pub prescription_id: String,
    /// Must name the caller when present
    #[serde(default)]
    pub healthcare_provider_id: Option<String>,
    pub total_bill: i64,
    #[serde(default)]
    pub medicine: Vec<Medicine>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// `{viewerId, userId}`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewPatientInput {
    #[serde(default)]
    pub viewer_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInput {
    pub patient_id: String,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

fn check_medicine(result: &mut ValidationResult, medicine: &[Medicine]) {
    for (i, item) in medicine.iter().enumerate() {
        if item.amount < 0 {
            result.add_error(
                &format!("medicine[{}].amount", i),
                "must not be negative",
                ValidationErrorCode::OutOfRange,
            );
        }
    }
}

pub fn validate_prescription(prescription: &Prescription) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", &prescription.id);
    result.check_identifier("doctorId", &prescription.doctor_id);
    result.check_equals("docType", prescription.doc_type, DocType::Prescription);
    if prescription.timestamp < 0 {
        result.add_error("timestamp", "must not be negative", ValidationErrorCode::OutOfRange);
    }
    check_medicine(&mut result, &prescription.medicine);
    result
}

pub fn validate_billing(billing: &Billing) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("id", &billing.id);
    result.check_identifier("prescriptionId", &billing.prescription_id);
    result.check_identifier("doctorId", &billing.doctor_id);
    result.check_identifier("healthcareProviderId", &billing.healthcare_provider_id);
    result.check_equals("docType", billing.doc_type, DocType::Billing);
    if billing.total_bill < 0 {
        result.add_error("totalBill", "must not be negative", ValidationErrorCode::OutOfRange);
    }
    if billing.timestamp < 0 {
        result.add_error("timestamp", "must not be negative", ValidationErrorCode::OutOfRange);
    }
    check_medicine(&mut result, &billing.medicine);
    result
}

pub fn validate_history_input(input: &HistoryInput) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.check_identifier("patientId", &input.patient_id);
    result.check_optional_identifier("doctorId", input.doctor_id.as_deref());
    result
}
