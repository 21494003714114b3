//! Registry Tests
//!
//! Creation order, uniqueness, own-record reads and the lifecycle paths.

use super::*;
use hospital_shared::{ChaincodeError, DocType, EntityIndex};
use serde_json::json;

fn bootstrap() -> Ledger {
    Ledger::two_hospitals(ContractConfig::default()).unwrap()
}

#[test]
fn test_put_then_get_returns_identical_bytes() {
    let mut ledger = bootstrap();
    let stored = ledger
        .submit(&staff("D1", "DOCTOR", "H1"), "ViewOwnRecord", &[])
        .unwrap();

    let config = ContractConfig::default();
    let index = EntityIndex::new(&config);
    let key = index.key(&ledger.stub, "D1", DocType::Doctor).unwrap();
    assert_eq!(ledger.stub.committed_state(&key).unwrap(), stored.as_slice());

    let doctor: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(doctor["hospitalId"], "H1");
    assert_eq!(doctor["active"], true);
}

#[test]
fn test_second_creation_fails() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit(&super_admin(), "CreateHospital", &[&hospital_json("H1")])
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::AlreadyExists(_)));

    let err = ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "RegisterEntity",
            &[&user_json("D1", "DOCTOR", "")],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::AlreadyExists(_)));
}

#[test]
fn test_same_id_different_kind_is_distinct() {
    let mut ledger = bootstrap();
    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "RegisterEntity",
            &[&user_json("P1", "DOCTOR", "")],
        )
        .unwrap();
    let as_doctor = ledger
        .submit(&staff("P1", "DOCTOR", "H1"), "ViewOwnRecord", &[])
        .unwrap();
    let as_patient = ledger
        .submit(&patient_identity("P1", "H1"), "ViewOwnRecord", &[])
        .unwrap();
    assert_ne!(as_doctor, as_patient);
}

#[test]
fn test_admin_for_unknown_hospital() {
    let mut ledger = Ledger::default();
    let err = ledger
        .submit(&super_admin(), "CreateHospitalAdmin", &[&admin_json("A9", "H9")])
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));
    assert!(ledger.stub.committed_transactions().is_empty());
}

#[test]
fn test_register_entity_uses_caller_organization() {
    let mut ledger = bootstrap();
    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "RegisterEntity",
            &[&user_json("D3", "DOCTOR", "H2")],
        )
        .unwrap();
    let record = ledger
        .submit(&staff("D3", "DOCTOR", "H1"), "ViewOwnRecord", &[])
        .unwrap();
    let record: Value = serde_json::from_slice(&record).unwrap();
    assert_eq!(record["hospitalId"], "H1");
}

#[test]
fn test_register_entity_requires_organization() {
    let mut ledger = bootstrap();
    let admin = MockIdentity::new("A1", "Org1MSP").with_attribute("userRole", "HOSPITAL_ADMIN");
    let err = ledger
        .submit(&admin, "RegisterEntity", &[&user_json("D3", "DOCTOR", "")])
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Credential(_)));
}

#[test]
fn test_doctor_cannot_register_entities() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit(
            &staff("D1", "DOCTOR", "H1"),
            "RegisterEntity",
            &[&user_json("P9", "PATIENT", "")],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));
}

#[test]
fn test_view_own_record_errors() {
    let mut ledger = bootstrap();
    let unregistered = staff("D9", "DOCTOR", "H1");
    let err = ledger.submit(&unregistered, "ViewOwnRecord", &[]).unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));

    let no_role = MockIdentity::new("D1", "Org1MSP");
    let err = ledger.submit(&no_role, "ViewOwnRecord", &[]).unwrap_err();
    assert!(matches!(err, ChaincodeError::Credential(_)));
}

#[test]
fn test_deactivated_entity_is_absent() {
    let mut ledger = bootstrap();
    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "SetEntityActive",
            &[r#"{"id":"D1","docType":"DOCTOR","active":false}"#],
        )
        .unwrap();

    let doctor = staff("D1", "DOCTOR", "H1");
    let err = ledger.submit(&doctor, "ViewOwnRecord", &[]).unwrap_err();
    assert!(matches!(err, ChaincodeError::EntityInactive { .. }));

    let err = ledger
        .submit_key(&doctor, "CreatePrescription", &prescription_json("P1", "flu"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let audit = ledger
        .submit_json(&super_admin(), "ReadEntityForAudit", &json!({"id": "D1", "docType": "DOCTOR"}))
        .unwrap();
    assert_eq!(audit["active"], false);

    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "SetEntityActive",
            &[r#"{"id":"D1","docType":"DOCTOR","active":true}"#],
        )
        .unwrap();
    ledger.submit(&doctor, "ViewOwnRecord", &[]).unwrap();
}

#[test]
fn test_deactivated_patient_blocks_new_records() {
    let mut ledger = bootstrap();
    let doctor = staff("D1", "DOCTOR", "H1");
    let tx_id = ledger
        .submit_key(&doctor, "CreatePrescription", &prescription_json("P1", "flu"))
        .unwrap();
    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "SetEntityActive",
            &[r#"{"id":"P1","docType":"PATIENT","active":false}"#],
        )
        .unwrap();

    let err = ledger
        .submit_key(&doctor, "CreatePrescription", &prescription_json("P1", "again"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));
    let err = ledger
        .submit_json(&doctor, "ViewPatient", &view_json("D1", "P1"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));

    // Append-only records are not subject to the flag
    let prescription: Value =
        serde_json::from_slice(ledger.stub.committed_state(&tx_id).unwrap()).unwrap();
    assert_eq!(prescription["desc"], "flu");
}

#[test]
fn test_lifecycle_permissions() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit(
            &hospital_admin("A2", "H2"),
            "SetEntityActive",
            &[r#"{"id":"D1","docType":"DOCTOR","active":false}"#],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let err = ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "SetEntityActive",
            &[r#"{"id":"H1","docType":"HOSPITAL","active":false}"#],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let err = ledger
        .submit(
            &super_admin(),
            "SetEntityActive",
            &[r#"{"id":"H9","docType":"HOSPITAL","active":false}"#],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));

    ledger
        .submit(
            &super_admin(),
            "SetEntityActive",
            &[r#"{"id":"H2","docType":"HOSPITAL","active":false}"#],
        )
        .unwrap();
    let err = ledger
        .submit(
            &patient_identity("P3", "H2"),
            "SelfRegister",
            &[&user_json("P3", "PATIENT", "H2")],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));
}

#[test]
fn test_self_register_is_for_oneself() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit(
            &patient_identity("P3", "H1"),
            "SelfRegister",
            &[&user_json("P4", "PATIENT", "H1")],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    ledger
        .submit(
            &patient_identity("P4", "H1"),
            "SelfRegister",
            &[&user_json("P4", "PATIENT", "H1")],
        )
        .unwrap();
}

#[test]
fn test_audit_read_is_super_admin_only() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "ReadEntityForAudit",
            &[r#"{"id":"D1","docType":"DOCTOR"}"#],
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));
}
