//! Consent Ledger Tests
//!
//! GRANT/REVOKE transitions per (patient, grantee) pair and grant listing.

use super::*;
use hospital_shared::{ChaincodeError, GrantPolicy};

fn bootstrap() -> Ledger {
    Ledger::two_hospitals(ContractConfig::default()).unwrap()
}

fn p1() -> MockIdentity {
    patient_identity("P1", "H1")
}

#[test]
fn test_grant_revoke_grant_uses_new_keys() {
    let mut ledger = bootstrap();
    let granted = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    let revoked = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "REVOKE"))
        .unwrap();
    assert_eq!(granted, revoked);
    assert!(ledger.stub.committed_state(&granted).is_none());

    let regranted = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    assert_ne!(regranted, granted);

    let stored: Value =
        serde_json::from_slice(ledger.stub.committed_state(&regranted).unwrap()).unwrap();
    assert_eq!(stored, serde_json::json!({"id": "P1", "doctorId": "D2", "docType": "ACCESS"}));
}

#[test]
fn test_repeated_transitions_fail() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "REVOKE"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidConsentTransition(_)));

    ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidConsentTransition(_)));
}

#[test]
fn test_grant_targets() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "P2", "PATIENT", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidTarget(_)));

    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D9", "DOCTOR", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));

    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "SHARE"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidInput(_)));

    ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "H2", "HOSPITAL", "GRANT"))
        .unwrap();
}

#[test]
fn test_patient_only_policy() {
    let mut ledger = bootstrap();
    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P2", "D1", "DOCTOR", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let err = ledger
        .submit_key(
            &hospital_admin("A1", "H1"),
            "SetAccessGrant",
            &access_json("P1", "D2", "DOCTOR", "GRANT"),
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));
}

#[test]
fn test_hospital_scoped_policy() {
    let config = ContractConfig::default().with_grant_policy(GrantPolicy::HospitalScoped);
    let mut ledger = Ledger::two_hospitals(config).unwrap();

    ledger
        .submit_key(
            &hospital_admin("A1", "H1"),
            "SetAccessGrant",
            &access_json("P1", "D2", "DOCTOR", "GRANT"),
        )
        .unwrap();

    let err = ledger
        .submit_key(
            &hospital_admin("A2", "H2"),
            "SetAccessGrant",
            &access_json("P1", "D2", "DOCTOR", "REVOKE"),
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let err = ledger
        .submit_key(
            &hospital_admin("A1", "H1"),
            "SetAccessGrant",
            &access_json("P1", "P2", "PATIENT", "GRANT"),
        )
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidTarget(_)));
}

#[test]
fn test_list_my_grants() {
    let mut ledger = bootstrap();
    let d2 = staff("D2", "DOCTOR", "H2");
    let empty: Value = serde_json::from_slice(&ledger.submit(&d2, "ListMyGrants", &[]).unwrap()).unwrap();
    assert_eq!(empty["records"], serde_json::json!([]));
    assert_eq!(empty["fetchedRecordsCount"], 0);

    ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "H2", "HOSPITAL", "GRANT"))
        .unwrap();
    ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "R1", "DRUGGIST", "GRANT"))
        .unwrap();

    let issued: Value = serde_json::from_slice(&ledger.submit(&p1(), "ListMyGrants", &[]).unwrap()).unwrap();
    assert_eq!(issued["records"].as_array().unwrap().len(), 3);
    assert_eq!(issued["fetchedRecordsCount"], 3);

    let received = ledger.submit_json(&d2, "ListMyGrants", &serde_json::json!({})).unwrap();
    let mut grantees: Vec<&str> = received["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|grant| grant["doctorId"].as_str().unwrap())
        .collect();
    grantees.sort();
    assert_eq!(grantees, vec!["D2", "H2"]);
    assert_eq!(ledger.stub.open_cursors(), 0);
}

#[test]
fn test_grant_listing_is_paged() {
    let config = ContractConfig::default().with_max_page_size(2);
    let mut ledger = Ledger::two_hospitals(config).unwrap();
    for (grantee, kind) in [("D2", "DOCTOR"), ("H2", "HOSPITAL"), ("R1", "DRUGGIST")] {
        ledger
            .submit_key(&p1(), "SetAccessGrant", &access_json("P1", grantee, kind, "GRANT"))
            .unwrap();
    }

    let first: Value = serde_json::from_slice(&ledger.submit(&p1(), "ListMyGrants", &[]).unwrap()).unwrap();
    assert_eq!(first["fetchedRecordsCount"], 2);
    let bookmark = first["bookmark"].as_str().unwrap().to_string();
    assert!(!bookmark.is_empty());

    let rest = ledger
        .submit_json(&p1(), "ListMyGrants", &serde_json::json!({"bookmark": bookmark}))
        .unwrap();
    assert_eq!(rest["fetchedRecordsCount"], 1);

    let err = ledger
        .submit_json(&p1(), "ListMyGrants", &serde_json::json!({"pageSize": 3}))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::InvalidInput(_)));
}

#[test]
fn test_revoke_from_suspended_grantee() {
    let mut ledger = bootstrap();
    let granted = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    ledger
        .submit(
            &hospital_admin("A2", "H2"),
            "SetEntityActive",
            &[r#"{"id":"D2","docType":"DOCTOR","active":false}"#],
        )
        .unwrap();

    let revoked = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "REVOKE"))
        .unwrap();
    assert_eq!(revoked, granted);
    assert!(ledger.stub.committed_state(&granted).is_none());

    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));
}

#[test]
fn test_suspended_patient_cannot_change_grants() {
    let mut ledger = bootstrap();
    ledger
        .submit(
            &hospital_admin("A1", "H1"),
            "SetEntityActive",
            &[r#"{"id":"P1","docType":"PATIENT","active":false}"#],
        )
        .unwrap();
    let err = ledger
        .submit_key(&p1(), "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));
    let err = ledger.submit(&p1(), "ListMyGrants", &[]).unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));
}
