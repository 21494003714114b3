//! End-to-end clinic walkthrough, from an empty ledger to a revoked grant

use super::*;
use hospital_shared::ChaincodeError;
use serde_json::json;

#[test]
fn test_clinic_walkthrough() {
    let mut ledger = Ledger::default();
    let root = super_admin();
    let a1 = hospital_admin("A1", "H1");
    let p1 = patient_identity("P1", "H1");
    let d1 = staff("D1", "DOCTOR", "H1");
    let d2 = staff("D2", "DOCTOR", "H2");

    // 1-2. Tenancy
    ledger.submit(&root, "CreateHospital", &[&hospital_json("H1")]).unwrap();
    ledger.submit(&root, "CreateHospitalAdmin", &[&admin_json("A1", "H1")]).unwrap();

    // 3. The patient signs up under H1
    ledger
        .submit(&p1, "SelfRegister", &[&user_json("P1", "PATIENT", "H1")])
        .unwrap();
    let own: Value = serde_json::from_slice(&ledger.submit(&p1, "ViewOwnRecord", &[]).unwrap()).unwrap();
    assert_eq!(own["hospitalId"], "H1");

    // 4. The admin registers a doctor
    ledger
        .submit(&a1, "RegisterEntity", &[&user_json("D1", "DOCTOR", "")])
        .unwrap();

    // 5-6. One prescription, visible in history
    let prescription_id = ledger
        .submit_key(&d1, "CreatePrescription", &prescription_json("P1", "bronchitis"))
        .unwrap();
    let history = ledger
        .submit_json(&d1, "QueryPrescriptionHistory", &json!({"patientId": "P1"}))
        .unwrap();
    assert_eq!(history["fetchedRecordsCount"], 1);
    assert_eq!(history["records"][0]["doctorId"], "D1");
    assert_eq!(history["bookmark"], prescription_id.as_str());

    // 7. A doctor at another hospital gets access
    ledger.submit(&root, "CreateHospital", &[&hospital_json("H2")]).unwrap();
    ledger.submit(&root, "CreateHospitalAdmin", &[&admin_json("A2", "H2")]).unwrap();
    ledger
        .submit(&hospital_admin("A2", "H2"), "RegisterEntity", &[&user_json("D2", "DOCTOR", "")])
        .unwrap();

    let err = ledger
        .submit_json(&d2, "ViewPatientViaConsent", &view_json("D2", "P1"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    let grant_key = ledger
        .submit_key(&p1, "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "GRANT"))
        .unwrap();
    let view = ledger
        .submit_json(&d2, "ViewPatientViaConsent", &view_json("D2", "P1"))
        .unwrap();
    assert_eq!(view["patientDetail"]["id"], "P1");
    let recent = view["last3PrescriptionDetails"].as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["desc"], "bronchitis");
    assert_eq!(
        recent[0],
        serde_json::from_slice::<Value>(ledger.stub.committed_state(&prescription_id).unwrap()).unwrap()
    );

    // 8. Revocation closes the door again
    let revoked_key = ledger
        .submit_key(&p1, "SetAccessGrant", &access_json("P1", "D2", "DOCTOR", "REVOKE"))
        .unwrap();
    assert_eq!(revoked_key, grant_key);
    let err = ledger
        .submit_json(&d2, "ViewPatientViaConsent", &view_json("D2", "P1"))
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Unauthorized(_)));

    assert_eq!(ledger.stub.open_cursors(), 0);
}

#[test]
fn test_status_responses_carry_codes() {
    let mut ledger = Ledger::two_hospitals(ContractConfig::default()).unwrap();
    ledger.stub.begin_transaction("tx-status", DateTime::<Utc>::UNIX_EPOCH).unwrap();
    let response = ledger.contract.handle(
        &mut ledger.stub,
        &staff("D2", "DOCTOR", "H2"),
        "ViewPatient",
        &[&view_json("D2", "P1").to_string()],
    );
    ledger.stub.rollback().unwrap();

    assert_eq!(response.status, hospital_chaincode::ERROR);
    assert!(response.message.starts_with("UNAUTHORIZED:"));
    assert!(response.payload.is_empty());
}
