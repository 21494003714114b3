//! Replay Determinism
//!
//! Endorsing peers execute each transaction independently; the same
//! submissions against the same prior state must yield identical write sets
//! and identical payloads.

use super::*;
use proptest::prelude::*;
use serde_json::json;

type Step = (MockIdentity, &'static str, Value);

fn workload() -> Vec<Step> {
    vec![
        (staff("D1", "DOCTOR", "H1"), "CreatePrescription", prescription_json("P1", "fever")),
        (staff("D1", "DOCTOR", "H1"), "CreatePrescription", prescription_json("P1", "cough")),
        (patient_identity("P1", "H1"), "SetAccessGrant", access_json("P1", "D2", "DOCTOR", "GRANT")),
        (patient_identity("P1", "H1"), "SetAccessGrant", access_json("P1", "H2", "HOSPITAL", "GRANT")),
        (staff("D2", "DOCTOR", "H2"), "ViewPatientViaConsent", view_json("D2", "P1")),
        (staff("D2", "DOCTOR", "H2"), "QueryPrescriptionHistory", json!({"patientId": "P1", "pageSize": 1})),
        (patient_identity("P1", "H1"), "SetAccessGrant", access_json("P1", "D2", "DOCTOR", "REVOKE")),
        (staff("D2", "DOCTOR", "H2"), "ListMyGrants", Value::Null),
    ]
}

fn replay(steps: &[Step]) -> (Vec<Result<Vec<u8>, String>>, MockStub) {
    let mut ledger = Ledger::two_hospitals(ContractConfig::default()).unwrap();
    let outputs = steps
        .iter()
        .map(|(identity, function, arg)| {
            let arg = arg.to_string();
            let args: Vec<&str> = if arg == "null" { Vec::new() } else { vec![arg.as_str()] };
            ledger
                .submit(identity, function, &args)
                .map_err(|err| err.code().to_string())
        })
        .collect();
    (outputs, ledger.stub)
}

#[test]
fn test_replay_is_byte_identical() {
    let (left_outputs, left) = replay(&workload());
    let (right_outputs, right) = replay(&workload());

    assert_eq!(left_outputs, right_outputs);
    assert!(left_outputs.iter().all(Result::is_ok), "{:?}", left_outputs);
    assert_eq!(left.committed_transactions(), right.committed_transactions());
}

#[test]
fn test_payloads_embed_stored_bytes() {
    let (outputs, stub) = replay(&workload()[..6]);
    let cough = String::from_utf8(outputs[1].clone().unwrap()).unwrap();
    let stored = std::str::from_utf8(stub.committed_state(&cough).unwrap()).unwrap();

    // One record per page, newest first
    let history = String::from_utf8(outputs[5].clone().unwrap()).unwrap();
    assert!(history.contains(stored), "{} does not embed {}", history, stored);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_prefix_replays_identically(len in 0usize..=8) {
        let steps = workload();
        let (left_outputs, left) = replay(&steps[..len]);
        let (right_outputs, right) = replay(&steps[..len]);
        prop_assert_eq!(left_outputs, right_outputs);
        prop_assert_eq!(left.committed_transactions(), right.committed_transactions());
    }
}
