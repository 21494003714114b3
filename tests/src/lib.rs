//! Hospital Ledger Test Suite
//!
//! Scenario tests that drive `HospitalContract` through `invoke` on the
//! in-memory stub, one committed or rolled-back transaction per call:
//! - registry and lifecycle
//! - consent transitions and grant listing
//! - prescriptions, billing and history paging
//! - cross-hospital access control under both grant policies
//! - the end-to-end clinic walkthrough
//! - replay determinism

use chrono::{DateTime, Duration, Utc};
use hospital_chaincode::HospitalContract;
use hospital_shared::{ChaincodeResult, ContractConfig};
use ledger_shim::{ClientIdentity, MockIdentity, MockStub};
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
mod consent;
#[cfg(test)]
mod determinism;
#[cfg(test)]
mod registry;
#[cfg(test)]
mod scenario;

/// Transaction timestamps start here and advance one second per submission
pub const GENESIS_SECONDS: i64 = 1_700_000_000;

/// A contract and its world state, submitting one transaction at a time
pub struct Ledger {
    pub stub: MockStub,
    pub contract: HospitalContract,
    submissions: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            stub: MockStub::new("hospital"),
            contract: HospitalContract::default(),
            submissions: 0,
        }
    }
}

impl Ledger {
    pub fn with_config(config: ContractConfig) -> ChaincodeResult<Self> {
        Ok(Self {
            contract: HospitalContract::new(config)?,
            ..Self::default()
        })
    }

    /// Run one transaction; commit on success, roll back on failure
    pub fn submit(
        &mut self,
        identity: &MockIdentity,
        function: &str,
        args: &[&str],
    ) -> ChaincodeResult<Vec<u8>> {
        let sequence = self.submissions;
        self.submissions += 1;

        let creator = identity.get_id()?;
        let tx_id = MockStub::derive_tx_id(&sequence.to_be_bytes(), creator.as_bytes());
        let timestamp = DateTime::<Utc>::UNIX_EPOCH
            + Duration::seconds(GENESIS_SECONDS + sequence as i64);

        self.stub.begin_transaction(tx_id.clone(), timestamp)?;
        match self.contract.invoke(&mut self.stub, identity, function, args) {
            Ok(payload) => {
                self.stub.commit()?;
                Ok(payload)
            }
            Err(err) => {
                debug!(tx_id = %tx_id, function, error = %err, "rolling back");
                self.stub.rollback()?;
                Err(err)
            }
        }
    }

    /// `submit` with a single JSON argument, decoding a JSON payload
    pub fn submit_json(
        &mut self,
        identity: &MockIdentity,
        function: &str,
        arg: &Value,
    ) -> ChaincodeResult<Value> {
        let arg = arg.to_string();
        let payload = self.submit(identity, function, &[&arg])?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// `submit` for operations whose payload is a key or transaction id
    pub fn submit_key(
        &mut self,
        identity: &MockIdentity,
        function: &str,
        arg: &Value,
    ) -> ChaincodeResult<String> {
        let arg = arg.to_string();
        let payload = self.submit(identity, function, &[&arg])?;
        String::from_utf8(payload).map_err(|e| {
            hospital_shared::ChaincodeError::InvalidInput(format!("payload is not utf-8: {}", e))
        })
    }

    /// Two hospitals with an admin, a patient and a doctor each, plus a
    /// druggist at H1
    pub fn two_hospitals(config: ContractConfig) -> ChaincodeResult<Self> {
        let mut ledger = Self::with_config(config)?;
        let root = super_admin();
        for (hospital, admin) in [("H1", "A1"), ("H2", "A2")] {
            ledger.submit(&root, "CreateHospital", &[&hospital_json(hospital)])?;
            ledger.submit(&root, "CreateHospitalAdmin", &[&admin_json(admin, hospital)])?;
        }
        for (patient, hospital) in [("P1", "H1"), ("P2", "H2")] {
            let input = user_json(patient, "PATIENT", hospital);
            ledger.submit(&patient_identity(patient, hospital), "SelfRegister", &[&input])?;
        }
        for (id, role, admin, hospital) in [
            ("D1", "DOCTOR", "A1", "H1"),
            ("D2", "DOCTOR", "A2", "H2"),
            ("R1", "DRUGGIST", "A1", "H1"),
        ] {
            let input = user_json(id, role, "");
            ledger.submit(&hospital_admin(admin, hospital), "RegisterEntity", &[&input])?;
        }
        Ok(ledger)
    }
}

pub fn super_admin() -> MockIdentity {
    MockIdentity::new("admin", "Org1MSP")
}

pub fn hospital_admin(id: &str, hospital: &str) -> MockIdentity {
    staff(id, "HOSPITAL_ADMIN", hospital)
}

pub fn staff(id: &str, role: &str, hospital: &str) -> MockIdentity {
    MockIdentity::new(id, "Org1MSP")
        .with_attribute("userRole", role)
        .with_attribute("organization", hospital)
}

pub fn patient_identity(id: &str, hospital: &str) -> MockIdentity {
    staff(id, "PATIENT", hospital)
}

pub fn hospital_json(id: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": format!("{} General", id),
        "docType": "HOSPITAL",
        "city": "Pune",
    })
    .to_string()
}

pub fn admin_json(id: &str, hospital: &str) -> String {
    serde_json::json!({
        "id": id,
        "firstName": "Asha",
        "docType": "HOSPITAL_ADMIN",
        "hospitalId": hospital,
    })
    .to_string()
}

pub fn user_json(id: &str, role: &str, hospital: &str) -> String {
    serde_json::json!({
        "id": id,
        "firstName": id,
        "docType": role,
        "hospitalId": hospital,
    })
    .to_string()
}

pub fn access_json(patient: &str, grantee: &str, grantee_kind: &str, access_type: &str) -> Value {
    serde_json::json!({
        "fromUserId": patient,
        "toUserId": grantee,
        "toUserIdRole": grantee_kind,
        "accessType": access_type,
    })
}

pub fn view_json(viewer: &str, patient: &str) -> Value {
    serde_json::json!({ "viewerId": viewer, "userId": patient })
}

pub fn prescription_json(patient: &str, desc: &str) -> Value {
    serde_json::json!({
        "id": patient,
        "desc": desc,
        "medicine": [{ "name": "amoxicillin", "dosage": "250mg", "frequency": "tid" }],
    })
}
