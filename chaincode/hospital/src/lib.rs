//! Hospital Ledger Contract
//!
//! The contract surface over the registry, records and consent crates.
//! Every operation has a typed entry point; `invoke` dispatches by the
//! function name a client submits and `handle` wraps the outcome in a
//! status response carrying the error code.

use hospital_shared::{ChaincodeError, ChaincodeResult, Context, ContractConfig};
use ledger_shim::{ChaincodeStub, ClientIdentity};
use serde::Serialize;
use tracing::{debug, warn};

/// Status of a successful response
pub const OK: u16 = 200;
/// Status of a failed response
pub const ERROR: u16 = 500;

/// Outcome of one invocation as returned to the client
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// `CODE: description` on failure, empty on success
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: OK,
            message: String::new(),
            payload,
        }
    }

    pub fn error(err: &ChaincodeError) -> Self {
        Self {
            status: ERROR,
            message: format!("{}: {}", err.code(), err),
            payload: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OK
    }
}

/// Exposed function names, in the order they are documented
pub const FUNCTIONS: [&str; 14] = [
    "CreateHospital",
    "CreateHospitalAdmin",
    "RegisterEntity",
    "SelfRegister",
    "ViewOwnRecord",
    "ViewPatient",
    "ViewPatientViaConsent",
    "CreatePrescription",
    "CreateBilling",
    "SetAccessGrant",
    "QueryPrescriptionHistory",
    "ListMyGrants",
    "SetEntityActive",
    "ReadEntityForAudit",
];

#[derive(Clone, Debug, Default)]
pub struct HospitalContract {
    config: ContractConfig,
}

impl HospitalContract {
    pub fn new(config: ContractConfig) -> ChaincodeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build from the chaincode init argument; blank means defaults
    pub fn from_init_args(raw: &str) -> ChaincodeResult<Self> {
        Ok(Self {
            config: ContractConfig::from_json(raw)?,
        })
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    fn context<'a>(
        &'a self,
        stub: &'a mut dyn ChaincodeStub,
        identity: &'a dyn ClientIdentity,
    ) -> Context<'a> {
        Context::new(stub, identity, &self.config)
    }

    pub fn create_hospital(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<()> {
        registry::create_hospital(&mut self.context(stub, identity), input)
    }

    pub fn create_hospital_admin(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<()> {
        registry::create_hospital_admin(&mut self.context(stub, identity), input)
    }

    pub fn register_entity(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<()> {
        registry::register_entity(&mut self.context(stub, identity), input)
    }

    pub fn self_register(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<()> {
        registry::self_register(&mut self.context(stub, identity), input)
    }

    pub fn view_own_record(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
    ) -> ChaincodeResult<Vec<u8>> {
        registry::view_own_record(&self.context(stub, identity))
    }

    pub fn view_patient(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<Vec<u8>> {
        records::view_patient(&self.context(stub, identity), input)
    }

    pub fn view_patient_via_consent(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<Vec<u8>> {
        records::view_patient_via_consent(&self.context(stub, identity), input)
    }

    /// Returns the id of the transaction that now keys the prescription
    pub fn create_prescription(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<String> {
        records::create_prescription(&mut self.context(stub, identity), input)
    }

    pub fn create_billing(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<String> {
        records::create_billing(&mut self.context(stub, identity), input)
    }

    /// Returns the key of the grant that was written or removed
    pub fn set_access_grant(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<String> {
        consent::set_access_grant(&mut self.context(stub, identity), input)
    }

    pub fn query_prescription_history(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<Vec<u8>> {
        records::query_prescription_history(&self.context(stub, identity), input)
    }

    /// `input` is an optional `{pageSize, bookmark}` request
    pub fn list_my_grants(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: Option<&str>,
    ) -> ChaincodeResult<Vec<u8>> {
        consent::list_my_grants(&self.context(stub, identity), input)
    }

    pub fn set_entity_active(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<()> {
        registry::set_entity_active(&mut self.context(stub, identity), input)
    }

    pub fn read_entity_for_audit(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        input: &str,
    ) -> ChaincodeResult<Vec<u8>> {
        registry::read_entity_for_audit(&self.context(stub, identity), input)
    }

    /// Dispatch by function name
    pub fn invoke(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        function: &str,
        args: &[&str],
    ) -> ChaincodeResult<Vec<u8>> {
        debug!(function, args = args.len(), tx_id = %stub.tx_id(), "invoke");
        match function {
            "CreateHospital" => {
                self.create_hospital(stub, identity, single_arg(function, args)?)?;
                Ok(Vec::new())
            }
            "CreateHospitalAdmin" => {
                self.create_hospital_admin(stub, identity, single_arg(function, args)?)?;
                Ok(Vec::new())
            }
            "RegisterEntity" => {
                self.register_entity(stub, identity, single_arg(function, args)?)?;
                Ok(Vec::new())
            }
            "SelfRegister" => {
                self.self_register(stub, identity, single_arg(function, args)?)?;
                Ok(Vec::new())
            }
            "ViewOwnRecord" => {
                no_args(function, args)?;
                self.view_own_record(stub, identity)
            }
            "ViewPatient" => self.view_patient(stub, identity, single_arg(function, args)?),
            "ViewPatientViaConsent" => {
                self.view_patient_via_consent(stub, identity, single_arg(function, args)?)
            }
            "CreatePrescription" => self
                .create_prescription(stub, identity, single_arg(function, args)?)
                .map(String::into_bytes),
            "CreateBilling" => self
                .create_billing(stub, identity, single_arg(function, args)?)
                .map(String::into_bytes),
            "SetAccessGrant" => self
                .set_access_grant(stub, identity, single_arg(function, args)?)
                .map(String::into_bytes),
            "QueryPrescriptionHistory" => {
                self.query_prescription_history(stub, identity, single_arg(function, args)?)
            }
            "ListMyGrants" => self.list_my_grants(stub, identity, optional_arg(function, args)?),
            "SetEntityActive" => {
                self.set_entity_active(stub, identity, single_arg(function, args)?)?;
                Ok(Vec::new())
            }
            "ReadEntityForAudit" => {
                self.read_entity_for_audit(stub, identity, single_arg(function, args)?)
            }
            _ => Err(ChaincodeError::InvalidInput(format!(
                "unknown function {}",
                function
            ))),
        }
    }

    /// `invoke`, with the outcome folded into a status response
    pub fn handle(
        &self,
        stub: &mut dyn ChaincodeStub,
        identity: &dyn ClientIdentity,
        function: &str,
        args: &[&str],
    ) -> Response {
        match self.invoke(stub, identity, function, args) {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                warn!(function, code = err.code(), error = %err, "invocation failed");
                Response::error(&err)
            }
        }
    }
}

fn single_arg<'a>(function: &str, args: &[&'a str]) -> ChaincodeResult<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(ChaincodeError::InvalidInput(format!(
            "{} expects 1 argument, got {}",
            function,
            args.len()
        ))),
    }
}

fn optional_arg<'a>(function: &str, args: &[&'a str]) -> ChaincodeResult<Option<&'a str>> {
    match args {
        [] => Ok(None),
        [arg] => Ok(Some(*arg)),
        _ => Err(ChaincodeError::InvalidInput(format!(
            "{} expects at most 1 argument, got {}",
            function,
            args.len()
        ))),
    }
}

fn no_args(function: &str, args: &[&str]) -> ChaincodeResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ChaincodeError::InvalidInput(format!(
            "{} expects no arguments, got {}",
            function,
            args.len()
        )))
    }
}
