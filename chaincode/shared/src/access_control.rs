//! Authorization policy
//!
//! `Policy::decide` is a pure function of the operation, the resolved
//! caller, the loaded target summary and the consent state. Coordinators
//! load everything first, ask for a decision, and only then write.

use std::fmt;

use serde::Deserialize;
use tracing::warn;

use crate::config::{ContractConfig, GrantPolicy};
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::identity::CallerAttributes;
use crate::types::{DocType, Role};

/// Operations gated by the policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateHospital,
    CreateHospitalAdmin,
    ReadEntityForAudit,
    RegisterEntity,
    SelfRegister,
    ViewOwnRecord,
    ViewPatient,
    ViewPatientViaConsent,
    CreatePrescription,
    CreateBilling,
    SetAccessGrant,
    QueryPrescriptionHistory,
    SetEntityActive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Consent between a patient and the caller (or the caller's organization)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentState {
    NoGrant,
    Granted,
}

/// The fields of a loaded record the policy looks at
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    pub id: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub hospital_id: Option<String>,
}

impl TargetSummary {
    pub fn from_bytes(bytes: &[u8]) -> ChaincodeResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    NotSuperAdmin,
    MissingRole,
    RoleNotPermitted(Role),
    MissingOrganization,
    DifferentHospital,
    MissingTarget,
    WrongTargetKind(DocType),
    NotRecordOwner,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotSuperAdmin => write!(f, "caller is not the super-admin"),
            DenyReason::MissingRole => write!(f, "caller has no role"),
            DenyReason::RoleNotPermitted(role) => write!(f, "role {} is not permitted", role),
            DenyReason::MissingOrganization => write!(f, "caller has no organization"),
            DenyReason::DifferentHospital => {
                write!(f, "caller organization differs from the record's hospital")
            }
            DenyReason::MissingTarget => write!(f, "no target record"),
            DenyReason::WrongTargetKind(doc_type) => {
                write!(f, "operation does not apply to {} records", doc_type)
            }
            DenyReason::NotRecordOwner => write!(f, "caller does not own the record"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn or_else(self, other: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => Decision::Allow,
            Decision::Deny(_) => other(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Policy<'a> {
    super_admin_id: &'a str,
    grant_policy: GrantPolicy,
}

impl<'a> Policy<'a> {
    pub fn new(config: &'a ContractConfig) -> Self {
        Self {
            super_admin_id: &config.super_admin_id,
            grant_policy: config.grant_policy,
        }
    }

    pub fn decide(
        &self,
        operation: Operation,
        caller: &CallerAttributes,
        target: Option<&TargetSummary>,
        consent: ConsentState,
    ) -> Decision {
        match operation {
            Operation::CreateHospital
            | Operation::CreateHospitalAdmin
            | Operation::ReadEntityForAudit => self.super_admin(caller),
            Operation::RegisterEntity => require_role(caller, &[Role::HospitalAdmin]),
            Operation::SelfRegister => Decision::Allow,
            Operation::ViewOwnRecord => match (target, caller.role) {
                (None, _) => Decision::Deny(DenyReason::MissingTarget),
                (Some(_), None) => Decision::Deny(DenyReason::MissingRole),
                (Some(target), Some(role)) => {
                    if target.id == caller.identity && target.doc_type == role.doc_type() {
                        Decision::Allow
                    } else {
                        Decision::Deny(DenyReason::NotRecordOwner)
                    }
                }
            },
            Operation::ViewPatient => {
                same_hospital(caller, target, &[Role::Doctor, Role::HospitalAdmin])
            }
            Operation::ViewPatientViaConsent => patient_target(target)
                .and_then_consent(consent)
                .or_else(|| same_hospital(caller, target, &[Role::Doctor, Role::HospitalAdmin])),
            Operation::CreatePrescription => same_hospital(caller, target, &[Role::Doctor]),
            Operation::CreateBilling => require_role(caller, &[Role::Druggist, Role::Pathologist]),
            Operation::SetAccessGrant => self.set_access_grant(caller, target),
            Operation::QueryPrescriptionHistory => {
                let own = match (target, caller.role) {
                    (Some(target), Some(Role::Patient))
                        if target.doc_type == DocType::Patient && target.id == caller.identity =>
                    {
                        Decision::Allow
                    }
                    _ => Decision::Deny(DenyReason::NotRecordOwner),
                };
                own.or_else(|| patient_target(target).and_then_consent(consent))
                    .or_else(|| {
                        same_hospital(
                            caller,
                            target,
                            &[Role::Doctor, Role::HospitalAdmin, Role::Patient],
                        )
                    })
            }
            Operation::SetEntityActive => self.set_entity_active(caller, target),
        }
    }

    /// `decide`, with denials turned into `Unauthorized`
    pub fn require(
        &self,
        operation: Operation,
        caller: &CallerAttributes,
        target: Option<&TargetSummary>,
        consent: ConsentState,
    ) -> ChaincodeResult<()> {
        match self.decide(operation, caller, target, consent) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                warn!(
                    operation = %operation,
                    caller = %caller.identity,
                    record = ?target.map(|t| t.id.as_str()),
                    reason = %reason,
                    "access denied"
                );
                Err(ChaincodeError::Unauthorized(format!("{}: {}", operation, reason)))
            }
        }
    }

    pub fn is_super_admin(&self, caller: &CallerAttributes) -> bool {
        caller.identity == self.super_admin_id
    }

    fn super_admin(&self, caller: &CallerAttributes) -> Decision {
        if self.is_super_admin(caller) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::NotSuperAdmin)
        }
    }

    fn set_access_grant(&self, caller: &CallerAttributes, target: Option<&TargetSummary>) -> Decision {
        let grantor = match target {
            None => return Decision::Deny(DenyReason::MissingTarget),
            Some(target) if target.doc_type != DocType::Patient => {
                return Decision::Deny(DenyReason::WrongTargetKind(target.doc_type))
            }
            Some(target) => target,
        };
        match self.grant_policy {
            GrantPolicy::PatientOnly => match require_role(caller, &[Role::Patient]) {
                Decision::Allow if grantor.id == caller.identity => Decision::Allow,
                Decision::Allow => Decision::Deny(DenyReason::NotRecordOwner),
                deny => deny,
            },
            GrantPolicy::HospitalScoped => organization_matches(caller, grantor),
        }
    }

    fn set_entity_active(&self, caller: &CallerAttributes, target: Option<&TargetSummary>) -> Decision {
        let target = match target {
            Some(target) => target,
            None => return Decision::Deny(DenyReason::MissingTarget),
        };
        match target.doc_type {
            DocType::Hospital | DocType::HospitalAdmin => self.super_admin(caller),
            DocType::Patient | DocType::Doctor | DocType::Druggist | DocType::Pathologist => {
                match require_role(caller, &[Role::HospitalAdmin]) {
                    Decision::Allow => organization_matches(caller, target),
                    deny => deny,
                }
            }
            DocType::Prescription | DocType::Billing | DocType::Access => {
                Decision::Deny(DenyReason::WrongTargetKind(target.doc_type))
            }
        }
    }
}

trait ConsentDecision {
    fn and_then_consent(self, consent: ConsentState) -> Decision;
}

impl ConsentDecision for Decision {
    /// Allow only when the target check passed and consent exists
    fn and_then_consent(self, consent: ConsentState) -> Decision {
        match (self, consent) {
            (Decision::Allow, ConsentState::Granted) => Decision::Allow,
            (Decision::Allow, ConsentState::NoGrant) => Decision::Deny(DenyReason::DifferentHospital),
            (deny, _) => deny,
        }
    }
}

fn require_role(caller: &CallerAttributes, allowed: &[Role]) -> Decision {
    match caller.role {
        None => Decision::Deny(DenyReason::MissingRole),
        Some(role) if allowed.contains(&role) => Decision::Allow,
        Some(role) => Decision::Deny(DenyReason::RoleNotPermitted(role)),
    }
}

fn patient_target(target: Option<&TargetSummary>) -> Decision {
    match target {
        None => Decision::Deny(DenyReason::MissingTarget),
        Some(target) if target.doc_type == DocType::Patient => Decision::Allow,
        Some(target) => Decision::Deny(DenyReason::WrongTargetKind(target.doc_type)),
    }
}

fn organization_matches(caller: &CallerAttributes, target: &TargetSummary) -> Decision {
    match (&caller.organization, &target.hospital_id) {
        (None, _) => Decision::Deny(DenyReason::MissingOrganization),
        (Some(org), Some(hospital)) if org == hospital => Decision::Allow,
        _ => Decision::Deny(DenyReason::DifferentHospital),
    }
}

/// Caller role in `allowed`, target a patient, and caller organization equal
/// to the patient's hospital
fn same_hospital(
    caller: &CallerAttributes,
    target: Option<&TargetSummary>,
    allowed: &[Role],
) -> Decision {
    let target = match target {
        Some(target) => target,
        None => return Decision::Deny(DenyReason::MissingTarget),
    };
    if target.doc_type != DocType::Patient {
        return Decision::Deny(DenyReason::WrongTargetKind(target.doc_type));
    }
    match require_role(caller, allowed) {
        Decision::Allow => organization_matches(caller, target),
        deny => deny,
    }
}
