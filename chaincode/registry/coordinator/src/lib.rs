//! Registry Coordinator
//!
//! Creates hospitals, hospital admins and users, lets callers read their
//! own record, and covers the lifecycle (suspend/reactivate) and audit
//! paths. Every creation runs parse, validate, authorize, reference
//! checks and uniqueness before its single write.

use hospital_shared::{
    ChaincodeError, ChaincodeResult, ConsentState, Context, DocType, Operation, TargetSummary,
};
use registry_integrity::*;
use tracing::{debug, info};

/// Create a hospital (super-admin only)
pub fn create_hospital(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<()> {
    let mut hospital: Hospital =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("hospital", e))?;
    validate_hospital(&hospital).into_result()?;

    let caller = ctx.caller()?;
    ctx.policy()
        .require(Operation::CreateHospital, &caller, None, ConsentState::NoGrant)?;

    let index = ctx.index();
    if index.exists(ctx.stub(), &hospital.id, DocType::Hospital)? {
        return Err(ChaincodeError::AlreadyExists(format!(
            "hospital {} already exists",
            hospital.id
        )));
    }

    hospital.active = true;
    let bytes = serde_json::to_vec(&hospital)?;
    index.put(ctx.stub_mut(), &hospital.id, DocType::Hospital, &bytes)?;

    info!(tx_id = %ctx.tx_id(), hospital_id = %hospital.id, "hospital created");
    Ok(())
}

/// Create the admin of an existing, active hospital (super-admin only)
pub fn create_hospital_admin(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<()> {
    let mut admin: HospitalAdmin = serde_json::from_str(input)
        .map_err(|e| ChaincodeError::invalid_json("hospital admin", e))?;
    validate_hospital_admin(&admin).into_result()?;

    let caller = ctx.caller()?;
    ctx.policy()
        .require(Operation::CreateHospitalAdmin, &caller, None, ConsentState::NoGrant)?;

    let index = ctx.index();
    let hospital: Hospital = index.read_typed(ctx.stub(), &admin.hospital_id, DocType::Hospital)?;
    debug!(hospital_id = %hospital.id, name = %hospital.name, "admin hospital resolved");
    if index.exists(ctx.stub(), &admin.id, DocType::HospitalAdmin)? {
        return Err(ChaincodeError::AlreadyExists(format!(
            "hospital admin {} already exists",
            admin.id
        )));
    }

    admin.active = true;
    let bytes = serde_json::to_vec(&admin)?;
    index.put(ctx.stub_mut(), &admin.id, DocType::HospitalAdmin, &bytes)?;

    info!(
        tx_id = %ctx.tx_id(),
        admin_id = %admin.id,
        hospital_id = %admin.hospital_id,
        "hospital admin created"
    );
    Ok(())
}

/// Register a user under the calling admin's hospital
pub fn register_entity(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<()> {
    let mut user: User =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("user", e))?;
    validate_user(&user, false).into_result()?;

    let caller = ctx.caller()?;
    ctx.policy()
        .require(Operation::RegisterEntity, &caller, None, ConsentState::NoGrant)?;
    let organization = caller.require_organization()?.to_string();

    let index = ctx.index();
    index.get_active(ctx.stub(), &organization, DocType::Hospital)?;

    let doc_type = user.doc_type.doc_type();
    if index.exists(ctx.stub(), &user.id, doc_type)? {
        return Err(ChaincodeError::AlreadyExists(format!(
            "{} {} already exists",
            doc_type, user.id
        )));
    }

    if !user.hospital_id.is_empty() && user.hospital_id != organization {
        debug!(
            supplied = %user.hospital_id,
            organization = %organization,
            "overriding supplied hospitalId with caller organization"
        );
    }
    user.hospital_id = organization;
    user.active = true;
    store_user(ctx, &user)
}

/// Register oneself under an existing hospital
pub fn self_register(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<()> {
    let mut user: User =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("user", e))?;
    validate_user(&user, true).into_result()?;

    let caller = ctx.caller()?;
    ctx.policy()
        .require(Operation::SelfRegister, &caller, None, ConsentState::NoGrant)?;
    if user.id != caller.identity {
        return Err(ChaincodeError::Unauthorized(format!(
            "caller {} cannot register as {}",
            caller.identity, user.id
        )));
    }

    let index = ctx.index();
    index.get_active(ctx.stub(), &user.hospital_id, DocType::Hospital)?;

    let doc_type = user.doc_type.doc_type();
    if index.exists(ctx.stub(), &user.id, doc_type)? {
        return Err(ChaincodeError::AlreadyExists(format!(
            "{} {} already exists",
            doc_type, user.id
        )));
    }

    user.active = true;
    store_user(ctx, &user)
}

fn store_user(ctx: &mut Context<'_>, user: &User) -> ChaincodeResult<()> {
    let doc_type = user.doc_type.doc_type();
    let bytes = serde_json::to_vec(user)?;
    ctx.index().put(ctx.stub_mut(), &user.id, doc_type, &bytes)?;

    info!(
        tx_id = %ctx.tx_id(),
        user_id = %user.id,
        doc_type = %doc_type,
        hospital_id = %user.hospital_id,
        "user registered"
    );
    Ok(())
}

/// The caller's own record, looked up by (identity, role)
pub fn view_own_record(ctx: &Context<'_>) -> ChaincodeResult<Vec<u8>> {
    let caller = ctx.caller()?;
    let role = caller.require_role()?;
    let doc_type = role.doc_type();

    let bytes = ctx
        .index()
        .get(ctx.stub(), &caller.identity, doc_type)?
        .ok_or_else(|| {
            ChaincodeError::NotFound(format!("{} {} is not registered", doc_type, caller.identity))
        })?;

    let target = TargetSummary::from_bytes(&bytes)?;
    ctx.policy()
        .require(Operation::ViewOwnRecord, &caller, Some(&target), ConsentState::NoGrant)?;
    Ok(bytes)
}

/// Suspend or reactivate an indexed entity
pub fn set_entity_active(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<()> {
    let request: SetActiveInput =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("request", e))?;
    validate_entity_ref(&request.id, request.doc_type).into_result()?;

    let caller = ctx.caller()?;
    let index = ctx.index();
    let bytes = index
        .get_entity_raw(ctx.stub(), &request.id, request.doc_type)?
        .ok_or_else(|| {
            ChaincodeError::NotFound(format!("{} {} does not exist", request.doc_type, request.id))
        })?;
    let target = TargetSummary::from_bytes(&bytes)?;
    ctx.policy()
        .require(Operation::SetEntityActive, &caller, Some(&target), ConsentState::NoGrant)?;

    let updated = with_active_flag(request.doc_type, &bytes, request.active)?;
    index.put(ctx.stub_mut(), &request.id, request.doc_type, &updated)?;

    info!(
        tx_id = %ctx.tx_id(),
        id = %request.id,
        doc_type = %request.doc_type,
        active = request.active,
        "entity lifecycle changed"
    );
    Ok(())
}

/// Rewrite the record through its typed form so field order is preserved
fn with_active_flag(doc_type: DocType, bytes: &[u8], active: bool) -> ChaincodeResult<Vec<u8>> {
    match doc_type {
        DocType::Hospital => {
            let mut hospital: Hospital = serde_json::from_slice(bytes)?;
            hospital.active = active;
            Ok(serde_json::to_vec(&hospital)?)
        }
        DocType::HospitalAdmin => {
            let mut admin: HospitalAdmin = serde_json::from_slice(bytes)?;
            admin.active = active;
            Ok(serde_json::to_vec(&admin)?)
        }
        DocType::Patient | DocType::Doctor | DocType::Druggist | DocType::Pathologist => {
            let mut user: User = serde_json::from_slice(bytes)?;
            user.active = active;
            Ok(serde_json::to_vec(&user)?)
        }
        DocType::Prescription | DocType::Billing | DocType::Access => Err(
            ChaincodeError::InvalidTarget(format!("{} records have no lifecycle", doc_type)),
        ),
    }
}

/// Stored bytes of any indexed entity, active or not (super-admin only)
pub fn read_entity_for_audit(ctx: &Context<'_>, input: &str) -> ChaincodeResult<Vec<u8>> {
    let request: EntityRef =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("request", e))?;
    validate_entity_ref(&request.id, request.doc_type).into_result()?;

    let caller = ctx.caller()?;
    ctx.policy()
        .require(Operation::ReadEntityForAudit, &caller, None, ConsentState::NoGrant)?;

    ctx.index()
        .get_entity_raw(ctx.stub(), &request.id, request.doc_type)?
        .ok_or_else(|| {
            ChaincodeError::NotFound(format!("{} {} does not exist", request.doc_type, request.id))
        })
}
