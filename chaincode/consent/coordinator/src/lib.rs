//! Consent Coordinator
//!
//! Grant and revoke access to a patient's records, look grants up for the
//! authorization policy, and list a caller's grants.

use consent_integrity::*;
use hospital_shared::query::{self, QueryBuilder};
use hospital_shared::{
    CallerAttributes, ChaincodeError, ChaincodeResult, ConsentState, Context, DocType, Operation,
    Role, TargetSummary,
};
use ledger_shim::ChaincodeStub;
use tracing::{debug, info};

/// Apply a GRANT or REVOKE; returns the key written or deleted
pub fn set_access_grant(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<String> {
    let request: AccessRightsInput = serde_json::from_str(input)
        .map_err(|e| ChaincodeError::invalid_json("access request", e))?;
    validate_access_rights(&request).into_result()?;

    let caller = ctx.active_caller()?;
    let index = ctx.index();
    let patient = index.get_active(ctx.stub(), &request.from_user_id, DocType::Patient)?;
    let patient = TargetSummary::from_bytes(&patient)?;
    ctx.policy()
        .require(Operation::SetAccessGrant, &caller, Some(&patient), ConsentState::NoGrant)?;

    let grantee_kind = request.to_user_id_role;
    if grantee_kind == DocType::Patient || !grantee_kind.is_indexed_entity() {
        return Err(ChaincodeError::InvalidTarget(format!(
            "access cannot be granted to a {}",
            grantee_kind
        )));
    }
    // Only a new grant needs a live grantee; a suspended one can still be revoked
    if request.access_type == AccessType::Grant {
        index.get_active(ctx.stub(), &request.to_user_id, grantee_kind)?;
    }

    let existing = is_access_granted(ctx.stub(), &request.from_user_id, &[&request.to_user_id])?;

    match (request.access_type, existing) {
        (AccessType::Grant, None) => {
            let key = ctx.tx_id();
            let grant = AccessGrant::new(&request.from_user_id, &request.to_user_id);
            let bytes = serde_json::to_vec(&grant)?;
            ctx.stub_mut().put_state(&key, &bytes)?;
            info!(
                tx_id = %key,
                patient_id = %request.from_user_id,
                grantee_id = %request.to_user_id,
                "access granted"
            );
            Ok(key)
        }
        (AccessType::Revoke, Some(key)) => {
            index.delete(ctx.stub_mut(), &key)?;
            info!(
                tx_id = %ctx.tx_id(),
                patient_id = %request.from_user_id,
                grantee_id = %request.to_user_id,
                key = %key,
                "access revoked"
            );
            Ok(key)
        }
        (AccessType::Grant, Some(key)) => Err(ChaincodeError::InvalidConsentTransition(format!(
            "access to {} is already granted to {} (grant {})",
            request.from_user_id, request.to_user_id, key
        ))),
        (AccessType::Revoke, None) => Err(ChaincodeError::InvalidConsentTransition(format!(
            "access to {} is already revoked for {}",
            request.from_user_id, request.to_user_id
        ))),
    }
}

/// Key of a grant from `patient_id` to any of `grantee_ids`
pub fn is_access_granted(
    stub: &dyn ChaincodeStub,
    patient_id: &str,
    grantee_ids: &[&str],
) -> ChaincodeResult<Option<String>> {
    if grantee_ids.is_empty() {
        return Ok(None);
    }
    let query = QueryBuilder::new()
        .eq("id", patient_id)
        .doc_type(DocType::Access)
        .any_of("doctorId", grantee_ids);
    let key = query::first_key(stub, &query)?;
    debug!(patient_id, grantees = ?grantee_ids, granted = key.is_some(), "consent lookup");
    Ok(key)
}

/// Consent held by the caller individually or through its organization
pub fn consent_state(
    stub: &dyn ChaincodeStub,
    patient_id: &str,
    caller: &CallerAttributes,
) -> ChaincodeResult<ConsentState> {
    let grantees = grantee_ids(caller);
    Ok(match is_access_granted(stub, patient_id, &grantees)? {
        Some(_) => ConsentState::Granted,
        None => ConsentState::NoGrant,
    })
}

/// Organization first, then the individual identity
fn grantee_ids(caller: &CallerAttributes) -> Vec<&str> {
    caller
        .organization
        .as_deref()
        .into_iter()
        .chain(std::iter::once(caller.identity.as_str()))
        .collect()
}

/// One page of the grants issued by a patient caller, or received by
/// anyone else
pub fn list_my_grants(ctx: &Context<'_>, input: Option<&str>) -> ChaincodeResult<Vec<u8>> {
    let request: GrantListInput = match input {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ChaincodeError::invalid_json("grant list request", e))?,
        None => GrantListInput::default(),
    };

    let caller = ctx.active_caller()?;
    let query = match caller.role {
        Some(Role::Patient) => QueryBuilder::new()
            .eq("id", caller.identity.as_str())
            .doc_type(DocType::Access),
        _ => QueryBuilder::new()
            .doc_type(DocType::Access)
            .any_of("doctorId", &grantee_ids(&caller)),
    };

    let max_page_size = ctx.config().max_page_size;
    let page = query::execute_paginated(
        ctx.stub(),
        &query,
        request.page_size.unwrap_or(max_page_size),
        max_page_size,
        request.bookmark.as_deref().unwrap_or(""),
    )?;
    debug!(caller = %caller.identity, count = page.fetched_records_count, "listed grants");
    Ok(serde_json::to_vec(&page)?)
}
