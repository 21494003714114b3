//! Records Coordinator
//!
//! Prescriptions and bills are written once under the transaction id.
//! Patient views embed the most recent prescriptions; history queries
//! page through all of them, newest first.

use hospital_shared::query::{self, QueryBuilder};
use hospital_shared::{
    CallerAttributes, ChaincodeError, ChaincodeResult, ConsentState, Context, DocType, Operation,
    TargetSummary,
};
use ledger_shim::ChaincodeStub;
use records_integrity::*;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, info};

/// Record a prescription for a patient of the caller's hospital
pub fn create_prescription(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<String> {
    let request: PrescriptionInput = serde_json::from_str(input)
        .map_err(|e| ChaincodeError::invalid_json("prescription", e))?;

    let caller = ctx.active_caller()?;
    let patient = load_patient(ctx, &request.id)?;
    ctx.policy()
        .require(Operation::CreatePrescription, &caller, Some(&patient), ConsentState::NoGrant)?;

    let prescription = Prescription {
        timestamp: request
            .timestamp
            .unwrap_or_else(|| ctx.stub().tx_timestamp().timestamp_millis()),
        doc_type: DocType::Prescription,
        doctor_id: caller.identity.clone(),
        id: request.id,
        desc: request.desc,
        medicine: request.medicine,
    };
    validate_prescription(&prescription).into_result()?;

    let tx_id = ctx.tx_id();
    let bytes = serde_json::to_vec(&prescription)?;
    ctx.stub_mut().put_state(&tx_id, &bytes)?;

    info!(
        tx_id = %tx_id,
        patient_id = %prescription.id,
        doctor_id = %prescription.doctor_id,
        "prescription created"
    );
    Ok(tx_id)
}

/// Bill a prescription; the caller is the healthcare provider
pub fn create_billing(ctx: &mut Context<'_>, input: &str) -> ChaincodeResult<String> {
    let request: BillingInput =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("billing", e))?;

    let caller = ctx.active_caller()?;
    let provider_id = match request.healthcare_provider_id.as_deref() {
        Some(id) if id != caller.identity => {
            return Err(ChaincodeError::Unauthorized(format!(
                "caller {} cannot bill on behalf of {}",
                caller.identity, id
            )))
        }
        _ => caller.identity.clone(),
    };

    load_patient(ctx, &request.id)?;

    let prescription = ctx
        .index()
        .get_by_tx(ctx.stub(), &request.prescription_id)?
        .ok_or_else(|| {
            ChaincodeError::NotFound(format!("prescription {} does not exist", request.prescription_id))
        })?;
    let prescription: Prescription = serde_json::from_slice(&prescription).map_err(|_| {
        ChaincodeError::NotFound(format!("{} is not a prescription", request.prescription_id))
    })?;
    if prescription.doc_type != DocType::Prescription {
        return Err(ChaincodeError::NotFound(format!(
            "{} is not a prescription",
            request.prescription_id
        )));
    }
    if prescription.id != request.id {
        return Err(ChaincodeError::InvalidInput(format!(
            "prescription {} belongs to another patient",
            request.prescription_id
        )));
    }

    ctx.policy()
        .require(Operation::CreateBilling, &caller, None, ConsentState::NoGrant)?;

    let billing = Billing {
        id: request.id,
        doc_type: DocType::Billing,
        prescription_id: request.prescription_id,
        doctor_id: prescription.doctor_id,
        healthcare_provider_id: provider_id,
        total_bill: request.total_bill,
        timestamp: request
            .timestamp
            .unwrap_or_else(|| ctx.stub().tx_timestamp().timestamp_millis()),
        medicine: request.medicine,
    };
    validate_billing(&billing).into_result()?;

    let tx_id = ctx.tx_id();
    let bytes = serde_json::to_vec(&billing)?;
    ctx.stub_mut().put_state(&tx_id, &bytes)?;

    info!(
        tx_id = %tx_id,
        patient_id = %billing.id,
        prescription_id = %billing.prescription_id,
        provider_id = %billing.healthcare_provider_id,
        "bill created"
    );
    Ok(tx_id)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientView<'a> {
    patient_detail: &'a RawValue,
    #[serde(rename = "last3PrescriptionDetails")]
    recent_prescriptions: Vec<Box<RawValue>>,
}

/// Patient record plus recent prescriptions, for staff of the patient's hospital
pub fn view_patient(ctx: &Context<'_>, input: &str) -> ChaincodeResult<Vec<u8>> {
    let (caller, request) = parse_view_request(ctx, input)?;
    let bytes = ctx.index().get_active(ctx.stub(), &request.user_id, DocType::Patient)?;
    let patient = TargetSummary::from_bytes(&bytes)?;
    ctx.policy()
        .require(Operation::ViewPatient, &caller, Some(&patient), ConsentState::NoGrant)?;
    render_patient_view(ctx, &patient.id, &bytes)
}

/// Like `view_patient`, but a consent grant to the caller or its
/// organization also suffices
pub fn view_patient_via_consent(ctx: &Context<'_>, input: &str) -> ChaincodeResult<Vec<u8>> {
    let (caller, request) = parse_view_request(ctx, input)?;
    let bytes = ctx.index().get_active(ctx.stub(), &request.user_id, DocType::Patient)?;
    let patient = TargetSummary::from_bytes(&bytes)?;
    let consent = consent::consent_state(ctx.stub(), &patient.id, &caller)?;
    ctx.policy()
        .require(Operation::ViewPatientViaConsent, &caller, Some(&patient), consent)?;
    render_patient_view(ctx, &patient.id, &bytes)
}

fn parse_view_request(
    ctx: &Context<'_>,
    input: &str,
) -> ChaincodeResult<(CallerAttributes, ViewPatientInput)> {
    let request: ViewPatientInput =
        serde_json::from_str(input).map_err(|e| ChaincodeError::invalid_json("view request", e))?;
    let caller = ctx.active_caller()?;
    if !request.viewer_id.is_empty() && request.viewer_id != caller.identity {
        return Err(ChaincodeError::Unauthorized(format!(
            "viewer {} does not match caller {}",
            request.viewer_id, caller.identity
        )));
    }
    Ok((caller, request))
}

fn render_patient_view(ctx: &Context<'_>, patient_id: &str, bytes: &[u8]) -> ChaincodeResult<Vec<u8>> {
    let limit = ctx.config().recent_prescription_limit;
    let recent = recent_prescriptions(ctx.stub(), patient_id, limit)?;
    let patient_detail: Box<RawValue> = serde_json::from_slice(bytes)?;
    let view = PatientView {
        patient_detail: &patient_detail,
        recent_prescriptions: query::raw_values(&recent)?,
    };
    debug!(patient_id, prescriptions = view.recent_prescriptions.len(), "patient view");
    Ok(serde_json::to_vec(&view)?)
}

/// Newest prescriptions first, at most `limit`
pub fn recent_prescriptions(
    stub: &dyn ChaincodeStub,
    patient_id: &str,
    limit: usize,
) -> ChaincodeResult<Vec<query::QueryRecord>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let query = history_query(patient_id, None).limit(limit);
    query::execute(stub, &query)
}

fn history_query(patient_id: &str, doctor_id: Option<&str>) -> QueryBuilder {
    let query = QueryBuilder::new()
        .eq("id", patient_id)
        .doc_type(DocType::Prescription);
    let query = match doctor_id {
        Some(doctor_id) => query.eq("doctorId", doctor_id),
        None => query,
    };
    query.sort_desc("timestamp")
}

/// One page of a patient's prescriptions, newest first
pub fn query_prescription_history(ctx: &Context<'_>, input: &str) -> ChaincodeResult<Vec<u8>> {
    let request: HistoryInput = serde_json::from_str(input)
        .map_err(|e| ChaincodeError::invalid_json("history request", e))?;
    validate_history_input(&request).into_result()?;

    let caller = ctx.active_caller()?;
    let bytes = ctx
        .index()
        .get_active(ctx.stub(), &request.patient_id, DocType::Patient)?;
    let patient = TargetSummary::from_bytes(&bytes)?;
    let consent = consent::consent_state(ctx.stub(), &patient.id, &caller)?;
    ctx.policy()
        .require(Operation::QueryPrescriptionHistory, &caller, Some(&patient), consent)?;

    let query = history_query(&request.patient_id, request.doctor_id.as_deref());
    let bookmark = request.bookmark.as_deref().unwrap_or("");
    let max_page_size = ctx.config().max_page_size;
    // Without a page size the caller gets the largest page allowed
    let page_size = request.page_size.unwrap_or(max_page_size);

    let page = query::execute_paginated(ctx.stub(), &query, page_size, max_page_size, bookmark)?;
    if page.records.is_empty() && bookmark.is_empty() {
        return Err(ChaincodeError::NoResults(format!(
            "no prescription records found for {}",
            request.patient_id
        )));
    }

    debug!(
        patient_id = %request.patient_id,
        fetched = page.fetched_records_count,
        "prescription history"
    );
    Ok(serde_json::to_vec(&page)?)
}

fn load_patient(ctx: &Context<'_>, patient_id: &str) -> ChaincodeResult<TargetSummary> {
    let bytes = ctx.index().get_active(ctx.stub(), patient_id, DocType::Patient)?;
    TargetSummary::from_bytes(&bytes)
}
