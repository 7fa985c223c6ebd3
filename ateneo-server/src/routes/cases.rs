//! Case submission and claiming endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ateneo_core::{AiReport, CaseOracle};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{CaseId, CaseStore, CreditLedger, DebateId, DebateStore, ProfileStore};

#[derive(Deserialize)]
pub struct SubmitCaseRequest {
    pub volunteer_email: String,
    pub case_text: String,
}

#[derive(Serialize)]
pub struct SubmitCaseResponse {
    pub case_id: CaseId,
    pub report: AiReport,
}

/// POST /api/v1/cases
/// Submit a case; the response carries the freshly generated report
pub async fn submit_case<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Json(req): Json<SubmitCaseRequest>,
) -> Result<Json<SubmitCaseResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let submitted = state
        .engine
        .submit_case(&req.volunteer_email, &req.case_text)
        .await?;

    Ok(Json(SubmitCaseResponse {
        case_id: submitted.case_id,
        report: submitted.report,
    }))
}

/// One claimable case. The submitting volunteer is never exposed here.
#[derive(Serialize)]
pub struct AvailableCase {
    pub case_id: CaseId,
    pub report: AiReport,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AvailableCasesResponse {
    pub cases: Vec<AvailableCase>,
}

/// GET /api/v1/cases/available
/// Claimable cases, newest first
pub async fn list_available<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
) -> Result<Json<AvailableCasesResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let cases = state
        .engine
        .list_available()?
        .into_iter()
        .map(|case| AvailableCase {
            case_id: case.id,
            report: case.report,
            created_at: case.created_at,
        })
        .collect();

    Ok(Json(AvailableCasesResponse { cases }))
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub professional_email: String,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub debate_id: DebateId,
    pub remaining_credits: i64,
}

/// POST /api/v1/cases/{case_id}/claim
/// Spend one credit to open a debate on the case
pub async fn claim_case<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Path(case_id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let outcome = state
        .engine
        .claim_case(&req.professional_email, &CaseId(case_id))?;

    Ok(Json(ClaimResponse {
        debate_id: outcome.debate_id,
        remaining_credits: outcome.remaining_credits,
    }))
}
