//! Refutation endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use ateneo_core::CaseOracle;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{CaseStore, CreditLedger, DebateId, DebateStore, ProfileStore};

#[derive(Deserialize)]
pub struct RefuteRequest {
    pub debate_id: i64,
    pub professional_email: String,
    pub refutation_text: String,
}

#[derive(Serialize)]
pub struct RefuteResponse {
    pub score: u8,
    pub ranking_delta: i64,
    pub message: String,
}

/// POST /api/v1/debates/refute
/// Score the refutation against the frozen report and close the debate
pub async fn submit_refutation<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Json(req): Json<RefuteRequest>,
) -> Result<Json<RefuteResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let outcome = state
        .engine
        .submit_refutation(
            DebateId(req.debate_id),
            &req.professional_email,
            &req.refutation_text,
        )
        .await?;

    Ok(Json(RefuteResponse {
        score: outcome.score,
        ranking_delta: outcome.ranking_delta,
        message: outcome.message,
    }))
}
