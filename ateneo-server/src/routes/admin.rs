//! Operational endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use ateneo_core::CaseOracle;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileStore};

#[derive(Serialize)]
pub struct SweepResponse {
    pub alerts: usize,
    pub released: usize,
}

/// POST /api/v1/admin/sweep
/// Run one alert + release pass right now. Shares the background
/// sweeper, so warnings stay deduplicated across both.
pub async fn run_sweep<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
) -> Result<Json<SweepResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let report = state.sweeper.run_once(Utc::now())?;

    Ok(Json(SweepResponse {
        alerts: report.alerts,
        released: report.released,
    }))
}
