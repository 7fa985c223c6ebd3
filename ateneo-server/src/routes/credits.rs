//! Credit balance endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ateneo_core::CaseOracle;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileStore};

#[derive(Deserialize)]
pub struct AddCreditsRequest {
    pub email: String,
    pub delta: i64,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

/// POST /api/v1/credits/add
/// Adjust a balance; stands in for payment-provider glue. A delta that
/// would push the balance negative is refused.
pub async fn add_credits<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Json(req): Json<AddCreditsRequest>,
) -> Result<Json<BalanceResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let email = req.email.to_lowercase();
    let balance = state.profiles.add_credits(&email, req.delta)?;

    tracing::info!(email = %email, delta = req.delta, balance, "Credits adjusted");

    Ok(Json(BalanceResponse { balance }))
}

#[derive(Deserialize)]
pub struct CreditsQuery {
    pub email: String,
}

/// GET /api/v1/credits
pub async fn get_credits<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Query(query): Query<CreditsQuery>,
) -> Result<Json<BalanceResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let balance = state.profiles.get_credits(&query.email.to_lowercase())?;
    Ok(Json(BalanceResponse { balance }))
}
