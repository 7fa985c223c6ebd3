//! HTTP routes for the platform

mod admin;
mod auth;
mod cases;
mod credits;
mod debates;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use ateneo_core::CaseOracle;

use crate::state::AppState;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileStore};

/// Create the router with all routes
pub fn create_router<P, C, D, O>(state: Arc<AppState<P, C, D, O>>) -> Router
where
    P: ProfileStore + CreditLedger + 'static,
    C: CaseStore + 'static,
    D: DebateStore + 'static,
    O: CaseOracle + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/waiver", post(auth::sign_waiver))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/cases", post(cases::submit_case))
        .route("/api/v1/cases/available", get(cases::list_available))
        .route("/api/v1/cases/{case_id}/claim", post(cases::claim_case))
        .route("/api/v1/debates/refute", post(debates::submit_refutation))
        .route("/api/v1/credits/add", post(credits::add_credits))
        .route("/api/v1/credits", get(credits::get_credits))
        .route("/api/v1/admin/sweep", post(admin::run_sweep))
        .with_state(state)
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}
