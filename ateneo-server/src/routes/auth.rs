//! Registration and account endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ateneo_core::CaseOracle;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileKind, ProfileStore};

#[derive(Deserialize)]
pub struct SignWaiverRequest {
    pub email: String,
    pub kind: String,
}

#[derive(Serialize)]
pub struct SignWaiverResponse {
    pub email: String,
    pub kind: String,
    pub waiver_signed: bool,
}

/// POST /api/v1/auth/waiver
/// Create the profile if needed and record waiver acceptance
pub async fn sign_waiver<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Json(req): Json<SignWaiverRequest>,
) -> Result<Json<SignWaiverResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::ValidationError(
            "a valid email is required".to_string(),
        ));
    }

    let kind = ProfileKind::from_str(&req.kind).ok_or_else(|| {
        ApiError::ValidationError("kind must be 'volunteer' or 'professional'".to_string())
    })?;

    // Create-if-absent; an existing profile keeps its stored kind.
    match state.profiles.create(&email, kind) {
        Ok(_) => tracing::info!(email = %email, kind = kind.as_str(), "Profile created"),
        Err(ApiError::ProfileAlreadyExists) => {}
        Err(e) => return Err(e),
    }

    state.profiles.mark_waiver(&email)?;

    let profile = state
        .profiles
        .get(&email)?
        .ok_or(ApiError::ProfileNotFound)?;

    Ok(Json(SignWaiverResponse {
        email: profile.email,
        kind: profile.kind.as_str().to_string(),
        waiver_signed: profile.waiver_signed,
    }))
}

#[derive(Deserialize)]
pub struct MeQuery {
    pub email: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub email: String,
    pub kind: String,
    pub waiver_signed: bool,
    pub credits: i64,
    pub ranking: i64,
    pub created_at: DateTime<Utc>,
}

/// GET /api/v1/auth/me
/// Full view of one profile
pub async fn me<P, C, D, O>(
    State(state): State<Arc<AppState<P, C, D, O>>>,
    Query(query): Query<MeQuery>,
) -> Result<Json<MeResponse>, ApiError>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    let profile = state
        .profiles
        .get(&query.email.to_lowercase())?
        .ok_or(ApiError::ProfileNotFound)?;

    Ok(Json(MeResponse {
        email: profile.email,
        kind: profile.kind.as_str().to_string(),
        waiver_signed: profile.waiver_signed,
        credits: profile.credits,
        ranking: profile.ranking,
        created_at: profile.created_at,
    }))
}
