use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use cinder_shared::errors::{AppError, AppResult};
use cinder_shared::middleware::MatchmakerUser;
use cinder_shared::types::api::ApiResponse;

use crate::models::{AuditReport, PairCheck, PairFixReport, RepairReport};
use crate::rate_limit::{Action, RateDecision};
use crate::services::{audit, profiles};
use crate::AppState;

/// GET /debug/users/:id/audit
pub async fn audit_user(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<AuditReport>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let report = audit::audit(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// POST /debug/users/:id/repair
pub async fn repair_user(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<RepairReport>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let report = audit::repair(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /debug/matches/:id/check
pub async fn check_match(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> AppResult<Json<ApiResponse<PairCheck>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let check = audit::check_pair(state.store.as_ref(), &match_id).await?;
    Ok(Json(ApiResponse::ok(check)))
}

#[derive(Debug, Deserialize)]
pub struct FixMatchRequest {
    pub user_id: String,
}

/// POST /debug/matches/:id/fix
pub async fn fix_match(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(req): Json<FixMatchRequest>,
) -> AppResult<Json<ApiResponse<PairFixReport>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let report = audit::fix_pair(state.store.as_ref(), &match_id, &req.user_id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

fn parse_action(raw: &str) -> AppResult<Action> {
    raw.parse()
        .map_err(|_| AppError::invalid_argument(format!("unknown rate-limit action: {raw}")))
}

/// GET /debug/rate-limits/:user_id/:action - read-only, never increments.
pub async fn rate_limit_status(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path((user_id, action)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<RateDecision>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let action = parse_action(&action)?;
    let decision = state.limiter.status(&user_id, action).await?;
    Ok(Json(ApiResponse::ok(decision)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRateLimitRequest {
    /// Omit to clear every action's counters for the user.
    pub action: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ResetRateLimitResponse {
    pub reset: bool,
}

/// POST /debug/rate-limits/:user_id/reset
pub async fn rate_limit_reset(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<ResetRateLimitRequest>,
) -> AppResult<Json<ApiResponse<ResetRateLimitResponse>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;
    let action = req.action.as_deref().map(parse_action).transpose()?;
    state.limiter.reset(&user_id, action).await?;
    Ok(Json(ApiResponse::ok(ResetRateLimitResponse { reset: true })))
}
