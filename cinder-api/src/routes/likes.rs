use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use cinder_shared::errors::AppResult;
use cinder_shared::types::api::ApiResponse;
use cinder_shared::types::auth::AuthUser;

use crate::events::{publisher, ChangeKind};
use crate::rate_limit::Action;
use crate::services::likes::{self, LikeOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub target_id: String,
}

/// POST /likes
pub async fn send_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<LikeOutcome>>> {
    state.limiter.enforce(&user.id, Action::Like).await?;

    let outcome = likes::like(state.store.as_ref(), &user.id, &req.target_id).await?;

    publisher::publish_like_sent(&state.rabbitmq, &user.id, &req.target_id, outcome.is_match).await;
    if let Some(match_id) = &outcome.match_id {
        publisher::publish_match_created(&state.rabbitmq, match_id, &user.id, &req.target_id, false)
            .await;
        state.bus.notify(&user.id, ChangeKind::MatchCreated);
        state.bus.notify(&req.target_id, ChangeKind::MatchCreated);
    } else {
        state.bus.notify(&req.target_id, ChangeKind::LikeReceived);
    }

    Ok(Json(ApiResponse::ok(outcome)))
}

#[derive(Debug, serde::Serialize)]
pub struct PassResponse {
    pub recorded: bool,
}

/// POST /passes
pub async fn send_pass(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<PassResponse>>> {
    state.limiter.enforce(&user.id, Action::Pass).await?;

    likes::pass(state.store.as_ref(), &user.id, &req.target_id).await?;
    Ok(Json(ApiResponse::ok(PassResponse { recorded: true })))
}
