use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use cinder_shared::errors::AppResult;
use cinder_shared::middleware::{AdminUser, MatchmakerUser};
use cinder_shared::types::api::ApiResponse;

use crate::events::{publisher, ChangeKind};
use crate::models::{MatchRecord, UserProfile};
use crate::services::{matches, profiles};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ArrangeMatchRequest {
    pub user_a: String,
    pub user_b: String,
}

/// POST /admin/matches - verified matchmakers and admins arrange a match
/// directly, skipping the mutual-like flow.
pub async fn arrange_match(
    MatchmakerUser(operator): MatchmakerUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ArrangeMatchRequest>,
) -> AppResult<Json<ApiResponse<MatchRecord>>> {
    profiles::require_verified_operator(state.store.as_ref(), &operator).await?;

    let (record, created) = matches::arrange(state.store.as_ref(), &req.user_a, &req.user_b).await?;
    if created {
        publisher::publish_match_created(&state.rabbitmq, &record.id, &req.user_a, &req.user_b, true)
            .await;
        state.bus.notify(&req.user_a, ChangeKind::MatchCreated);
        state.bus.notify(&req.user_b, ChangeKind::MatchCreated);
    }
    Ok(Json(ApiResponse::ok(record)))
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyMatchmakerRequest {
    pub organization: Option<String>,
}

/// POST /admin/matchmakers/:id/verify - admin only.
pub async fn verify_matchmaker(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<VerifyMatchmakerRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile =
        profiles::verify_matchmaker(state.store.as_ref(), &user_id, req.organization.clone())
            .await?;
    publisher::publish_matchmaker_verified(&state.rabbitmq, &profile.id, req.organization.as_deref())
        .await;
    Ok(Json(ApiResponse::ok(profile)))
}
