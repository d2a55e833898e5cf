use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use cinder_shared::errors::AppResult;
use cinder_shared::types::api::ApiResponse;
use cinder_shared::types::auth::AuthUser;

use crate::models::{MatchRecord, MatchSummary};
use crate::services::matches;
use crate::AppState;

/// GET /matches
pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let summaries = matches::list_matches(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(summaries)))
}

/// GET /matches/:id - participants only.
pub async fn get_match(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> AppResult<Json<ApiResponse<MatchRecord>>> {
    let record = matches::get_match_for(state.store.as_ref(), &user.id, &match_id).await?;
    Ok(Json(ApiResponse::ok(record)))
}
