use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use cinder_shared::errors::AppResult;
use cinder_shared::types::api::ApiResponse;
use cinder_shared::types::auth::AuthUser;
use cinder_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::{publisher, ChangeKind};
use crate::models::ChatMessage;
use crate::rate_limit::Action;
use crate::services::{matches, messages};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// GET /matches/:id/messages - newest first, participants only.
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ChatMessage>>>> {
    let page = messages::list(state.store.as_ref(), &user.id, &match_id, &params).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /matches/:id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<ChatMessage>>> {
    state.limiter.enforce(&user.id, Action::Message).await?;

    let record = matches::get_match_for(state.store.as_ref(), &user.id, &match_id).await?;
    let message = messages::send(state.store.as_ref(), &user.id, &match_id, &req.body).await?;

    publisher::publish_message_sent(
        &state.rabbitmq,
        &message.id,
        &message.match_id,
        &message.sender_id,
        &message.body,
    )
    .await;
    if let Some(counterpart) = record.counterpart_of(&user.id) {
        state.bus.notify(counterpart, ChangeKind::MessageReceived);
    }

    Ok(Json(ApiResponse::ok(message)))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// POST /matches/:id/read - mark the counterpart's messages read.
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    let updated = messages::mark_read(state.store.as_ref(), &user.id, &match_id).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}
