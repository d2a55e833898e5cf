use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use serde::Serialize;

use cinder_shared::errors::AppResult;
use cinder_shared::types::api::ApiResponse;
use cinder_shared::types::auth::AuthUser;

use crate::events::ChangeKind;
use crate::models::NotificationCounts;
use crate::rate_limit::Action;
use crate::services::notifications;
use crate::AppState;

/// GET /notifications/counts
pub async fn get_counts(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<NotificationCounts>>> {
    let counts = notifications::counts(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

#[derive(Debug, Serialize)]
pub struct MarkSeenResponse {
    pub acknowledged: bool,
}

/// POST /notifications/mark-seen
pub async fn mark_seen(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MarkSeenResponse>>> {
    state.limiter.enforce(&user.id, Action::MarkSeen).await?;

    let acknowledged = notifications::mark_all_seen(state.store.as_ref(), &user.id).await?;
    state.bus.notify(&user.id, ChangeKind::SeenMarked);
    Ok(Json(ApiResponse::ok(MarkSeenResponse { acknowledged })))
}

/// GET /notifications/stream - live badge counts over SSE.
///
/// Emits a snapshot on connect, then recomputes and emits on every change
/// addressed to this user. A lagged subscriber recomputes from storage
/// instead of replaying what it missed; the stream ends when the client
/// disconnects or the bus closes.
pub async fn stream(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut rx = state.bus.subscribe();
    let store = state.store.clone();
    let user_id = user.id;
    tracing::debug!(user_id = %user_id, "notification stream connected");

    let stream = async_stream::stream! {
        if let Some(event) = counts_event(store.as_ref(), &user_id).await {
            yield Ok(event);
        }

        loop {
            match rx.recv().await {
                Ok(change) => {
                    if change.user_id != user_id {
                        continue;
                    }
                    if let Some(event) = counts_event(store.as_ref(), &user_id).await {
                        yield Ok(event);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "notification stream lagged");
                    if let Some(event) = counts_event(store.as_ref(), &user_id).await {
                        yield Ok(event);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

async fn counts_event(store: &dyn crate::store::Store, user_id: &str) -> Option<SseEvent> {
    let counts = match notifications::counts(store, user_id).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "failed to recompute counts for stream");
            return None;
        }
    };
    let json = serde_json::to_string(&counts).ok()?;
    Some(SseEvent::default().event("counts").data(json))
}
