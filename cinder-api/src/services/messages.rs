use chrono::Utc;
use uuid::Uuid;

use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::id;
use cinder_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{ChatMessage, MatchRecord};
use crate::store::Store;

pub const MAX_MESSAGE_LEN: usize = 4000;

/// Append a message to a match the sender participates in. Dissolved
/// matches keep their history readable but accept no new messages.
pub async fn send(
    store: &dyn Store,
    sender_id: &str,
    match_id: &str,
    body: &str,
) -> AppResult<ChatMessage> {
    let record = participant_match(store, sender_id, match_id).await?;
    if !record.is_active() {
        return Err(AppError::new(
            ErrorCode::MatchNotFound,
            "match has been dissolved",
        ));
    }

    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("message body is empty".to_string()));
    }
    if body.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "message body exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }

    let message = ChatMessage {
        id: Uuid::now_v7().to_string(),
        match_id: match_id.to_string(),
        sender_id: sender_id.to_string(),
        body: body.to_string(),
        is_read: false,
        created_at: Utc::now(),
    };
    store.insert_message(message.clone()).await?;
    tracing::debug!(match_id, sender_id, message_id = %message.id, "message sent");
    Ok(message)
}

/// Messages for a match, newest first, participants only.
pub async fn list(
    store: &dyn Store,
    reader_id: &str,
    match_id: &str,
    params: &PaginationParams,
) -> AppResult<Paginated<ChatMessage>> {
    participant_match(store, reader_id, match_id).await?;
    let (items, total) = store
        .list_messages(match_id, params.limit() as i64, params.offset() as i64)
        .await?;
    Ok(Paginated::new(items, total as u64, params))
}

/// Mark every message from the counterpart as read. Returns how many changed.
pub async fn mark_read(store: &dyn Store, reader_id: &str, match_id: &str) -> AppResult<usize> {
    participant_match(store, reader_id, match_id).await?;
    store.mark_messages_read(match_id, reader_id).await
}

async fn participant_match(
    store: &dyn Store,
    user_id: &str,
    match_id: &str,
) -> AppResult<MatchRecord> {
    id::require_well_formed(user_id, "user_id")?;
    id::require_well_formed(match_id, "match_id")?;

    let record = store
        .get_match(match_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
    if !record.involves(user_id) {
        // A user missing from a drifted match's `users` array lands here,
        // exactly the failure the debug tooling diagnoses.
        return Err(AppError::new(
            ErrorCode::PermissionDenied,
            "you are not a participant in this match",
        ));
    }
    Ok(record)
}
