use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::id;

use crate::models::{MatchRecord, MatchSummary, ProfileCard, UserProfile};
use crate::store::Store;

/// The active match both profiles reference, if any. Discovered the same way
/// the like guard needs it: intersect the two `match_refs` lists and resolve
/// the candidates against the ledger.
pub async fn shared_active_match(
    store: &dyn Store,
    a: &UserProfile,
    b: &UserProfile,
) -> AppResult<Option<MatchRecord>> {
    for match_id in &a.match_refs {
        if !b.match_refs.contains(match_id) {
            continue;
        }
        if let Some(record) = store.get_match(match_id).await? {
            if record.is_active() {
                return Ok(Some(record));
            }
        }
    }
    Ok(None)
}

/// Matchmaker/admin tooling: create a match directly, without a mutual like.
pub async fn arrange(
    store: &dyn Store,
    user_a: &str,
    user_b: &str,
) -> AppResult<(MatchRecord, bool)> {
    id::require_well_formed(user_a, "user_a")?;
    id::require_well_formed(user_b, "user_b")?;
    if user_a == user_b {
        return Err(AppError::invalid_argument("cannot match a user with themselves"));
    }

    let a = store
        .get_profile(user_a)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, format!("profile {user_a} not found")))?;
    let b = store
        .get_profile(user_b)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, format!("profile {user_b} not found")))?;

    if let Some(existing) = shared_active_match(store, &a, &b).await? {
        return Err(AppError::with_details(
            ErrorCode::AlreadyMatched,
            "users are already matched",
            serde_json::json!({ "match_id": existing.id }),
        ));
    }

    let (record, created) = store.create_match(user_a, user_b).await?;
    tracing::info!(match_id = %record.id, user_a, user_b, created, "match arranged");
    Ok((record, created))
}

/// The user's matches, resolved against the ledger and enriched with the
/// counterpart profile and unread-message count. References that do not
/// resolve to an active record with a live counterpart are skipped here;
/// the auditor exists to surface them.
pub async fn list_matches(store: &dyn Store, user_id: &str) -> AppResult<Vec<MatchSummary>> {
    id::require_well_formed(user_id, "user_id")?;
    let profile = store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let mut summaries = Vec::new();
    for match_id in &profile.match_refs {
        let Some(record) = store.get_match(match_id).await? else {
            continue;
        };
        if !record.is_active() {
            continue;
        }
        let Some(counterpart_id) = record.counterpart_of(user_id) else {
            continue;
        };
        let Some(counterpart) = store.get_profile(counterpart_id).await? else {
            continue;
        };
        let unread = store.count_unread(match_id, user_id).await?;
        summaries.push(MatchSummary {
            match_id: record.id.clone(),
            counterpart: ProfileCard::from(&counterpart),
            created_at: record.created_at,
            unread_messages: unread,
        });
    }
    Ok(summaries)
}

/// Load a match for one of its participants. A caller the record does not
/// name gets `PermissionDenied`, which is also how a drifted asymmetric
/// match surfaces to the user left out of the `users` set.
pub async fn get_match_for(
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
        return Err(AppError::new(
            ErrorCode::PermissionDenied,
            "you are not a participant in this match",
        ));
    }
    Ok(record)
}
