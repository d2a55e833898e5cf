use serde::Serialize;

use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::id;

use crate::models::{Choice, UserProfile};
use crate::services::matches;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
}

/// Record that `actor_id` likes `target_id`, creating a match if the like
/// turns out to be mutual.
///
/// The decision upsert is idempotent, so a retry after a crash between the
/// like write and the mutual check converges on the same state. The match
/// write itself is a single storage transaction.
pub async fn like(store: &dyn Store, actor_id: &str, target_id: &str) -> AppResult<LikeOutcome> {
    let (_, target) = load_pair(store, actor_id, target_id).await?;

    store.upsert_decision(actor_id, target_id, Choice::Like).await?;

    let reverse = store.get_decision(target_id, actor_id).await?;
    let mutual = reverse.map_or(false, |d| d.choice == Choice::Like);
    if !mutual {
        tracing::debug!(actor_id, target_id, "like recorded, not mutual yet");
        return Ok(LikeOutcome {
            is_match: false,
            match_id: None,
        });
    }

    let (record, created) = store.create_match(actor_id, target_id).await?;
    tracing::info!(
        actor_id,
        target_id = %target.id,
        match_id = %record.id,
        created,
        "mutual like"
    );
    Ok(LikeOutcome {
        is_match: true,
        match_id: Some(record.id),
    })
}

/// Record that `actor_id` passed on `target_id`. A pass after a like (or the
/// reverse) overwrites it: one decision per pair, never both.
pub async fn pass(store: &dyn Store, actor_id: &str, target_id: &str) -> AppResult<()> {
    load_pair(store, actor_id, target_id).await?;
    store.upsert_decision(actor_id, target_id, Choice::Pass).await?;
    tracing::debug!(actor_id, target_id, "pass recorded");
    Ok(())
}

/// Common validation for like/pass: well-formed distinct ids, both profiles
/// present, and the pair not already matched.
async fn load_pair(
    store: &dyn Store,
    actor_id: &str,
    target_id: &str,
) -> AppResult<(UserProfile, UserProfile)> {
    id::require_well_formed(actor_id, "actor_id")?;
    id::require_well_formed(target_id, "target_id")?;
    if actor_id == target_id {
        return Err(AppError::new(
            ErrorCode::CannotLikeSelf,
            "cannot decide on your own profile",
        ));
    }

    let actor = store
        .get_profile(actor_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
    let target = store
        .get_profile(target_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "target profile not found"))?;

    if let Some(existing) = matches::shared_active_match(store, &actor, &target).await? {
        return Err(AppError::with_details(
            ErrorCode::AlreadyMatched,
            "users are already matched",
            serde_json::json!({ "match_id": existing.id }),
        ));
    }

    Ok((actor, target))
}
