use std::collections::HashSet;

use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::id;

use crate::models::{Decision, MatchRecord, NotificationCounts, UserProfile};
use crate::store::Store;

/// Badge counts for a user: matches and inbound likes newer than the
/// per-category high-water marks.
pub async fn counts(store: &dyn Store, user_id: &str) -> AppResult<NotificationCounts> {
    let profile = load(store, user_id).await?;
    let (new_matches, new_likes) = new_items(store, &profile).await?;
    Ok(NotificationCounts {
        new_matches: new_matches.len() as i64,
        new_likes: new_likes.len() as i64,
        total: (new_matches.len() + new_likes.len()) as i64,
    })
}

/// Acknowledge everything currently visible by advancing the high-water
/// marks to the newest visible item's own timestamp, never to "now". An item
/// arriving between the read and the write stays newer than the mark, so
/// nothing is silently lost. Returns whether anything was acknowledged.
pub async fn mark_all_seen(store: &dyn Store, user_id: &str) -> AppResult<bool> {
    let profile = load(store, user_id).await?;
    let (new_matches, new_likes) = new_items(store, &profile).await?;

    let matches_mark = new_matches.iter().map(|r| r.created_at).max();
    let likes_mark = new_likes.iter().map(|d| d.created_at).max();
    if matches_mark.is_none() && likes_mark.is_none() {
        return Ok(false);
    }

    store
        .advance_seen_marks(user_id, matches_mark, likes_mark)
        .await?;
    tracing::debug!(
        user_id,
        matches = new_matches.len(),
        likes = new_likes.len(),
        "notifications acknowledged"
    );
    Ok(true)
}

async fn load(store: &dyn Store, user_id: &str) -> AppResult<UserProfile> {
    id::require_well_formed(user_id, "user_id")?;
    store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// The currently-new matches and inbound likes for a profile.
///
/// A like only counts while the pair shares no active match; once they match,
/// the like is subsumed by the match notification. The inbound-like lookup is
/// an indexed query on the decisions table, not a profile-collection scan.
async fn new_items(
    store: &dyn Store,
    profile: &UserProfile,
) -> AppResult<(Vec<MatchRecord>, Vec<Decision>)> {
    let mut new_matches = Vec::new();
    let mut matched_counterparts: HashSet<String> = HashSet::new();

    for match_id in &profile.match_refs {
        let Some(record) = store.get_match(match_id).await? else {
            continue;
        };
        if !record.is_active() {
            continue;
        }
        if let Some(counterpart) = record.counterpart_of(&profile.id) {
            matched_counterparts.insert(counterpart.to_string());
        }
        if profile.matches_seen_at.map_or(true, |seen| record.created_at > seen) {
            new_matches.push(record);
        }
    }

    let mut new_likes = Vec::new();
    for decision in store.likers_of(&profile.id).await? {
        if matched_counterparts.contains(&decision.actor_id) {
            continue;
        }
        if profile.likes_seen_at.map_or(false, |seen| decision.created_at <= seen) {
            continue;
        }
        // A like from a since-deleted profile is not worth surfacing.
        if store.get_profile(&decision.actor_id).await?.is_none() {
            continue;
        }
        new_likes.push(decision);
    }

    Ok((new_matches, new_likes))
}
