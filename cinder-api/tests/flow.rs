//! End-to-end scenarios for the like/match/audit/notification core, run
//! against the in-memory store.

use chrono::Utc;

use cinder_api::models::{Choice, Preferences, RefStatus, UserProfile};
use cinder_api::services::{audit, likes, matches, messages, notifications, profiles};
use cinder_api::store::{MemStore, Store};
use cinder_shared::errors::ErrorCode;
use cinder_shared::types::auth::UserRole;
use cinder_shared::types::pagination::PaginationParams;

fn profile(id: &str, age: i32) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        id: id.to_string(),
        display_name: format!("user {id}"),
        age,
        bio: None,
        city: None,
        gender: None,
        interests: vec![],
        photo_urls: vec![],
        hobbies: vec![],
        education: None,
        occupation: None,
        preferences: Preferences::default(),
        role: UserRole::Regular,
        matchmaker: None,
        match_refs: vec![],
        matches_seen_at: None,
        likes_seen_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn seed(store: &MemStore, ids: &[&str]) {
    for id in ids {
        assert!(store.insert_profile(profile(id, 25)).await.unwrap());
    }
}

// --- Like evaluation ---

#[tokio::test]
async fn like_is_idempotent_without_reciprocation() {
    let store = MemStore::new();
    seed(&store, &["u1", "u2"]).await;

    let first = likes::like(&store, "u1", "u2").await.unwrap();
    let second = likes::like(&store, "u1", "u2").await.unwrap();
    assert!(!first.is_match);
    assert!(!second.is_match);

    let decision = store.get_decision("u1", "u2").await.unwrap().unwrap();
    assert_eq!(decision.choice, Choice::Like);
    assert!(store.matches_naming("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn mutual_like_creates_exactly_one_symmetric_match() {
    let store = MemStore::new();
    seed(&store, &["u1", "u2"]).await;

    assert!(!likes::like(&store, "u1", "u2").await.unwrap().is_match);
    let outcome = likes::like(&store, "u2", "u1").await.unwrap();
    assert!(outcome.is_match);
    let match_id = outcome.match_id.unwrap();

    // Match symmetry: both profiles reference the record, and the record
    // names exactly this pair.
    let u1 = store.get_profile("u1").await.unwrap().unwrap();
    let u2 = store.get_profile("u2").await.unwrap().unwrap();
    assert_eq!(u1.match_refs, vec![match_id.clone()]);
    assert_eq!(u2.match_refs, vec![match_id.clone()]);

    let record = store.get_match(&match_id).await.unwrap().unwrap();
    let mut users = record.users.clone();
    users.sort();
    assert_eq!(users, vec!["u1", "u2"]);
    assert_eq!(store.matches_naming("u1").await.unwrap().len(), 1);

    // A third like in either direction short-circuits.
    let err = likes::like(&store, "u1", "u2").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AlreadyMatched);
    let err = likes::like(&store, "u2", "u1").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AlreadyMatched);
}

#[tokio::test]
async fn racing_match_creation_converges_on_one_record() {
    let store = std::sync::Arc::new(MemStore::new());
    seed(&store, &["u1", "u2"]).await;

    // Both directions of a mutual like race into match creation; exactly
    // one insert wins and the loser observes the surviving record.
    let a = tokio::spawn({
        let store = store.clone();
        async move { store.create_match("u1", "u2").await.unwrap() }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { store.create_match("u2", "u1").await.unwrap() }
    });
    let ((first, first_created), (second, second_created)) =
        (a.await.unwrap(), b.await.unwrap());

    assert_eq!(first.id, second.id);
    assert!(first_created ^ second_created);
    assert_eq!(store.matches_naming("u1").await.unwrap().len(), 1);

    let u1 = store.get_profile("u1").await.unwrap().unwrap();
    let u2 = store.get_profile("u2").await.unwrap().unwrap();
    assert_eq!(u1.match_refs, vec![first.id.clone()]);
    assert_eq!(u2.match_refs, vec![first.id.clone()]);
}

#[tokio::test]
async fn like_and_pass_are_mutually_exclusive() {
    let store = MemStore::new();
    seed(&store, &["u1", "u2"]).await;

    likes::like(&store, "u1", "u2").await.unwrap();
    likes::pass(&store, "u1", "u2").await.unwrap();

    let decision = store.get_decision("u1", "u2").await.unwrap().unwrap();
    assert_eq!(decision.choice, Choice::Pass);

    // A pass withdraws the like, so a later reciprocal like is one-sided.
    let outcome = likes::like(&store, "u2", "u1").await.unwrap();
    assert!(!outcome.is_match);

    // Re-deciding back to like completes the pair.
    let outcome = likes::like(&store, "u1", "u2").await.unwrap();
    assert!(outcome.is_match);
}

#[tokio::test]
async fn like_rejects_bad_arguments() {
    let store = MemStore::new();
    seed(&store, &["u1"]).await;

    let err = likes::like(&store, "", "u1").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);

    let err = likes::like(&store, "u1", "u 2").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);

    let err = likes::like(&store, "u1", "u1").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::CannotLikeSelf);

    let err = likes::like(&store, "u1", "ghost").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::ProfileNotFound);
}

// --- Notifications ---

#[tokio::test]
async fn counts_reflect_unseen_matches_and_likes() {
    let store = MemStore::new();
    seed(&store, &["u", "m", "v"]).await;

    // One match for u, one inbound like from v (no shared match).
    likes::like(&store, "u", "m").await.unwrap();
    likes::like(&store, "m", "u").await.unwrap();
    likes::like(&store, "v", "u").await.unwrap();

    let counts = notifications::counts(&store, "u").await.unwrap();
    assert_eq!(counts.new_matches, 1);
    assert_eq!(counts.new_likes, 1);
    assert_eq!(counts.total, 2);

    // The like from the matched counterpart is subsumed by the match.
    let m_counts = notifications::counts(&store, "m").await.unwrap();
    assert_eq!(m_counts.new_matches, 1);
    assert_eq!(m_counts.new_likes, 0);

    assert!(notifications::mark_all_seen(&store, "u").await.unwrap());
    let counts = notifications::counts(&store, "u").await.unwrap();
    assert_eq!(counts.new_matches, 0);
    assert_eq!(counts.new_likes, 0);
    assert_eq!(counts.total, 0);

    // Nothing left to acknowledge.
    assert!(!notifications::mark_all_seen(&store, "u").await.unwrap());
}

#[tokio::test]
async fn like_arriving_after_acknowledgment_stays_new() {
    let store = MemStore::new();
    seed(&store, &["u", "v", "w"]).await;

    likes::like(&store, "v", "u").await.unwrap();
    notifications::mark_all_seen(&store, "u").await.unwrap();
    assert_eq!(notifications::counts(&store, "u").await.unwrap().total, 0);

    // The mark is the newest acknowledged item's timestamp, not "now", so a
    // like recorded afterwards is strictly newer and still counts.
    likes::like(&store, "w", "u").await.unwrap();
    let counts = notifications::counts(&store, "u").await.unwrap();
    assert_eq!(counts.new_likes, 1);
}

// --- Consistency audit ---

async fn matched_pair(store: &MemStore, a: &str, b: &str) -> String {
    likes::like(store, a, b).await.unwrap();
    likes::like(store, b, a).await.unwrap().match_id.unwrap()
}

#[tokio::test]
async fn audit_detects_and_repair_restores_orphan() {
    let store = MemStore::new();
    seed(&store, &["a", "b"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    // Drift: the ledger names a, but a's profile lost the reference.
    assert!(store.remove_match_ref("a", &match_id).await.unwrap());

    let report = audit::audit(&store, "a").await.unwrap();
    assert!(!report.healthy);
    assert_eq!(report.orphaned, vec![match_id.clone()]);

    let repair = audit::repair(&store, "a").await.unwrap();
    assert_eq!(repair.added, vec![match_id.clone()]);

    let second = audit::audit(&store, "a").await.unwrap();
    assert!(second.healthy);
    assert!(second.orphaned.is_empty());
}

#[tokio::test]
async fn audit_reports_asymmetry_and_fix_pair_resolves_it() {
    let store = MemStore::new();
    seed(&store, &["a", "b"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    // Drift: b's back-reference is gone.
    assert!(store.remove_match_ref("b", &match_id).await.unwrap());

    let report = audit::audit(&store, "a").await.unwrap();
    assert!(!report.healthy);
    let finding = &report.findings[0];
    assert_eq!(finding.status, RefStatus::NotReciprocated);
    assert_eq!(finding.counterpart_id.as_deref(), Some("b"));

    // Repair on a's side is conservative: it reports but does not touch b.
    let repair = audit::repair(&store, "a").await.unwrap();
    assert!(repair.removed.is_empty());
    assert_eq!(repair.remaining_issues.len(), 1);

    // The narrow fix on b's side restores symmetry.
    let fix = audit::fix_pair(&store, &match_id, "b").await.unwrap();
    assert!(fix.added_back_ref);
    assert!(!fix.added_to_record);

    assert!(audit::audit(&store, "a").await.unwrap().healthy);
    assert!(audit::audit(&store, "b").await.unwrap().healthy);
}

#[tokio::test]
async fn repair_removes_dangling_reference_to_missing_record() {
    let store = MemStore::new();
    seed(&store, &["a"]).await;
    store.add_match_ref("a", "ghost-match").await.unwrap();

    let report = audit::audit(&store, "a").await.unwrap();
    assert_eq!(report.findings[0].status, RefStatus::RecordMissing);

    let repair = audit::repair(&store, "a").await.unwrap();
    assert_eq!(repair.removed, vec!["ghost-match"]);
    assert!(audit::audit(&store, "a").await.unwrap().healthy);
}

#[tokio::test]
async fn deleted_counterpart_tombstones_without_oscillation() {
    let store = MemStore::new();
    seed(&store, &["a", "b"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    assert!(store.remove_profile("b").await);

    let report = audit::audit(&store, "a").await.unwrap();
    assert_eq!(report.findings[0].status, RefStatus::CounterpartMissing);

    let repair = audit::repair(&store, "a").await.unwrap();
    assert_eq!(repair.dissolved, vec![match_id.clone()]);

    // History survives: the record still exists, tombstoned.
    let record = store.get_match(&match_id).await.unwrap().unwrap();
    assert!(record.dissolved_at.is_some());

    // And the dissolved record neither re-surfaces as an orphan nor counts.
    let second = audit::audit(&store, "a").await.unwrap();
    assert!(second.healthy);
    assert_eq!(notifications::counts(&store, "a").await.unwrap().total, 0);
    assert!(matches::list_matches(&store, "a").await.unwrap().is_empty());
}

#[tokio::test]
async fn check_pair_describes_both_sides() {
    let store = MemStore::new();
    seed(&store, &["a", "b"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    let check = audit::check_pair(&store, &match_id).await.unwrap();
    assert!(check.symmetric);
    assert!(!check.malformed_users);
    assert_eq!(check.sides.len(), 2);

    store.remove_match_ref("b", &match_id).await.unwrap();
    let check = audit::check_pair(&store, &match_id).await.unwrap();
    assert!(!check.symmetric);
    let b_side = check.sides.iter().find(|s| s.user_id == "b").unwrap();
    assert!(b_side.profile_exists);
    assert!(!b_side.has_back_ref);
}

// --- Matches and chat ---

#[tokio::test]
async fn match_listing_is_enriched_and_participant_guarded() {
    let store = MemStore::new();
    seed(&store, &["a", "b", "c"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    messages::send(&store, "b", &match_id, "hey!").await.unwrap();

    let listed = matches::list_matches(&store, "a").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].counterpart.id, "b");
    assert_eq!(listed[0].unread_messages, 1);

    let err = matches::get_match_for(&store, "c", &match_id).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::PermissionDenied);
}

#[tokio::test]
async fn chat_is_participant_only_and_tracks_reads() {
    let store = MemStore::new();
    seed(&store, &["a", "b", "c"]).await;
    let match_id = matched_pair(&store, "a", "b").await;

    let err = messages::send(&store, "c", &match_id, "let me in").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::PermissionDenied);

    let err = messages::send(&store, "a", &match_id, "   ").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::ValidationError);

    messages::send(&store, "a", &match_id, "first").await.unwrap();
    messages::send(&store, "a", &match_id, "second").await.unwrap();

    let params = PaginationParams::default();
    let page = messages::list(&store, "b", &match_id, &params).await.unwrap();
    assert_eq!(page.total, 2);
    // Newest first.
    assert_eq!(page.items[0].body, "second");

    assert_eq!(messages::mark_read(&store, "b", &match_id).await.unwrap(), 2);
    assert_eq!(store.count_unread(&match_id, "b").await.unwrap(), 0);
    // The sender's own messages are not "unread" for the sender.
    assert_eq!(store.count_unread(&match_id, "a").await.unwrap(), 0);
}

// --- Discovery ---

#[tokio::test]
async fn discover_excludes_decided_and_matched_and_applies_preferences() {
    let store = MemStore::new();

    let mut viewer = profile("viewer", 30);
    viewer.preferences.min_age = 25;
    viewer.preferences.max_age = 35;
    store.insert_profile(viewer).await.unwrap();

    store.insert_profile(profile("too-young", 21)).await.unwrap();
    store.insert_profile(profile("passed", 30)).await.unwrap();
    store.insert_profile(profile("matched", 30)).await.unwrap();
    store.insert_profile(profile("fresh", 30)).await.unwrap();

    likes::pass(&store, "viewer", "passed").await.unwrap();
    matched_pair(&store, "viewer", "matched").await;

    let params = PaginationParams::default();
    let page = profiles::discover(&store, "viewer", &params).await.unwrap();
    let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["fresh"]);
    assert_eq!(page.total, 1);
}

// --- Matchmaker tooling ---

#[tokio::test]
async fn arranged_match_respects_existing_matches() {
    let store = MemStore::new();
    seed(&store, &["a", "b"]).await;

    let (record, created) = matches::arrange(&store, "a", "b").await.unwrap();
    assert!(created);

    let err = matches::arrange(&store, "b", "a").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AlreadyMatched);

    // The arranged match is indistinguishable from a mutual-like one.
    let a = store.get_profile("a").await.unwrap().unwrap();
    assert_eq!(a.match_refs, vec![record.id]);
}
