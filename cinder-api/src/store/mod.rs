use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cinder_shared::errors::AppResult;

use crate::models::{ChatMessage, Choice, Decision, MatchRecord, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// The storage contract the core logic runs against.
///
/// Everything the service layer needs from persistence, in domain terms:
/// profile documents, one decision row per (actor, target) pair, the match
/// ledger with atomic array unions, and per-match message sequences.
/// Implemented by [`PgStore`] (diesel/Postgres) and [`MemStore`] (in-process,
/// used by tests and local development). The two must be observably
/// equivalent; the test suite runs against [`MemStore`].
#[async_trait]
pub trait Store: Send + Sync {
    // --- Profiles ---

    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Insert a new profile. Returns `false` if a profile with this id
    /// already exists (nothing written).
    async fn insert_profile(&self, profile: UserProfile) -> AppResult<bool>;

    /// Replace an existing profile document, refreshing `updated_at`.
    async fn update_profile(&self, profile: UserProfile) -> AppResult<()>;

    /// All profiles except `user_id`, for discovery.
    async fn list_other_profiles(&self, user_id: &str) -> AppResult<Vec<UserProfile>>;

    /// Advance the notification high-water marks. Only moves forward: a
    /// timestamp older than the stored one is ignored per category.
    async fn advance_seen_marks(
        &self,
        user_id: &str,
        matches_seen_at: Option<DateTime<Utc>>,
        likes_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Atomically union a match id into the user's `match_refs`.
    /// Returns `true` if the id was actually added.
    async fn add_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool>;

    /// Remove a match id from the user's `match_refs`.
    /// Returns `true` if the id was present.
    async fn remove_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool>;

    // --- Decisions ---

    /// Record the actor's stance on the target. One row per pair: a different
    /// choice overwrites and refreshes `created_at`; recording the same
    /// choice again leaves the existing row untouched.
    async fn upsert_decision(&self, actor_id: &str, target_id: &str, choice: Choice)
        -> AppResult<Decision>;

    async fn get_decision(&self, actor_id: &str, target_id: &str) -> AppResult<Option<Decision>>;

    /// Every decision the actor has recorded, for discovery exclusion.
    async fn decisions_by(&self, actor_id: &str) -> AppResult<Vec<Decision>>;

    /// Inbound likes: every `like` decision whose target is `user_id`.
    /// This is the inverted index that replaces a full-collection scan.
    async fn likers_of(&self, user_id: &str) -> AppResult<Vec<Decision>>;

    // --- Matches ---

    async fn get_match(&self, match_id: &str) -> AppResult<Option<MatchRecord>>;

    /// Every ledger record naming `user_id`, regardless of what the user's
    /// own `match_refs` claims. Includes dissolved records.
    async fn matches_naming(&self, user_id: &str) -> AppResult<Vec<MatchRecord>>;

    /// Create a match between two users: the ledger insert and both users'
    /// `match_refs` unions happen in one transaction. Idempotent on the
    /// normalized pair: if an active record for the pair already exists it is
    /// returned with `created = false`.
    async fn create_match(&self, user_a: &str, user_b: &str) -> AppResult<(MatchRecord, bool)>;

    /// Union a user into a match record's `users` set (pair repair).
    /// Returns `true` if the user was actually added.
    async fn add_match_user(&self, match_id: &str, user_id: &str) -> AppResult<bool>;

    /// Tombstone a match record. Returns `true` if it was active.
    /// Records are never hard-deleted.
    async fn dissolve_match(&self, match_id: &str) -> AppResult<bool>;

    // --- Messages ---

    async fn insert_message(&self, message: ChatMessage) -> AppResult<()>;

    /// Messages for a match, newest first, with the total count.
    async fn list_messages(
        &self,
        match_id: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ChatMessage>, i64)>;

    /// Unread messages in this match not sent by `reader_id`.
    async fn count_unread(&self, match_id: &str, reader_id: &str) -> AppResult<i64>;

    /// Mark every message in the match not sent by `reader_id` as read.
    /// Returns the number of rows changed.
    async fn mark_messages_read(&self, match_id: &str, reader_id: &str) -> AppResult<usize>;

    /// Storage reachability probe for health checks.
    async fn ping(&self) -> AppResult<()>;
}
