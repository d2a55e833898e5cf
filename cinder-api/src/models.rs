use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use cinder_shared::types::auth::UserRole;

// --- Profile ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub age: i32,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
    pub interests: Vec<String>,
    pub photo_urls: Vec<String>,
    pub hobbies: Vec<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub preferences: Preferences,
    pub role: UserRole,
    pub matchmaker: Option<MatchmakerInfo>,
    /// Denormalized ids of match records this user appears in.
    pub match_refs: Vec<String>,
    pub matches_seen_at: Option<DateTime<Utc>>,
    pub likes_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Preferences {
    #[validate(range(min = 18, max = 120, message = "minimum age must be between 18 and 120"))]
    pub min_age: i32,
    #[validate(range(min = 18, max = 120, message = "maximum age must be between 18 and 120"))]
    pub max_age: i32,
    /// Genders the user wants to see in discovery. Empty means no filter.
    #[serde(default)]
    pub interested_in: Vec<String>,
    /// Preferred cities. Empty means no filter.
    #[serde(default)]
    pub cities: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            min_age: 18,
            max_age: 120,
            interested_in: vec![],
            cities: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakerInfo {
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub organization: Option<String>,
}

/// Public subset of a profile, safe to return to other users.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCard {
    pub id: String,
    pub display_name: String,
    pub age: i32,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub interests: Vec<String>,
    pub photo_urls: Vec<String>,
}

impl From<&UserProfile> for ProfileCard {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            age: profile.age,
            bio: profile.bio.clone(),
            city: profile.city.clone(),
            interests: profile.interests.clone(),
            photo_urls: profile.photo_urls.clone(),
        }
    }
}

// --- Decision ---

/// A user's recorded stance on another user. One decision per (actor, target)
/// pair; recording the opposite choice overwrites the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Like,
    Pass,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Like => "like",
            Choice::Pass => "pass",
        }
    }
}

impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Choice::Like),
            "pass" => Ok(Choice::Pass),
            _ => Err(format!("unknown choice: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub actor_id: String,
    pub target_id: String,
    pub choice: Choice,
    pub created_at: DateTime<Utc>,
}

// --- Match ---

/// The authoritative record of a match between two users.
///
/// Records are never hard-deleted. When one side's profile disappears,
/// repair stamps `dissolved_at` instead of dropping the record, so history
/// survives and repeated audits stay stable.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub id: String,
    pub users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub dissolved_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    pub fn is_active(&self) -> bool {
        self.dissolved_at.is_none()
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }

    /// The other participant, if this record names `user_id` and exactly one
    /// distinct counterpart.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if !self.involves(user_id) {
            return None;
        }
        self.users.iter().find(|u| *u != user_id).map(String::as_str)
    }
}

/// One entry in a user's match list, enriched for display.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub counterpart: ProfileCard,
    pub created_at: DateTime<Utc>,
    pub unread_messages: i64,
}

// --- Message ---

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// --- Notifications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    pub new_matches: i64,
    pub new_likes: i64,
    pub total: i64,
}

// --- Audit reports ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefStatus {
    Valid,
    /// No match record exists with the referenced id.
    RecordMissing,
    /// The referenced record was tombstoned; the reference is stale.
    RecordDissolved,
    /// The record does not name this user plus exactly one distinct counterpart.
    MalformedUsers,
    /// The counterpart's profile no longer exists.
    CounterpartMissing,
    /// The counterpart exists but its own match list lacks this record.
    NotReciprocated,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefFinding {
    pub match_id: String,
    pub status: RefStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart_id: Option<String>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub user_id: String,
    pub healthy: bool,
    pub findings: Vec<RefFinding>,
    /// Active records naming this user that its match list does not reference.
    pub orphaned: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// What a repair run changed. `dissolved` entries had their reference removed
/// and the record tombstoned in one step.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub user_id: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub dissolved: Vec<String>,
    /// Asymmetries that only the counterpart side can fix.
    pub remaining_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairSide {
    pub user_id: String,
    pub profile_exists: bool,
    pub has_back_ref: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairCheck {
    pub match_id: String,
    pub active: bool,
    pub malformed_users: bool,
    pub sides: Vec<PairSide>,
    pub symmetric: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairFixReport {
    pub match_id: String,
    pub user_id: String,
    pub added_to_record: bool,
    pub added_back_ref: bool,
}

// --- Write requests ---

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 40, message = "display name must be 1-40 characters"))]
    pub display_name: String,
    #[validate(range(min = 18, max = 120, message = "users must be at least 18"))]
    pub age: i32,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    #[validate]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 40, message = "display name must be 1-40 characters"))]
    pub display_name: Option<String>,
    #[validate(range(min = 18, max = 120, message = "users must be at least 18"))]
    pub age: Option<i32>,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
    pub interests: Option<Vec<String>>,
    pub photo_urls: Option<Vec<String>>,
    pub hobbies: Option<Vec<String>>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    #[validate]
    pub preferences: Option<Preferences>,
}
