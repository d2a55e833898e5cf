use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `cinder.{domain}.{entity}.{action}`
/// Example: `cinder.match.like.sent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Profile events
    pub const USER_PROFILE_CREATED: &str = "cinder.user.profile.created";
    pub const USER_PROFILE_UPDATED: &str = "cinder.user.profile.updated";
    pub const USER_MATCHMAKER_VERIFIED: &str = "cinder.user.matchmaker.verified";

    // Matching events
    pub const MATCH_LIKE_SENT: &str = "cinder.match.like.sent";
    pub const MATCH_CREATED: &str = "cinder.match.match.created";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "cinder.messaging.message.sent";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileCreated {
        pub user_id: String,
        pub display_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub user_id: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchmakerVerified {
        pub user_id: String,
        pub organization: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LikeSent {
        pub actor_id: String,
        pub target_id: String,
        pub matched: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: String,
        pub user_a: String,
        pub user_b: String,
        pub arranged: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: String,
        pub match_id: String,
        pub sender_id: String,
        pub content_preview: String,
    }
}
