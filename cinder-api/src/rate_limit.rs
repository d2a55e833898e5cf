use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use cinder_shared::clients::redis::RedisClient;
use cinder_shared::errors::{AppError, AppResult, ErrorCode};

/// Write actions with a throttling quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateProfile,
    UpdateProfile,
    Like,
    Pass,
    Message,
    MarkSeen,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::CreateProfile,
        Action::UpdateProfile,
        Action::Like,
        Action::Pass,
        Action::Message,
        Action::MarkSeen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProfile => "create_profile",
            Action::UpdateProfile => "update_profile",
            Action::Like => "like",
            Action::Pass => "pass",
            Action::Message => "message",
            Action::MarkSeen => "mark_seen",
        }
    }

    pub fn policy(&self) -> Policy {
        match self {
            Action::CreateProfile => Policy::new(3, 600, 300),
            Action::UpdateProfile => Policy::new(10, 60, 120),
            Action::Like => Policy::new(50, 60, 300),
            Action::Pass => Policy::new(120, 60, 120),
            Action::Message => Policy::new(60, 60, 180),
            Action::MarkSeen => Policy::new(30, 60, 60),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_profile" => Ok(Action::CreateProfile),
            "update_profile" => Ok(Action::UpdateProfile),
            "like" => Ok(Action::Like),
            "pass" => Ok(Action::Pass),
            "message" => Ok(Action::Message),
            "mark_seen" => Ok(Action::MarkSeen),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub max_requests: u32,
    pub window: Duration,
    pub block: Duration,
}

impl Policy {
    pub const fn new(max_requests: u32, window_secs: u64, block_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            block: Duration::from_secs(block_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateDecision {
    fn allowed(remaining: u32, reset_at: Option<DateTime<Utc>>) -> Self {
        Self {
            allowed: true,
            remaining: Some(remaining),
            reset_at,
        }
    }

    fn denied(reset_at: Option<DateTime<Utc>>) -> Self {
        Self {
            allowed: false,
            remaining: Some(0),
            reset_at,
        }
    }
}

/// Sliding-window limiter with a post-limit block interval.
///
/// Per (user, action) key: no entry means unthrottled; an entry within its
/// window counts requests; reaching the maximum blocks the key until the
/// block interval elapses. Block expiry is checked first and a blocked call
/// never increments the count.
pub enum RateLimiter {
    Memory(MemoryLimiter),
    Redis(RedisLimiter),
}

impl RateLimiter {
    pub fn memory() -> Self {
        Self::Memory(MemoryLimiter::default())
    }

    pub fn redis(client: RedisClient) -> Self {
        Self::Redis(RedisLimiter::new(client))
    }

    pub async fn check(&self, user_id: &str, action: Action) -> AppResult<RateDecision> {
        match self {
            Self::Memory(limiter) => {
                Ok(limiter.check(user_id, action.as_str(), action.policy()).await)
            }
            Self::Redis(limiter) => limiter.check(user_id, action.as_str(), action.policy()).await,
        }
    }

    pub async fn status(&self, user_id: &str, action: Action) -> AppResult<RateDecision> {
        match self {
            Self::Memory(limiter) => {
                Ok(limiter.status(user_id, action.as_str(), action.policy()).await)
            }
            Self::Redis(limiter) => limiter.status(user_id, action.as_str(), action.policy()).await,
        }
    }

    /// Clear counters for one action, or all actions when `action` is `None`.
    pub async fn reset(&self, user_id: &str, action: Option<Action>) -> AppResult<()> {
        let actions: Vec<Action> = match action {
            Some(a) => vec![a],
            None => Action::ALL.to_vec(),
        };
        for a in actions {
            match self {
                Self::Memory(limiter) => limiter.reset(user_id, a.as_str()).await,
                Self::Redis(limiter) => limiter.reset(user_id, a.as_str()).await?,
            }
        }
        Ok(())
    }

    /// `check` that turns a denial into a `RateLimited` error carrying the
    /// reset time, for handlers that gate a write.
    pub async fn enforce(&self, user_id: &str, action: Action) -> AppResult<RateDecision> {
        let decision = self.check(user_id, action).await?;
        if decision.allowed {
            return Ok(decision);
        }
        let mut details = serde_json::json!({ "action": action.as_str() });
        if let Some(reset_at) = decision.reset_at {
            details["reset_at"] = serde_json::json!(reset_at.to_rfc3339());
        }
        Err(AppError::with_details(
            ErrorCode::RateLimited,
            format!("too many {} requests", action.as_str()),
            details,
        ))
    }
}

// --- In-process backend ---

#[derive(Debug)]
struct Entry {
    count: u32,
    window_start: Instant,
    blocked_until: Option<Instant>,
}

/// Process-local backend. Uses `tokio::time::Instant` so the state machine
/// runs deterministically under paused test time; wall-clock reset times are
/// derived from the remaining monotonic interval only when reported.
#[derive(Default)]
pub struct MemoryLimiter {
    entries: Mutex<HashMap<(String, &'static str), Entry>>,
}

fn wall_clock(deadline: Instant) -> DateTime<Utc> {
    let now = Instant::now();
    let remaining = deadline.saturating_duration_since(now);
    Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero())
}

impl MemoryLimiter {
    pub async fn check(&self, user_id: &str, action: &'static str, policy: Policy) -> RateDecision {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let key = (user_id.to_string(), action);

        let entry = entries.entry(key).or_insert(Entry {
            count: 0,
            window_start: now,
            blocked_until: None,
        });

        if let Some(blocked_until) = entry.blocked_until {
            if now < blocked_until {
                return RateDecision::denied(Some(wall_clock(blocked_until)));
            }
            entry.blocked_until = None;
            entry.count = 0;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= policy.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count >= policy.max_requests {
            // This call is still allowed; the next one hits the block.
            let blocked_until = now + policy.block;
            entry.blocked_until = Some(blocked_until);
            return RateDecision::allowed(0, Some(wall_clock(blocked_until)));
        }

        let window_end = entry.window_start + policy.window;
        RateDecision::allowed(policy.max_requests - entry.count, Some(wall_clock(window_end)))
    }

    pub async fn status(&self, user_id: &str, action: &'static str, policy: Policy) -> RateDecision {
        let entries = self.entries.lock().await;
        let now = Instant::now();

        let Some(entry) = entries.get(&(user_id.to_string(), action)) else {
            return RateDecision::allowed(policy.max_requests, None);
        };

        if let Some(blocked_until) = entry.blocked_until {
            if now < blocked_until {
                return RateDecision::denied(Some(wall_clock(blocked_until)));
            }
        }
        if now.duration_since(entry.window_start) >= policy.window {
            return RateDecision::allowed(policy.max_requests, None);
        }
        let remaining = policy.max_requests.saturating_sub(entry.count);
        RateDecision::allowed(remaining, Some(wall_clock(entry.window_start + policy.window)))
    }

    pub async fn reset(&self, user_id: &str, action: &'static str) {
        let mut entries = self.entries.lock().await;
        entries.remove(&(user_id.to_string(), action));
    }
}

// --- Redis backend ---

/// Shared backend: the count key carries the window TTL, the block key the
/// block TTL, so state survives restarts and is consistent across instances.
pub struct RedisLimiter {
    client: RedisClient,
}

impl RedisLimiter {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn count_key(user_id: &str, action: &str) -> String {
        format!("rl:{user_id}:{action}")
    }

    fn block_key(user_id: &str, action: &str) -> String {
        format!("rl:block:{user_id}:{action}")
    }

    pub async fn check(&self, user_id: &str, action: &str, policy: Policy) -> AppResult<RateDecision> {
        let block_key = Self::block_key(user_id, action);
        let block_ttl = self.ttl(&block_key).await?;
        if block_ttl > 0 {
            return Ok(RateDecision::denied(Some(
                Utc::now() + chrono::Duration::seconds(block_ttl),
            )));
        }

        let count_key = Self::count_key(user_id, action);
        let count = self
            .client
            .incr(&count_key)
            .await
            .map_err(|e| AppError::storage_unavailable(format!("rate limit incr: {e}")))?;
        if count == 1 {
            self.client
                .expire(&count_key, policy.window.as_secs() as i64)
                .await
                .map_err(|e| AppError::storage_unavailable(format!("rate limit expire: {e}")))?;
        }

        if count >= policy.max_requests as i64 {
            self.client
                .set(&block_key, "1", policy.block.as_secs())
                .await
                .map_err(|e| AppError::storage_unavailable(format!("rate limit block: {e}")))?;
            let reset_at = Utc::now() + chrono::Duration::seconds(policy.block.as_secs() as i64);
            return Ok(RateDecision::allowed(0, Some(reset_at)));
        }

        let window_ttl = self.ttl(&count_key).await?.max(0);
        Ok(RateDecision::allowed(
            policy.max_requests.saturating_sub(count as u32),
            Some(Utc::now() + chrono::Duration::seconds(window_ttl)),
        ))
    }

    pub async fn status(&self, user_id: &str, action: &str, policy: Policy) -> AppResult<RateDecision> {
        let block_key = Self::block_key(user_id, action);
        let block_ttl = self.ttl(&block_key).await?;
        if block_ttl > 0 {
            return Ok(RateDecision::denied(Some(
                Utc::now() + chrono::Duration::seconds(block_ttl),
            )));
        }

        let count_key = Self::count_key(user_id, action);
        let count = self
            .client
            .get(&count_key)
            .await
            .map_err(|e| AppError::storage_unavailable(format!("rate limit get: {e}")))?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        if count == 0 {
            return Ok(RateDecision::allowed(policy.max_requests, None));
        }
        let window_ttl = self.ttl(&count_key).await?.max(0);
        Ok(RateDecision::allowed(
            policy.max_requests.saturating_sub(count),
            Some(Utc::now() + chrono::Duration::seconds(window_ttl)),
        ))
    }

    pub async fn reset(&self, user_id: &str, action: &str) -> AppResult<()> {
        for key in [
            Self::count_key(user_id, action),
            Self::block_key(user_id, action),
        ] {
            self.client
                .del(&key)
                .await
                .map_err(|e| AppError::storage_unavailable(format!("rate limit del: {e}")))?;
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> AppResult<i64> {
        self.client
            .ttl(key)
            .await
            .map_err(|e| AppError::storage_unavailable(format!("rate limit ttl: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    const TEST_POLICY: Policy = Policy::new(3, 1, 5);

    #[tokio::test(start_paused = true)]
    async fn window_allows_up_to_max_then_blocks() {
        let limiter = MemoryLimiter::default();

        assert!(limiter.check("u1", "like", TEST_POLICY).await.allowed);
        assert!(limiter.check("u1", "like", TEST_POLICY).await.allowed);
        let third = limiter.check("u1", "like", TEST_POLICY).await;
        assert!(third.allowed);
        assert_eq!(third.remaining, Some(0));

        let fourth = limiter.check("u1", "like", TEST_POLICY).await;
        assert!(!fourth.allowed);
        assert!(fourth.reset_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn block_expiry_unthrottles() {
        let limiter = MemoryLimiter::default();
        for _ in 0..3 {
            limiter.check("u1", "like", TEST_POLICY).await;
        }
        assert!(!limiter.check("u1", "like", TEST_POLICY).await.allowed);

        advance(Duration::from_secs(6)).await;
        let after = limiter.check("u1", "like", TEST_POLICY).await;
        assert!(after.allowed);
        assert_eq!(after.remaining, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_window_restarts_count() {
        let limiter = MemoryLimiter::default();
        limiter.check("u1", "like", TEST_POLICY).await;
        limiter.check("u1", "like", TEST_POLICY).await;

        advance(Duration::from_secs(2)).await;
        let fresh = limiter.check("u1", "like", TEST_POLICY).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_call_does_not_increment() {
        let limiter = MemoryLimiter::default();
        for _ in 0..3 {
            limiter.check("u1", "like", TEST_POLICY).await;
        }
        // Denied calls during the block must not extend it.
        for _ in 0..10 {
            assert!(!limiter.check("u1", "like", TEST_POLICY).await.allowed);
        }
        advance(Duration::from_secs(6)).await;
        assert!(limiter.check("u1", "like", TEST_POLICY).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn status_never_increments() {
        let limiter = MemoryLimiter::default();
        for _ in 0..20 {
            let status = limiter.status("u1", "like", TEST_POLICY).await;
            assert!(status.allowed);
            assert_eq!(status.remaining, Some(3));
        }
        assert!(limiter.check("u1", "like", TEST_POLICY).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_isolated_per_user_and_action() {
        let limiter = MemoryLimiter::default();
        for _ in 0..4 {
            limiter.check("u1", "like", TEST_POLICY).await;
        }
        assert!(!limiter.check("u1", "like", TEST_POLICY).await.allowed);
        assert!(limiter.check("u2", "like", TEST_POLICY).await.allowed);
        assert!(limiter.check("u1", "pass", TEST_POLICY).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_block() {
        let limiter = MemoryLimiter::default();
        for _ in 0..4 {
            limiter.check("u1", "like", TEST_POLICY).await;
        }
        assert!(!limiter.check("u1", "like", TEST_POLICY).await.allowed);

        limiter.reset("u1", "like").await;
        assert!(limiter.check("u1", "like", TEST_POLICY).await.allowed);
    }

    #[tokio::test]
    async fn enforce_reports_reset_time() {
        let limiter = RateLimiter::memory();
        // MarkSeen allows 30 per window; exhaust it.
        for _ in 0..30 {
            limiter.check("u1", Action::MarkSeen).await.unwrap();
        }
        let err = limiter.enforce("u1", Action::MarkSeen).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RateLimited);
    }
}
