use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use cinder_shared::errors::AppResult;

use crate::models::{ChatMessage, Choice, Decision, MatchRecord, UserProfile};
use crate::store::Store;

/// Normalized ordering for a user pair, used as the uniqueness key for
/// match records.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Default)]
struct State {
    profiles: HashMap<String, UserProfile>,
    decisions: HashMap<(String, String), Decision>,
    matches: HashMap<String, MatchRecord>,
    /// (lo, hi) -> match id, mirroring the Postgres unique constraint.
    pairs: HashMap<(String, String), String>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// In-process store: every collection is a map behind one `RwLock`, so a
/// multi-step mutation holds the write guard for its whole critical section
/// and behaves like a transaction.
#[derive(Default)]
pub struct MemStore {
    state: RwLock<State>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a deletion happening outside this service. The core never
    /// deletes profiles; external deletion is exactly the drift the auditor
    /// has to cope with, so tests need a way to produce it.
    pub async fn remove_profile(&self, user_id: &str) -> bool {
        let mut state = self.state.write().await;
        state.profiles.remove(user_id).is_some()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let state = self.state.read().await;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: UserProfile) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if state.profiles.contains_key(&profile.id) {
            return Ok(false);
        }
        state.profiles.insert(profile.id.clone(), profile);
        Ok(true)
    }

    async fn update_profile(&self, mut profile: UserProfile) -> AppResult<()> {
        let mut state = self.state.write().await;
        profile.updated_at = Utc::now();
        state.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn list_other_profiles(&self, user_id: &str) -> AppResult<Vec<UserProfile>> {
        let state = self.state.read().await;
        let mut others: Vec<UserProfile> = state
            .profiles
            .values()
            .filter(|p| p.id != user_id)
            .cloned()
            .collect();
        others.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(others)
    }

    async fn advance_seen_marks(
        &self,
        user_id: &str,
        matches_seen_at: Option<DateTime<Utc>>,
        likes_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(profile) = state.profiles.get_mut(user_id) {
            if let Some(ts) = matches_seen_at {
                if profile.matches_seen_at.map_or(true, |prev| ts > prev) {
                    profile.matches_seen_at = Some(ts);
                }
            }
            if let Some(ts) = likes_seen_at {
                if profile.likes_seen_at.map_or(true, |prev| ts > prev) {
                    profile.likes_seen_at = Some(ts);
                }
            }
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(add_ref(&mut state, user_id, match_id))
    }

    async fn remove_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if let Some(profile) = state.profiles.get_mut(user_id) {
            let before = profile.match_refs.len();
            profile.match_refs.retain(|m| m != match_id);
            if profile.match_refs.len() != before {
                profile.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn upsert_decision(
        &self,
        actor_id: &str,
        target_id: &str,
        choice: Choice,
    ) -> AppResult<Decision> {
        let mut state = self.state.write().await;
        let key = (actor_id.to_string(), target_id.to_string());
        if let Some(existing) = state.decisions.get(&key) {
            if existing.choice == choice {
                return Ok(existing.clone());
            }
        }
        let decision = Decision {
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            choice,
            created_at: Utc::now(),
        };
        state.decisions.insert(key, decision.clone());
        Ok(decision)
    }

    async fn get_decision(&self, actor_id: &str, target_id: &str) -> AppResult<Option<Decision>> {
        let state = self.state.read().await;
        Ok(state
            .decisions
            .get(&(actor_id.to_string(), target_id.to_string()))
            .cloned())
    }

    async fn decisions_by(&self, actor_id: &str) -> AppResult<Vec<Decision>> {
        let state = self.state.read().await;
        Ok(state
            .decisions
            .values()
            .filter(|d| d.actor_id == actor_id)
            .cloned()
            .collect())
    }

    async fn likers_of(&self, user_id: &str) -> AppResult<Vec<Decision>> {
        let state = self.state.read().await;
        Ok(state
            .decisions
            .values()
            .filter(|d| d.target_id == user_id && d.choice == Choice::Like)
            .cloned()
            .collect())
    }

    async fn get_match(&self, match_id: &str) -> AppResult<Option<MatchRecord>> {
        let state = self.state.read().await;
        Ok(state.matches.get(match_id).cloned())
    }

    async fn matches_naming(&self, user_id: &str) -> AppResult<Vec<MatchRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<MatchRecord> = state
            .matches
            .values()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn create_match(&self, user_a: &str, user_b: &str) -> AppResult<(MatchRecord, bool)> {
        let mut state = self.state.write().await;
        let key = pair_key(user_a, user_b);

        if let Some(existing_id) = state.pairs.get(&key).cloned() {
            if let Some(existing) = state.matches.get(&existing_id) {
                if existing.is_active() {
                    return Ok((existing.clone(), false));
                }
            }
        }

        let record = MatchRecord {
            id: Uuid::now_v7().to_string(),
            users: vec![user_a.to_string(), user_b.to_string()],
            created_at: Utc::now(),
            dissolved_at: None,
        };
        state.pairs.insert(key, record.id.clone());
        state.matches.insert(record.id.clone(), record.clone());
        add_ref(&mut state, user_a, &record.id);
        add_ref(&mut state, user_b, &record.id);
        Ok((record, true))
    }

    async fn add_match_user(&self, match_id: &str, user_id: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if let Some(record) = state.matches.get_mut(match_id) {
            if !record.involves(user_id) {
                record.users.push(user_id.to_string());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn dissolve_match(&self, match_id: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if let Some(record) = state.matches.get_mut(match_id) {
            if record.is_active() {
                record.dissolved_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn insert_message(&self, message: ChatMessage) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .messages
            .entry(message.match_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn list_messages(
        &self,
        match_id: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ChatMessage>, i64)> {
        let state = self.state.read().await;
        let all = state.messages.get(match_id).cloned().unwrap_or_default();
        let total = all.len() as i64;
        let mut newest_first = all;
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page = newest_first
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_unread(&self, match_id: &str, reader_id: &str) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .get(match_id)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.sender_id != reader_id && !m.is_read)
                    .count() as i64
            })
            .unwrap_or(0))
    }

    async fn mark_messages_read(&self, match_id: &str, reader_id: &str) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        if let Some(msgs) = state.messages.get_mut(match_id) {
            for msg in msgs.iter_mut() {
                if msg.sender_id != reader_id && !msg.is_read {
                    msg.is_read = true;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

fn add_ref(state: &mut State, user_id: &str, match_id: &str) -> bool {
    if let Some(profile) = state.profiles.get_mut(user_id) {
        if !profile.match_refs.iter().any(|m| m == match_id) {
            profile.match_refs.push(match_id.to_string());
            profile.updated_at = Utc::now();
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Preferences;
    use cinder_shared::types::auth::UserRole;

    fn profile(id: &str) -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: id.to_string(),
            display_name: id.to_string(),
            age: 25,
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

    #[tokio::test]
    async fn match_ref_union_is_idempotent() {
        let store = MemStore::new();
        store.insert_profile(profile("u1")).await.unwrap();

        assert!(store.add_match_ref("u1", "m1").await.unwrap());
        assert!(!store.add_match_ref("u1", "m1").await.unwrap());

        let refs = store.get_profile("u1").await.unwrap().unwrap().match_refs;
        assert_eq!(refs, vec!["m1"]);
    }

    #[tokio::test]
    async fn create_match_dedupes_on_pair() {
        let store = MemStore::new();
        store.insert_profile(profile("u1")).await.unwrap();
        store.insert_profile(profile("u2")).await.unwrap();

        let (first, created) = store.create_match("u1", "u2").await.unwrap();
        assert!(created);
        // Reversed argument order still hits the same normalized pair.
        let (second, created) = store.create_match("u2", "u1").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn same_choice_keeps_decision_timestamp() {
        let store = MemStore::new();
        let first = store.upsert_decision("u1", "u2", Choice::Like).await.unwrap();
        let second = store.upsert_decision("u1", "u2", Choice::Like).await.unwrap();
        assert_eq!(first.created_at, second.created_at);

        let flipped = store.upsert_decision("u1", "u2", Choice::Pass).await.unwrap();
        assert_eq!(flipped.choice, Choice::Pass);
        assert!(flipped.created_at >= first.created_at);
    }

    #[tokio::test]
    async fn seen_marks_only_move_forward() {
        let store = MemStore::new();
        store.insert_profile(profile("u1")).await.unwrap();

        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(60);

        store.advance_seen_marks("u1", Some(later), None).await.unwrap();
        store.advance_seen_marks("u1", Some(earlier), None).await.unwrap();

        let p = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(p.matches_seen_at, Some(later));
    }
}
