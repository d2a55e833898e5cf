use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Array, Text};
use diesel::upsert::DecoratableTarget;
use uuid::Uuid;

use cinder_shared::clients::db::DbPool;
use cinder_shared::errors::{AppError, AppResult};

use crate::models::{ChatMessage, Choice, Decision, MatchRecord, Preferences, UserProfile};
use crate::schema::{decisions, matches, messages, profiles};
use crate::store::memory::pair_key;
use crate::store::Store;

diesel::define_sql_function! {
    fn array_append(arr: Array<Text>, elem: Text) -> Array<Text>;
}

diesel::define_sql_function! {
    fn array_remove(arr: Array<Text>, elem: Text) -> Array<Text>;
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> AppResult<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>>
    {
        self.pool
            .get()
            .map_err(|e| AppError::storage_unavailable(format!("database pool: {e}")))
    }
}

// --- Row types ---

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = profiles)]
#[diesel(treat_none_as_null = true)]
struct ProfileRow {
    id: String,
    display_name: String,
    age: i32,
    bio: Option<String>,
    city: Option<String>,
    gender: Option<String>,
    interests: Vec<String>,
    photo_urls: Vec<String>,
    hobbies: Vec<String>,
    education: Option<String>,
    occupation: Option<String>,
    preferences: serde_json::Value,
    role: String,
    matchmaker: Option<serde_json::Value>,
    match_refs: Vec<String>,
    matches_seen_at: Option<DateTime<Utc>>,
    likes_seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserProfile> for ProfileRow {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name,
            age: p.age,
            bio: p.bio,
            city: p.city,
            gender: p.gender,
            interests: p.interests,
            photo_urls: p.photo_urls,
            hobbies: p.hobbies,
            education: p.education,
            occupation: p.occupation,
            preferences: serde_json::to_value(&p.preferences).unwrap_or_default(),
            role: p.role.to_string(),
            matchmaker: p.matchmaker.as_ref().and_then(|m| serde_json::to_value(m).ok()),
            match_refs: p.match_refs,
            matches_seen_at: p.matches_seen_at,
            likes_seen_at: p.likes_seen_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        // Drifted documents still need to load for auditing, so unknown
        // role strings and malformed jsonb fall back to defaults here
        // rather than failing the read.
        Self {
            id: r.id,
            display_name: r.display_name,
            age: r.age,
            bio: r.bio,
            city: r.city,
            gender: r.gender,
            interests: r.interests,
            photo_urls: r.photo_urls,
            hobbies: r.hobbies,
            education: r.education,
            occupation: r.occupation,
            preferences: serde_json::from_value::<Preferences>(r.preferences).unwrap_or_default(),
            role: r.role.parse().unwrap_or(cinder_shared::types::auth::UserRole::Regular),
            matchmaker: r.matchmaker.and_then(|v| serde_json::from_value(v).ok()),
            match_refs: r.match_refs,
            matches_seen_at: r.matches_seen_at,
            likes_seen_at: r.likes_seen_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = decisions)]
struct DecisionRow {
    actor_id: String,
    target_id: String,
    choice: String,
    created_at: DateTime<Utc>,
}

impl From<DecisionRow> for Decision {
    fn from(r: DecisionRow) -> Self {
        Self {
            actor_id: r.actor_id,
            target_id: r.target_id,
            choice: r.choice.parse().unwrap_or(Choice::Pass),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = matches)]
struct MatchRow {
    id: String,
    user_lo: String,
    user_hi: String,
    users: Vec<String>,
    created_at: DateTime<Utc>,
    dissolved_at: Option<DateTime<Utc>>,
}

impl From<MatchRow> for MatchRecord {
    fn from(r: MatchRow) -> Self {
        Self {
            id: r.id,
            users: r.users,
            created_at: r.created_at,
            dissolved_at: r.dissolved_at,
        }
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = messages)]
struct MessageRow {
    id: String,
    match_id: String,
    sender_id: String,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(r: MessageRow) -> Self {
        Self {
            id: r.id,
            match_id: r.match_id,
            sender_id: r.sender_id,
            body: r.body,
            is_read: r.is_read,
            created_at: r.created_at,
        }
    }
}

impl From<ChatMessage> for MessageRow {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            match_id: m.match_id,
            sender_id: m.sender_id,
            body: m.body,
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }
}

fn union_match_ref(conn: &mut PgConnection, user_id: &str, match_id: &str) -> QueryResult<usize> {
    diesel::update(
        profiles::table
            .filter(profiles::id.eq(user_id))
            .filter(diesel::dsl::not(
                profiles::match_refs.contains(vec![match_id.to_string()]),
            )),
    )
    .set((
        profiles::match_refs.eq(array_append(profiles::match_refs, match_id)),
        profiles::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
}

#[async_trait]
impl Store for PgStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let mut conn = self.conn()?;
        let row = profiles::table
            .find(user_id)
            .first::<ProfileRow>(&mut conn)
            .optional()?;
        Ok(row.map(UserProfile::from))
    }

    async fn insert_profile(&self, profile: UserProfile) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let row = ProfileRow::from(profile);
        let inserted = diesel::insert_into(profiles::table)
            .values(&row)
            .on_conflict(profiles::id)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    async fn update_profile(&self, mut profile: UserProfile) -> AppResult<()> {
        let mut conn = self.conn()?;
        profile.updated_at = Utc::now();
        let id = profile.id.clone();
        let row = ProfileRow::from(profile);
        diesel::update(profiles::table.find(&id))
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn list_other_profiles(&self, user_id: &str) -> AppResult<Vec<UserProfile>> {
        let mut conn = self.conn()?;
        let rows = profiles::table
            .filter(profiles::id.ne(user_id))
            .order(profiles::created_at.asc())
            .load::<ProfileRow>(&mut conn)?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    async fn advance_seen_marks(
        &self,
        user_id: &str,
        matches_seen_at: Option<DateTime<Utc>>,
        likes_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut conn = self.conn()?;
        if let Some(ts) = matches_seen_at {
            diesel::update(
                profiles::table.filter(profiles::id.eq(user_id)).filter(
                    profiles::matches_seen_at
                        .is_null()
                        .or(profiles::matches_seen_at.lt(ts)),
                ),
            )
            .set((
                profiles::matches_seen_at.eq(ts),
                profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        }
        if let Some(ts) = likes_seen_at {
            diesel::update(
                profiles::table.filter(profiles::id.eq(user_id)).filter(
                    profiles::likes_seen_at
                        .is_null()
                        .or(profiles::likes_seen_at.lt(ts)),
                ),
            )
            .set((
                profiles::likes_seen_at.eq(ts),
                profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        }
        Ok(())
    }

    async fn add_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let updated = union_match_ref(&mut conn, user_id, match_id)?;
        Ok(updated == 1)
    }

    async fn remove_match_ref(&self, user_id: &str, match_id: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            profiles::table
                .filter(profiles::id.eq(user_id))
                .filter(profiles::match_refs.contains(vec![match_id.to_string()])),
        )
        .set((
            profiles::match_refs.eq(array_remove(profiles::match_refs, match_id)),
            profiles::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }

    async fn upsert_decision(
        &self,
        actor_id: &str,
        target_id: &str,
        choice: Choice,
    ) -> AppResult<Decision> {
        let mut conn = self.conn()?;
        let row = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let new_row = DecisionRow {
                actor_id: actor_id.to_string(),
                target_id: target_id.to_string(),
                choice: choice.as_str().to_string(),
                created_at: Utc::now(),
            };
            let inserted = diesel::insert_into(decisions::table)
                .values(&new_row)
                .on_conflict_do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                // Flipping the choice refreshes the timestamp; repeating the
                // same choice leaves the original row untouched.
                diesel::update(
                    decisions::table
                        .find((actor_id, target_id))
                        .filter(decisions::choice.ne(choice.as_str())),
                )
                .set((
                    decisions::choice.eq(choice.as_str()),
                    decisions::created_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            }

            decisions::table
                .find((actor_id, target_id))
                .first::<DecisionRow>(conn)
        })?;
        Ok(row.into())
    }

    async fn get_decision(&self, actor_id: &str, target_id: &str) -> AppResult<Option<Decision>> {
        let mut conn = self.conn()?;
        let row = decisions::table
            .find((actor_id, target_id))
            .first::<DecisionRow>(&mut conn)
            .optional()?;
        Ok(row.map(Decision::from))
    }

    async fn decisions_by(&self, actor_id: &str) -> AppResult<Vec<Decision>> {
        let mut conn = self.conn()?;
        let rows = decisions::table
            .filter(decisions::actor_id.eq(actor_id))
            .load::<DecisionRow>(&mut conn)?;
        Ok(rows.into_iter().map(Decision::from).collect())
    }

    async fn likers_of(&self, user_id: &str) -> AppResult<Vec<Decision>> {
        let mut conn = self.conn()?;
        let rows = decisions::table
            .filter(decisions::target_id.eq(user_id))
            .filter(decisions::choice.eq(Choice::Like.as_str()))
            .load::<DecisionRow>(&mut conn)?;
        Ok(rows.into_iter().map(Decision::from).collect())
    }

    async fn get_match(&self, match_id: &str) -> AppResult<Option<MatchRecord>> {
        let mut conn = self.conn()?;
        let row = matches::table
            .find(match_id)
            .first::<MatchRow>(&mut conn)
            .optional()?;
        Ok(row.map(MatchRecord::from))
    }

    async fn matches_naming(&self, user_id: &str) -> AppResult<Vec<MatchRecord>> {
        let mut conn = self.conn()?;
        let rows = matches::table
            .filter(matches::users.contains(vec![user_id.to_string()]))
            .order(matches::created_at.asc())
            .load::<MatchRow>(&mut conn)?;
        Ok(rows.into_iter().map(MatchRecord::from).collect())
    }

    async fn create_match(&self, user_a: &str, user_b: &str) -> AppResult<(MatchRecord, bool)> {
        let mut conn = self.conn()?;
        let (lo, hi) = pair_key(user_a, user_b);

        let (row, created) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let candidate = MatchRow {
                id: Uuid::now_v7().to_string(),
                user_lo: lo.clone(),
                user_hi: hi.clone(),
                users: vec![user_a.to_string(), user_b.to_string()],
                created_at: Utc::now(),
                dissolved_at: None,
            };
            // The partial unique index on (user_lo, user_hi) WHERE
            // dissolved_at IS NULL arbitrates concurrent mutual likes: the
            // losing insert is a no-op and we read back the surviving row.
            let inserted = diesel::insert_into(matches::table)
                .values(&candidate)
                .on_conflict((matches::user_lo, matches::user_hi))
                .filter_target(matches::dissolved_at.is_null())
                .do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                let row = matches::table
                    .filter(matches::user_lo.eq(&lo))
                    .filter(matches::user_hi.eq(&hi))
                    .filter(matches::dissolved_at.is_null())
                    .first::<MatchRow>(conn)?;
                return Ok((row, false));
            }

            // Back-references land in the same transaction, so the ledger
            // and both profiles commit together or not at all.
            union_match_ref(conn, user_a, &candidate.id)?;
            union_match_ref(conn, user_b, &candidate.id)?;

            Ok((candidate, true))
        })?;

        Ok((row.into(), created))
    }

    async fn add_match_user(&self, match_id: &str, user_id: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            matches::table
                .filter(matches::id.eq(match_id))
                .filter(diesel::dsl::not(
                    matches::users.contains(vec![user_id.to_string()]),
                )),
        )
        .set(matches::users.eq(array_append(matches::users, user_id)))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }

    async fn dissolve_match(&self, match_id: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            matches::table
                .filter(matches::id.eq(match_id))
                .filter(matches::dissolved_at.is_null()),
        )
        .set(matches::dissolved_at.eq(Utc::now()))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }

    async fn insert_message(&self, message: ChatMessage) -> AppResult<()> {
        let mut conn = self.conn()?;
        let row = MessageRow::from(message);
        diesel::insert_into(messages::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        match_id: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ChatMessage>, i64)> {
        let mut conn = self.conn()?;
        let total: i64 = messages::table
            .filter(messages::match_id.eq(match_id))
            .count()
            .get_result(&mut conn)?;
        let rows = messages::table
            .filter(messages::match_id.eq(match_id))
            .order(messages::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<MessageRow>(&mut conn)?;
        Ok((rows.into_iter().map(ChatMessage::from).collect(), total))
    }

    async fn count_unread(&self, match_id: &str, reader_id: &str) -> AppResult<i64> {
        let mut conn = self.conn()?;
        let count: i64 = messages::table
            .filter(messages::match_id.eq(match_id))
            .filter(messages::sender_id.ne(reader_id))
            .filter(messages::is_read.eq(false))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    async fn mark_messages_read(&self, match_id: &str, reader_id: &str) -> AppResult<usize> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            messages::table
                .filter(messages::match_id.eq(match_id))
                .filter(messages::sender_id.ne(reader_id))
                .filter(messages::is_read.eq(false)),
        )
        .set(messages::is_read.eq(true))
        .execute(&mut conn)?;
        Ok(updated)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
