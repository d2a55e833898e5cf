diesel::table! {
    profiles (id) {
        id -> Text,
        display_name -> Text,
        age -> Int4,
        bio -> Nullable<Text>,
        city -> Nullable<Text>,
        gender -> Nullable<Text>,
        interests -> Array<Text>,
        photo_urls -> Array<Text>,
        hobbies -> Array<Text>,
        education -> Nullable<Text>,
        occupation -> Nullable<Text>,
        preferences -> Jsonb,
        #[max_length = 20]
        role -> Varchar,
        matchmaker -> Nullable<Jsonb>,
        match_refs -> Array<Text>,
        matches_seen_at -> Nullable<Timestamptz>,
        likes_seen_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    decisions (actor_id, target_id) {
        actor_id -> Text,
        target_id -> Text,
        #[max_length = 10]
        choice -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    matches (id) {
        id -> Text,
        // Normalized pair ordering. Requires
        //   CREATE UNIQUE INDEX matches_active_pair
        //   ON matches (user_lo, user_hi) WHERE dissolved_at IS NULL;
        // so match creation stays idempotent under concurrent mutual likes
        // while a dissolved pair may match again.
        user_lo -> Text,
        user_hi -> Text,
        users -> Array<Text>,
        created_at -> Timestamptz,
        dissolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        match_id -> Text,
        sender_id -> Text,
        body -> Text,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    profiles,
    decisions,
    matches,
    messages,
);
