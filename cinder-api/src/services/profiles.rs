use std::collections::HashSet;

use chrono::Utc;
use validator::Validate;

use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::auth::{AuthUser, UserRole};
use cinder_shared::types::id;
use cinder_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{
    CreateProfileRequest, MatchmakerInfo, ProfileCard, UpdateProfileRequest, UserProfile,
};
use crate::store::Store;

/// Create the caller's profile. The id comes from the token subject; the
/// whole document is validated here, at the write boundary, and nowhere else.
pub async fn create(
    store: &dyn Store,
    user: &AuthUser,
    req: CreateProfileRequest,
) -> AppResult<UserProfile> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let preferences = req.preferences.unwrap_or_default();
    if preferences.min_age > preferences.max_age {
        return Err(AppError::Validation(
            "minimum preferred age exceeds maximum".to_string(),
        ));
    }

    let now = Utc::now();
    let profile = UserProfile {
        id: user.id.clone(),
        display_name: req.display_name,
        age: req.age,
        bio: req.bio,
        city: req.city,
        gender: req.gender,
        interests: req.interests,
        photo_urls: req.photo_urls,
        hobbies: req.hobbies,
        education: req.education,
        occupation: req.occupation,
        preferences,
        role: user.role,
        matchmaker: (user.role == UserRole::Matchmaker).then(|| MatchmakerInfo {
            verified: false,
            verified_at: None,
            organization: None,
        }),
        match_refs: vec![],
        matches_seen_at: None,
        likes_seen_at: None,
        created_at: now,
        updated_at: now,
    };

    if !store.insert_profile(profile.clone()).await? {
        return Err(AppError::new(
            ErrorCode::ProfileAlreadyExists,
            "profile already exists for this user",
        ));
    }
    tracing::info!(user_id = %profile.id, "profile created");
    Ok(profile)
}

pub async fn get(store: &dyn Store, user_id: &str) -> AppResult<UserProfile> {
    id::require_well_formed(user_id, "user_id")?;
    store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Partial update: only the fields present in the request change.
pub async fn update(
    store: &dyn Store,
    user_id: &str,
    req: UpdateProfileRequest,
) -> AppResult<UserProfile> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let mut profile = get(store, user_id).await?;

    if let Some(display_name) = req.display_name {
        profile.display_name = display_name;
    }
    if let Some(age) = req.age {
        profile.age = age;
    }
    if let Some(bio) = req.bio {
        profile.bio = Some(bio);
    }
    if let Some(city) = req.city {
        profile.city = Some(city);
    }
    if let Some(gender) = req.gender {
        profile.gender = Some(gender);
    }
    if let Some(interests) = req.interests {
        profile.interests = interests;
    }
    if let Some(photo_urls) = req.photo_urls {
        profile.photo_urls = photo_urls;
    }
    if let Some(hobbies) = req.hobbies {
        profile.hobbies = hobbies;
    }
    if let Some(education) = req.education {
        profile.education = Some(education);
    }
    if let Some(occupation) = req.occupation {
        profile.occupation = Some(occupation);
    }
    if let Some(preferences) = req.preferences {
        if preferences.min_age > preferences.max_age {
            return Err(AppError::Validation(
                "minimum preferred age exceeds maximum".to_string(),
            ));
        }
        profile.preferences = preferences;
    }

    store.update_profile(profile.clone()).await?;
    Ok(profile)
}

/// Profiles the viewer can still decide on: everyone else, minus targets
/// already decided, minus active match counterparts, filtered by the
/// viewer's preferences.
pub async fn discover(
    store: &dyn Store,
    viewer_id: &str,
    params: &PaginationParams,
) -> AppResult<Paginated<ProfileCard>> {
    let viewer = get(store, viewer_id).await?;

    let decided: HashSet<String> = store
        .decisions_by(viewer_id)
        .await?
        .into_iter()
        .map(|d| d.target_id)
        .collect();

    let mut matched: HashSet<String> = HashSet::new();
    for match_id in &viewer.match_refs {
        if let Some(record) = store.get_match(match_id).await? {
            if record.is_active() {
                if let Some(counterpart) = record.counterpart_of(viewer_id) {
                    matched.insert(counterpart.to_string());
                }
            }
        }
    }

    let prefs = &viewer.preferences;
    let candidates: Vec<ProfileCard> = store
        .list_other_profiles(viewer_id)
        .await?
        .iter()
        .filter(|p| !decided.contains(&p.id) && !matched.contains(&p.id))
        .filter(|p| p.age >= prefs.min_age && p.age <= prefs.max_age)
        .filter(|p| {
            prefs.cities.is_empty()
                || p.city.as_ref().map_or(false, |c| prefs.cities.contains(c))
        })
        .filter(|p| {
            prefs.interested_in.is_empty()
                || p.gender
                    .as_ref()
                    .map_or(false, |g| prefs.interested_in.contains(g))
        })
        .map(ProfileCard::from)
        .collect();

    let total = candidates.len() as u64;
    let page: Vec<ProfileCard> = candidates
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit() as usize)
        .collect();
    Ok(Paginated::new(page, total, params))
}

/// Admin operation: mark a matchmaker profile as verified.
pub async fn verify_matchmaker(
    store: &dyn Store,
    target_id: &str,
    organization: Option<String>,
) -> AppResult<UserProfile> {
    let mut profile = get(store, target_id).await?;
    if profile.role != UserRole::Matchmaker {
        return Err(AppError::bad_request("profile is not a matchmaker"));
    }

    profile.matchmaker = Some(MatchmakerInfo {
        verified: true,
        verified_at: Some(Utc::now()),
        organization,
    });
    store.update_profile(profile.clone()).await?;
    tracing::info!(user_id = %profile.id, "matchmaker verified");
    Ok(profile)
}

/// Gate for debug tooling and arranged matches: admins always pass,
/// matchmakers only once verified.
pub async fn require_verified_operator(store: &dyn Store, user: &AuthUser) -> AppResult<()> {
    match user.role {
        UserRole::Admin => Ok(()),
        UserRole::Matchmaker => {
            let profile = get(store, &user.id).await?;
            let verified = profile
                .matchmaker
                .as_ref()
                .map_or(false, |m| m.verified);
            if verified {
                Ok(())
            } else {
                Err(AppError::new(
                    ErrorCode::MatchmakerNotVerified,
                    "matchmaker account is not verified",
                ))
            }
        }
        UserRole::Regular => Err(AppError::forbidden("matchmaker or admin access required")),
    }
}
