use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use cinder_shared::errors::AppResult;
use cinder_shared::types::api::ApiResponse;
use cinder_shared::types::auth::AuthUser;
use cinder_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{CreateProfileRequest, ProfileCard, UpdateProfileRequest, UserProfile};
use crate::rate_limit::Action;
use crate::services::profiles;
use crate::AppState;

/// POST /profiles
pub async fn create_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    state.limiter.enforce(&user.id, Action::CreateProfile).await?;

    let profile = profiles::create(state.store.as_ref(), &user, req).await?;
    publisher::publish_profile_created(&state.rabbitmq, &profile.id, &profile.display_name).await;
    Ok(Json(ApiResponse::ok(profile)))
}

/// GET /profiles/me
pub async fn get_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = profiles::get(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// PATCH /profiles/me
pub async fn update_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    state.limiter.enforce(&user.id, Action::UpdateProfile).await?;

    let profile = profiles::update(state.store.as_ref(), &user.id, req).await?;
    publisher::publish_profile_updated(&state.rabbitmq, &profile.id).await;
    Ok(Json(ApiResponse::ok(profile)))
}

/// GET /profiles/:id - public card only, never the full document.
pub async fn get_profile(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<ProfileCard>>> {
    let profile = profiles::get(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(ProfileCard::from(&profile))))
}

/// GET /discover
pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ProfileCard>>>> {
    let page = profiles::discover(state.store.as_ref(), &user.id, &params).await?;
    Ok(Json(ApiResponse::ok(page)))
}
