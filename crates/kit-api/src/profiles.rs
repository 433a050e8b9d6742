use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};

use kit_types::api::{ActionResponse, ProfileResponse, UpdateProfileRequest};
use kit_types::models::{AccountId, Profile};

use crate::auth::AppState;
use crate::authenticator::Authenticator;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::middleware::presented_token;

async fn load_profile(state: &AppState, user_id: i64) -> Result<Profile, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_profile(user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found."))?;

    Ok(Profile {
        user_id: AccountId(row.user_id),
        bio: row.bio,
        profile_pic: row.profile_pic,
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = load_profile(&state, user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

/// POST /api/profile/{id}: owner-only. Omitted fields keep their value.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Payload(req): Payload<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), req.user_id)
        .await?;

    let profile = load_profile(&state, user_id).await?;
    Authenticator::require_ownership(&account, &profile)?;

    let bio = req.bio.unwrap_or(profile.bio);
    let profile_pic = req.profile_pic.unwrap_or(profile.profile_pic);

    let db = state.db.clone();
    let updated = blocking(move || db.update_profile(user_id, &bio, &profile_pic)).await?;
    if !updated {
        return Err(ApiError::Unsuccessful);
    }

    Ok(Json(ActionResponse::ok()))
}
