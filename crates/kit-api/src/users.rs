use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use kit_db::models::UserRow;
use kit_db::queries::is_unique_violation;
use kit_types::api::{
    ActionResponse, DeleteUserQuery, UpdateUserRequest, UserResponse, UserSummary, UsersResponse,
};
use kit_types::models::AccountId;

use crate::auth::{AppState, non_empty};
use crate::blocking;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::middleware::presented_token;

fn summary(row: UserRow) -> UserSummary {
    UserSummary {
        id: AccountId(row.id),
        username: row.username,
        email: row.email,
    }
}

pub async fn get_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let rows = blocking(move || db.get_users()).await?;

    Ok(Json(UsersResponse {
        users: rows.into_iter().map(summary).collect(),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_user_by_id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    Ok(Json(UserResponse {
        success: true,
        user: summary(row),
    }))
}

/// PUT /api/user: an account may only rewrite itself. The new password is
/// hashed like at registration; the live token is left alone.
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(req): Payload<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), req.user_id)
        .await?;

    let (Some(username), Some(password), Some(email)) = (
        non_empty(req.username),
        non_empty(req.password),
        non_empty(req.email),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };

    let password_hash = state.auth.store().hash_secret(&password).await?;

    let db = state.db.clone();
    let id = account.id.0;
    let updated = match blocking(move || db.update_user(id, &username, &email, &password_hash)).await {
        Ok(updated) => updated,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::bad_request("Username or email already exists."));
        }
        Err(e) => return Err(e.into()),
    };
    if !updated {
        return Err(ApiError::Unsuccessful);
    }

    info!("Account {} updated", account.id);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok())))
}

/// DELETE /api/user?userId=: an account may only delete itself. Its
/// messages and profile are removed with it.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeleteUserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), query.user_id)
        .await?;

    let db = state.db.clone();
    let id = account.id.0;
    let deleted = blocking(move || db.delete_user(id)).await?;
    if !deleted {
        return Err(ApiError::Unsuccessful);
    }

    info!("Account {} ({}) deleted", account.username, account.id);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok())))
}
