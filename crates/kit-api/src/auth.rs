use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{info, warn};

use kit_db::{Database, queries::is_unique_violation};
use kit_types::api::{
    ActionResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    VerifyTokenRequest,
};
use kit_types::models::AccountId;

use crate::authenticator::Authenticator;
use crate::blocking;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::extract::Payload;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub auth: Authenticator,
}

impl AppStateInner {
    /// Wire the credential store and authenticator around an opened database.
    pub fn new(db: Arc<Database>) -> AppState {
        let auth = Authenticator::new(CredentialStore::new(db.clone()));
        Arc::new(Self { db, auth })
    }
}

/// Treats absent and blank fields alike.
pub(crate) fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    Payload(req): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password), Some(email)) = (
        non_empty(req.username),
        non_empty(req.password),
        non_empty(req.email),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };

    // Check if username or email is taken
    let db = state.db.clone();
    let (name, mail) = (username.clone(), email.clone());
    let (by_name, by_email) = blocking(move || {
        Ok((
            db.get_user_by_username(&name)?.is_some(),
            db.get_user_by_email(&mail)?.is_some(),
        ))
    })
    .await?;

    if by_name {
        return Err(ApiError::bad_request("Username already exists."));
    }
    if by_email {
        return Err(ApiError::bad_request("Email already exists."));
    }

    let password_hash = state.auth.store().hash_secret(&password).await?;

    let db = state.db.clone();
    let name = username.clone();
    let created = blocking(move || db.create_user(&name, &email, &password_hash)).await;

    let user_id = match created {
        Ok(id) => AccountId(id),
        // Lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::bad_request("Username or email already exists."));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Registered {} ({})", username, user_id);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (non_empty(req.username), non_empty(req.password))
    else {
        return Err(ApiError::bad_request("Username and password are required."));
    };

    let grant = state.auth.login(&username, &password).await.inspect_err(|e| {
        warn!("Login failed for {}: {}", username, e);
    })?;

    Ok(Json(LoginResponse {
        success: true,
        user_id: grant.account_id,
        nameofuser: grant.username,
        token: grant.token,
    }))
}

/// POST /api/verifyToken: same check as the mutation endpoints, with the
/// token carried in the body instead of the Authorization header.
pub async fn verify_token(
    State(state): State<AppState>,
    Payload(req): Payload<VerifyTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .authenticate_claim(req.token.as_deref(), req.user_id)
        .await?;

    Ok(Json(ActionResponse::with_message(
        true,
        "Token and User ID verified successfully.",
    )))
}
