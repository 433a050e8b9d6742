use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};

use kit_types::api::ApiIndex;

use crate::auth::{self, AppState};
use crate::{messages, profiles, users};

/// Every endpoint the router serves, as listed by `GET /api`.
pub const ENDPOINTS: &[&str] = &[
    "GET /api",
    "POST /api/register",
    "POST /api/login",
    "POST /api/verifyToken",
    "GET /api/messages",
    "POST /api/message",
    "PUT /api/message",
    "DELETE /api/message",
    "GET /api/users",
    "PUT /api/user",
    "DELETE /api/user",
    "GET /api/user/{id}",
    "GET /api/profile/{id}",
    "POST /api/profile/{id}",
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(index))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/verifyToken", post(auth::verify_token))
        .route("/api/messages", get(messages::get_messages))
        .route(
            "/api/message",
            post(messages::send_message)
                .put(messages::update_message)
                .delete(messages::delete_message),
        )
        .route("/api/users", get(users::get_users))
        .route("/api/user", put(users::update_user).delete(users::delete_user))
        .route("/api/user/{id}", get(users::get_user))
        .route(
            "/api/profile/{id}",
            get(profiles::get_profile).post(profiles::update_profile),
        )
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(ApiIndex {
        title: "Kit Network API".into(),
        intro: "This is the API that directly communicates with Kit Network".into(),
        routes: ENDPOINTS.iter().map(|s| s.to_string()).collect(),
    })
}
