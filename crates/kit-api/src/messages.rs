use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use kit_db::models::MessageRow;
use kit_types::api::{
    ActionResponse, ChatEntry, ChatResponse, DeleteMessageRequest, SendMessageRequest,
    UpdateMessageRequest,
};
use kit_types::models::{Account, AccountId, Message};

use crate::auth::{AppState, non_empty};
use crate::authenticator::Authenticator;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::middleware::presented_token;

/// GET /api/messages: public chat history, oldest first.
pub async fn get_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let rows = blocking(move || db.get_messages()).await?;

    let chat = rows
        .into_iter()
        .map(|row| ChatEntry {
            timestamp: parse_timestamp(&row),
            id: row.id,
            message: row.message,
            username: row.username,
            user_id: AccountId(row.user_id),
        })
        .collect();

    Ok(Json(ChatResponse { chat }))
}

/// POST /api/message: post as the authenticated account.
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(req): Payload<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), req.user_id)
        .await?;

    let text = non_empty(req.message).ok_or_else(|| ApiError::bad_request("Message is required."))?;
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let db = state.db.clone();
    let message_id = blocking(move || db.insert_message(&text, account.id.0, &timestamp)).await?;

    info!("{} ({}) posted message {}", account.username, account.id, message_id);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok())))
}

/// PUT /api/message: edit a message the caller owns.
///
/// The ownership check and the write are separate statements. If the
/// message is deleted in between, the update matches nothing and the
/// request reports failure.
pub async fn update_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(req): Payload<UpdateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), req.user_id)
        .await?;

    let (Some(message_id), Some(text)) = (req.id, non_empty(req.message)) else {
        return Err(ApiError::bad_request("Message id and text are required."));
    };

    let message = load_message(&state, message_id).await?;
    rewrite_owned(&state, &account, &message, text).await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::ok())))
}

/// DELETE /api/message: remove a message the caller owns.
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(req): Payload<DeleteMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .auth
        .authenticate_claim(presented_token(&headers), req.user_id)
        .await?;

    let message_id = req
        .message_id
        .ok_or_else(|| ApiError::bad_request("Message id is required."))?;

    let message = load_message(&state, message_id).await?;
    delete_owned(&state, &account, &message).await?;

    info!("{} ({}) deleted message {}", account.username, account.id, message_id);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok())))
}

/// Ownership check against `message` as loaded, then the write. A message
/// deleted since it was loaded matches no row and yields `Unsuccessful`.
async fn rewrite_owned(
    state: &AppState,
    account: &Account,
    message: &Message,
    text: String,
) -> Result<(), ApiError> {
    Authenticator::require_ownership(account, message)?;

    let db = state.db.clone();
    let id = message.id;
    let updated = blocking(move || db.update_message(id, &text)).await?;
    if !updated {
        warn!("Message {} vanished before it could be updated", id);
        return Err(ApiError::Unsuccessful);
    }
    Ok(())
}

async fn delete_owned(state: &AppState, account: &Account, message: &Message) -> Result<(), ApiError> {
    Authenticator::require_ownership(account, message)?;

    let db = state.db.clone();
    let id = message.id;
    let deleted = blocking(move || db.delete_message(id)).await?;
    if !deleted {
        warn!("Message {} vanished before it could be deleted", id);
        return Err(ApiError::Unsuccessful);
    }
    Ok(())
}

async fn load_message(state: &AppState, id: i64) -> Result<Message, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_message(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found."))?;

    Ok(Message {
        timestamp: parse_timestamp(&row),
        id: row.id,
        message: row.message,
        user_id: AccountId(row.user_id),
    })
}

fn parse_timestamp(row: &MessageRow) -> DateTime<Utc> {
    row.timestamp
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on message {}: {}", row.timestamp, row.id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::response::Response;
    use http_body_util::BodyExt;
    use kit_db::Database;
    use serde_json::{Value, json};

    use super::*;
    use crate::auth::AppStateInner;

    const STAMP: &str = "2024-05-01T12:00:00.000Z";

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn setup() -> (AppState, Account) {
        let state = AppStateInner::new(Arc::new(Database::open_in_memory().unwrap()));
        let id = state.db.create_user("alice", "a@x.com", "x").unwrap();
        let account = Account {
            id: AccountId(id),
            username: "alice".into(),
            email: "a@x.com".into(),
        };
        (state, account)
    }

    #[tokio::test]
    async fn message_deleted_after_ownership_load_reports_failure() {
        let (state, alice) = setup();
        let doomed = state.db.insert_message("doomed", alice.id.0, STAMP).unwrap();
        let kept = state.db.insert_message("kept", alice.id.0, STAMP).unwrap();

        let message = load_message(&state, doomed).await.unwrap();
        assert!(state.db.delete_message(doomed).unwrap());

        let err = rewrite_owned(&state, &alice, &message, "edited".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unsuccessful));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({ "success": false }));

        let err = delete_owned(&state, &alice, &message).await.unwrap_err();
        assert!(matches!(err, ApiError::Unsuccessful));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        // The neighbouring message is untouched
        let rows = state.db.get_messages().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, kept);
        assert_eq!(rows[0].message, "kept");
    }

    #[tokio::test]
    async fn ownership_is_checked_before_the_write() {
        let (state, alice) = setup();
        let bob_id = state.db.create_user("bob", "b@x.com", "x").unwrap();
        let id = state.db.insert_message("mine", alice.id.0, STAMP).unwrap();
        let message = load_message(&state, id).await.unwrap();

        let bob = Account {
            id: AccountId(bob_id),
            username: "bob".into(),
            email: "b@x.com".into(),
        };
        let err = rewrite_owned(&state, &bob, &message, "theirs".into())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(state.db.get_message(id).unwrap().unwrap().message, "mine");

        rewrite_owned(&state, &alice, &message, "still mine".into())
            .await
            .unwrap();
        assert_eq!(state.db.get_message(id).unwrap().unwrap().message, "still mine");
    }
}
