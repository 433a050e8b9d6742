use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{AccountId, Profile};

/// The `userId` a request claims to act as, before it is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimedId {
    Id(AccountId),
    /// Present but not an integer, e.g. `"abc"` or `1.5`. Never matches
    /// any account.
    Malformed,
}

// -- Generic --

/// Body returned by most mutation endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self { success: true, message: None }
    }

    pub fn failed() -> Self {
        Self { success: false, message: None }
    }

    pub fn with_message(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiIndex {
    pub title: String,
    pub intro: String,
    pub routes: Vec<String>,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: AccountId,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: AccountId,
    pub nameofuser: String,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub token: Option<String>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub message_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: i64,
    pub message: String,
    pub username: String,
    pub user_id: AccountId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub chat: Vec<ChatEntry>,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: AccountId,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserSummary,
}

/// The acting account is `userId`; `id` is accepted as an alias for older
/// clients that sent the target id under that name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default, alias = "id", deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserQuery {
    #[serde(default, alias = "id", deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
}

// -- Profiles --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<ClaimedId>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Profile,
}

/// Accepts an account id as a JSON number or a numeric string. Null and
/// an empty string count as absent. Anything else is kept as
/// [`ClaimedId::Malformed`] so the handler can still check the token first.
/// Query strings only carry text, and browser clients send form values as
/// strings, so both shapes show up for the same field.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<ClaimedId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
        Other(IgnoredAny),
    }

    let claim = match Option::<RawId>::deserialize(deserializer)? {
        None => None,
        Some(RawId::Number(n)) => Some(ClaimedId::Id(AccountId(n))),
        Some(RawId::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(
                    s.parse::<i64>()
                        .map(|n| ClaimedId::Id(AccountId(n)))
                        .unwrap_or(ClaimedId::Malformed),
                )
            }
        }
        Some(RawId::Other(_)) => Some(ClaimedId::Malformed),
    };
    Ok(claim)
}
