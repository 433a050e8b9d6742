use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Auto-assigned account identifier. SQLite `AUTOINCREMENT` guarantees a
/// deleted id is never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// An account as seen outside the credential store. Secrets never leave the
/// store, so there are no hash fields here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
}

/// Any persisted record that belongs to exactly one account.
pub trait Owned {
    fn owner_id(&self) -> AccountId;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub message: String,
    pub user_id: AccountId,
    pub timestamp: DateTime<Utc>,
}

impl Owned for Message {
    fn owner_id(&self) -> AccountId {
        self.user_id
    }
}

/// One profile per account, created empty at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: AccountId,
    pub bio: String,
    pub profile_pic: String,
}

impl Owned for Profile {
    fn owner_id(&self) -> AccountId {
        self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&AccountId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn owned_resources_report_their_owner() {
        let message = Message {
            id: 7,
            message: "hi".into(),
            user_id: AccountId(3),
            timestamp: Utc::now(),
        };
        let profile = Profile {
            user_id: AccountId(9),
            bio: String::new(),
            profile_pic: String::new(),
        };

        assert_eq!(message.owner_id(), AccountId(3));
        assert_eq!(profile.owner_id(), AccountId(9));
    }
}
