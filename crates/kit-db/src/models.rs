/// Database row types. These map directly to SQLite rows.
/// Distinct from kit-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Nullable in the schema for rows imported without one.
    pub password: Option<String>,
}

/// A user paired with its live token hash, as read by the token scan.
pub struct TokenRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

pub struct MessageRow {
    pub id: i64,
    pub message: String,
    pub user_id: i64,
    pub username: String,
    pub timestamp: String,
}

pub struct ProfileRow {
    pub user_id: i64,
    pub bio: String,
    pub profile_pic: String,
}
