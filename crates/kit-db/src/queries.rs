use crate::Database;
use crate::models::{MessageRow, ProfileRow, TokenRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, username, email, password";

impl Database {
    // -- Users --

    /// Insert a user together with an empty profile. Returns the new id.
    /// A duplicate username or email surfaces as an error for which
    /// [`is_unique_violation`] is true.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let id = tx.last_insert_rowid();
            tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", [id])?;
            tx.commit()?;
            Ok(id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", &username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", &email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    pub fn get_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if no such user exists.
    pub fn update_user(
        &self,
        id: i64,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET username = ?1, email = ?2, password = ?3 WHERE id = ?4",
                rusqlite::params![username, email, password_hash, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the user; messages and profile go with it via ON DELETE CASCADE.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Tokens --

    /// Overwrite the user's token hash. The previous token stops working.
    pub fn set_user_token(&self, id: i64, token_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET token = ?1 WHERE id = ?2",
                rusqlite::params![token_hash, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Every live token hash, oldest account first.
    pub fn get_token_hashes(&self) -> Result<Vec<TokenRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, email, token FROM users WHERE token IS NOT NULL ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TokenRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        token: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &str, user_id: i64, timestamp: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (message, user_id, timestamp) VALUES (?1, ?2, ?3)",
                rusqlite::params![message, user_id, timestamp],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author's username in a single query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.message, m.user_id, u.username, m.timestamp
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 ORDER BY m.id",
            )?;
            let rows = stmt
                .query_map([], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT m.id, m.message, m.user_id, u.username, m.timestamp
                     FROM messages m
                     JOIN users u ON m.user_id = u.id
                     WHERE m.id = ?1",
                    [id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns false if the message no longer exists.
    pub fn update_message(&self, id: i64, message: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET message = ?1 WHERE id = ?2",
                rusqlite::params![message, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: i64) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, bio, profile_pic FROM profiles WHERE user_id = ?1",
                    [user_id],
                    |row| {
                        Ok(ProfileRow {
                            user_id: row.get(0)?,
                            bio: row.get(1)?,
                            profile_pic: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_profile(&self, user_id: i64, bio: &str, profile_pic: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET bio = ?1, profile_pic = ?2 WHERE user_id = ?3",
                rusqlite::params![bio, profile_pic, user_id],
            )?;
            Ok(changed > 0)
        })
    }
}

/// True when the error came from a UNIQUE constraint, i.e. a username or
/// email that is already taken.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
            && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_user(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        message: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
