use std::sync::Arc;

use kit_crypto::secret;
use kit_db::Database;
use kit_types::models::{Account, AccountId};
use tracing::{debug, warn};

use crate::blocking;
use crate::error::AuthError;

/// Owner of every hashed password and hashed bearer token.
///
/// Nothing is cached: each call reads the `users` table afresh. Hash work
/// runs on the blocking pool because Argon2 is deliberately slow.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn hash_secret(&self, plaintext: &str) -> Result<String, AuthError> {
        let plaintext = plaintext.to_owned();
        blocking(move || secret::hash_secret(&plaintext))
            .await
            .map_err(AuthError::StoreUnavailable)
    }

    pub async fn verify_secret(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        blocking(move || Ok(secret::verify_secret(&plaintext, &hash)))
            .await
            .map_err(AuthError::StoreUnavailable)
    }

    /// Replace the account's token hash. Fails with `AuthenticationFailed`
    /// if the account no longer exists.
    pub async fn set_account_token(
        &self,
        account_id: AccountId,
        token_hash: &str,
    ) -> Result<(), AuthError> {
        let db = self.db.clone();
        let token_hash = token_hash.to_owned();
        let updated = blocking(move || db.set_user_token(account_id.0, &token_hash))
            .await
            .map_err(AuthError::StoreUnavailable)?;

        if !updated {
            warn!("Token not stored: account {} no longer exists", account_id);
            return Err(AuthError::AuthenticationFailed);
        }
        Ok(())
    }

    /// Check a username/password pair. `Ok(None)` covers both an unknown
    /// username and a wrong password.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, AuthError> {
        let db = self.db.clone();
        let name = username.to_owned();
        let row = blocking(move || db.get_user_by_username(&name))
            .await
            .map_err(AuthError::StoreUnavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(hash) = row.password.as_deref() else {
            warn!("Account {} has no password hash; refusing login", row.id);
            return Ok(None);
        };

        if !self.verify_secret(password, hash).await? {
            return Ok(None);
        }

        Ok(Some(Account {
            id: AccountId(row.id),
            username: row.username,
            email: row.email,
        }))
    }

    /// Resolve a plaintext token by checking it against every live token
    /// hash in turn. One table read, then up to N Argon2 verifications.
    pub async fn find_account_by_token_plaintext(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AuthError> {
        let db = self.db.clone();
        let token = token.to_owned();

        blocking(move || {
            let rows = db.get_token_hashes()?;
            debug!("Scanning {} token hashes", rows.len());

            let found = rows
                .into_iter()
                .find(|row| secret::verify_secret(&token, &row.token))
                .map(|row| Account {
                    id: AccountId(row.user_id),
                    username: row.username,
                    email: row.email,
                });
            Ok(found)
        })
        .await
        .map_err(AuthError::StoreUnavailable)
    }
}
