use std::fmt;

use kit_crypto::token::generate_token;
use kit_types::api::ClaimedId;
use kit_types::models::{Account, AccountId, Owned};
use tracing::{debug, info};

use crate::credentials::CredentialStore;
use crate::error::AuthError;

/// A freshly minted bearer token. The plaintext exists only here; the
/// store keeps its hash.
#[derive(Clone)]
pub struct LoginGrant {
    pub account_id: AccountId,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginGrant")
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Decides whether a request may act as the account it claims to be.
#[derive(Clone)]
pub struct Authenticator {
    store: CredentialStore,
}

impl Authenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Resolve `presented_token` to an account and require that it is the
    /// account named by `claimed_id`.
    ///
    /// The token is compared exactly as presented. An unknown token and a
    /// token owned by someone else both yield `AuthenticationFailed`. A
    /// store failure yields `StoreUnavailable`.
    pub async fn authenticate(
        &self,
        presented_token: Option<&str>,
        claimed_id: Option<AccountId>,
    ) -> Result<Account, AuthError> {
        let token = require_token(presented_token)?;
        let claimed_id = claimed_id.ok_or(AuthError::MissingAccountId)?;

        match self.store.find_account_by_token_plaintext(token).await? {
            Some(account) if account.id == claimed_id => Ok(account),
            Some(_) => {
                debug!("Token presented for account {} belongs to another account", claimed_id);
                Err(AuthError::AuthenticationFailed)
            }
            None => {
                debug!("No account holds the token presented for account {}", claimed_id);
                Err(AuthError::AuthenticationFailed)
            }
        }
    }

    /// [`Self::authenticate`] for an id taken straight off a request. A
    /// malformed id names no account, so it fails like a mismatch once a
    /// token is present, without scanning the store.
    pub async fn authenticate_claim(
        &self,
        presented_token: Option<&str>,
        claim: Option<ClaimedId>,
    ) -> Result<Account, AuthError> {
        let claimed_id = match claim {
            Some(ClaimedId::Id(id)) => Some(id),
            Some(ClaimedId::Malformed) => {
                require_token(presented_token)?;
                debug!("Token presented with an unparseable account id");
                return Err(AuthError::AuthenticationFailed);
            }
            None => None,
        };
        self.authenticate(presented_token, claimed_id).await
    }

    /// True iff `account` owns `resource`.
    pub fn authorize_ownership<R: Owned + ?Sized>(account: &Account, resource: &R) -> bool {
        resource.owner_id() == account.id
    }

    /// [`Self::authorize_ownership`] as a gate: `Forbidden` when the proven
    /// identity does not own the resource.
    pub fn require_ownership<R: Owned + ?Sized>(
        account: &Account,
        resource: &R,
    ) -> Result<(), AuthError> {
        if Self::authorize_ownership(account, resource) {
            Ok(())
        } else {
            debug!(
                "Account {} denied access to resource owned by {}",
                account.id,
                resource.owner_id()
            );
            Err(AuthError::Forbidden)
        }
    }

    /// Verify the password, then mint and persist a new token. The previous
    /// token for the account stops working. Concurrent logins race and the
    /// last hash written wins.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let account = self
            .store
            .verify_password(username, password)
            .await?
            .ok_or(AuthError::AuthenticationFailed)?;

        let token = generate_token();
        let token_hash = self.store.hash_secret(&token).await?;
        self.store.set_account_token(account.id, &token_hash).await?;

        info!("{} ({}) logged in", account.username, account.id);
        Ok(LoginGrant {
            account_id: account.id,
            username: account.username,
            token,
        })
    }
}

fn require_token(presented_token: Option<&str>) -> Result<&str, AuthError> {
    presented_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kit_db::Database;
    use kit_types::models::{Message, Profile};

    use super::*;

    async fn setup_with_db() -> (Authenticator, Arc<Database>, AccountId, AccountId) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = CredentialStore::new(db.clone());
        let hash = store.hash_secret("pw1").await.unwrap();
        let alice = AccountId(db.create_user("alice", "a@x.com", &hash).unwrap());
        let hash = store.hash_secret("pw2").await.unwrap();
        let bob = AccountId(db.create_user("bob", "b@x.com", &hash).unwrap());
        (Authenticator::new(store), db, alice, bob)
    }

    async fn setup() -> (Authenticator, AccountId, AccountId) {
        let (auth, _, alice, bob) = setup_with_db().await;
        (auth, alice, bob)
    }

    fn account(id: i64) -> Account {
        Account {
            id: AccountId(id),
            username: format!("user{id}"),
            email: format!("user{id}@x.com"),
        }
    }

    #[tokio::test]
    async fn login_then_authenticate_scenario() {
        let (auth, alice, bob) = setup().await;
        assert_eq!(alice, AccountId(1));

        let t1 = auth.login("alice", "pw1").await.unwrap();
        assert_eq!(t1.account_id, alice);
        assert_eq!(t1.username, "alice");
        assert_eq!(t1.token.len(), 32);

        let account = auth.authenticate(Some(&t1.token), Some(alice)).await.unwrap();
        assert_eq!(account.id, alice);
        assert_eq!(account.username, "alice");

        let err = auth.authenticate(Some(&t1.token), Some(bob)).await.unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed));

        let t2 = auth.login("alice", "pw1").await.unwrap();
        assert_ne!(t1.token, t2.token);

        let err = auth.authenticate(Some(&t1.token), Some(alice)).await.unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed));
        assert_eq!(
            auth.authenticate(Some(&t2.token), Some(alice)).await.unwrap().id,
            alice
        );
    }

    #[tokio::test]
    async fn missing_inputs_fail_before_any_lookup() {
        let (auth, alice, _) = setup().await;
        let grant = auth.login("alice", "pw1").await.unwrap();

        let err = auth.authenticate(Some(""), Some(alice)).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        let err = auth.authenticate(None, Some(alice)).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        let err = auth.authenticate(Some(&grant.token), None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingAccountId));
        // Token is checked first when both are missing
        let err = auth.authenticate(None, None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn unknown_token_fails_like_mismatch() {
        let (auth, alice, _) = setup().await;
        auth.login("alice", "pw1").await.unwrap();

        let err = auth
            .authenticate(Some("00000000000000000000000000000000"), Some(alice))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn each_account_resolves_its_own_token() {
        let (auth, alice, bob) = setup().await;
        let ta = auth.login("alice", "pw1").await.unwrap();
        let tb = auth.login("bob", "pw2").await.unwrap();

        assert_eq!(auth.authenticate(Some(&tb.token), Some(bob)).await.unwrap().id, bob);
        assert_eq!(auth.authenticate(Some(&ta.token), Some(alice)).await.unwrap().id, alice);
        assert!(auth.authenticate(Some(&tb.token), Some(alice)).await.is_err());
    }

    #[tokio::test]
    async fn overwritten_token_hash_invalidates_old_token() {
        let (auth, alice, _) = setup().await;
        let grant = auth.login("alice", "pw1").await.unwrap();

        let new_hash = auth.store().hash_secret("replacement").await.unwrap();
        auth.store().set_account_token(alice, &new_hash).await.unwrap();

        assert!(matches!(
            auth.authenticate(Some(&grant.token), Some(alice)).await,
            Err(AuthError::AuthenticationFailed)
        ));
        assert!(auth.authenticate(Some("replacement"), Some(alice)).await.is_ok());
    }

    #[tokio::test]
    async fn bad_password_and_unknown_user_fail_login() {
        let (auth, _, _) = setup().await;
        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::AuthenticationFailed)
        ));
        assert!(matches!(
            auth.login("nobody", "pw1").await,
            Err(AuthError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn token_is_compared_verbatim() {
        let (auth, alice, _) = setup().await;
        let grant = auth.login("alice", "pw1").await.unwrap();
        let padded = format!(" {}", grant.token);
        assert!(matches!(
            auth.authenticate(Some(&padded), Some(alice)).await,
            Err(AuthError::AuthenticationFailed)
        ));
        assert!(auth.authenticate(Some(&grant.token), Some(alice)).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_claim_fails_after_token_check() {
        let (auth, alice, _) = setup().await;
        let grant = auth.login("alice", "pw1").await.unwrap();

        let err = auth
            .authenticate_claim(None, Some(ClaimedId::Malformed))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        let err = auth
            .authenticate_claim(Some(&grant.token), Some(ClaimedId::Malformed))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed));
        let err = auth.authenticate_claim(Some(&grant.token), None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingAccountId));

        let account = auth
            .authenticate_claim(Some(&grant.token), Some(ClaimedId::Id(alice)))
            .await
            .unwrap();
        assert_eq!(account.id, alice);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_store_unavailable() {
        let (auth, db, alice, _) = setup_with_db().await;
        let grant = auth.login("alice", "pw1").await.unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("ALTER TABLE users RENAME TO users_gone")?;
            Ok(())
        })
        .unwrap();

        let err = auth.authenticate(Some(&grant.token), Some(alice)).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        let err = auth.login("alice", "pw1").await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[test]
    fn ownership_is_owner_id_equality() {
        let alice = account(1);
        let bob = account(2);
        let message = Message {
            id: 10,
            message: "hi".into(),
            user_id: alice.id,
            timestamp: Utc::now(),
        };
        let profile = Profile {
            user_id: bob.id,
            bio: String::new(),
            profile_pic: String::new(),
        };

        assert!(Authenticator::authorize_ownership(&alice, &message));
        assert!(!Authenticator::authorize_ownership(&bob, &message));
        assert!(Authenticator::authorize_ownership(&bob, &profile));
        assert!(!Authenticator::authorize_ownership(&alice, &profile));

        assert!(Authenticator::require_ownership(&alice, &message).is_ok());
        assert!(matches!(
            Authenticator::require_ownership(&bob, &message),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn login_grant_debug_hides_token() {
        let grant = LoginGrant {
            account_id: AccountId(1),
            username: "alice".into(),
            token: "deadbeef".into(),
        };
        let shown = format!("{:?}", grant);
        assert!(!shown.contains("deadbeef"));
    }
}
