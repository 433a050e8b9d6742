//! HTTP surface of the Kit Network API.
//!
//! [`credentials::CredentialStore`] owns every hashed secret and
//! [`authenticator::Authenticator`] turns a presented token plus a claimed
//! user id into a proven [`kit_types::models::Account`]. The handler modules
//! call into those two before touching any owned resource.

pub mod auth;
pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod profiles;
pub mod routes;
pub mod users;

use anyhow::anyhow;

/// Run blocking DB or hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}
