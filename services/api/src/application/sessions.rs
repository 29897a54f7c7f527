//! services/api/src/application/sessions.rs
//!
//! Server-side login sessions keyed by an opaque random token.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use wanderlust_core::domain::{AuthSession, User};
use wanderlust_core::ports::DatabaseService;

use crate::error::ApiError;

const TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<dyn DatabaseService>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<dyn DatabaseService>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores a fresh session for the user and returns it; `id` is the cookie value.
    pub async fn create_session(&self, user_id: Uuid) -> Result<AuthSession, ApiError> {
        let now = Utc::now();
        let session = AuthSession {
            id: generate_token(),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.db.create_auth_session(&session).await?;
        info!(%user_id, "Session created");
        Ok(session)
    }

    /// Maps a token to its user. Unknown and expired tokens resolve to `None`;
    /// expired ones are deleted on the way.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, ApiError> {
        let Some(session) = self.db.get_auth_session(token).await? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            debug!(user_id = %session.user_id, "Dropping expired session");
            self.db.delete_auth_session(token).await?;
            return Ok(None);
        }
        Ok(self.db.get_user_by_id(session.user_id).await?)
    }

    pub async fn destroy_session(&self, token: &str) -> Result<(), ApiError> {
        self.db.delete_auth_session(token).await?;
        Ok(())
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use wanderlust_core::domain::NewUser;

    async fn store_with_user() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                hashed_password: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn live_session_resolves_to_its_user() {
        let (store, user) = store_with_user().await;
        let sessions = SessionManager::new(store, Duration::days(7));

        let session = sessions.create_session(user.id).await.unwrap();
        let resolved = sessions.resolve_session(&session.id).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        sessions.destroy_session(&session.id).await.unwrap();
        assert!(sessions.resolve_session(&session.id).await.unwrap().is_none());
        // Destroying twice is fine.
        sessions.destroy_session(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_is_anonymous_and_removed() {
        let (store, user) = store_with_user().await;
        let sessions = SessionManager::new(store.clone(), Duration::seconds(-1));

        let session = sessions.create_session(user.id).await.unwrap();
        assert!(sessions.resolve_session(&session.id).await.unwrap().is_none());
        assert!(store.get_auth_session(&session.id).await.unwrap().is_none());
    }
}
