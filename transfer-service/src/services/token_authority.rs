//! Registration, login and bearer-token resolution.

use chrono::{Duration, Utc};
use std::sync::Arc;

use super::error::ServiceError;
use super::store::CredentialStore;
use crate::models::{Principal, SessionToken, User};
use crate::utils::{generate_random_token, CredentialHasher, Password, PasswordHashString};

/// Issues and resolves opaque session tokens.
///
/// A user holds at most one session; logging in again replaces it.
#[derive(Clone)]
pub struct TokenAuthority {
    store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    session_ttl: Duration,
}

impl TokenAuthority {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: CredentialHasher,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            session_ttl,
        }
    }

    /// Create an account. Only the hash of `secret` is ever stored.
    #[tracing::instrument(skip(self, secret))]
    pub async fn register(&self, login: &str, secret: Password) -> Result<User, ServiceError> {
        let hash = self.hasher.hash(&secret)?;

        let user = self
            .store
            .insert_user(login, hash.as_str())
            .await?
            .ok_or(ServiceError::UserAlreadyExists)?;

        tracing::info!(user_id = user.user_id, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue a fresh session, discarding any previous one.
    ///
    /// Unknown login and wrong secret fail identically.
    #[tracing::instrument(skip(self, secret))]
    pub async fn authenticate(
        &self,
        login: &str,
        secret: Password,
    ) -> Result<SessionToken, ServiceError> {
        let user = self
            .store
            .find_user_by_login(login)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let stored = PasswordHashString::new(user.secret_hash.clone());
        if !self.hasher.verify(&secret, &stored) {
            tracing::info!(user_id = user.user_id, "Login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let session = SessionToken {
            token: generate_random_token(),
            expires_utc: Utc::now() + self.session_ttl,
        };

        if !self
            .store
            .store_session(user.user_id, &session.token, session.expires_utc)
            .await?
        {
            // Only possible if the user vanished between lookup and update
            return Err(ServiceError::InvalidCredentials);
        }

        tracing::info!(
            user_id = user.user_id,
            expires_utc = %session.expires_utc,
            "Session issued"
        );
        Ok(session)
    }

    /// Map a bearer token to its holder. Expired sessions are rejected but
    /// left in place; the next login overwrites them.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<Principal, ServiceError> {
        if token.is_empty() {
            return Err(ServiceError::Unauthenticated);
        }

        let user = self
            .store
            .find_user_by_token(token)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        if !user.has_live_session(Utc::now()) {
            tracing::debug!(user_id = user.user_id, "Session expired");
            return Err(ServiceError::Unauthenticated);
        }

        Ok(user.principal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    fn authority_with_ttl(ttl: Duration) -> (TokenAuthority, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let hasher = CredentialHasher::with_params(8, 1, 1).unwrap();
        (TokenAuthority::new(store.clone(), hasher, ttl), store)
    }

    fn pw(s: &str) -> Password {
        Password::new(s.to_string())
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_secret() {
        let (authority, store) = authority_with_ttl(Duration::hours(24));
        let user = authority.register("alice", pw("pw1")).await.unwrap();

        let stored = store.find_user_by_login("alice").await.unwrap().unwrap();
        assert_eq!(stored.user_id, user.user_id);
        assert_ne!(stored.secret_hash, "pw1");
        assert!(stored.session().is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_login_fails() {
        let (authority, _) = authority_with_ttl(Duration::hours(24));
        authority.register("alice", pw("pw1")).await.unwrap();

        let err = authority.register("alice", pw("other")).await.unwrap_err();
        assert!(matches!(err, ServiceError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (authority, _) = authority_with_ttl(Duration::hours(24));
        authority.register("alice", pw("pw1")).await.unwrap();

        let wrong_secret = authority.authenticate("alice", pw("nope")).await.unwrap_err();
        let unknown = authority.authenticate("nobody", pw("pw1")).await.unwrap_err();

        assert!(matches!(wrong_secret, ServiceError::InvalidCredentials));
        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert_eq!(wrong_secret.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_second_login_invalidates_first_token() {
        let (authority, _) = authority_with_ttl(Duration::hours(24));
        authority.register("alice", pw("pw1")).await.unwrap();

        let first = authority.authenticate("alice", pw("pw1")).await.unwrap();
        let second = authority.authenticate("alice", pw("pw1")).await.unwrap();
        assert_ne!(first.token, second.token);

        assert!(matches!(
            authority.resolve(&first.token).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert_eq!(authority.resolve(&second.token).await.unwrap().login, "alice");
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let (authority, _) = authority_with_ttl(Duration::seconds(-1));
        authority.register("alice", pw("pw1")).await.unwrap();
        let session = authority.authenticate("alice", pw("pw1")).await.unwrap();

        assert!(matches!(
            authority.resolve(&session.token).await,
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expiry_is_issue_time_plus_ttl() {
        let (authority, _) = authority_with_ttl(Duration::hours(24));
        authority.register("alice", pw("pw1")).await.unwrap();

        let before = Utc::now();
        let session = authority.authenticate("alice", pw("pw1")).await.unwrap();
        let after = Utc::now();

        assert!(session.expires_utc >= before + Duration::hours(24));
        assert!(session.expires_utc <= after + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens_are_rejected() {
        let (authority, _) = authority_with_ttl(Duration::hours(24));
        assert!(matches!(
            authority.resolve("deadbeef").await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            authority.resolve("").await,
            Err(ServiceError::Unauthenticated)
        ));
    }
}
