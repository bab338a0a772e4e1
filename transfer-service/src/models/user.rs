//! User model - registered accounts and their bearer session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Registered user.
///
/// `session_token` and `session_expires_utc` are either both set or both
/// empty; the store enforces the pairing on every write.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i64,
    pub login: String,
    pub secret_hash: String,
    pub session_token: Option<String>,
    pub session_expires_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a user with no active session.
    pub fn new(user_id: i64, login: String, secret_hash: String) -> Self {
        Self {
            user_id,
            login,
            secret_hash,
            session_token: None,
            session_expires_utc: None,
            created_utc: Utc::now(),
        }
    }

    /// The stored session, if any, regardless of whether it has expired.
    pub fn session(&self) -> Option<SessionToken> {
        match (&self.session_token, self.session_expires_utc) {
            (Some(token), Some(expires_utc)) => Some(SessionToken {
                token: token.clone(),
                expires_utc,
            }),
            _ => None,
        }
    }

    /// True if the stored session is still valid at `now`.
    ///
    /// A session expiring exactly at `now` is already dead.
    pub fn has_live_session(&self, now: DateTime<Utc>) -> bool {
        self.session_expires_utc
            .map(|expires| expires > now)
            .unwrap_or(false)
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            login: self.login.clone(),
        }
    }
}

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub login: String,
}

/// Opaque bearer token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_utc: DateTime<Utc>,
}
