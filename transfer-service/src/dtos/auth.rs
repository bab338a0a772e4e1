use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::SessionToken;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64, message = "Login must be 1-64 characters"))]
    #[schema(example = "user1")]
    pub login: String,

    #[validate(length(min = 1, max = 256, message = "Password must be 1-256 characters"))]
    #[schema(example = "password")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "User has been registered")]
    pub detail: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Login is required"))]
    #[schema(example = "user1")]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "ccc06989e67e552227cbb80f952d1ac8")]
    pub token: String,
    pub expires_utc: DateTime<Utc>,
}

impl From<SessionToken> for LoginResponse {
    fn from(session: SessionToken) -> Self {
        Self {
            token: session.token,
            expires_utc: session.expires_utc,
        }
    }
}
