use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::Principal, services::ServiceError, AppState};

/// Resolve the bearer token and attach the caller's [`Principal`].
///
/// A missing or malformed header is rejected exactly like an unknown token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ServiceError::Unauthenticated)?;

    let principal = state.tokens.resolve(token).await?;

    tracing::Span::current().record("user_id", principal.user_id);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extractor for the principal attached by [`auth_middleware`].
pub struct AuthUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<Principal>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Principal missing from request extensions"
            ))
        })?;

        Ok(AuthUser(principal.clone()))
    }
}
