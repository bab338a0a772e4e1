use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Malformed JSON", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Login already taken", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many requests", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    state
        .tokens
        .register(&req.login, Password::new(req.password))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            detail: "User has been registered".to_string(),
        }),
    ))
}

/// Log in and receive a bearer token
///
/// Any previously issued token for the user stops working.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Malformed JSON", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Unknown login or wrong password", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many requests", body = crate::dtos::ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let session = state
        .tokens
        .authenticate(&req.login, Password::new(req.password))
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}
