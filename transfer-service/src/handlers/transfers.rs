use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::transfers::{ConfirmQuery, ConfirmResponse, SendItemRequest, SendItemResponse},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Start handing an item to another user
///
/// Returns the URL the recipient must open to accept the item.
#[utoipa::path(
    post,
    path = "/send",
    request_body = SendItemRequest,
    responses(
        (status = 201, description = "Transfer pending", body = SendItemResponse),
        (status = 400, description = "Sending to yourself", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Invalid token", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Item belongs to another user", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Item or recipient not found", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Transfers",
    security(("bearer_auth" = []))
)]
pub async fn send_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(req): ValidatedJson<SendItemRequest>,
) -> Result<(StatusCode, Json<SendItemResponse>), AppError> {
    let transfer = state
        .transfers
        .initiate(&principal, req.id, &req.recipient_login)
        .await?;

    let confirmation_url = format!(
        "{}/confirm?item_token={}",
        state.config.transfers.public_base_url, transfer.confirmation_token
    );

    Ok((StatusCode::CREATED, Json(SendItemResponse { confirmation_url })))
}

/// Accept an item sent to the caller
#[utoipa::path(
    get,
    path = "/confirm",
    params(ConfirmQuery),
    responses(
        (status = 200, description = "Item received", body = ConfirmResponse),
        (status = 400, description = "Already received or malformed query", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Invalid token or not the recipient", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Transfer or item not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Transfers",
    security(("bearer_auth" = []))
)]
pub async fn confirm_transfer(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ConfirmResponse>, AppError> {
    state
        .transfers
        .confirm(&query.item_token, &principal)
        .await?;

    Ok(Json(ConfirmResponse {
        message: "Item has been received".to_string(),
    }))
}
