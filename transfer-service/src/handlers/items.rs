use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::items::{CreateItemRequest, ItemResponse},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 401, description = "Invalid token", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Items",
    security(("bearer_auth" = []))
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    let item = state.items.create(&principal, &req.name).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 401, description = "Invalid token", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Item belongs to another user", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Items",
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.items.delete(&principal, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's items in ascending id order
#[utoipa::path(
    get,
    path = "/items",
    responses(
        (status = 200, description = "Items owned by the caller", body = [ItemResponse]),
        (status = 401, description = "Invalid token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Items",
    security(("bearer_auth" = []))
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = state.items.list_by_owner(&principal).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}
