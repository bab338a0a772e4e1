use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendItemRequest {
    /// Item to hand over.
    #[schema(example = 3)]
    pub id: i64,

    #[validate(length(min = 1, max = 64, message = "Recipient login must be 1-64 characters"))]
    #[schema(example = "user2")]
    pub recipient_login: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendItemResponse {
    #[schema(example = "http://localhost:8080/confirm?item_token=a185a9ad7b1b3d166702ba97b83e9e17")]
    pub confirmation_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConfirmQuery {
    /// Confirmation token from the sender's confirmation URL.
    #[param(example = "a185a9ad7b1b3d166702ba97b83e9e17")]
    pub item_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmResponse {
    #[schema(example = "Item has been received")]
    pub message: String,
}
