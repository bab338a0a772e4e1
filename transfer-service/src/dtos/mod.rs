pub mod auth;
pub mod items;
pub mod transfers;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Token has not been authorized")]
    pub error: String,
    /// Present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
