//! service-core: Shared infrastructure for the item transfer workspace.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use serde;
pub use sqlx;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
