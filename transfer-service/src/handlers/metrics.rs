use axum::response::IntoResponse;

/// Prometheus text exposition.
#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Prometheus metrics", content_type = "text/plain")),
    tag = "Observability"
)]
pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
