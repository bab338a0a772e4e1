pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, SwaggerMode, TransferConfig};
use crate::services::{
    CredentialStore, ItemRegistry, TokenAuthority, TransferCoordinator,
};
use crate::utils::CredentialHasher;

pub use startup::Application;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::metrics::metrics,
        handlers::auth::register,
        handlers::auth::login,
        handlers::items::create_item,
        handlers::items::delete_item,
        handlers::items::list_items,
        handlers::transfers::send_item,
        handlers::transfers::confirm_transfer,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::items::CreateItemRequest,
            dtos::items::ItemResponse,
            dtos::transfers::SendItemRequest,
            dtos::transfers::SendItemResponse,
            dtos::transfers::ConfirmResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and bearer sessions"),
        (name = "Items", description = "Items owned by the caller"),
        (name = "Transfers", description = "Two-step ownership handoff"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: TransferConfig,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenAuthority,
    pub items: ItemRegistry,
    pub transfers: TransferCoordinator,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the core components around one shared store.
    pub fn new(
        config: TransferConfig,
        store: Arc<dyn CredentialStore>,
        hasher: CredentialHasher,
    ) -> Self {
        let tokens = TokenAuthority::new(store.clone(), hasher, config.session_ttl());
        let items = ItemRegistry::new(store.clone(), config.transfers.ownership);
        let transfers = TransferCoordinator::new(store.clone(), items.clone());

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
        );

        Self {
            config,
            store,
            tokens,
            items,
            transfers,
            login_rate_limiter,
            register_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/registration", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected_routes = Router::new()
        .route(
            "/items",
            post(handlers::items::create_item).get(handlers::items::list_items),
        )
        .route("/items/:id", delete(handlers::items::delete_item))
        .route("/send", post(handlers::transfers::send_item))
        .route("/confirm", get(handlers::transfers::confirm_transfer))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    app.merge(login_route)
        .merge(register_route)
        .merge(protected_routes)
        .with_state(state)
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
