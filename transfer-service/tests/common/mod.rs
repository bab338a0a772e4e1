//! Shared helpers for transfer-service integration tests.
//!
//! Every test gets a fresh router over its own `InMemoryStore` and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::util::ServiceExt;
use transfer_service::{
    build_router,
    config::{
        Environment, RateLimitConfig, SecurityConfig, SessionConfig, StorageBackend,
        SwaggerConfig, SwaggerMode, TransferConfig, TransfersConfig,
    },
    services::{metrics::init_metrics, InMemoryStore, OwnershipPolicy},
    utils::CredentialHasher,
    AppState,
};

pub const BASE_URL: &str = "http://transfers.test";

pub fn test_config(ownership: OwnershipPolicy) -> TransferConfig {
    TransferConfig {
        common: CoreConfig::default(),
        environment: Environment::Dev,
        service_name: "transfer-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        storage: StorageBackend::Memory,
        database: None,
        session: SessionConfig { token_ttl_hours: 24 },
        transfers: TransfersConfig {
            public_base_url: BASE_URL.to_string(),
            ownership,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 5,
            login_window_seconds: 60,
            register_attempts: 3,
            register_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(test_config(OwnershipPolicy::Enforced))
    }

    pub fn with_config(config: TransferConfig) -> Self {
        init_metrics();

        let store = Arc::new(InMemoryStore::new());
        // Minimal Argon2 cost keeps the suite fast
        let hasher = CredentialHasher::with_params(8, 1, 1).expect("valid argon2 params");
        let state = AppState::new(config, store.clone(), hasher);

        TestApp {
            router: build_router(state.clone()),
            store,
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn register(&self, login: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/registration",
            None,
            Some(json!({ "login": login, "password": password })),
        )
        .await
    }

    pub async fn login(&self, login: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/login",
            None,
            Some(json!({ "login": login, "password": password })),
        )
        .await
    }

    /// Register `login` with password "password" and return a fresh token.
    pub async fn signed_up(&self, login: &str) -> String {
        assert_eq!(self.register(login, "password").await.status, StatusCode::CREATED);
        let response = self.login(login, "password").await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub async fn create_item(&self, token: &str, name: &str) -> i64 {
        let response = self
            .request("POST", "/items", Some(token), Some(json!({ "name": name })))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_i64().expect("id in item response")
    }

    pub async fn list_item_ids(&self, token: &str) -> Vec<i64> {
        let response = self.request("GET", "/items", Some(token), None).await;
        assert_eq!(response.status, StatusCode::OK);
        response
            .body
            .as_array()
            .expect("item list")
            .iter()
            .map(|item| item["id"].as_i64().expect("item id"))
            .collect()
    }

    /// POST /send on behalf of `token`.
    pub async fn send_item(&self, token: &str, item_id: i64, recipient: &str) -> TestResponse {
        self.request(
            "POST",
            "/send",
            Some(token),
            Some(json!({ "id": item_id, "recipient_login": recipient })),
        )
        .await
    }

    pub async fn confirm(&self, token: &str, item_token: &str) -> TestResponse {
        self.request(
            "GET",
            &format!("/confirm?item_token={}", item_token),
            Some(token),
            None,
        )
        .await
    }
}

/// Pull the `item_token` query value out of a confirmation URL.
pub fn item_token_from(response: &TestResponse) -> String {
    let url = response.body["confirmation_url"]
        .as_str()
        .expect("confirmation_url in send response");
    url.split("item_token=")
        .nth(1)
        .expect("item_token query parameter")
        .to_string()
}
