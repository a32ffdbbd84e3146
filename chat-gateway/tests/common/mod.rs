#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chat_gateway::config::{
    CorsConfig, Environment, GatewayConfig, InferenceConfig, RateLimitConfig, ServeMode,
};
use chat_gateway::services::providers::TextProvider;
use chat_gateway::{build_router, AppState};
use secrecy::Secret;
use std::sync::Arc;

pub const TEST_MODEL: &str = "test-org/test-model";

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        common: service_core::config::Config {
            host: Some("127.0.0.1".to_string()),
            port: Some(0), // Random port
        },
        environment: Environment::Dev,
        serve_mode: ServeMode::Local,
        platform_port: None,
        service_name: "chat-gateway-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        inference: InferenceConfig {
            api_key: Secret::new("test-api-key".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            model_id: TEST_MODEL.to_string(),
            timeout_seconds: 5,
        },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
        },
        rate_limit: RateLimitConfig {
            max_requests: 100,
            window_seconds: 900,
        },
    }
}

pub fn app_with_config(config: &GatewayConfig, provider: Arc<dyn TextProvider>) -> Router {
    build_router(AppState::new(config, provider))
}

pub fn app(provider: Arc<dyn TextProvider>) -> Router {
    app_with_config(&test_config(), provider)
}

pub fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn is_iso8601(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or(false)
}
