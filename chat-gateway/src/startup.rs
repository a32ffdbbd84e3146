//! Application startup and lifecycle management.
//!
//! Builds the router (chat, health, metrics, 404 fallback), wires the shared
//! middleware stack and owns the bound listener.

use crate::config::{CorsConfig, GatewayConfig, ServeMode};
use crate::handlers;
use crate::services::providers::huggingface::{HuggingFaceConfig, HuggingFaceTextProvider};
use crate::services::providers::TextProvider;
use crate::services::ChatService;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    catch_panic_layer, ip_rate_limit_middleware, metrics_middleware, request_id_layers,
    IpRateLimit, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable apart from the rate limiter's
/// internal counters.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub cors: CorsConfig,
    pub rate_limit: IpRateLimit,
}

impl AppState {
    pub fn new(config: &GatewayConfig, provider: Arc<dyn TextProvider>) -> Self {
        Self {
            chat: ChatService::new(provider, config.inference.model_id.clone()),
            cors: config.cors.clone(),
            // only the platform router in front of a hosted deployment
            // sets X-Forwarded-For
            rate_limit: IpRateLimit::new(
                config.rate_limit.max_requests,
                config.rate_limit.window_seconds,
            )
            .trust_forwarded_for(config.serve_mode == ServeMode::Hosted),
        }
    }
}

/// Build the HTTP router. Public so hosting shims can mount it without
/// going through [`Application`].
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/chat",
            post(handlers::chat).fallback(handlers::not_found),
        )
        .layer(from_fn_with_state(
            state.rate_limit.clone(),
            ip_rate_limit_middleware,
        ));

    let cors = cors_layer(&state.cors);

    Router::new()
        .route(
            "/health",
            get(handlers::health_check).fallback(handlers::not_found),
        )
        .route(
            "/metrics",
            get(handlers::metrics_endpoint).fallback(handlers::not_found),
        )
        .merge(api_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(catch_panic_layer())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(request_id_layers())
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allow_origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Hugging Face provider.
    pub async fn build(config: GatewayConfig) -> Result<Self, AppError> {
        let provider = HuggingFaceTextProvider::new(HuggingFaceConfig {
            api_key: config.inference.api_key.clone(),
            api_base: config.inference.api_base.clone(),
            timeout: Duration::from_secs(config.inference.timeout_seconds),
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        tracing::info!(
            model = %config.inference.model_id,
            api_base = %config.inference.api_base,
            "Initialized Hugging Face text provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: GatewayConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let router = build_router(AppState::new(&config, provider));

        // port 0 = random port for testing
        let addr = format!("{}:{}", config.host(), config.port());
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            address = %addr,
            port,
            serve_mode = ?config.serve_mode,
            "Chat gateway listening"
        );

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
