use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use ragd_core::cluster::NodeId;
use ragd_core::config::GatewayConfig;
use ragd_core::error::{RagdError, Result};

use super::routes::{RouteProvider, RouteRegistry};
use super::tracing::tracing_middleware;
use crate::periodic::{TaskStats, TaskStatsSnapshot};

/// CORS preflight cache lifetime (30 days).
const CORS_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Routes every gateway serves.
pub const SYSTEM_ROUTES: RouteProvider = RouteProvider::new("system", system_routes);

/// State shared with route handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// This process.
    pub node_id: NodeId,
    /// Name of the lock guarding the progress task.
    pub lock_name: String,
    /// Counters of the progress task; `None` when it is disabled on this node.
    pub progress: Option<Arc<TaskStats>>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Progress task status response.
#[derive(Debug, Serialize)]
pub struct ProgressStatusResponse {
    pub node_id: String,
    pub lock: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TaskStatsSnapshot>,
}

/// Gateway HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    registry: RouteRegistry,
    state: GatewayState,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, registry: RouteRegistry, state: GatewayState) -> Self {
        Self {
            config,
            registry,
            state,
        }
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        self.registry
            .mount()
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(self.cors_layer())
                    .layer(middleware::from_fn(tracing_middleware))
                    .layer(RequestBodyLimitLayer::new(self.config.max_content_length)),
            )
    }

    fn cors_layer(&self) -> CorsLayer {
        if self.config.cors_origins.iter().any(|o| o == "*") {
            return CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .max_age(CORS_MAX_AGE);
        }

        let origins: Vec<_> = self
            .config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        // Credentialed CORS cannot use wildcards, so mirror the request instead.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
            .max_age(CORS_MAX_AGE)
    }

    /// Get the socket address to bind to.
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| {
                RagdError::Gateway(format!(
                    "Invalid listen address {}:{}: {}",
                    self.config.host, self.config.port, e
                ))
            })
    }

    /// Bind the listening socket.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.addr()?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| RagdError::Gateway(format!("Failed to bind {}: {}", addr, e)))
    }

    /// Serve requests on `listener` until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let router = self.router();
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(providers = ?self.registry.names(), "Gateway server listening on {}", addr);
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| RagdError::Gateway(format!("Server error: {}", e)))
    }
}

fn system_routes() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/system/progress", get(progress_handler))
}

/// Health check handler.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Progress task status handler.
async fn progress_handler(State(state): State<GatewayState>) -> Json<ProgressStatusResponse> {
    Json(ProgressStatusResponse {
        node_id: state.node_id.to_string(),
        lock: state.lock_name.clone(),
        enabled: state.progress.is_some(),
        stats: state.progress.as_ref().map(|stats| stats.snapshot()),
    })
}
