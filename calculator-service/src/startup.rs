//! Application startup and lifecycle management.
//!
//! Builds the analyzer from configuration, wires the router and runs the HTTP
//! server until a shutdown signal arrives.

use crate::config::CalculatorConfig;
use crate::handlers::{
    calculate::calculate,
    health::{health_check, metrics_endpoint, readiness_check, root},
};
use crate::services::analyzers::gemini::{GeminiConfig, GeminiImageAnalyzer};
use crate::services::analyzers::ImageAnalyzer;
use crate::services::Calculator;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CalculatorConfig>,
    pub calculator: Calculator,
}

impl AppState {
    pub fn new(config: CalculatorConfig, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self {
            config: Arc::new(config),
            calculator: Calculator::new(analyzer),
        }
    }
}

/// Routes: the calculation endpoint at `/` (and `/calculate`, where the web
/// client posts), plus health, readiness and metrics.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes;

    Router::new()
        .route("/", get(root).post(calculate))
        .route("/calculate", post(calculate))
        .route("/calculate/", post(calculate))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(DefaultBodyLimit::max(body_limit))
        // The browser client is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini analyzer.
    pub async fn build(config: CalculatorConfig) -> Result<Self, AppError> {
        let analyzer = GeminiImageAnalyzer::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            api_base: config.gemini.api_base.clone(),
        })
        .map_err(|e| {
            tracing::error!("Failed to initialize Gemini analyzer: {}", e);
            AppError::InternalError(anyhow::anyhow!("Gemini analyzer initialization error: {}", e))
        })?;

        if analyzer.is_configured() {
            tracing::info!(model = %analyzer.model(), "Initialized Gemini analyzer");
        } else {
            tracing::warn!(
                "GEMINI_API_KEY not configured - calculation requests will fail until it is set"
            );
        }

        Self::build_with_analyzer(config, Arc::new(analyzer)).await
    }

    /// Build the application around an arbitrary analyzer.
    pub async fn build_with_analyzer(
        config: CalculatorConfig,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            environment = config.environment.as_str(),
            "Calculator service: HTTP on {}:{}",
            config.common.host,
            port
        );

        let router = build_router(AppState::new(config, analyzer));

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

    /// Run the application until a shutdown signal is received.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
