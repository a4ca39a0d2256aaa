//! HTTP API over the document pipeline.

mod error;
mod handlers;

pub use error::ApiError;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use brdoc_core::document::DocumentProcessor;
use brdoc_core::ocr::EngineInfo;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub const SERVICE_NAME: &str = "brdoc";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    processor: Arc<DocumentProcessor>,
    engines: Vec<EngineInfo>,
    /// Resolved once at startup; health checks never touch the engine.
    ocr_available: bool,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(processor: DocumentProcessor, engines: Vec<EngineInfo>, max_upload_bytes: usize) -> Self {
        let ocr_available = processor.ocr().is_some_and(|ocr| ocr.is_available());

        Self {
            inner: Arc::new(AppStateInner {
                processor: Arc::new(processor),
                engines,
                ocr_available,
                max_upload_bytes,
            }),
        }
    }

    pub fn processor(&self) -> Arc<DocumentProcessor> {
        Arc::clone(&self.inner.processor)
    }

    pub fn engines(&self) -> &[EngineInfo] {
        &self.inner.engines
    }

    pub fn ocr_available(&self) -> bool {
        self.inner.ocr_available
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }

    /// Upload limit in whole MiB, as shown to clients.
    pub fn max_upload_mb(&self) -> usize {
        self.inner.max_upload_bytes / (1024 * 1024)
    }
}

/// Build the router with CORS for `allowed_origins` and request tracing.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let body_limit = state.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/ocr/info", get(handlers::info))
        .route("/api/ocr/extract", post(handlers::extract))
        .route("/api/ocr/extract-block", post(handlers::extract_block))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
