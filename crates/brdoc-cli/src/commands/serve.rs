//! Serve command - run the HTTP extraction service.

use clap::Args;
use tracing::{info, warn};

use brdoc_core::document::DocumentProcessor;
use brdoc_core::ocr::{create_backend, engine_report};

use crate::server::{self, AppState};

use super::load_config;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let backend = match create_backend(&config.ocr) {
        Ok(backend) => backend,
        Err(e) => {
            warn!("OCR engine '{}' unavailable: {}", config.ocr.engine, e);
            warn!("Extraction requests will fail until an engine is configured");
            None
        }
    };
    let engines = engine_report(&config.ocr, backend.as_deref());

    let processor = DocumentProcessor::from_config(&config, backend);
    let state = AppState::new(processor, engines, config.server.max_upload_bytes);
    let app = server::router(state, &config.server.allowed_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!("brdoc listening on {}", addr);
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
