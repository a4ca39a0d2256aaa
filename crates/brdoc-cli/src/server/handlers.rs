//! Request handlers.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use brdoc_core::document::{filter, BlockType};
use brdoc_core::models::document::{DocumentResult, FilteredResult};
use brdoc_core::patterns::PatternCategory;

use super::{ApiError, AppState, SERVICE_NAME};

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "OCR text and pattern extraction for scanned Brazilian documents",
        "endpoints": {
            "health": "GET /health",
            "extract_pdf": "POST /api/ocr/extract",
            "extract_block": "POST /api/ocr/extract-block",
            "info": "GET /api/ocr/info"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "ocr_engine_available": state.ocr_available(),
    }))
}

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    let engines: Map<String, Value> = state
        .engines()
        .iter()
        .map(|engine| {
            (
                engine.name.clone(),
                json!({ "available": engine.available, "active": engine.active }),
            )
        })
        .collect();

    let processor = state.processor();
    let pattern_detection: Vec<&str> = PatternCategory::ALL.iter().map(|c| c.label()).collect();

    Json(json!({
        "engines": engines,
        "features": {
            "pattern_detection": pattern_detection,
            "image_preprocessing": processor.preprocessor().steps(),
            "max_file_size": format!("{}MB", state.max_upload_mb()),
            "supported_formats": ["PDF"],
            "block_types": ["general", "finance", "all"],
        }
    }))
}

pub async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentResult>, ApiError> {
    let (filename, data) = read_pdf_upload(&state, multipart?).await?;

    let result = process(&state, data).await?;
    if result.success {
        info!("Successfully processed {}", filename);
    } else {
        info!("Could not process {}: {:?}", filename, result.error);
    }

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    block_type: Option<String>,
}

pub async fn extract_block(
    State(state): State<AppState>,
    Query(query): Query<BlockQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FilteredResult>, ApiError> {
    let multipart = multipart?;
    let block = query
        .block_type
        .as_deref()
        .map(BlockType::parse_lenient)
        .unwrap_or_default();

    let (filename, data) = read_pdf_upload(&state, multipart).await?;
    let result = process(&state, data).await?;

    let filtered = filter(&result, block).map_err(|_| {
        ApiError::BadRequest(
            result
                .error
                .clone()
                .unwrap_or_else(|| "Extraction failed".to_string()),
        )
    })?;

    info!("Processed {} with block '{}'", filename, block);

    Ok(Json(filtered))
}

/// Run the CPU-bound pipeline on the blocking pool.
async fn process(state: &AppState, data: Bytes) -> Result<DocumentResult, ApiError> {
    let processor = state.processor();
    let result = tokio::task::spawn_blocking(move || processor.process(&data)).await?;
    Ok(result)
}

/// Pull the `file` field out of the form and validate it.
async fn read_pdf_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(String, Bytes), ApiError> {
    let limit_mb = state.max_upload_mb();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, limit_mb))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(ApiError::BadRequest("File must be a PDF".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_multipart(e, limit_mb))?;

        if data.is_empty() {
            return Err(ApiError::BadRequest("Empty PDF file".to_string()));
        }
        if data.len() > state.max_upload_bytes() {
            return Err(ApiError::PayloadTooLarge(limit_mb));
        }

        debug!("Received {} ({} bytes)", filename, data.len());
        return Ok((filename, data));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}
