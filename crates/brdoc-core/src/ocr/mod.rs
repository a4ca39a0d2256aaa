//! OCR backends and page image preprocessing.
//!
//! The engine is chosen once from configuration. A backend that cannot be
//! built is reported, and the service keeps running without one.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod tesseract;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use tesseract::TesseractEngine;

use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::info;

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrEngineKind};

/// Image-to-text recognizer for a single page.
pub trait OcrBackend: Send + Sync {
    /// Engine name as reported to clients.
    fn name(&self) -> &'static str;

    /// Whether the engine can currently run.
    fn is_available(&self) -> bool {
        true
    }

    /// Recognize the text of one page image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Availability of one engine, as listed by the info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub available: bool,
    /// Whether this engine serves requests.
    pub active: bool,
}

/// Build the backend selected by `config.engine`.
///
/// Returns `Ok(None)` when OCR is disabled.
pub fn create_backend(config: &OcrConfig) -> Result<Option<Arc<dyn OcrBackend>>, OcrError> {
    match config.engine {
        OcrEngineKind::None => {
            info!("OCR disabled by configuration");
            Ok(None)
        }
        OcrEngineKind::Tesseract => {
            let engine = TesseractEngine::from_config(config);
            if !engine.is_available() {
                return Err(OcrError::Unavailable(format!(
                    "tesseract binary '{}' not found",
                    config.tesseract_binary
                )));
            }
            info!("Using tesseract OCR ({})", config.language);
            Ok(Some(Arc::new(engine)))
        }
        OcrEngineKind::PureOnnx => create_pure_onnx(config),
    }
}

#[cfg(feature = "native")]
fn create_pure_onnx(config: &OcrConfig) -> Result<Option<Arc<dyn OcrBackend>>, OcrError> {
    Ok(Some(Arc::new(PureOcrEngine::from_config(config)?)))
}

#[cfg(not(feature = "native"))]
fn create_pure_onnx(_config: &OcrConfig) -> Result<Option<Arc<dyn OcrBackend>>, OcrError> {
    Err(OcrError::Unavailable(
        "built without the native feature".to_string(),
    ))
}

/// Probe every known engine.
pub fn engine_report(config: &OcrConfig, active: Option<&dyn OcrBackend>) -> Vec<EngineInfo> {
    let active_name = active.map(|b| b.name());

    #[cfg(feature = "native")]
    let pure_available = PureOcrEngine::models_present(config);
    #[cfg(not(feature = "native"))]
    let pure_available = false;

    vec![
        EngineInfo {
            name: OcrEngineKind::PureOnnx.to_string(),
            available: pure_available,
            active: active_name == Some("pure_onnx"),
        },
        EngineInfo {
            name: OcrEngineKind::Tesseract.to_string(),
            available: TesseractEngine::probe(&config.tesseract_binary),
            active: active_name == Some("tesseract"),
        },
    ]
}
