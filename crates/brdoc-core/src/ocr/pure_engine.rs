//! OCR backend using `pure-onnx-ocr` (PaddleOCR models, no external runtime).
//!
//! The underlying engine keeps per-instance caches that are not thread safe,
//! so it lives on a dedicated worker thread. [`PureOcrEngine`] is the shared
//! handle: it sends page images to the worker and waits for the text.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::OcrBackend;

/// Row height in pixels used to group boxes into lines.
const ROW_BUCKET: f32 = 20.0;

const WORKER_NAME: &str = "pure-onnx-ocr";

/// A recognized region reduced to what reading order needs.
#[derive(Debug, Clone)]
struct Region {
    x: f32,
    y: f32,
    text: String,
}

type Reply = mpsc::Sender<Result<Vec<Region>, OcrError>>;

struct Job {
    image: DynamicImage,
    reply: Reply,
}

/// PaddleOCR detection + recognition through `pure-onnx-ocr`.
pub struct PureOcrEngine {
    jobs: mpsc::Sender<Job>,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Load the detection model, recognition model and dictionary named in `config`.
    ///
    /// The models are loaded on the worker thread; load failures are reported
    /// back here before the handle is returned.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = config.model_path(&config.detection_model);
        let rec_path = config.model_path(&config.recognition_model);
        let dict_path = config.model_path(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing model file {}", path.display())));
            }
        }

        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), OcrError>>();

        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_worker(det_path, rec_path, dict_path, queue, ready_tx))
            .map_err(|e| OcrError::ModelLoad(format!("failed to start OCR worker: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| OcrError::ModelLoad("OCR worker exited during startup".to_string()))??;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            jobs,
            keep_unk: config.keep_unk,
        })
    }

    /// Whether the model files named in `config` are present.
    pub fn models_present(config: &OcrConfig) -> bool {
        [&config.detection_model, &config.recognition_model, &config.dictionary]
            .into_iter()
            .all(|name| config.model_path(name).exists())
    }

    fn clean(&self, text: &str) -> String {
        if self.keep_unk {
            text.to_string()
        } else {
            text.replace("[UNK]", " ")
        }
    }
}

/// Owns the engine for its whole lifetime. Exits once every handle is dropped.
fn run_worker(
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
    queue: mpsc::Receiver<Job>,
    ready: mpsc::Sender<Result<(), OcrError>>,
) {
    let engine = match pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(&det_path)
        .rec_model_path(&rec_path)
        .dictionary_path(&dict_path)
        .build()
    {
        Ok(engine) => {
            let _ = ready.send(Ok(()));
            engine
        }
        Err(e) => {
            let _ = ready.send(Err(OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e))));
            return;
        }
    };
    drop(ready);

    for job in queue {
        let result = engine
            .run_from_image(&job.image)
            .map(|results| {
                results
                    .iter()
                    .map(|r| {
                        let (x, y) = top_left(&r.bounding_box);
                        Region {
                            x,
                            y,
                            text: r.text.clone(),
                        }
                    })
                    .collect()
            })
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)));

        if job.reply.send(result).is_err() {
            warn!("OCR caller went away before the result was delivered");
        }
    }

    debug!("OCR worker shutting down");
}

impl OcrBackend for PureOcrEngine {
    fn name(&self) -> &'static str {
        "pure_onnx"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let (reply, response) = mpsc::channel();
        self.jobs
            .send(Job {
                image: image.clone(),
                reply,
            })
            .map_err(|_| OcrError::Unavailable("OCR worker has stopped".to_string()))?;

        let regions = response
            .recv()
            .map_err(|_| OcrError::Unavailable("OCR worker has stopped".to_string()))??;

        debug!("pure-onnx-ocr returned {} text regions", regions.len());

        let regions = regions
            .into_iter()
            .map(|r| Region {
                text: self.clean(&r.text),
                ..r
            })
            .collect();

        let text = reading_order_text(regions);

        info!(
            "OCR {}x{} image in {}ms",
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}


/// Minimum corner of a detection polygon.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

/// Join regions top-to-bottom, left-to-right; regions sharing a row are
/// separated by a space, rows by a newline.
fn reading_order_text(mut regions: Vec<Region>) -> String {
    regions.sort_by(|a, b| {
        let row_a = (a.y / ROW_BUCKET) as i32;
        let row_b = (b.y / ROW_BUCKET) as i32;
        row_a
            .cmp(&row_b)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut text = String::new();
    let mut current_row = None;

    for region in regions.iter().filter(|r| !r.text.trim().is_empty()) {
        let row = (region.y / ROW_BUCKET) as i32;
        match current_row {
            Some(prev) if prev == row => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(region.text.trim());
        current_row = Some(row);
    }

    text
}
