//! Image cleanup applied to page scans before OCR.

use image::{DynamicImage, GrayImage, Luma};
use tracing::trace;

use crate::models::config::PreprocessingConfig;

/// Grey-level preprocessing pipeline.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    enabled: bool,
    denoise: bool,
    enhance_contrast: bool,
    binarize: bool,
    /// Side of the adaptive threshold window, in pixels.
    block_size: u32,
    /// Offset subtracted from the local mean.
    threshold_offset: i32,
}

impl ImagePreprocessor {
    /// Create a preprocessor with the default steps.
    pub fn new() -> Self {
        Self::from_config(&PreprocessingConfig::default())
    }

    pub fn from_config(config: &PreprocessingConfig) -> Self {
        Self {
            enabled: config.enabled,
            denoise: config.denoise,
            enhance_contrast: config.enhance_contrast,
            binarize: config.binarize,
            block_size: 15,
            threshold_offset: 5,
        }
    }

    /// Names of the steps this preprocessor runs, in order.
    pub fn steps(&self) -> Vec<&'static str> {
        if !self.enabled {
            return Vec::new();
        }

        let mut steps = vec!["grayscale"];
        if self.denoise {
            steps.push("denoise");
        }
        if self.enhance_contrast {
            steps.push("contrast");
        }
        if self.binarize {
            steps.push("binarize");
        }
        steps
    }

    /// Run the configured steps. Disabled preprocessing returns a copy of the input.
    pub fn process(&self, image: &DynamicImage) -> DynamicImage {
        if !self.enabled {
            return image.clone();
        }

        let mut gray = image.to_luma8();

        if self.denoise {
            gray = median_3x3(&gray);
        }
        if self.enhance_contrast {
            gray = stretch_contrast(&gray);
        }
        if self.binarize {
            gray = adaptive_threshold(&gray, self.block_size, self.threshold_offset);
        }

        trace!("Preprocessed {}x{} image: {:?}", gray.width(), gray.height(), self.steps());

        DynamicImage::ImageLuma8(gray)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 3x3 median filter; border pixels use the clamped neighbourhood.
fn median_3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    let mut window = Vec::with_capacity(9);

    for y in 0..height {
        for x in 0..width {
            window.clear();
            for ny in y.saturating_sub(1)..(y + 2).min(height) {
                for nx in x.saturating_sub(1)..(x + 2).min(width) {
                    window.push(image.get_pixel(nx, ny)[0]);
                }
            }
            window.sort_unstable();
            result.put_pixel(x, y, Luma([window[window.len() / 2]]));
        }
    }

    result
}

/// Linearly map the 1st..99th percentile grey range onto 0..255.
fn stretch_contrast(image: &GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return image.clone();
    }
    let cutoff = total / 100;

    let percentile = |from_top: bool| -> u8 {
        let mut seen = 0;
        let levels: Box<dyn Iterator<Item = usize>> = if from_top {
            Box::new((0..256).rev())
        } else {
            Box::new(0..256)
        };
        for level in levels {
            seen += histogram[level];
            if seen > cutoff {
                return level as u8;
            }
        }
        if from_top { 255 } else { 0 }
    };

    let low = percentile(false);
    let high = percentile(true);
    if high <= low {
        return image.clone();
    }

    let range = (high - low) as f32;
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        let value = pixel[0].clamp(low, high);
        pixel[0] = (((value - low) as f32 / range) * 255.0).round() as u8;
    }

    result
}

/// Mean-based adaptive threshold using a summed-area table.
fn adaptive_threshold(image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let stride = width as usize + 1;
    let mut integral = vec![0u64; stride * (height as usize + 1)];

    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let half_block = block_size / 2;
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let x0 = x.saturating_sub(half_block) as usize;
            let y0 = y.saturating_sub(half_block) as usize;
            let x1 = (x + half_block + 1).min(width) as usize;
            let y1 = (y + half_block + 1).min(height) as usize;

            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((x1 - x0) * (y1 - y0)) as u64;

            let threshold = (sum / count) as i32 - c;
            let output = if image.get_pixel(x, y)[0] as i32 > threshold { 255 } else { 0 };
            result.put_pixel(x, y, Luma([output]));
        }
    }

    result
}
