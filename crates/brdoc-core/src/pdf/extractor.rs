//! Page image extraction for scanned PDFs using lopdf.
//!
//! Scanned documents carry one raster image per page. Rather than rendering
//! vector content, the extractor recovers that image and scales it to the
//! requested DPI using the page's MediaBox.

use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, RgbImage};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{RasterPage, Rasterizer, Result};
use crate::error::PdfError;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer recovering embedded page images with lopdf.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// Maximum pages to rasterize (0 = unlimited).
    max_pages: usize,
    /// Upper bound on the longer side of a page image.
    max_image_size: u32,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            max_pages: 0,
            max_image_size: 4096,
        }
    }

    /// Limit the number of pages rasterized.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Cap the longer side of produced images.
    pub fn with_max_image_size(mut self, size: u32) -> Self {
        self.max_image_size = size.max(1);
        self
    }

    /// Parse the document, decrypting PDFs protected by an empty password.
    fn load(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    fn render_page(&self, doc: &Document, number: u32, page_id: ObjectId, dpi: u32) -> Result<DynamicImage> {
        let image = self
            .page_images(doc, page_id)
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| PdfError::ImageExtraction(format!("no image found on page {}", number)))?;

        let (width, height) = image.dimensions();
        let target_width = media_box_width(doc, page_id)
            .map(|points| (points / POINTS_PER_INCH * dpi as f32).round() as u32)
            .unwrap_or(width);
        let (new_width, new_height) =
            calculate_dimensions(width, height, target_width, self.max_image_size);

        trace!(
            "Page {}: {}x{} image scaled to {}x{} for {} DPI",
            number, width, height, new_width, new_height, dpi
        );

        if (new_width, new_height) == (width, height) {
            Ok(image)
        } else {
            Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
        }
    }

    /// Decode every image XObject referenced by a page.
    fn page_images(&self, doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let resources = match inherited_attribute(doc, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict,
            _ => return images,
        };

        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                for (name, obj_ref) in xobj_dict.iter() {
                    if let Ok((_, obj)) = doc.dereference(obj_ref) {
                        match decode_image_object(doc, obj) {
                            Some(img) => images.push(img),
                            None => trace!("Skipping XObject {}", String::from_utf8_lossy(name)),
                        }
                    }
                }
            }
        }

        images
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdfExtractor {
    fn rasterize(&self, data: &[u8], dpi: u32) -> Result<Vec<RasterPage>> {
        let doc = self.load(data)?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let limit = match self.max_pages {
            0 => pages.len(),
            max => max.min(pages.len()),
        };
        if limit < pages.len() {
            warn!("PDF has {} pages, only the first {} will be processed", pages.len(), limit);
        }

        debug!("Rasterizing {} pages at {} DPI", limit, dpi);

        Ok(pages
            .iter()
            .take(limit)
            .map(|(&number, &page_id)| RasterPage {
                number,
                image: self.render_page(&doc, number, page_id, dpi),
            })
            .collect())
    }
}

/// Look up a page attribute, walking up the page tree for inherited values.
fn inherited_attribute(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(node_id);
    // Page trees are shallow; the bound only guards against reference cycles.
    let mut depth = 0;

    while let Some(id) = current {
        if depth > 32 {
            return None;
        }
        depth += 1;

        let dict = match doc.get_object(id).ok()? {
            Object::Dictionary(dict) => dict,
            _ => return None,
        };

        if let Ok(value) = dict.get(key) {
            if let Ok((_, resolved)) = doc.dereference(value) {
                return Some(resolved.clone());
            }
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => Some(*parent_id),
            _ => None,
        };
    }

    None
}

/// Width of the page MediaBox in points.
fn media_box_width(doc: &Document, page_id: ObjectId) -> Option<f32> {
    match inherited_attribute(doc, page_id, b"MediaBox")? {
        Object::Array(values) if values.len() == 4 => {
            let x0 = number(doc, &values[0])?;
            let x1 = number(doc, &values[2])?;
            let width = (x1 - x0).abs();
            (width > 0.0).then_some(width)
        }
        _ => None,
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match doc.dereference(obj).ok()?.1 {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Scale `(width, height)` to `target_width`, keeping aspect ratio and
/// capping the longer side at `max_size`.
fn calculate_dimensions(width: u32, height: u32, target_width: u32, max_size: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let mut scale = target_width.max(1) as f32 / width as f32;
    let longer = width.max(height) as f32 * scale;
    if longer > max_size as f32 {
        scale = max_size as f32 / width.max(height) as f32;
    }

    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    // Avoid resampling for rounding noise.
    if new_width.abs_diff(width) <= 1 && new_height.abs_diff(height) <= 1 {
        return (width, height);
    }

    (new_width, new_height)
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let stream = match obj {
        Object::Stream(stream) => stream,
        _ => return None,
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.clone()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
            Object::Reference(r) => doc
                .get_object(*r)
                .ok()
                .and_then(|o| match o {
                    Object::Name(name) => Some(name.clone()),
                    Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                    _ => None,
                }),
            _ => None,
        })
        .unwrap_or_else(|| b"DeviceGray".to_vec());

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8) as u8;

    decode_raw(&data, width, height, &color_space, bits)
}

fn decode_raw(data: &[u8], width: u32, height: u32, color_space: &[u8], bits: u8) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;

    match (bits, color_space) {
        (1, _) => {
            // Bilevel scans: rows are padded to a byte boundary, 0 is black.
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return None;
            }
            let mut gray = Vec::with_capacity(pixels);
            for row in data.chunks(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    gray.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, gray).map(DynamicImage::ImageLuma8)
        }
        (8, b"DeviceRGB") | (8, b"RGB") | (8, b"CalRGB") if data.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        (8, b"DeviceGray") | (8, b"G") | (8, b"CalGray") if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        // ICC-based and other spaces: infer the component count from the data.
        (8, _) if data.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        (8, _) if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode image: data_len={}, {}x{}, colorspace={}, bits={}",
                data.len(),
                width,
                height,
                String::from_utf8_lossy(color_space),
                bits
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Build a PDF whose pages each carry one raw grey image; `None` makes an
    /// image-less page.
    fn scanned_pdf(pages: &[Option<(u32, u32)>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();

        for page in pages {
            let resources = match page {
                Some((w, h)) => {
                    let stream = Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => *w as i64,
                            "Height" => *h as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        vec![200u8; (*w * *h) as usize],
                    );
                    let image_id = doc.add_object(stream);
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } }
                }
                None => dictionary! {},
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 72.into(), 144.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_rasterize_scales_to_dpi() {
        // MediaBox is one inch wide, inherited from the page tree.
        let data = scanned_pdf(&[Some((50, 100))]);
        let pages = PdfExtractor::new().rasterize(&data, 200).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        let image = pages[0].image.as_ref().unwrap();
        assert_eq!(image.dimensions(), (200, 400));
    }

    #[test]
    fn test_page_without_image_keeps_its_slot() {
        let data = scanned_pdf(&[Some((72, 144)), None, Some((72, 144))]);
        let pages = PdfExtractor::new().rasterize(&data, 72).unwrap();

        let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[0].image.is_ok());
        assert!(matches!(pages[1].image, Err(PdfError::ImageExtraction(_))));
        assert!(pages[2].image.is_ok());
    }

    #[test]
    fn test_max_pages() {
        let data = scanned_pdf(&[Some((10, 10)), Some((10, 10)), Some((10, 10))]);
        let pages = PdfExtractor::new().with_max_pages(2).rasterize(&data, 72).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = PdfExtractor::new().rasterize(b"definitely not a pdf", 200);
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_calculate_dimensions() {
        assert_eq!(calculate_dimensions(100, 200, 300, 4096), (300, 600));
        assert_eq!(calculate_dimensions(1000, 2000, 3000, 4096), (2048, 4096));
        assert_eq!(calculate_dimensions(500, 300, 501, 4096), (500, 300));
    }

    #[test]
    fn test_decode_bilevel() {
        // Two rows of 10 pixels, padded to 2 bytes each.
        let data = [0b1010_0000, 0b0000_0000, 0b1111_1111, 0b1100_0000];
        let image = decode_raw(&data, 10, 2, b"DeviceGray", 1).unwrap().to_luma8();

        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(1, 0)[0], 0);
        assert_eq!(image.get_pixel(9, 1)[0], 255);
    }
}
