//! Image Fetcher: downloads located images into a chapter directory
//!
//! Files are named by a zero-padded sequence number that only advances on a
//! successful save, so the directory never has gaps and sorts in reading order.

use crate::helpers::{image_file_name, origin_of};
use crate::http_client::{FetchError, PageFetcher};
use crate::models::ImageRecord;
use image::ImageFormat;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unsupported image format {0}")]
    Unsupported(String),

    #[error("could not recognise image data")]
    Unrecognised,

    #[error("image conversion failed: {0}")]
    Convert(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub saved: Vec<ImageRecord>,
    pub failures: Vec<ImageFailure>,
}

/// Normalised bytes and extension: JPEG/PNG unchanged, WEBP re-encoded as JPEG
pub fn normalize_image(bytes: Vec<u8>) -> Result<(Vec<u8>, &'static str), ImageError> {
    let format = image::guess_format(&bytes).map_err(|_| ImageError::Unrecognised)?;
    match format {
        ImageFormat::Jpeg => Ok((bytes, "jpg")),
        ImageFormat::Png => Ok((bytes, "png")),
        ImageFormat::WebP => {
            let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP)?;
            // JPEG has no alpha channel
            let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
            let mut out = Cursor::new(Vec::new());
            rgb.write_to(&mut out, ImageFormat::Jpeg)?;
            Ok((out.into_inner(), "jpg"))
        }
        other => Err(ImageError::Unsupported(format!("{:?}", other))),
    }
}

/// Write one image as `<NNN>.<ext>` under `dir`
pub fn save_image(
    bytes: Vec<u8>,
    dir: &Path,
    sequence: usize,
    source_url: &str,
) -> Result<ImageRecord, ImageError> {
    let (data, ext) = normalize_image(bytes)?;
    let path = dir.join(image_file_name(sequence, ext));
    std::fs::write(&path, &data).map_err(|e| ImageError::Write {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(ImageRecord {
        sequence,
        ext: ext.to_string(),
        path,
        source_url: source_url.to_string(),
    })
}

pub struct ImageFetcher<'a> {
    fetcher: &'a dyn PageFetcher,
}

impl<'a> ImageFetcher<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Download `urls` in order into `dir`; failures are recorded and skipped
    pub async fn fetch_all(&self, urls: &[String], dir: &Path, page_url: &str) -> FetchReport {
        let referer = origin_of(page_url).unwrap_or_else(|| page_url.to_string());
        let mut report = FetchReport::default();
        let mut next_sequence = 1usize;

        for url in urls {
            let result = match self.fetcher.fetch_bytes(url, Some(&referer)).await {
                Ok(bytes) => save_image(bytes, dir, next_sequence, url),
                Err(e) => Err(ImageError::from(e)),
            };
            match result {
                Ok(record) => {
                    log::debug!("Saved {} as {}", url, record.file_name());
                    next_sequence += 1;
                    report.saved.push(record);
                }
                Err(e) => {
                    log::warn!("Skipping image {}: {}", url, e);
                    report.failures.push(ImageFailure {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }
}
