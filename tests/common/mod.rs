//! Stub seams shared by the integration tests: no network, no Tesseract, no Chrome
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use reqwest::StatusCode;
use rust_manga_translator::config::Config;
use rust_manga_translator::http_client::{FetchError, PageFetcher};
use rust_manga_translator::metrics::MetricsTracker;
use rust_manga_translator::ocr::{OcrEngine, OcrError};
use rust_manga_translator::pipeline::Pipeline;
use rust_manga_translator::translate::{TranslateError, Translator};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

pub fn png(seed: u8) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(3, 2, Rgb([seed, 0, 0])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serves fixed pages and image bytes by exact URL; everything else is a 404
#[derive(Default)]
pub struct StubSite {
    pages: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
}

impl StubSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND,
        }
    }
}

#[async_trait]
impl PageFetcher for StubSite {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_bytes(&self, url: &str, _referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        self.images.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }
}

/// "OCR" that reports the image file name
pub struct NameOcr;

#[async_trait]
impl OcrEngine for NameOcr {
    async fn recognize(&self, image: &Path, _lang: &str) -> Result<String, OcrError> {
        let name = image.file_name().unwrap().to_string_lossy().to_string();
        Ok(format!("text of {}", name))
    }
}

pub struct UpperTranslator;

#[async_trait]
impl Translator for UpperTranslator {
    fn name(&self) -> &str {
        "upper"
    }

    async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        Ok(text.to_uppercase())
    }
}

pub fn img_tags(urls: &[&str]) -> String {
    let tags: String = urls
        .iter()
        .map(|u| format!("<img class=\"img-fluid\" src=\"{}\">", u))
        .collect();
    format!("<html><body><div class=\"reader\">{}</div></body></html>", tags)
}

pub fn pipeline(output_dir: &Path, site: StubSite) -> Pipeline {
    let mut config = Config::default();
    config.output_dir = output_dir.to_path_buf();
    Pipeline::new(
        config,
        Arc::new(site),
        None,
        Arc::new(NameOcr),
        Arc::new(UpperTranslator),
        MetricsTracker::new(),
    )
}
