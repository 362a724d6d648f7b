//! Diagnostics for one chapter image directory
//!
//! Lists the images with size, colour mode and dimensions, runs OCR and
//! translation on the first one, and writes `debug_preview.pdf` and
//! `debug_summary.txt` next to the images.

use crate::document::{body_lines, write_pdf, DocumentError, PdfPage};
use crate::models::TRANSLATION_FAILED_PLACEHOLDER;
use crate::ocr::OcrEngine;
use crate::transcriber::list_images;
use crate::translate::Translator;
use image::ColorType;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Images listed individually in the summary; the rest are only counted
const LISTED_IMAGES: usize = 10;
pub const PREVIEW_FILE: &str = "debug_preview.pdf";
pub const SUMMARY_FILE: &str = "debug_summary.txt";

#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    #[error("directory not found: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageInfo {
    pub name: String,
    pub bytes: Option<u64>,
    pub mode: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub error: Option<String>,
}

impl ImageInfo {
    fn summary_line(&self) -> String {
        match (&self.error, self.bytes, &self.mode, self.dimensions) {
            (None, Some(bytes), Some(mode), Some((w, h))) => {
                format!("  {}: {} bytes, mode={}, dims={}x{}", self.name, bytes, mode, w, h)
            }
            (err, ..) => format!(
                "  {}: ERROR: {}",
                self.name,
                err.as_deref().unwrap_or("unreadable")
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub images: Vec<ImageInfo>,
    pub ocr_text: Option<String>,
    pub translated: Option<String>,
    pub preview: Option<PathBuf>,
    pub summary: PathBuf,
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 | ColorType::L16 => "L".to_string(),
        ColorType::La8 | ColorType::La16 => "LA".to_string(),
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB".to_string(),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA".to_string(),
        other => format!("{:?}", other),
    }
}

fn inspect(path: &Path) -> ImageInfo {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) => {
            return ImageInfo {
                name,
                bytes: None,
                mode: None,
                dimensions: None,
                error: Some(e.to_string()),
            }
        }
    };
    match image::open(path) {
        Ok(img) => ImageInfo {
            name,
            bytes: Some(bytes),
            mode: Some(color_mode(img.color())),
            dimensions: Some((img.width(), img.height())),
            error: None,
        },
        Err(e) => ImageInfo {
            name,
            bytes: Some(bytes),
            mode: None,
            dimensions: None,
            error: Some(e.to_string()),
        },
    }
}

/// Sorted image files of `dir` with size, colour mode and dimensions
pub fn inspect_images(dir: &Path) -> Result<Vec<ImageInfo>, DebugError> {
    let images = list_images(dir).map_err(|source| DebugError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(images.iter().map(|p| inspect(p)).collect())
}

fn preview_pages(ocr_text: &str, translated: &str, target: &str) -> Vec<PdfPage> {
    let mut lines = vec!["Original (OCR):".to_string()];
    lines.extend(body_lines(ocr_text));
    lines.push(String::new());
    lines.push(format!("Translated ({}):", target));
    lines.extend(body_lines(translated));
    vec![PdfPage {
        header: "Debug preview: OCR + translation".to_string(),
        lines,
    }]
}

/// Inspect `dir`, OCR and translate its first image, write the preview PDF and summary
pub async fn run_debug(
    dir: &Path,
    ocr: &dyn OcrEngine,
    translator: &dyn Translator,
    source: &str,
    target: &str,
) -> Result<DebugReport, DebugError> {
    if !dir.is_dir() {
        return Err(DebugError::NotADirectory(dir.to_path_buf()));
    }

    let images = inspect_images(dir)?;
    let mut summary = String::new();
    let _ = writeln!(summary, "Debug for directory: {}\n", dir.display());
    let _ = writeln!(summary, "1. Images found:");
    if images.is_empty() {
        let _ = writeln!(summary, "  No image files found.");
    }
    for info in images.iter().take(LISTED_IMAGES) {
        let _ = writeln!(summary, "{}", info.summary_line());
    }
    if images.len() > LISTED_IMAGES {
        let _ = writeln!(summary, "  ... {} more image(s)", images.len() - LISTED_IMAGES);
    }

    let mut report = DebugReport {
        images,
        ocr_text: None,
        translated: None,
        preview: None,
        summary: dir.join(SUMMARY_FILE),
    };

    if let Some(first) = report.images.first() {
        let first_path = dir.join(&first.name);
        let ocr_text = match ocr.recognize(&first_path, source).await {
            Ok(text) => text,
            Err(e) => format!("[OCR ERROR] {}", e),
        };
        let _ = writeln!(summary, "\n2. OCR on {}:\n{}", first.name, ocr_text);

        let translated = if ocr_text.trim().is_empty() {
            String::new()
        } else {
            match translator.translate(&ocr_text, source, target).await {
                Ok(t) => t,
                Err(e) => format!("{} {}", TRANSLATION_FAILED_PLACEHOLDER, e),
            }
        };
        let _ = writeln!(summary, "\n3. Translation ({}):\n{}", target, translated);

        let preview = dir.join(PREVIEW_FILE);
        write_pdf(&preview_pages(&ocr_text, &translated, target), &preview)?;
        let _ = writeln!(summary, "\n4. Preview PDF written: {}", preview.display());

        report.ocr_text = Some(ocr_text);
        report.translated = Some(translated);
        report.preview = Some(preview);
    } else {
        let _ = writeln!(summary, "No OCR or translation possible without images.");
    }

    std::fs::write(&report.summary, summary).map_err(|source| DebugError::Io {
        path: report.summary.clone(),
        source,
    })?;
    log::info!("Summary saved to {}", report.summary.display());
    Ok(report)
}
