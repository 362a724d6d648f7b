//! Page Transcriber: OCR then translation, one image at a time
//!
//! Each image is handled independently. A failed OCR run yields
//! `StageOutcome::Failed` for that image only and skips its translation; a
//! failed translation is recorded as such and rendered with the placeholder.

use crate::helpers::is_image_file_name;
use crate::metrics::MetricsTracker;
use crate::models::{StageOutcome, Transcription};
use crate::ocr::OcrEngine;
use crate::translate::Translator;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Image files in `dir`, sorted by name (zero padding makes that reading order)
pub fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(is_image_file_name)
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

pub struct Transcriber<'a> {
    ocr: &'a dyn OcrEngine,
    translator: &'a dyn Translator,
    metrics: Option<&'a MetricsTracker>,
}

impl<'a> Transcriber<'a> {
    pub fn new(ocr: &'a dyn OcrEngine, translator: &'a dyn Translator) -> Self {
        Self {
            ocr,
            translator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsTracker) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, stage: &str, started: Instant, outcome: &StageOutcome) {
        if let Some(m) = self.metrics {
            match outcome {
                StageOutcome::Failed(e) => m.record_failure(stage, e.clone()),
                StageOutcome::Skipped => {}
                _ => m.record_success(stage, started.elapsed()),
            }
        }
    }

    pub async fn transcribe_image(&self, image: &Path, source: &str, target: &str) -> Transcription {
        let filename = image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let started = Instant::now();
        let ocr = match self.ocr.recognize(image, source).await {
            Ok(text) => StageOutcome::from_text(text),
            Err(e) => {
                log::warn!("OCR failed for {}: {}", filename, e);
                StageOutcome::Failed(e.to_string())
            }
        };
        self.record("ocr", started, &ocr);

        let translation = match ocr.text() {
            Some(text) => {
                let started = Instant::now();
                let outcome = match self.translator.translate(text, source, target).await {
                    Ok(t) => StageOutcome::from_text(t),
                    Err(e) => {
                        log::warn!(
                            "Translation via {} failed for {}: {}",
                            self.translator.name(),
                            filename,
                            e
                        );
                        StageOutcome::Failed(e.to_string())
                    }
                };
                self.record("translate", started, &outcome);
                outcome
            }
            None => StageOutcome::Skipped,
        };

        Transcription {
            filename,
            ocr,
            translation,
        }
    }

    /// One transcription per image in `dir`, in file name order
    pub async fn transcribe_dir(
        &self,
        dir: &Path,
        source: &str,
        target: &str,
    ) -> std::io::Result<Vec<Transcription>> {
        let images = list_images(dir)?;
        let mut out = Vec::with_capacity(images.len());
        for image in &images {
            out.push(self.transcribe_image(image, source, target).await);
        }
        Ok(out)
    }
}
