//! Request shell: runs locate → fetch → transcribe → assemble per chapter,
//! then bundles every artifact that was produced.

use crate::browser_client::PageRenderer;
use crate::config::Config;
use crate::document::{build_cbz, build_pdf};
use crate::downloader::ImageFetcher;
use crate::helpers::{
    build_comicinfo, chapter_artifact_stem, chapter_dir_name, chapter_url, series_url_of_chapter,
    title_from_url,
};
use crate::http_client::PageFetcher;
use crate::metrics::MetricsTracker;
use crate::models::{ChapterArtifacts, ChapterJob, ChapterReport, ChapterStatus, ExportResult};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::packager::{bundle, PackageError};
use crate::scraper::ImageLocator;
use crate::transcriber::Transcriber;
use crate::translate::{GoogleTranslator, Translator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid chapter range {start}..{end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("failed to create session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write export bundle: {0}")]
    Bundle(#[from] PackageError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    ocr: Arc<dyn OcrEngine>,
    translator: Arc<dyn Translator>,
    metrics: MetricsTracker,
}

impl Pipeline {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
        ocr: Arc<dyn OcrEngine>,
        translator: Arc<dyn Translator>,
        metrics: MetricsTracker,
    ) -> Self {
        Self {
            config,
            fetcher,
            renderer,
            ocr,
            translator,
            metrics,
        }
    }

    /// Pipeline wired to the real network clients, Tesseract and Google Translate
    pub fn from_config(config: Config, metrics: MetricsTracker) -> Result<Self, PipelineError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(config.http.create_http_client()?);
        let renderer = config
            .browser
            .create_browser_client()
            .map(|b| Arc::new(b) as Arc<dyn PageRenderer>);
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(config.ocr.tesseract_cmd.clone()));
        let translator: Arc<dyn Translator> =
            Arc::new(GoogleTranslator::from_config(&config.translation)?);
        Ok(Self::new(config, fetcher, renderer, ocr, translator, metrics))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    /// Process every chapter of `job` in ascending order and write the export bundle.
    ///
    /// Chapter-level failures are reported in the result; only set-up and
    /// bundle errors are returned as `Err`.
    pub async fn run(&self, job: &ChapterJob) -> Result<ExportResult, PipelineError> {
        if job.end < job.start {
            return Err(PipelineError::InvalidRange {
                start: job.start,
                end: job.end,
            });
        }

        // A single chapter submitted by its own URL is scraped as-is
        let suffix = &self.config.locator.chapter_suffix;
        let series_url = if job.start == job.end && !job.base_url.contains("{chapter}") {
            series_url_of_chapter(&job.base_url, suffix)
        } else {
            None
        };
        let direct = series_url.is_some();
        let title = title_from_url(series_url.as_deref().unwrap_or(&job.base_url));
        let session_dir = self
            .config
            .output_dir
            .join(format!("{}_{}", title, job.session));
        std::fs::create_dir_all(&session_dir).map_err(|source| PipelineError::SessionDir {
            path: session_dir.clone(),
            source,
        })?;
        log::info!(
            "Session {} started: {} chapters {}-{} ({} -> {})",
            job.session,
            title,
            job.start,
            job.end,
            job.source_lang,
            job.target_lang
        );

        let mut chapters = Vec::new();
        let mut artifact_paths = Vec::new();
        for chapter in job.chapters() {
            let started = Instant::now();
            let url = if direct {
                job.base_url.clone()
            } else {
                chapter_url(&job.base_url, chapter, suffix)
            };
            let report = self
                .process_chapter(job, &title, &session_dir, chapter, url)
                .await;
            match (&report.status, &report.artifacts) {
                (ChapterStatus::Completed, Some(artifacts)) => {
                    self.metrics.record_success("chapter", started.elapsed());
                    artifact_paths.push(artifacts.pdf.clone());
                    artifact_paths.push(artifacts.cbz.clone());
                }
                (status, _) => {
                    log::warn!("Chapter {} produced no artifacts: {:?}", chapter, status);
                    self.metrics
                        .record_failure("chapter", format!("chapter {}: {:?}", chapter, status));
                }
            }
            chapters.push(report);
        }

        let bundle_path = session_dir.join(format!("{}_{}_export.zip", title, job.session));
        bundle(&artifact_paths, &bundle_path)?;

        let failed_chapters = chapters
            .iter()
            .filter(|c| c.artifacts.is_none())
            .map(|c| c.chapter)
            .collect::<Vec<_>>();
        log::info!(
            "Session {} finished: {} of {} chapter(s) exported to {}",
            job.session,
            chapters.len() - failed_chapters.len(),
            chapters.len(),
            bundle_path.display()
        );

        Ok(ExportResult {
            session: job.session.clone(),
            title,
            bundle: bundle_path,
            chapters,
            failed_chapters,
        })
    }

    async fn process_chapter(
        &self,
        job: &ChapterJob,
        title: &str,
        session_dir: &Path,
        chapter: u32,
        url: String,
    ) -> ChapterReport {
        let mut report = ChapterReport {
            chapter,
            url: url.clone(),
            status: ChapterStatus::NoImages,
            images_located: 0,
            images_saved: 0,
            ocr_failures: 0,
            translation_failures: 0,
            artifacts: None,
        };
        log::info!("Chapter {}: {}", chapter, url);

        let image_dir = session_dir.join(chapter_dir_name(chapter));
        if let Err(e) = std::fs::create_dir_all(&image_dir) {
            report.status = ChapterStatus::Failed(format!("create {}: {}", image_dir.display(), e));
            return report;
        }

        // Locate
        let started = Instant::now();
        let locator = ImageLocator::new(
            self.fetcher.as_ref(),
            self.renderer.as_deref(),
            self.config.browser.wait_selector.clone(),
            self.config.locator.max_images,
        );
        let located = locator.locate(&url).await;
        report.images_located = located.count();
        if let Some(err) = located.page_error {
            self.metrics.record_failure("locate", err.clone());
            report.status = ChapterStatus::Failed(err);
            return report;
        }
        if located.urls.is_empty() {
            self.metrics
                .record_failure("locate", format!("no images on {}", url));
            return report;
        }
        self.metrics.record_success("locate", started.elapsed());

        // Fetch
        let started = Instant::now();
        let fetched = ImageFetcher::new(self.fetcher.as_ref())
            .fetch_all(&located.urls, &image_dir, &url)
            .await;
        for failure in &fetched.failures {
            self.metrics.record_failure("fetch", failure.reason.clone());
        }
        report.images_saved = fetched.saved.len();
        if fetched.saved.is_empty() {
            return report;
        }
        self.metrics.record_success("fetch", started.elapsed());

        // Transcribe
        let transcriber = Transcriber::new(self.ocr.as_ref(), self.translator.as_ref())
            .with_metrics(&self.metrics);
        let transcriptions = match transcriber
            .transcribe_dir(&image_dir, &job.source_lang, &job.target_lang)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                report.status = ChapterStatus::Failed(format!("list {}: {}", image_dir.display(), e));
                return report;
            }
        };
        report.ocr_failures = transcriptions.iter().filter(|t| t.ocr.is_failed()).count();
        report.translation_failures = transcriptions
            .iter()
            .filter(|t| t.translation.is_failed())
            .count();

        // Assemble
        let stem = chapter_artifact_stem(title, chapter);
        let pdf = session_dir.join(format!("{}.pdf", stem));
        let cbz = session_dir.join(format!("{}.cbz", stem));
        let comicinfo = build_comicinfo(
            title,
            chapter,
            transcriptions.len(),
            Some(job.target_lang.as_str()),
        );
        let assembled = build_pdf(&transcriptions, &pdf)
            .and_then(|_| build_cbz(&image_dir, &cbz, Some(&comicinfo)));
        match assembled {
            Ok(_) => {
                report.status = ChapterStatus::Completed;
                report.artifacts = Some(ChapterArtifacts { pdf, cbz });
            }
            Err(e) => {
                log::error!("Chapter {} assembly failed: {}", chapter, e);
                report.status = ChapterStatus::Failed(e.to_string());
            }
        }
        report
    }
}
