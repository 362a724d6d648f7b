//! Application state for the Actix-web server
//!
//! `AppState` is wrapped in `web::Data` and shared by every handler. The
//! pipeline holds its own clients, so nothing here needs a lock.

use crate::config::Config;
use crate::metrics::MetricsTracker;
use crate::pipeline::Pipeline;
use std::path::PathBuf;

/// Shared application state for Actix-web handlers
pub struct AppState {
    /// Export pipeline with its HTTP, OCR and translation clients
    pub pipeline: Pipeline,
    /// Metrics tracker shared with the pipeline
    pub metrics: MetricsTracker,
    /// Canonical output root; downloads are restricted to files below it
    pub output_root: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> std::io::Result<Self> {
        let output_dir = pipeline.config().output_dir.clone();
        std::fs::create_dir_all(&output_dir)?;
        let output_root = output_dir.canonicalize()?;
        Ok(Self {
            metrics: pipeline.metrics().clone(),
            pipeline,
            output_root,
        })
    }

    pub fn config(&self) -> &Config {
        self.pipeline.config()
    }
}
