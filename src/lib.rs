// Library interface for rust_manga_translator
// The server binary, the debug tool and the integration tests all build on these modules

pub mod app_state;
pub mod browser_client;
pub mod config;
pub mod debug;
pub mod document;
pub mod downloader;
pub mod helpers;
pub mod http_client;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod ocr;
pub mod packager;
pub mod pipeline;
pub mod scraper;
pub mod server;
pub mod transcriber;
pub mod translate;
