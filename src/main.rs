use actix_web::{web, App, HttpServer};
use log::{error, info};
use rust_manga_translator::app_state::AppState;
use rust_manga_translator::config::Config;
use rust_manga_translator::logging;
use rust_manga_translator::metrics::MetricsTracker;
use rust_manga_translator::pipeline::Pipeline;
use rust_manga_translator::server;
use std::path::Path;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    logging::init(Path::new("log4rs.yml"));

    let cfg = Config::load();
    info!("Configuration:");
    info!("  Output dir: {}", cfg.output_dir.display());
    info!("  Listen: {}", cfg.bind_addr());
    info!("  HTTP timeout: {}s, max retries: {}", cfg.http.timeout_secs, cfg.http.max_retries);
    info!("  Browser enabled: {}", cfg.browser.enabled);
    info!("  Image cap per chapter: {}", cfg.locator.max_images);
    info!("  Tesseract: {}", cfg.ocr.tesseract_cmd);
    info!("  Translation endpoint: {}", cfg.translation.endpoint);

    let addr = cfg.bind_addr();
    let pipeline = match Pipeline::from_config(cfg, MetricsTracker::new()) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to set up pipeline: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    let data = web::Data::new(AppState::new(pipeline)?);

    info!("Starting server on http://{}", addr);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(server::configure)
    })
    .bind(&addr)?
    .run()
    .await
}
