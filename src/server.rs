//! HTTP routes: form page, export processing, bundle download and metrics

use crate::app_state::AppState;
use crate::helpers::new_session_id;
use crate::models::{ChapterJob, ExportResult};
use crate::pipeline::PipelineError;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const NOT_FOUND_BODY: &str = "file not found";

fn default_src() -> String {
    "auto".to_string()
}
fn default_tgt() -> String {
    "de".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProcessForm {
    pub url: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_tgt")]
    pub tgt: String,
}

/// Chapter number of a form field; missing or blank means 1
fn parse_chapter(field: &str, value: Option<&str>) -> Result<u32, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(1),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| format!("{} must be a chapter number, got {:?}", field, v)),
    }
}

impl ProcessForm {
    /// Job for this form; blank chapter fields fall back to 1, blank languages to `auto`/`de`
    pub fn into_job(self, session: String) -> Result<ChapterJob, String> {
        let start = parse_chapter("start", self.start.as_deref())?;
        let end = parse_chapter("end", self.end.as_deref())?;
        if end < start {
            return Err("end chapter must not be before start chapter".to_string());
        }
        let or_default = |v: String, d: fn() -> String| {
            if v.trim().is_empty() {
                d()
            } else {
                v.trim().to_string()
            }
        };
        Ok(ChapterJob {
            base_url: self.url.trim().to_string(),
            start,
            end,
            source_lang: or_default(self.src, default_src),
            target_lang: or_default(self.tgt, default_tgt),
            session,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

fn render_page(result_html: &str) -> String {
    INDEX_TEMPLATE.replace("{{RESULT}}", result_html)
}

fn wants_json(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

/// `/download?path=...` link for a bundle path
pub fn download_link(bundle: &Path) -> String {
    let path = bundle.to_string_lossy();
    match Url::parse_with_params("http://localhost/download", &[("path", path.as_ref())]) {
        Ok(url) => format!("/download?{}", url.query().unwrap_or_default()),
        Err(_) => "/download".to_string(),
    }
}

fn result_html(result: &ExportResult) -> String {
    let link = download_link(&result.bundle);
    let mut html = format!(
        "<div class=\"result\"><p>Export for <strong>{}</strong> ready: <a href=\"{}\">download zip</a></p>",
        html_escape::encode_text(&result.title),
        html_escape::encode_double_quoted_attribute(&link),
    );
    if !result.failed_chapters.is_empty() {
        let failed = result
            .failed_chapters
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        html.push_str(&format!(
            "<p class=\"failed\">Chapters without output: {}</p>",
            html_escape::encode_text(&failed)
        ));
    }
    html.push_str("</div>");
    html
}

fn error_html(message: &str) -> String {
    format!(
        "<div class=\"result failed\"><p>{}</p></div>",
        html_escape::encode_text(message)
    )
}

fn bad_request(req: &HttpRequest, message: &str) -> HttpResponse {
    if wants_json(req) {
        HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
    } else {
        HttpResponse::BadRequest()
            .content_type("text/html; charset=utf-8")
            .body(render_page(&error_html(message)))
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(""))
}

#[post("/process")]
async fn process(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Form<ProcessForm>,
) -> impl Responder {
    let form = form.into_inner();
    if Url::parse(form.url.trim())
        .map(|u| u.scheme() != "http" && u.scheme() != "https")
        .unwrap_or(true)
    {
        return bad_request(&req, "url must be an absolute http(s) URL");
    }
    let job = match form.into_job(new_session_id()) {
        Ok(job) => job,
        Err(message) => return bad_request(&req, &message),
    };
    info!(
        "Processing {} chapters {}-{} as session {}",
        job.base_url, job.start, job.end, job.session
    );

    match data.pipeline.run(&job).await {
        Ok(result) => {
            if wants_json(&req) {
                HttpResponse::Ok().json(serde_json::json!({
                    "zip": result.bundle,
                    "download": download_link(&result.bundle),
                    "session": result.session,
                    "title": result.title,
                    "chapters": result.chapters,
                    "failed_chapters": result.failed_chapters,
                }))
            } else {
                HttpResponse::Ok()
                    .content_type("text/html; charset=utf-8")
                    .body(render_page(&result_html(&result)))
            }
        }
        Err(e @ PipelineError::InvalidRange { .. }) => bad_request(&req, &e.to_string()),
        Err(e) => {
            error!("Session {} failed: {}", job.session, e);
            if wants_json(&req) {
                HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
            } else {
                HttpResponse::InternalServerError()
                    .content_type("text/html; charset=utf-8")
                    .body(render_page(&error_html("Export failed, see server log")))
            }
        }
    }
}

/// Resolve a requested path to an existing file inside `root`.
/// Relative paths are tried against the working directory, then against `root`.
pub fn resolve_download(root: &Path, requested: &str) -> Option<PathBuf> {
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }
    let candidates = [
        PathBuf::from(requested),
        root.join(requested.trim_start_matches('/')),
    ];
    candidates
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .find(|p| p.starts_with(root) && p.is_file())
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body(NOT_FOUND_BODY)
}

async fn send_bundle(data: &AppState, requested: Option<&str>) -> HttpResponse {
    let Some(path) = requested.and_then(|r| resolve_download(&data.output_root, r)) else {
        info!("Download of {:?} refused: not found", requested);
        return not_found();
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "export.zip".to_string());
    match tokio::fs::read(&path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ))
            .body(bytes),
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            not_found()
        }
    }
}

#[get("/download")]
async fn download_by_query(
    data: web::Data<AppState>,
    query: web::Query<DownloadQuery>,
) -> impl Responder {
    send_bundle(&data, query.path.as_deref()).await
}

#[get("/download/{path:.*}")]
async fn download_by_path(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    send_bundle(&data, Some(path.as_str())).await
}

#[get("/metrics")]
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let summary = data.metrics.summary();

    let stages: Vec<serde_json::Value> = summary
        .stages
        .iter()
        .map(|m| {
            serde_json::json!({
                "stage": m.stage,
                "success_rate": format!("{:.2}%", m.success_rate()),
                "total_requests": m.total_requests,
                "successful_requests": m.successful_requests,
                "failed_requests": m.failed_requests,
                "average_duration_ms": format!("{:.2}", m.average_duration_ms),
                "timeout_count": m.timeout_count,
                "last_success": m.last_success,
                "last_failure": m.last_failure,
                "last_error": m.last_error,
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "metrics": stages,
        "total_failures": summary.total_failures,
    }))
}

/// Register every route on an actix `App`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(process)
        .service(download_by_query)
        .service(download_by_path)
        .service(get_metrics);
}
