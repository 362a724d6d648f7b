/// HTTP route tests against the actix service with a stubbed pipeline
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use common::{img_tags, png, pipeline, StubSite};
use rust_manga_translator::app_state::AppState;
use rust_manga_translator::server;

fn site() -> StubSite {
    StubSite::new()
        .page(
            "https://example.com/series/Foo/chapter-1",
            &img_tags(&["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"]),
        )
        .image("https://cdn.example.com/a.png", png(1))
        .image("https://cdn.example.com/b.png", png(2))
}

fn state(dir: &std::path::Path) -> web::Data<AppState> {
    web::Data::new(AppState::new(pipeline(&dir.join("output"), site())).unwrap())
}

#[actix_web::test]
async fn test_index_serves_form() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("<form"));
    assert!(html.contains("name=\"url\""));
    assert!(!html.contains("{{RESULT}}"));
}

#[actix_web::test]
async fn test_download_missing_file_is_404_text() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    for uri in [
        "/download?path=output%2Fnope_export.zip",
        "/download",
        "/download/nope/nope_export.zip",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"file not found");
    }
}

#[actix_web::test]
async fn test_download_outside_output_dir_refused() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.zip"), b"PK").unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let target = dir.path().join("secret.zip");
    let uri = server::download_link(&target);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_process_json_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/process")
        .insert_header((header::ACCEPT, "application/json"))
        .set_form([("url", "https://example.com/series/Foo"), ("start", "1"), ("end", "1")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = test::read_body_json(resp).await;
    let zip = json["zip"].as_str().unwrap();
    assert!(zip.ends_with("_export.zip"));
    assert!(zip.contains("Foo_"));
    assert_eq!(json["title"], "Foo");
    assert_eq!(json["failed_chapters"], serde_json::json!([]));

    let download = json["download"].as_str().unwrap();
    let resp = test::call_service(&app, test::TestRequest::get().uri(download).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"PK"));
}

#[actix_web::test]
async fn test_process_html_contains_download_link() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/process")
        .set_form([("url", "https://example.com/series/Foo")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("href=\"/download?path="));
}

#[actix_web::test]
async fn test_process_blank_chapter_fields_default_to_first() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/process")
        .insert_header((header::ACCEPT, "application/json"))
        .set_form([("url", "https://example.com/series/Foo"), ("start", ""), ("end", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["chapters"].as_array().unwrap().len(), 1);
    assert_eq!(json["chapters"][0]["chapter"], 1);
    assert_eq!(json["failed_chapters"], serde_json::json!([]));
}

#[actix_web::test]
async fn test_process_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let backwards = test::TestRequest::post()
        .uri("/process")
        .insert_header((header::ACCEPT, "application/json"))
        .set_form([("url", "https://example.com/series/Foo"), ("start", "3"), ("end", "1")])
        .to_request();
    let resp = test::call_service(&app, backwards).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let not_a_url = test::TestRequest::post()
        .uri("/process")
        .set_form([("url", "series/Foo")])
        .to_request();
    let resp = test::call_service(&app, not_a_url).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let not_a_number = test::TestRequest::post()
        .uri("/process")
        .insert_header((header::ACCEPT, "application/json"))
        .set_form([("url", "https://example.com/series/Foo"), ("start", "one")])
        .to_request();
    let resp = test::call_service(&app, not_a_number).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_metrics_after_export() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(dir.path())).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/process")
        .insert_header((header::ACCEPT, "application/json"))
        .set_form([("url", "https://example.com/series/Foo")])
        .to_request();
    test::call_service(&app, req).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    let stages: Vec<&str> = json["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["stage"].as_str().unwrap())
        .collect();
    assert_eq!(stages, vec!["chapter", "fetch", "locate", "ocr", "translate"]);
    assert_eq!(json["total_failures"], 0);
}
