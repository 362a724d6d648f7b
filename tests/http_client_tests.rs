/// HTTP client tests against a local actix server
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use rust_manga_translator::http_client::{EnhancedHttpClient, FetchError, HttpClientConfig, PageFetcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn fast_config() -> HttpClientConfig {
    HttpClientConfig {
        timeout: Duration::from_secs(5),
        max_retries: 2,
        initial_retry_delay_ms: 10,
        max_retry_delay_ms: 20,
        enable_cookies: true,
        enable_gzip: true,
    }
}

/// Start a throwaway server and return its base URL
fn serve() -> String {
    let flaky_hits = web::Data::new(AtomicUsize::new(0));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(flaky_hits.clone())
            .route(
                "/page",
                web::get().to(|| async {
                    HttpResponse::Ok()
                        .content_type("text/html")
                        .body("<html><img src=\"https://cdn.example.com/1.png\"></html>")
                }),
            )
            .route("/empty", web::get().to(|| async { HttpResponse::Ok().finish() }))
            .route(
                "/referer",
                web::get().to(|req: HttpRequest| async move {
                    let referer = req
                        .headers()
                        .get("referer")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string();
                    HttpResponse::Ok().body(referer)
                }),
            )
            .route(
                "/flaky",
                web::get().to(|hits: web::Data<AtomicUsize>| async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                        HttpResponse::ServiceUnavailable().finish()
                    } else {
                        HttpResponse::Ok().body("recovered")
                    }
                }),
            )
            .route(
                "/always-503",
                web::get().to(|| async { HttpResponse::ServiceUnavailable().finish() }),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_client_creation() {
    assert!(EnhancedHttpClient::new().is_ok(), "Failed to create HTTP client");
    assert!(
        EnhancedHttpClient::with_config(fast_config()).is_ok(),
        "Failed to create HTTP client with custom config"
    );
}

#[actix_web::test]
async fn test_fetch_html() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    let html = client.fetch_html(&format!("{}/page", base)).await.unwrap();
    assert!(html.contains("1.png"));
}

#[actix_web::test]
async fn test_missing_page_is_status_error() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    match client.fetch_html(&format!("{}/nope", base)).await {
        Err(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected 404, got {:?}", other.map(|s| s.len())),
    }
}

#[actix_web::test]
async fn test_retry_recovers_from_503() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    let body = client.fetch_html(&format!("{}/flaky", base)).await.unwrap();
    assert_eq!(body, "recovered");
}

#[actix_web::test]
async fn test_retries_exhausted() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    let response = client
        .get_with_retry(&format!("{}/always-503", base), None)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
}

#[actix_web::test]
async fn test_empty_image_body_is_an_error() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    let err = client.fetch_bytes(&format!("{}/empty", base), None).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyBody(_)));
}

#[actix_web::test]
async fn test_referer_is_sent() {
    let base = serve();
    let client = EnhancedHttpClient::with_config(fast_config()).unwrap();
    let bytes = client
        .fetch_bytes(&format!("{}/referer", base), Some("https://example.com"))
        .await
        .unwrap();
    assert_eq!(bytes, b"https://example.com");
}

#[tokio::test]
async fn test_connection_refused_is_request_error() {
    let config = HttpClientConfig {
        max_retries: 0,
        ..fast_config()
    };
    let client = EnhancedHttpClient::with_config(config).unwrap();
    let err = client.fetch_html("http://127.0.0.1:9/").await.unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}
