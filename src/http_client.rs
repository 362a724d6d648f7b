use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

/// User agents to rotate through to avoid bot detection
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("empty response body from {0}")]
    EmptyBody(String),
}

/// Where pages and image bytes come from
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;

    async fn fetch_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError>;
}

/// Configuration for HTTP client with bot detection bypass
#[derive(Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub enable_cookies: bool,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            enable_gzip: true,
        }
    }
}

/// HTTP client with retries and browser-like headers
pub struct EnhancedHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl EnhancedHttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            reqwest::header::HeaderValue::from_static("1"),
        );

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(Self::random_user_agent())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .redirect(reqwest::redirect::Policy::limited(10))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// Exponential backoff with ±25% jitter
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_retry_delay_ms;
        let max_delay = self.config.max_retry_delay_ms;

        let delay_ms = base_delay
            .saturating_mul(2u64.saturating_pow(attempt as u32))
            .min(max_delay);

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status.as_u16(),
            // Rate limiting
            429 |
            // Server errors
            500 | 502 | 503 | 504 |
            // Cloudflare errors
            520..=527
        )
    }

    /// GET `url`, retrying transient failures. Non-retryable statuses are returned as-is.
    pub async fn get_with_retry(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<Response, FetchError> {
        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, Self::random_user_agent());
            if let Some(r) = referer {
                request = request.header(reqwest::header::REFERER, r);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "Received retryable status {} for {}, attempt {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let should_retry = e.is_timeout() || e.is_connect();
                    if should_retry && attempt < self.config.max_retries {
                        log::warn!(
                            "Request failed for {}, attempt {}/{}: {}",
                            url,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Request {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    async fn get_success(&self, url: &str, referer: Option<&str>) -> Result<Response, FetchError> {
        let response = self.get_with_retry(url, referer).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Get the underlying reqwest client for direct access
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for EnhancedHttpClient {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get_success(url, None).await?;
        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })
    }

    async fn fetch_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        let response = self.get_success(url, referer).await?;
        let bytes = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        Ok(bytes.to_vec())
    }
}
