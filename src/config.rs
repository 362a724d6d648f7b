use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest per-chapter image count whose `NNN` file names still sort in reading order
pub const MAX_IMAGES_LIMIT: usize = 999;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root folder for per-session output directories
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of retry attempts for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial retry delay in milliseconds
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    #[serde(default = "default_true")]
    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Enable the headless render pass (requires Chrome/Chromium)
    #[serde(default = "default_false")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Seconds to wait for the image selector to appear
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,

    /// Selector that marks a rendered chapter page
    #[serde(default = "default_wait_selector")]
    pub wait_selector: String,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocatorConfig {
    /// Hard cap on image URLs collected per chapter
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Appended to the series URL when it has no `{chapter}` placeholder
    #[serde(default = "default_chapter_suffix")]
    pub chapter_suffix: String,
}

impl LocatorConfig {
    fn clamp_max_images(&mut self) {
        if self.max_images > MAX_IMAGES_LIMIT {
            log::warn!(
                "locator.max_images = {} exceeds {}, clamping",
                self.max_images,
                MAX_IMAGES_LIMIT
            );
            self.max_images = MAX_IMAGES_LIMIT;
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_translate_timeout")]
    pub timeout_secs: u64,

    /// Longest text sent in a single request
    #[serde(default = "default_chunk_chars")]
    pub max_chunk_chars: usize,
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 10000 }
fn default_timeout() -> u64 { 30 }
fn default_max_retries() -> usize { 2 }
fn default_initial_retry_delay() -> u64 { 500 }
fn default_max_retry_delay() -> u64 { 8000 }
fn default_browser_timeout() -> u64 { 30 }
fn default_wait_selector() -> String { "img.img-fluid".to_string() }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_max_images() -> usize { 200 }
fn default_chapter_suffix() -> String { "chapter-{chapter}".to_string() }
fn default_tesseract_cmd() -> String { "tesseract".to_string() }
fn default_translate_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}
fn default_translate_timeout() -> u64 { 20 }
fn default_chunk_chars() -> usize { 4500 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: false, // Disabled by default (requires Chrome)
            headless: true,
            timeout_secs: 30,
            wait_selector: default_wait_selector(),
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_images: 200,
            chapter_suffix: default_chapter_suffix(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: default_tesseract_cmd(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translate_endpoint(),
            timeout_secs: 20,
            max_chunk_chars: 4500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            browser: BrowserSettings::default(),
            locator: LocatorConfig::default(),
            ocr: OcrConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, then apply environment overrides
    pub fn load() -> Self {
        let mut cfg = Self::load_file(Path::new("config.toml"));
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg
    }

    fn load_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Invalid {}, using defaults: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}, using defaults: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut cfg = toml::from_str::<Config>(content)?;
        cfg.locator.clamp_max_images();
        Ok(cfg)
    }

    /// Apply `TESSERACT_CMD`, `PORT`, `HOST` and `OUTPUT_DIR` from `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cmd) = lookup("TESSERACT_CMD").filter(|v| !v.trim().is_empty()) {
            self.ocr.tesseract_cmd = cmd;
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => log::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(dir) = lookup("OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl HttpConfig {
    /// Create an enhanced HTTP client from this configuration
    pub fn create_http_client(
        &self,
    ) -> Result<crate::http_client::EnhancedHttpClient, reqwest::Error> {
        use crate::http_client::{EnhancedHttpClient, HttpClientConfig};
        use std::time::Duration;

        let config = HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            initial_retry_delay_ms: self.initial_retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
            enable_cookies: self.enable_cookies,
            enable_gzip: self.enable_compression,
        };

        EnhancedHttpClient::with_config(config)
    }
}

impl BrowserSettings {
    /// Create a browser client from this configuration, `None` when disabled
    pub fn create_browser_client(&self) -> Option<crate::browser_client::BrowserClient> {
        use crate::browser_client::{BrowserClient, BrowserConfig};
        use std::time::Duration;

        if !self.enabled {
            return None;
        }

        let config = BrowserConfig {
            headless: self.headless,
            window_width: self.window_width,
            window_height: self.window_height,
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        };

        Some(BrowserClient::with_config(config))
    }
}
