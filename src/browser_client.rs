use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::time::Duration;

/// Renders pages that only show their images after script execution
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_html(&self, url: &str, wait_selector: &str) -> Result<String, BrowserError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("HTML extraction error: {0}")]
    HtmlExtraction(String),

    #[error("Render task failed: {0}")]
    Join(String),
}

/// Configuration for headless browser
#[derive(Clone, Debug)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            timeout: Duration::from_secs(30),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

/// Launches a fresh headless Chromium for every render.
///
/// Chapters are processed one at a time, so a per-render browser keeps no
/// state between requests and needs no shutdown coordination.
#[derive(Clone)]
pub struct BrowserClient {
    config: BrowserConfig,
}

impl BrowserClient {
    pub fn new() -> Self {
        Self::with_config(BrowserConfig::default())
    }

    pub fn with_config(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn launch_options<'a>(
        config: &BrowserConfig,
        user_agent_arg: Option<&'a str>,
    ) -> Result<LaunchOptions<'a>, BrowserError> {
        let mut args: Vec<&'a OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-setuid-sandbox"),
        ];
        if let Some(ua) = user_agent_arg {
            args.push(OsStr::new(ua));
        }

        LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(config.timeout + Duration::from_secs(30))
            .args(args)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))
    }

    /// Blocking render: navigate, wait for `wait_selector`, scroll for lazy images, return DOM
    fn render_blocking(
        config: &BrowserConfig,
        url: &str,
        wait_selector: &str,
    ) -> Result<String, BrowserError> {
        log::info!("Browser navigating to: {}", url);

        // LaunchOptions borrows its args, so the owned flag must outlive the launch
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));
        let browser = Browser::new(Self::launch_options(config, user_agent_arg.as_deref())?)
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        tab.navigate_to(url)
            .map_err(|e| BrowserError::Navigation(format!("{}: {}", url, e)))?
            .wait_until_navigated()
            .map_err(|e| BrowserError::Navigation(format!("{}: {}", url, e)))?;

        tab.wait_for_element_with_custom_timeout(wait_selector, config.timeout)
            .map_err(|_| BrowserError::Timeout(wait_selector.to_string()))?;

        if let Err(e) = tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false) {
            log::debug!("Scroll failed on {}: {}", url, e);
        }
        std::thread::sleep(Duration::from_millis(500));

        tab.get_content()
            .map_err(|e| BrowserError::HtmlExtraction(e.to_string()))
    }
}

impl Default for BrowserClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for BrowserClient {
    async fn render_html(&self, url: &str, wait_selector: &str) -> Result<String, BrowserError> {
        let config = self.config.clone();
        let url = url.to_string();
        let selector = wait_selector.to_string();
        tokio::task::spawn_blocking(move || Self::render_blocking(&config, &url, &selector))
            .await
            .map_err(|e| BrowserError::Join(e.to_string()))?
    }
}
