//! Image Locator: finds page image URLs on a chapter page
//!
//! Strategies run in a fixed order and the first one that yields at least one
//! URL wins. Every candidate list is deduplicated by exact URL (first
//! occurrence keeps its position) and capped before it is returned.

use crate::browser_client::PageRenderer;
use crate::config::MAX_IMAGES_LIMIT;
use crate::http_client::PageFetcher;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

/// `<img>` attributes in the order they are trusted; lazy loaders keep the real URL in `data-*`
const IMG_ATTRS: &[&str] = &["data-src", "data-lazy-src", "src"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateStrategy {
    /// `<img>` tags of the statically fetched page
    StaticHtml,
    /// Image-extension URLs anywhere in the raw page text
    RegexScan,
    /// `<img>` tags after a headless browser has executed the page scripts
    BrowserRender,
}

pub const DEFAULT_STRATEGIES: &[LocateStrategy] = &[
    LocateStrategy::StaticHtml,
    LocateStrategy::RegexScan,
    LocateStrategy::BrowserRender,
];

/// Outcome of locating images on one chapter page
#[derive(Debug, Clone, Default)]
pub struct Located {
    pub urls: Vec<String>,
    /// Strategy that produced `urls`, `None` when every strategy came up empty
    pub strategy: Option<LocateStrategy>,
    /// Set when the page itself could not be retrieved by any means
    pub page_error: Option<String>,
}

impl Located {
    pub fn count(&self) -> usize {
        self.urls.len()
    }
}

fn image_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^"'\s<>()\\]+?\.(?:jpe?g|png|webp)(?:\?[^"'\s<>()\\]*)?"#)
            .expect("static image URL pattern")
    })
}

fn is_absolute_http(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Absolute HTTP(S) image URLs from `<img>` tags, in document order
pub fn extract_img_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let value = element.value();
        let mut sources = IMG_ATTRS
            .iter()
            .filter_map(|attr| value.attr(attr))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        match sources.clone().find(|v| is_absolute_http(v)) {
            Some(url) => urls.push(url.to_string()),
            None => {
                if let Some(url) = sources.next() {
                    log::debug!("Skipping non-absolute image source {:?}", url);
                }
            }
        }
    }
    urls
}

/// Image-extension URLs found anywhere in `text`, including JSON-escaped ones
pub fn scan_image_urls(text: &str) -> Vec<String> {
    let unescaped = text.replace("\\/", "/");
    image_url_regex()
        .find_iter(&unescaped)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Drop repeated URLs (exact match, first wins) and stop at `cap`
pub fn dedupe_capped<I>(urls: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for url in urls {
        if out.len() >= cap {
            log::warn!("Image cap of {} reached, ignoring remaining candidates", cap);
            break;
        }
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
    out
}

pub struct ImageLocator<'a> {
    fetcher: &'a dyn PageFetcher,
    renderer: Option<&'a dyn PageRenderer>,
    wait_selector: String,
    max_images: usize,
    strategies: Vec<LocateStrategy>,
}

impl<'a> ImageLocator<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        renderer: Option<&'a dyn PageRenderer>,
        wait_selector: impl Into<String>,
        max_images: usize,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            wait_selector: wait_selector.into(),
            max_images: max_images.min(MAX_IMAGES_LIMIT),
            strategies: DEFAULT_STRATEGIES.to_vec(),
        }
    }

    pub fn with_strategies(mut self, strategies: &[LocateStrategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }

    /// Run the strategies in order; never fails, errors end up in `Located::page_error`
    pub async fn locate(&self, chapter_url: &str) -> Located {
        // The static page is fetched at most once and shared by the strategies that need it
        let mut static_page: Option<Result<String, String>> = None;
        let mut errors: Vec<String> = Vec::new();
        let mut rendered = false;

        for strategy in &self.strategies {
            let candidates = match strategy {
                LocateStrategy::StaticHtml | LocateStrategy::RegexScan => {
                    if static_page.is_none() {
                        let fetched = self
                            .fetcher
                            .fetch_html(chapter_url)
                            .await
                            .map_err(|e| e.to_string());
                        if let Err(e) = &fetched {
                            log::warn!("Failed to fetch {}: {}", chapter_url, e);
                            errors.push(e.clone());
                        }
                        static_page = Some(fetched);
                    }
                    match static_page.as_ref() {
                        Some(Ok(html)) if *strategy == LocateStrategy::StaticHtml => {
                            extract_img_urls(html)
                        }
                        Some(Ok(html)) => scan_image_urls(html),
                        _ => continue,
                    }
                }
                LocateStrategy::BrowserRender => {
                    let Some(renderer) = self.renderer else {
                        log::debug!("No browser configured, skipping render pass");
                        continue;
                    };
                    match renderer.render_html(chapter_url, &self.wait_selector).await {
                        Ok(html) => {
                            rendered = true;
                            extract_img_urls(&html)
                        }
                        Err(e) => {
                            log::warn!("Browser render of {} failed: {}", chapter_url, e);
                            errors.push(e.to_string());
                            continue;
                        }
                    }
                }
            };

            let urls = dedupe_capped(candidates, self.max_images);
            log::debug!("{:?} found {} image(s) on {}", strategy, urls.len(), chapter_url);
            if !urls.is_empty() {
                log::info!(
                    "Located {} image(s) on {} via {:?}",
                    urls.len(),
                    chapter_url,
                    strategy
                );
                return Located {
                    urls,
                    strategy: Some(*strategy),
                    page_error: None,
                };
            }
        }

        // Only a page error when no strategy ever obtained the page
        let page_loaded = rendered || matches!(static_page, Some(Ok(_)));
        let page_error = if page_loaded || errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };
        Located {
            urls: Vec::new(),
            strategy: None,
            page_error,
        }
    }
}
