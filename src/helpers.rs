//! Naming helpers shared by the pipeline stages
//!
//! - Filename sanitising and title derivation from series URLs
//! - Chapter URL construction and zero-padded artifact names
//! - XML generation for ComicInfo.xml
//!
//! # Examples
//!
//! ```
//! use rust_manga_translator::helpers::{chapter_url, title_from_url};
//!
//! assert_eq!(title_from_url("https://example.com/series/Foo/"), "Foo");
//! assert_eq!(
//!     chapter_url("https://example.com/series/Foo", 3, "chapter-{chapter}"),
//!     "https://example.com/series/Foo/chapter-3"
//! );
//! ```

use regex::Regex;
use reqwest::Url;

/// Replace characters that are not allowed in file names
pub fn sanitize_filename(s: &str) -> String {
    s.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
        .trim()
        .to_string()
}

/// Title from the last non-empty path segment of a series URL, `"chapter"` when there is none
pub fn title_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(|s| s.to_string()))
        })
        .unwrap_or_default();
    let segment = segment.replace("%20", " ");
    let title = sanitize_filename(&segment);
    if title.is_empty() {
        "chapter".to_string()
    } else {
        title
    }
}

/// Chapter page URL: fill a `{chapter}` placeholder in `base`, otherwise append `suffix`
pub fn chapter_url(base: &str, chapter: u32, suffix: &str) -> String {
    let n = chapter.to_string();
    if base.contains("{chapter}") {
        return base.replace("{chapter}", &n);
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        suffix.trim_start_matches('/').replace("{chapter}", &n)
    )
}

/// Series URL of a link whose path already ends in the chapter `suffix`,
/// e.g. `.../series/Foo/chapter-5` with `chapter-{chapter}` gives `.../series/Foo`
pub fn series_url_of_chapter(url: &str, suffix: &str) -> Option<String> {
    let suffix = suffix.trim_matches('/');
    if !suffix.contains("{chapter}") {
        return None;
    }
    let pattern = format!(
        r"/{}/?$",
        regex::escape(suffix).replace(r"\{chapter\}", r"\d+")
    );
    let re = Regex::new(&pattern).ok()?;
    let mut parsed = Url::parse(url).ok()?;
    let path = parsed.path().to_string();
    let found = re.find(&path)?;
    parsed.set_path(&path[..found.start()]);
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.as_str().trim_end_matches('/').to_string())
}

/// Scheme and host of a URL, used as the image `Referer`
pub fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| Some(format!("{}://{}", u.scheme(), u.host_str()?)))
}

/// Short per-request identifier used to namespace output paths
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub fn chapter_dir_name(chapter: u32) -> String {
    format!("chapter_{:02}", chapter)
}

/// `<title>_Kapitel<NN>`, shared stem of a chapter's PDF and CBZ
pub fn chapter_artifact_stem(title: &str, chapter: u32) -> String {
    format!("{}_Kapitel{:02}", title, chapter)
}

pub fn image_file_name(sequence: usize, ext: &str) -> String {
    format!("{:03}.{}", sequence, ext)
}

pub fn is_image_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
}

/// Escape XML special characters for ComicInfo.xml
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Build ComicInfo.xml content
pub fn build_comicinfo(series: &str, number: u32, page_count: usize, language: Option<&str>) -> String {
    let mut lines = vec![
        r#"<?xml version="1.0"?>"#.to_string(),
        r#"<ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#.to_string(),
        format!(r#"  <Series>{}</Series>"#, xml_escape(series)),
        format!(r#"  <Number>{}</Number>"#, number),
        format!(r#"  <PageCount>{}</PageCount>"#, page_count),
    ];
    if let Some(lang) = language.filter(|l| !l.is_empty() && *l != "auto") {
        lines.push(format!(r#"  <LanguageISO>{}</LanguageISO>"#, xml_escape(lang)));
    }
    lines.push(r#"</ComicInfo>"#.to_string());
    lines.join("\n")
}
