use crate::config::TranslationConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service answered with HTTP {0}")]
    Status(u16),

    #[error("unexpected translation response: {0}")]
    Malformed(String),
}

/// Machine translation backend
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text`; `source` may be `auto`
    async fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, TranslateError>;
}

/// Split on line boundaries into chunks of at most `max_chars` characters.
/// A single line longer than the limit is cut at character boundaries.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        let line_len = line.chars().count();
        if line_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        // +1 for the joining newline
        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Concatenate the translated segments of a `translate_a/single` response
pub fn parse_gtx_response(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::Malformed("missing segment list".to_string()))?;

    let mut out = String::new();
    for segment in segments {
        if let Some(s) = segment.get(0).and_then(|v| v.as_str()) {
            out.push_str(s);
        }
    }
    Ok(out)
}

/// Client for the public Google Translate `gtx` endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    max_chunk_chars: usize,
}

impl GoogleTranslator {
    pub fn from_config(config: &TranslationConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    async fn translate_chunk(
        &self,
        chunk: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("client", "gtx"), ("sl", source), ("tl", target), ("dt", "t")])
            .form(&[("q", chunk)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }
        let body: serde_json::Value = response.json().await?;
        parse_gtx_response(&body)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let source = if source.trim().is_empty() { "auto" } else { source };
        let mut parts = Vec::new();
        for chunk in split_into_chunks(text, self.max_chunk_chars) {
            parts.push(self.translate_chunk(&chunk, source, target).await?);
        }
        Ok(parts.join("\n"))
    }
}
