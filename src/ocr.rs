use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to start OCR engine {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("image not found: {0}")]
    MissingImage(String),
}

/// Optical character recognition over a saved page image
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Raw recognised text; `lang` is an ISO 639-1 code or `auto`
    async fn recognize(&self, image: &Path, lang: &str) -> Result<String, OcrError>;
}

/// Map ISO 639-1 codes to Tesseract traineddata names; unknown codes pass through
pub fn tesseract_lang(lang: &str) -> Option<String> {
    let code = lang.trim().to_lowercase();
    let mapped = match code.as_str() {
        "" | "auto" => return None,
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "nl" => "nld",
        "pl" => "pol",
        "ru" => "rus",
        "uk" => "ukr",
        "tr" => "tur",
        "ja" => "jpn",
        "ko" => "kor",
        "zh" | "zh-cn" => "chi_sim",
        "zh-tw" => "chi_tra",
        "vi" => "vie",
        "th" => "tha",
        "id" => "ind",
        "ar" => "ara",
        other => other,
    };
    Some(mapped.to_string())
}

/// Runs `<cmd> <image> stdout [-l <lang>]`
pub struct TesseractOcr {
    cmd: String,
}

impl TesseractOcr {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn command(&self) -> &str {
        &self.cmd
    }

    fn args(image: &Path, lang: &str) -> Vec<String> {
        let mut args = vec![image.to_string_lossy().to_string(), "stdout".to_string()];
        if let Some(l) = tesseract_lang(lang) {
            args.push("-l".to_string());
            args.push(l);
        }
        args
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &Path, lang: &str) -> Result<String, OcrError> {
        if !image.exists() {
            return Err(OcrError::MissingImage(image.display().to_string()));
        }

        let output = Command::new(&self.cmd)
            .args(Self::args(image, lang))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(OcrError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
