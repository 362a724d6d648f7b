use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One export request: a series URL, an inclusive chapter range and a language pair
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChapterJob {
    pub base_url: String,
    pub start: u32,
    pub end: u32,
    pub source_lang: String,
    pub target_lang: String,
    pub session: String,
}

impl ChapterJob {
    pub fn chapters(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// A saved page image; `sequence` is its 1-based reading position
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub sequence: usize,
    pub ext: String,
    pub path: PathBuf,
    pub source_url: String,
}

impl ImageRecord {
    pub fn file_name(&self) -> String {
        crate::helpers::image_file_name(self.sequence, &self.ext)
    }
}

/// Result of one OCR or translation step
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum StageOutcome {
    /// Produced non-empty text
    Text(String),
    /// Ran fine but found nothing
    Empty,
    /// Ran and failed
    Failed(String),
    /// Not attempted because an earlier stage produced no text
    Skipped,
}

impl StageOutcome {
    pub fn from_text(text: String) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            StageOutcome::Empty
        } else {
            StageOutcome::Text(trimmed.to_string())
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            StageOutcome::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// Placeholder written to the PDF when translation failed
pub const TRANSLATION_FAILED_PLACEHOLDER: &str = "[TRANSLATE ERROR]";

/// OCR and translation outcome for one saved image
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub filename: String,
    pub ocr: StageOutcome,
    pub translation: StageOutcome,
}

impl Transcription {
    /// Text for the PDF body: the translation, the failure placeholder, or empty
    pub fn translated_text(&self) -> &str {
        match &self.translation {
            StageOutcome::Text(t) => t,
            StageOutcome::Failed(_) => TRANSLATION_FAILED_PLACEHOLDER,
            StageOutcome::Empty | StageOutcome::Skipped => "",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ChapterStatus {
    Completed,
    /// Page loaded but no image could be located or saved
    NoImages,
    /// Page fetch or artifact creation failed
    Failed(String),
}

/// PDF and CBZ produced for one chapter
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChapterArtifacts {
    pub pdf: PathBuf,
    pub cbz: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChapterReport {
    pub chapter: u32,
    pub url: String,
    pub status: ChapterStatus,
    pub images_located: usize,
    pub images_saved: usize,
    pub ocr_failures: usize,
    pub translation_failures: usize,
    pub artifacts: Option<ChapterArtifacts>,
}

/// Everything the request shell returns to its caller
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExportResult {
    pub session: String,
    pub title: String,
    pub bundle: PathBuf,
    pub chapters: Vec<ChapterReport>,
    /// Chapters requested but absent from the bundle
    pub failed_chapters: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outcome_from_text() {
        assert_eq!(StageOutcome::from_text("  \n ".into()), StageOutcome::Empty);
        assert_eq!(
            StageOutcome::from_text(" hello \n".into()),
            StageOutcome::Text("hello".into())
        );
    }

    #[test]
    fn test_translated_text_distinguishes_failure_from_empty() {
        let mut t = Transcription {
            filename: "001.jpg".into(),
            ocr: StageOutcome::Empty,
            translation: StageOutcome::Skipped,
        };
        assert_eq!(t.translated_text(), "");

        t.translation = StageOutcome::Failed("timeout".into());
        assert_eq!(t.translated_text(), TRANSLATION_FAILED_PLACEHOLDER);

        t.translation = StageOutcome::Text("Hallo".into());
        assert_eq!(t.translated_text(), "Hallo");
    }

    #[test]
    fn test_job_chapter_range_is_inclusive() {
        let job = ChapterJob {
            base_url: "https://example.com/series/Foo".into(),
            start: 2,
            end: 4,
            source_lang: "auto".into(),
            target_lang: "de".into(),
            session: "abcd1234".into(),
        };
        assert_eq!(job.chapters().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_status_serializes_tagged() {
        let v = serde_json::to_value(ChapterStatus::Failed("boom".into())).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["reason"], "boom");
    }
}
