//! Result types returned by [`crate::convert::convert`].

use crate::error::CorrectionError;
use crate::pipeline::input::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to a page in the AI correction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum CorrectionOutcome {
    /// `use_ai` was off.
    NotRequested,
    /// The OCR text was blank; nothing to correct.
    SkippedBlank,
    /// The corrector's text replaced the OCR text.
    Applied,
    /// The corrector failed; the sanitised OCR text was kept.
    FellBack(CorrectionError),
}

impl CorrectionOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, CorrectionOutcome::FellBack(_))
    }
}

/// One page (one paragraph) of the output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed position in the source.
    pub page_num: usize,
    /// Paragraph text as written to the document.
    pub text: String,
    pub correction: CorrectionOutcome,
    /// Wall-clock time for OCR + correction of this page.
    pub duration_ms: u64,
}

/// Aggregate numbers for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub corrected_pages: usize,
    pub fallback_pages: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Where the DOCX was written.
    pub path: PathBuf,
    pub kind: SourceKind,
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// The output file name, as listed by the recent-files registry.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
