//! Error types for the scan2docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **fatal**, the conversion cannot produce a document
//!   (missing input, unreadable PDF, OCR engine crashed, disk full). Returned
//!   as `Err(ConvertError)` from [`crate::convert::convert`]; no output file
//!   is left behind.
//!
//! * [`CorrectionError`]: **non-fatal**, the optional AI correction step
//!   could not run for one page. The pipeline always falls back to the
//!   sanitised OCR text and records the error in
//!   [`crate::output::PageResult::correction`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source file was not found at the given path.
    #[error("Source file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The source extension is not one of pdf, png, jpg, jpeg.
    #[error("Unsupported file type '{extension}' for '{path}'\nAllowed: pdf, png, jpg, jpeg")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The output name is not a bare file name.
    #[error("Invalid output name '{0}': must be a file name without path components")]
    InvalidOutputName(String),

    // ── Rasterisation / decode errors ─────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The raster image could not be decoded.
    #[error("Could not decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine binary could not be started at all.
    #[error("OCR engine '{command}' is not available: {detail}\nInstall tesseract or set TESSERACT_CMD.")]
    OcrUnavailable { command: String, detail: String },

    /// The OCR engine ran but failed on a page.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output DOCX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The DOCX container could not be assembled.
    #[error("Failed to build DOCX document: {0}")]
    DocxBuildFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why the AI correction step did not produce text for a page.
///
/// Never propagated out of the pipeline: the caller keeps the uncorrected
/// text. Stored alongside the page so callers can still see what happened.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum CorrectionError {
    /// Correction was requested but no corrector is configured (no API key).
    #[error("no text corrector configured")]
    NotConfigured,

    /// The provider call failed (connection refused, DNS, HTTP error, bad key).
    #[error("correction provider failed: {0}")]
    Provider(String),

    /// The provider did not answer within the configured timeout.
    #[error("correction timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered with no text.
    #[error("correction provider returned an empty response")]
    EmptyResponse,
}
