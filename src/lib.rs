//! # scan2docx
//!
//! OCR scanned PDFs and images into DOCX documents, optionally cleaning the
//! recognised text up with a hosted language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input      check the extension, classify as PDF or image
//!  ├─ 2. Render     rasterise PDF pages via pdfium (spawn_blocking)
//!  │    Decode      or decode the image, greyscale + sharpen
//!  ├─ 3. OCR        tesseract, `--oem 3 --psm 6 [-l lang]`
//!  ├─ 4. Sanitise   drop characters XML cannot carry
//!  ├─ 5. Correct    optional LLM pass; any failure keeps the OCR text
//!  └─ 6. Output     one paragraph per page, atomic DOCX write
//! ```
//!
//! The same pipeline backs three front ends: the library API below, the
//! HTTP service in [`server`], and the `scan2docx` binary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2docx::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .output_dir("converted_files")
//!         .build()?;
//!     let output = convert("scan.pdf", "scan.docx", false, &config).await?;
//!     println!("{} ({} pages)", output.path.display(), output.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2docx` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## External tools
//!
//! * **pdfium**: bound at runtime from `PDFIUM_LIB_PATH`, the working
//!   directory, or the system library path.
//! * **tesseract**: spawned per page; override the binary with `TESSERACT_CMD`.
//! * **OpenAI**: only when correction is requested; reads `OPENAI_API_KEY`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod docx;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ServiceConfig};
pub use convert::convert;
pub use docx::{read_paragraphs, DocxDocument};
pub use error::{ConvertError, CorrectionError};
pub use output::{ConversionOutput, ConversionStats, CorrectionOutcome, PageResult};
pub use pipeline::correct::{LlmCorrector, TextCorrector};
pub use pipeline::input::SourceKind;
pub use pipeline::ocr::{OcrEngine, OcrError, OcrSettings, TesseractEngine};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::list_recent;
pub use server::{router, AppState};
