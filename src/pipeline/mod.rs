//! Pipeline stages for scan-to-DOCX conversion.
//!
//! Each submodule implements exactly one transformation step. The three
//! external capabilities (rasteriser, OCR engine, text corrector) sit behind
//! traits so tests and embedders can swap them without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render / decode ──▶ preprocess ──▶ ocr ──▶ sanitize ──▶ correct
//! (kind)     (pdfium / image)   (grey+sharpen) (tesseract)          (LLM, fail-open)
//! ```
//!
//! 1. [`input`]       validate the source path and classify it by extension
//! 2. [`render`]      rasterise every PDF page; pdfium is blocking, so it runs
//!    inside `spawn_blocking`
//! 3. [`preprocess`]  optional greyscale + sharpen for raster inputs
//! 4. [`encode`]      PNG-encode a page for the OCR engine
//! 5. [`ocr`]         run the OCR engine with the fixed engine configuration
//! 6. [`sanitize`]    strip characters WordprocessingML cannot carry
//! 7. [`correct`]     optional LLM rewrite; errors fall back to the input

pub mod correct;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod sanitize;
