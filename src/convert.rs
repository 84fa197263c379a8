//! Conversion entry point: one source file in, one DOCX out.
//!
//! [`convert`] runs every stage of [`crate::pipeline`] in order and only
//! touches the output directory at the very end, so a failure at any stage
//! leaves no output file behind.

use crate::config::ConversionConfig;
use crate::docx::DocxDocument;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, CorrectionOutcome, PageResult};
use crate::pipeline::correct::correct_or_original;
use crate::pipeline::input::{self, SourceKind};
use crate::pipeline::ocr::{OcrEngine, OcrError, TesseractEngine};
use crate::pipeline::preprocess::sharpen_for_ocr;
use crate::pipeline::render::{self, PdfiumRasterizer, Rasterizer};
use crate::pipeline::sanitize::sanitize_text;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a PDF or raster image into a DOCX document.
///
/// Every page becomes exactly one paragraph, in source order. The document
/// is written to `config.output_dir/output_name`, overwriting any existing
/// file of that name.
///
/// # Arguments
/// * `source` - path to a `.pdf`, `.png`, `.jpg` or `.jpeg` file
/// * `output_name` - bare file name for the document, used verbatim
/// * `use_ai` - pass each page through `config.corrector`; failures fall
///   back to the OCR text and never fail the call
///
/// # Errors
/// Any input, rasterisation, decode, OCR or write failure. Nothing is
/// written in that case.
pub async fn convert(
    source: impl AsRef<Path>,
    output_name: &str,
    use_ai: bool,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    input::validate_output_name(output_name)?;
    let resolved = input::resolve_source(source.as_ref())?;
    info!(
        "Converting {} ({:?}) -> {} (ai: {})",
        resolved.path.display(),
        resolved.kind,
        output_name,
        use_ai
    );

    // ── Step 1: Page images ──────────────────────────────────────────────
    let render_start = Instant::now();
    let images = match resolved.kind {
        SourceKind::Pdf => {
            let rasterizer = resolve_rasterizer(config);
            render::render_pages(&rasterizer, &resolved.path).await?
        }
        SourceKind::Image => vec![load_image(&resolved.path, config.sharpen_images).await?],
    };
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let total_pages = images.len();
    debug!("{} page image(s) ready in {}ms", total_pages, render_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    // ── Step 2: OCR, sanitise, correct ───────────────────────────────────
    let engine = resolve_ocr_engine(config);
    let corrector = config.corrector.as_ref();
    let ocr_start = Instant::now();
    let mut pages = Vec::with_capacity(total_pages);

    for (idx, image) in images.iter().enumerate() {
        let page_num = idx + 1;
        let page_start = Instant::now();
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        let raw = engine
            .recognize(image, &config.ocr)
            .await
            .map_err(|e| ocr_error(page_num, e))?;
        let clean = sanitize_text(&raw);
        debug!(
            "Page {}: {} chars from OCR, {} after sanitising",
            page_num,
            raw.chars().count(),
            clean.chars().count()
        );

        let (text, correction) = correct_or_original(corrector, page_num, clean, use_ai).await;

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, total_pages, text.chars().count(), &correction);
        }
        pages.push(PageResult {
            page_num,
            text,
            correction,
            duration_ms: page_start.elapsed().as_millis() as u64,
        });
    }
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
    drop(images);

    // ── Step 3: Write the document ───────────────────────────────────────
    let path = config.output_dir.join(output_name);
    write_document(&pages, &config.output_dir, &path).await?;

    let stats = ConversionStats {
        total_pages,
        corrected_pages: pages
            .iter()
            .filter(|p| p.correction == CorrectionOutcome::Applied)
            .count(),
        fallback_pages: pages.iter().filter(|p| p.correction.is_fallback()).count(),
        render_duration_ms,
        ocr_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Wrote {} ({} pages, {} corrected, {} fell back) in {}ms",
        path.display(),
        stats.total_pages,
        stats.corrected_pages,
        stats.fallback_pages,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, stats.corrected_pages);
    }

    Ok(ConversionOutput {
        path,
        kind: resolved.kind,
        pages,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn resolve_rasterizer(config: &ConversionConfig) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::from_config(config)),
    }
}

fn resolve_ocr_engine(config: &ConversionConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_engine {
        Some(ref e) => Arc::clone(e),
        None => Arc::new(TesseractEngine::new()),
    }
}

fn ocr_error(page: usize, e: OcrError) -> ConvertError {
    match e {
        OcrError::Unavailable { command, detail } => ConvertError::OcrUnavailable { command, detail },
        OcrError::Failed(detail) => ConvertError::OcrFailed { page, detail },
    }
}

/// Decode a raster image, sniffing the format from its bytes.
async fn load_image(path: &Path, sharpen: bool) -> Result<DynamicImage, ConvertError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let decode_failed = |detail: String| ConvertError::ImageDecodeFailed {
            path: path.clone(),
            detail,
        };
        let img = ImageReader::open(&path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| decode_failed(e.to_string()))?
            .decode()
            .map_err(|e| decode_failed(e.to_string()))?;
        debug!("Decoded {}x{} image", img.width(), img.height());
        Ok(if sharpen { sharpen_for_ocr(&img) } else { img })
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Image decode task panicked: {}", e)))?
}

/// Build the DOCX and write it atomically into `output_dir`.
async fn write_document(
    pages: &[PageResult],
    output_dir: &Path,
    path: &Path,
) -> Result<(), ConvertError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    let mut doc = DocxDocument::new();
    for page in pages {
        doc.add_paragraph(page.text.as_str());
    }

    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || doc.save(&path))
        .await
        .map_err(|e| ConvertError::Internal(format!("DOCX write task panicked: {}", e)))?
}
