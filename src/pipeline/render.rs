//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`render_pages`] moves the work onto tokio's blocking pool so the runtime
//! keeps serving other requests while a large scan renders.
//!
//! ## Why DPI *and* a pixel cap?
//!
//! OCR accuracy follows DPI, so pages are scaled by `dpi / 72`. Page sizes
//! vary wildly though, and an A0 poster at 200 DPI is a 6,600 × 9,400 px
//! bitmap; `max_rendered_pixels` bounds either edge regardless.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a PDF into one bitmap per page, in page order.
///
/// Implementations are blocking; callers go through [`render_pages`].
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf_path`. Fails if the PDF cannot be parsed.
    fn render_pages(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError>;
}

/// Render all pages of a PDF on the blocking pool.
pub async fn render_pages(
    rasterizer: &Arc<dyn Rasterizer>,
    pdf_path: &Path,
) -> Result<Vec<DynamicImage>, ConvertError> {
    let rasterizer = Arc::clone(rasterizer);
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || rasterizer.render_pages(&path))
        .await
        .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
}

/// pdfium-backed [`Rasterizer`].
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(dpi: u32, max_pixels: u32) -> Self {
        Self {
            dpi,
            max_pixels,
            library_path: None,
        }
    }

    /// Use the DPI and pixel cap from `config`, and `PDFIUM_LIB_PATH` when set.
    pub fn from_config(config: &ConversionConfig) -> Self {
        let library_path = std::env::var_os(PDFIUM_LIB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            library_path,
        }
    }

    /// Bind to a specific pdfium library file, or a directory containing one.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Where to look for pdfium, in order: the explicit path, else the
    /// working directory and then the system library search path.
    fn binding_order(&self) -> Vec<LibrarySource> {
        match &self.library_path {
            Some(path) if path.is_dir() => vec![LibrarySource::File(
                Pdfium::pdfium_platform_library_name_at_path(path),
            )],
            Some(path) => vec![LibrarySource::File(path.clone())],
            None => vec![
                LibrarySource::File(working_dir_library()),
                LibrarySource::System,
            ],
        }
    }

    fn bind(&self) -> Result<Pdfium, ConvertError> {
        let mut failures = Vec::new();
        for source in self.binding_order() {
            let bound = match &source {
                LibrarySource::File(path) => Pdfium::bind_to_library(path),
                LibrarySource::System => Pdfium::bind_to_system_library(),
            };
            match bound {
                Ok(bindings) => {
                    debug!("Bound pdfium from {:?}", source);
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => failures.push(format!("{:?}: {:?}", source, e)),
            }
        }
        Err(ConvertError::PdfiumBindingFailed(failures.join("; ")))
    }
}

fn working_dir_library() -> PathBuf {
    Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from("./"))
}

#[derive(Debug, Clone, PartialEq)]
enum LibrarySource {
    File(PathBuf),
    System,
}

impl Rasterizer for PdfiumRasterizer {
    fn render_pages(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            ConvertError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let max_edge = i32::try_from(self.max_pixels).unwrap_or(i32::MAX);
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(render_scale(self.dpi))
            .set_maximum_width(max_edge)
            .set_maximum_height(max_edge);

        let mut results = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ConvertError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(image);
        }

        Ok(results)
    }
}

/// PDF user space is 72 units per inch.
fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}
