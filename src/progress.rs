//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a document. The CLI uses this to
//! drive its progress bar; the HTTP service leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use scan2docx::{ConversionProgressCallback, ConversionConfig, CorrectionOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, chars: usize, _: &CorrectionOutcome) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} chars)", page_num, total_pages, chars);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::CorrectionOutcome;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Pages are processed in order on one task, so calls never overlap for a
/// single conversion. The trait is still `Send + Sync` because one callback
/// may be shared by several conversions.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the source has been rasterised or decoded.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is handed to the OCR engine.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page's paragraph text is final.
    ///
    /// `chars` is the character count of the text going into the document.
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        chars: usize,
        correction: &CorrectionOutcome,
    ) {
        let _ = (page_num, total_pages, chars, correction);
    }

    /// Called once after the document has been written.
    fn on_conversion_complete(&self, total_pages: usize, corrected_pages: usize) {
        let _ = (total_pages, corrected_pages);
    }
}

/// No-op callback, used when none is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
