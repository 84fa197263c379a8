//! Pipeline integration tests.
//!
//! pdfium, tesseract and the LLM are replaced by in-process fakes, so these
//! run anywhere. The fake rasteriser encodes the page number in the image
//! width and the fake OCR engine reads it back, which lets the tests check
//! page order end to end.

use async_trait::async_trait;
use image::DynamicImage;
use scan2docx::{
    convert, read_paragraphs, ConversionConfig, ConversionProgressCallback, ConvertError,
    CorrectionError, CorrectionOutcome, OcrEngine, OcrError, OcrSettings, Rasterizer,
    SourceKind, TextCorrector,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeRasterizer {
    pages: usize,
}

impl Rasterizer for FakeRasterizer {
    fn render_pages(&self, _pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
        Ok((1..=self.pages)
            .map(|n| DynamicImage::new_rgb8(n as u32 * 10, 10))
            .collect())
    }
}

struct CorruptPdf;

impl Rasterizer for CorruptPdf {
    fn render_pages(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>, ConvertError> {
        Err(ConvertError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: "no xref".into(),
        })
    }
}

/// Returns `page <n>` plus the junk tesseract emits, `n` taken from the width.
#[derive(Default)]
struct FakeOcr {
    calls: AtomicUsize,
    fail_on_page: Option<usize>,
    seen_grey: Mutex<Vec<bool>>,
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(
        &self,
        image: &DynamicImage,
        settings: &OcrSettings,
    ) -> Result<String, OcrError> {
        assert_eq!(settings.engine_mode, 3);
        assert_eq!(settings.page_segmentation_mode, 6);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_grey
            .lock()
            .unwrap()
            .push(matches!(image, DynamicImage::ImageLuma8(_)));

        let page = (image.width() / 10) as usize;
        if self.fail_on_page == Some(page) {
            return Err(OcrError::Failed("tesseract exited with status 1".into()));
        }
        Ok(format!("page {page}\x07 text\n\x0c"))
    }
}

struct Upper;

#[async_trait]
impl TextCorrector for Upper {
    async fn correct(&self, text: &str) -> Result<String, CorrectionError> {
        Ok(text.to_uppercase())
    }
}

struct Unreachable {
    calls: AtomicUsize,
}

#[async_trait]
impl TextCorrector for Unreachable {
    async fn correct(&self, _text: &str) -> Result<String, CorrectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CorrectionError::Provider("connection refused".into()))
    }
}

#[derive(Default)]
struct Events {
    started: AtomicUsize,
    pages: AtomicUsize,
    completed: AtomicUsize,
}

impl ConversionProgressCallback for Events {
    fn on_conversion_start(&self, total_pages: usize) {
        self.started.store(total_pages, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _: usize, _: usize, _: usize, _: &CorrectionOutcome) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, total_pages: usize, _corrected: usize) {
        self.completed.store(total_pages, Ordering::SeqCst);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Setup {
    _dir: tempfile::TempDir,
    src_dir: PathBuf,
    out_dir: PathBuf,
    ocr: Arc<FakeOcr>,
}

fn setup(ocr: FakeOcr) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let src_dir = dir.path().join("uploads");
    std::fs::create_dir_all(&src_dir).unwrap();
    Setup {
        src_dir,
        out_dir: dir.path().join("converted_files"),
        _dir: dir,
        ocr: Arc::new(ocr),
    }
}

fn config(s: &Setup, pages: usize) -> scan2docx::ConversionConfigBuilder {
    ConversionConfig::builder()
        .output_dir(&s.out_dir)
        .rasterizer(Arc::new(FakeRasterizer { pages }))
        .ocr_engine(s.ocr.clone())
}

fn fake_pdf(s: &Setup, name: &str) -> PathBuf {
    let path = s.src_dir.join(name);
    std::fs::write(&path, b"%PDF-1.7\n").unwrap();
    path
}

fn png(s: &Setup, name: &str, width: u32) -> PathBuf {
    let path = s.src_dir.join(name);
    DynamicImage::new_rgb8(width, 10)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

fn docx_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_become_paragraphs_in_order() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "report.pdf");
    let cfg = config(&s, 3).build().unwrap();

    let out = convert(&src, "report.docx", false, &cfg).await.unwrap();

    assert_eq!(out.kind, SourceKind::Pdf);
    assert_eq!(out.path, s.out_dir.join("report.docx"));
    assert_eq!(out.stats.total_pages, 3);
    let paragraphs = read_paragraphs(&out.path).unwrap();
    assert_eq!(paragraphs, ["page 1 text\n", "page 2 text\n", "page 3 text\n"]);
    assert!(out
        .pages
        .iter()
        .all(|p| p.correction == CorrectionOutcome::NotRequested));
}

#[tokio::test]
async fn image_becomes_single_sanitised_paragraph() {
    let s = setup(FakeOcr::default());
    let src = png(&s, "scan.jpg", 10);
    let cfg = config(&s, 0).build().unwrap();

    let out = convert(&src, "scan.docx", false, &cfg).await.unwrap();

    assert_eq!(out.kind, SourceKind::Image);
    assert_eq!(read_paragraphs(&out.path).unwrap(), ["page 1 text\n"]);
    assert_eq!(docx_files(&s.out_dir), ["scan.docx"]);
}

#[tokio::test]
async fn sharpening_turns_image_input_grey() {
    let s = setup(FakeOcr::default());
    let src = png(&s, "a.png", 10);

    let cfg = config(&s, 0).sharpen_images(true).build().unwrap();
    convert(&src, "a.docx", false, &cfg).await.unwrap();
    let cfg = config(&s, 0).sharpen_images(false).build().unwrap();
    convert(&src, "b.docx", false, &cfg).await.unwrap();

    assert_eq!(*s.ocr.seen_grey.lock().unwrap(), [true, false]);
}

#[tokio::test]
async fn rendered_pdf_pages_are_not_sharpened() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "a.pdf");
    let cfg = config(&s, 2).sharpen_images(true).build().unwrap();
    convert(&src, "a.docx", false, &cfg).await.unwrap();
    assert_eq!(*s.ocr.seen_grey.lock().unwrap(), [false, false]);
}

#[tokio::test]
async fn unreachable_corrector_keeps_ocr_text() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "letter.pdf");
    let corrector = Arc::new(Unreachable {
        calls: AtomicUsize::new(0),
    });
    let cfg = config(&s, 2).corrector(corrector.clone()).build().unwrap();

    let out = convert(&src, "letter.docx", true, &cfg).await.unwrap();

    assert_eq!(
        read_paragraphs(&out.path).unwrap(),
        ["page 1 text\n", "page 2 text\n"]
    );
    assert_eq!(corrector.calls.load(Ordering::SeqCst), 2);
    assert_eq!(out.stats.fallback_pages, 2);
    assert_eq!(out.stats.corrected_pages, 0);
    assert!(out.pages.iter().all(|p| p.correction.is_fallback()));
}

#[tokio::test]
async fn corrector_output_replaces_text() {
    let s = setup(FakeOcr::default());
    let src = png(&s, "note.png", 10);
    let cfg = config(&s, 0).corrector(Arc::new(Upper)).build().unwrap();

    let out = convert(&src, "note.docx", true, &cfg).await.unwrap();

    assert_eq!(read_paragraphs(&out.path).unwrap(), ["PAGE 1 TEXT\n"]);
    assert_eq!(out.stats.corrected_pages, 1);
}

struct ControlChars;

#[async_trait]
impl TextCorrector for ControlChars {
    async fn correct(&self, _text: &str) -> Result<String, CorrectionError> {
        Ok("The quick\u{0B}fox\u{1B}[0m".into())
    }
}

#[tokio::test]
async fn control_characters_from_corrector_keep_document_well_formed() {
    use std::io::Read;

    let s = setup(FakeOcr::default());
    let src = png(&s, "note.png", 10);
    let cfg = config(&s, 0).corrector(Arc::new(ControlChars)).build().unwrap();

    let out = convert(&src, "note.docx", true, &cfg).await.unwrap();

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&out.path).unwrap()).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(!xml.contains('\u{0B}') && !xml.contains('\u{1B}'));
    roxmltree::Document::parse(&xml).expect("document.xml must be well-formed");
    assert_eq!(read_paragraphs(&out.path).unwrap(), ["The quickfox[0m"]);
}

#[tokio::test]
async fn corrector_is_not_called_without_use_ai() {
    let s = setup(FakeOcr::default());
    let src = png(&s, "note.png", 10);
    let cfg = config(&s, 0).corrector(Arc::new(Upper)).build().unwrap();

    let out = convert(&src, "note.docx", false, &cfg).await.unwrap();
    assert_eq!(read_paragraphs(&out.path).unwrap(), ["page 1 text\n"]);
}

#[tokio::test]
async fn use_ai_without_corrector_falls_back() {
    let s = setup(FakeOcr::default());
    let src = png(&s, "note.png", 10);
    let cfg = config(&s, 0).build().unwrap();

    let out = convert(&src, "note.docx", true, &cfg).await.unwrap();
    assert_eq!(
        out.pages[0].correction,
        CorrectionOutcome::FellBack(CorrectionError::NotConfigured)
    );
    assert_eq!(read_paragraphs(&out.path).unwrap(), ["page 1 text\n"]);
}

#[tokio::test]
async fn disallowed_extension_never_runs_the_pipeline() {
    let s = setup(FakeOcr::default());
    let src = s.src_dir.join("setup.exe");
    std::fs::write(&src, b"MZ").unwrap();
    let cfg = config(&s, 1).build().unwrap();

    let err = convert(&src, "setup.docx", false, &cfg).await.unwrap_err();

    assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    assert_eq!(s.ocr.calls.load(Ordering::SeqCst), 0);
    assert!(!s.out_dir.exists());
}

#[tokio::test]
async fn missing_source_is_reported() {
    let s = setup(FakeOcr::default());
    let cfg = config(&s, 1).build().unwrap();
    let err = convert(s.src_dir.join("gone.pdf"), "gone.docx", false, &cfg)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::FileNotFound { .. }));
}

#[tokio::test]
async fn ocr_failure_leaves_no_output() {
    let s = setup(FakeOcr {
        fail_on_page: Some(2),
        ..FakeOcr::default()
    });
    let src = fake_pdf(&s, "broken.pdf");
    let cfg = config(&s, 3).build().unwrap();

    let err = convert(&src, "broken.docx", false, &cfg).await.unwrap_err();

    assert!(matches!(err, ConvertError::OcrFailed { page: 2, .. }));
    assert!(docx_files(&s.out_dir).is_empty());
}

#[tokio::test]
async fn unreadable_pdf_leaves_no_output() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "corrupt.pdf");
    let cfg = ConversionConfig::builder()
        .output_dir(&s.out_dir)
        .rasterizer(Arc::new(CorruptPdf))
        .ocr_engine(s.ocr.clone())
        .build()
        .unwrap();

    let err = convert(&src, "corrupt.docx", false, &cfg).await.unwrap_err();
    assert!(matches!(err, ConvertError::CorruptPdf { .. }));
    assert!(docx_files(&s.out_dir).is_empty());
}

#[tokio::test]
async fn same_output_name_overwrites() {
    let s = setup(FakeOcr::default());
    let one = fake_pdf(&s, "one.pdf");
    let two = fake_pdf(&s, "two.pdf");

    convert(&one, "same.docx", false, &config(&s, 1).build().unwrap())
        .await
        .unwrap();
    let out = convert(&two, "same.docx", false, &config(&s, 2).build().unwrap())
        .await
        .unwrap();

    assert_eq!(read_paragraphs(&out.path).unwrap().len(), 2);
    assert_eq!(docx_files(&s.out_dir), ["same.docx"]);
}

#[tokio::test]
async fn progress_events_cover_every_page() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "p.pdf");
    let events = Arc::new(Events::default());
    let cfg = config(&s, 4).progress_callback(events.clone()).build().unwrap();

    convert(&src, "p.docx", false, &cfg).await.unwrap();

    assert_eq!(events.started.load(Ordering::SeqCst), 4);
    assert_eq!(events.pages.load(Ordering::SeqCst), 4);
    assert_eq!(events.completed.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn output_name_with_path_is_rejected() {
    let s = setup(FakeOcr::default());
    let src = fake_pdf(&s, "x.pdf");
    let cfg = config(&s, 1).build().unwrap();
    let err = convert(&src, "../x.docx", false, &cfg).await.unwrap_err();
    assert!(matches!(err, ConvertError::InvalidOutputName(_)));
    assert_eq!(s.ocr.calls.load(Ordering::SeqCst), 0);
}
