//! Configuration types for the conversion pipeline and the HTTP service.
//!
//! Two structs, both built once at startup and then shared by reference:
//!
//! * [`ConversionConfig`]: every pipeline knob (rasterisation, OCR,
//!   correction) plus the collaborators the pipeline calls into. Built via
//!   [`ConversionConfigBuilder`].
//! * [`ServiceConfig`]: what the HTTP layer needs (bind address, upload and
//!   output directories, allow-list, request-size cap).

use crate::error::ConvertError;
use crate::pipeline::correct::TextCorrector;
use crate::pipeline::ocr::{OcrEngine, OcrSettings};
use crate::pipeline::render::Rasterizer;
use crate::progress::ConversionProgressCallback;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Default directory converted documents are written to.
pub const DEFAULT_CONVERTED_DIR: &str = "converted_files";

/// Default directory uploads are persisted to before conversion.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default model used for text correction.
pub const DEFAULT_CORRECTION_MODEL: &str = "gpt-3.5-turbo";

/// Default request body cap: 100 MiB.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 100 * 1024 * 1024;

/// Number of entries shown in the "recently converted" listing.
pub const DEFAULT_RECENT_COUNT: usize = 5;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2docx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(300)
///     .sharpen_images(false)
///     .ocr_language("eng+best")
///     .output_dir("out")
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr.args(), ["--oem", "3", "--psm", "6", "-l", "eng+best"]);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory the DOCX is written to. Created when missing. Default: `converted_files`.
    pub output_dir: PathBuf,

    /// Rendering DPI for PDF pages. Range: 72–600. Default: 200.
    ///
    /// Tesseract is tuned for text around 300 DPI; 200 keeps memory modest
    /// while still reading body text reliably.
    pub dpi: u32,

    /// Cap on either rendered dimension in pixels. Default: 5000.
    ///
    /// Keeps a 200 DPI render of an oversized page (A0 poster, engineering
    /// drawing) from allocating hundreds of megabytes.
    pub max_rendered_pixels: u32,

    /// Convert raster inputs to greyscale and sharpen before OCR. Default: true.
    ///
    /// Only applies to image inputs; rendered PDF pages go to OCR as-is.
    pub sharpen_images: bool,

    /// Fixed OCR engine configuration (`--oem 3 --psm 6 [-l lang]`).
    pub ocr: OcrSettings,

    /// Model identifier for text correction. Default: `gpt-3.5-turbo`.
    pub correction_model: String,

    /// Maximum tokens the corrector may generate per page. Default: 1000.
    pub correction_max_tokens: usize,

    /// Per-page correction timeout in seconds. Default: 60.
    pub correction_timeout_secs: u64,

    /// Custom correction system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Pre-constructed rasteriser. If None, binds pdfium at conversion time.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Pre-constructed OCR engine. If None, spawns the `tesseract` CLI.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Text corrector. If None, `use_ai` requests fall back to the OCR text.
    pub corrector: Option<Arc<dyn TextCorrector>>,

    /// Optional per-page progress events.
    pub progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_CONVERTED_DIR),
            dpi: 200,
            max_rendered_pixels: 5000,
            sharpen_images: true,
            ocr: OcrSettings::default(),
            correction_model: DEFAULT_CORRECTION_MODEL.to_string(),
            correction_max_tokens: 1000,
            correction_timeout_secs: 60,
            system_prompt: None,
            rasterizer: None,
            ocr_engine: None,
            corrector: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("output_dir", &self.output_dir)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("sharpen_images", &self.sharpen_images)
            .field("ocr", &self.ocr)
            .field("correction_model", &self.correction_model)
            .field("correction_max_tokens", &self.correction_max_tokens)
            .field("correction_timeout_secs", &self.correction_timeout_secs)
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("corrector", &self.corrector.as_ref().map(|_| "<dyn TextCorrector>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    /// Clamped to `100..=i32::MAX`, the range pdfium accepts.
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn sharpen_images(mut self, v: bool) -> Self {
        self.config.sharpen_images = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = Some(lang.into());
        self
    }

    pub fn ocr_settings(mut self, settings: OcrSettings) -> Self {
        self.config.ocr = settings;
        self
    }

    pub fn correction_model(mut self, model: impl Into<String>) -> Self {
        self.config.correction_model = model.into();
        self
    }

    pub fn correction_max_tokens(mut self, n: usize) -> Self {
        self.config.correction_max_tokens = n;
        self
    }

    pub fn correction_timeout_secs(mut self, secs: u64) -> Self {
        self.config.correction_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn corrector(mut self, corrector: Arc<dyn TextCorrector>) -> Self {
        self.config.corrector = Some(corrector);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.correction_max_tokens == 0 {
            return Err(ConvertError::InvalidConfig(
                "correction max tokens must be ≥ 1".into(),
            ));
        }
        if c.correction_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "correction timeout must be ≥ 1s".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if let Some(lang) = &c.ocr.language {
            if lang.is_empty() || lang.chars().any(char::is_whitespace) {
                return Err(ConvertError::InvalidConfig(format!(
                    "OCR language must be a tesseract language spec like 'eng' or 'eng+deu', got {lang:?}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── HTTP service ─────────────────────────────────────────────────────────

/// Settings for the HTTP service, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the listener binds to. Default: `0.0.0.0:5006`.
    pub bind: SocketAddr,

    /// Where uploads and pasted images are persisted before conversion.
    pub upload_dir: PathBuf,

    /// Where converted documents are written and served from.
    pub converted_dir: PathBuf,

    /// Remote addresses allowed to use the service. Empty rejects everyone.
    pub allowed_ips: Vec<IpAddr>,

    /// Request body cap. `None` disables the cap.
    pub max_request_bytes: Option<usize>,

    /// Entries shown in the recent-files listing.
    pub recent_count: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5006)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            converted_dir: PathBuf::from(DEFAULT_CONVERTED_DIR),
            allowed_ips: Vec::new(),
            max_request_bytes: Some(DEFAULT_MAX_REQUEST_BYTES),
            recent_count: DEFAULT_RECENT_COUNT,
        }
    }
}

impl ServiceConfig {
    /// Whether `addr` is on the allow-list.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.1`), which a dual-stack
    /// listener reports for IPv4 clients, match their IPv4 entry.
    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.allowed_ips.iter().any(|ip| ip.to_canonical() == addr)
    }
}

/// Parse a comma-separated allow-list such as `"127.0.0.1, 10.0.0.7"`.
///
/// Blank entries are ignored; any other entry that is not an IP address is
/// a configuration error.
pub fn parse_allow_list(raw: &str) -> Result<Vec<IpAddr>, ConvertError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>().map_err(|e| {
                ConvertError::InvalidConfig(format!("invalid allow-list address {s:?}: {e}"))
            })
        })
        .collect()
}
