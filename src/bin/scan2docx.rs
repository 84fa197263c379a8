//! CLI binary for scan2docx.
//!
//! `serve` runs the HTTP service; `convert`, `recent` and `inspect` are
//! one-shot commands over the same library calls.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scan2docx::config::{parse_allow_list, DEFAULT_CONVERTED_DIR, DEFAULT_UPLOAD_DIR};
use scan2docx::{
    convert, list_recent, read_paragraphs, router, AppState, ConversionConfig,
    ConversionProgressCallback, CorrectionOutcome, LlmCorrector, ProgressCallback, ServiceConfig,
    TextCorrector,
};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ─────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            fallbacks: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_pages} page(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(
        &self,
        page_num: usize,
        total: usize,
        chars: usize,
        correction: &CorrectionOutcome,
    ) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let note = match correction {
            CorrectionOutcome::Applied => green("corrected"),
            CorrectionOutcome::FellBack(e) => {
                self.fallbacks.fetch_add(1, Ordering::SeqCst);
                yellow(&format!("kept OCR text ({e})"))
            }
            CorrectionOutcome::SkippedBlank => dim("blank"),
            CorrectionOutcome::NotRequested => String::new(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            note,
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, corrected_pages: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        if fallbacks == 0 {
            eprintln!(
                "{} {} page(s) converted, {} corrected",
                green("✔"),
                bold(&total_pages.to_string()),
                corrected_pages
            );
        } else {
            eprintln!(
                "{} {} page(s) converted, {} kept their OCR text",
                yellow("⚠"),
                bold(&total_pages.to_string()),
                fallbacks
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the web service for two workstations
  ALLOWED_IPS=192.168.1.10,192.168.1.11 scan2docx serve

  # One-off conversion, written to converted_files/scan.docx
  scan2docx convert scan.pdf

  # With AI correction and a custom output name
  OPENAI_API_KEY=sk-... scan2docx convert photo.jpg --ai -o letter.docx

  # Most recent conversions, and what one of them says
  scan2docx recent
  scan2docx inspect converted_files/letter.docx

ENVIRONMENT VARIABLES:
  UPLOAD_FOLDER             Where uploads are stored (default: uploads)
  CONVERTED_FOLDER          Where documents are written (default: converted_files)
  ALLOWED_IPS               Comma-separated client addresses allowed to connect
  OPENAI_API_KEY            Enables AI correction
  SCAN2DOCX_HOST            Bind address (default: 0.0.0.0)
  SCAN2DOCX_PORT            Bind port (default: 5006)
  SCAN2DOCX_MAX_REQUEST_MB  Request body cap in MiB (default: 100)
  SCAN2DOCX_SHARPEN         Greyscale + sharpen image uploads (default: true)
  SCAN2DOCX_OCR_LANGUAGE    tesseract language, e.g. eng or ukr+eng
  SCAN2DOCX_MODEL           Correction model (default: gpt-3.5-turbo)
  SCAN2DOCX_DPI             PDF rendering DPI (default: 200)
  PDFIUM_LIB_PATH           libpdfium file or directory
  TESSERACT_CMD             tesseract binary (default: tesseract on PATH)

A .env file in the working directory is loaded first.
"#;

/// OCR scanned PDFs and images into DOCX documents.
#[derive(Parser, Debug)]
#[command(
    name = "scan2docx",
    version,
    about = "OCR scanned PDFs and images into DOCX, with optional AI text correction",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCAN2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCAN2DOCX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Convert one file and print the output path.
    Convert(ConvertArgs),
    /// List the most recently converted files.
    Recent(RecentArgs),
    /// Print the paragraphs of a DOCX file.
    Inspect {
        /// Path to a .docx file.
        docx: PathBuf,
    },
}

/// Pipeline options shared by `serve` and `convert`.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "SCAN2DOCX_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Greyscale and sharpen image inputs before OCR.
    #[arg(long, env = "SCAN2DOCX_SHARPEN", default_value_t = true,
          action = clap::ArgAction::Set)]
    sharpen: bool,

    /// tesseract language, e.g. `eng` or `ukr+eng`.
    #[arg(long, env = "SCAN2DOCX_OCR_LANGUAGE")]
    ocr_language: Option<String>,

    /// Model used for AI correction.
    #[arg(long, env = "SCAN2DOCX_MODEL", default_value = "gpt-3.5-turbo")]
    model: String,

    /// Per-page AI correction timeout in seconds.
    #[arg(long, env = "SCAN2DOCX_CORRECTION_TIMEOUT", default_value_t = 60)]
    correction_timeout: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "SCAN2DOCX_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(long, env = "SCAN2DOCX_PORT", default_value_t = 5006)]
    port: u16,

    #[arg(long, env = "UPLOAD_FOLDER", default_value = DEFAULT_UPLOAD_DIR)]
    upload_dir: PathBuf,

    #[arg(long, env = "CONVERTED_FOLDER", default_value = DEFAULT_CONVERTED_DIR)]
    converted_dir: PathBuf,

    /// Comma-separated client addresses allowed to connect. Empty rejects all.
    #[arg(long, env = "ALLOWED_IPS", default_value = "")]
    allowed_ips: String,

    /// Request body cap in MiB.
    #[arg(long, env = "SCAN2DOCX_MAX_REQUEST_MB", default_value_t = 100)]
    max_request_mb: usize,

    /// Accept request bodies of any size.
    #[arg(long)]
    no_size_limit: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// PDF, PNG or JPEG file.
    input: PathBuf,

    /// Output file name. Default: the input name with a .docx extension.
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, env = "CONVERTED_FOLDER", default_value = DEFAULT_CONVERTED_DIR)]
    output_dir: PathBuf,

    /// Correct the OCR text with the AI model (needs OPENAI_API_KEY).
    #[arg(long)]
    ai: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SCAN2DOCX_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct RecentArgs {
    #[arg(long, env = "CONVERTED_FOLDER", default_value = DEFAULT_CONVERTED_DIR)]
    dir: PathBuf,

    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for one-shot conversions.
    let progress_bar_active = matches!(&cli.command, Command::Convert(a) if !a.no_progress);
    let filter = if cli.verbose {
        "scan2docx=debug,tower_http=debug"
    } else if cli.quiet || progress_bar_active {
        "error"
    } else {
        "scan2docx=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Convert(args) => convert_one(args, cli.quiet).await,
        Command::Recent(args) => {
            for name in list_recent(&args.dir, args.count).await {
                println!("{name}");
            }
            Ok(())
        }
        Command::Inspect { docx } => inspect(&docx),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let allowed_ips = parse_allow_list(&args.allowed_ips).context("Invalid ALLOWED_IPS")?;
    let service = ServiceConfig {
        bind: SocketAddr::new(args.host, args.port),
        upload_dir: args.upload_dir,
        converted_dir: args.converted_dir,
        allowed_ips,
        max_request_bytes: (!args.no_size_limit).then(|| args.max_request_mb * 1024 * 1024),
        ..ServiceConfig::default()
    };

    for dir in [&service.upload_dir, &service.converted_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let conversion = build_config(&args.pipeline, &service.converted_dir, None)?;
    let bind = service.bind;
    info!(
        "Starting scan2docx v{} ({} allowed address(es), body cap {})",
        env!("CARGO_PKG_VERSION"),
        service.allowed_ips.len(),
        match service.max_request_bytes {
            Some(n) => format!("{} MiB", n / (1024 * 1024)),
            None => "off".to_string(),
        }
    );
    let app = router(AppState::new(service, conversion));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on http://{}", bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn convert_one(args: ConvertArgs, quiet: bool) -> Result<()> {
    let output_name = match args.output {
        Some(name) => name,
        None => default_output_name(&args.input)?,
    };

    let progress: Option<ProgressCallback> = if args.no_progress || quiet {
        None
    } else {
        Some(CliProgressCallback::new())
    };
    let config = build_config(&args.pipeline, &args.output_dir, progress)?;
    if args.ai && config.corrector.is_none() {
        warn!("--ai given but no corrector is available; pages keep their OCR text");
    }

    let output = convert(&args.input, &output_name, args.ai, &config)
        .await
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    println!("{}", output.path.display());
    if !quiet {
        eprintln!(
            "   {}",
            dim(&format!(
                "render {}ms  ·  ocr {}ms  ·  {}ms total",
                output.stats.render_duration_ms,
                output.stats.ocr_duration_ms,
                output.stats.total_duration_ms
            ))
        );
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let paragraphs =
        read_paragraphs(path).with_context(|| format!("Failed to read {}", path.display()))?;
    for (i, text) in paragraphs.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", dim(&format!("── paragraph {} ──", i + 1)));
        println!("{text}");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`, attaching an OpenAI corrector when
/// `OPENAI_API_KEY` is set.
fn build_config(
    args: &PipelineArgs,
    output_dir: &Path,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .output_dir(output_dir)
        .dpi(args.dpi)
        .sharpen_images(args.sharpen)
        .correction_model(args.model.as_str())
        .correction_timeout_secs(args.correction_timeout);
    if let Some(ref lang) = args.ocr_language {
        builder = builder.ocr_language(lang.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let mut config = builder.build().context("Invalid configuration")?;

    let has_key = std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty());
    if has_key {
        match LlmCorrector::openai(&config) {
            Ok(c) => {
                let corrector: Arc<dyn TextCorrector> = Arc::new(c);
                config.corrector = Some(corrector);
            }
            Err(e) => warn!("AI correction disabled: {}", e),
        }
    } else {
        info!("OPENAI_API_KEY not set; AI correction requests will keep the OCR text");
    }

    Ok(config)
}

fn default_output_name(input: &Path) -> Result<String> {
    let stem = input
        .file_stem()
        .with_context(|| format!("{} has no file name", input.display()))?;
    Ok(format!("{}.docx", stem.to_string_lossy()))
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
