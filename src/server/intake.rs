//! Upload intake: multipart form reading, filename sanitising, pasted images.

use super::error::AppError;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, TimeZone};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Fixed upload name for images pasted into the form.
pub const PASTED_IMAGE_NAME: &str = "pasted_image.png";

/// Fixed upload name for files posted to `/convert`.
pub const API_UPLOAD_NAME: &str = "pasted_image1.png";

static DATA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(?P<mime_type>[^;,]*)(?:;[^,]*)?,(?P<data>.*)$").expect("valid regex")
});

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"));

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A file part of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied name, unsanitised. Empty when the browser sent no file.
    pub filename: String,
    pub data: Bytes,
}

/// The fields the upload endpoints understand.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub pasted_image: Option<String>,
    pub use_ai: bool,
}

/// Read every field of a multipart body.
///
/// Only parts that carry a filename count as files; a plain `file` text
/// field is ignored. Unknown fields are drained and dropped.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" if field.file_name().is_some() => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                debug!("Received file field '{}' ({} bytes)", filename, data.len());
                form.file = Some(UploadedFile { filename, data });
            }
            "pasted_image" => {
                let text = field.text().await.map_err(multipart_error)?;
                debug!("Received pasted image ({} chars)", text.len());
                form.pasted_image = Some(text);
            }
            "use_ai" => {
                let text = field.text().await.map_err(multipart_error)?;
                form.use_ai = parse_flag(&text);
            }
            _ => {
                field.bytes().await.map_err(multipart_error)?;
            }
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::MalformedUpload(e.body_text())
    }
}

/// Checkbox-style form flag: `on` (HTML forms) or `true` (API clients).
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "on" | "true")
}

/// Make a client-supplied filename safe to join onto a directory.
///
/// Folds to ASCII, turns path separators into spaces, joins whitespace runs
/// with `_`, drops everything outside `[A-Za-z0-9_.-]`, then strips leading
/// and trailing `.` and `_`. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    let name = kept.trim_matches(|c| c == '.' || c == '_');

    let base = name.split('.').next().unwrap_or("").to_ascii_uppercase();
    if !name.is_empty() && WINDOWS_DEVICE_NAMES.contains(&base.as_str()) {
        format!("_{name}")
    } else {
        name.to_string()
    }
}

/// `scan.pdf` → `scan.docx`.
pub fn docx_name_for(upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.docx")
}

/// `pasted_image_<DDHHMM>.docx`.
pub fn pasted_docx_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("pasted_image_{}.docx", now.format("%d%H%M"))
}

/// The base64 payload of a data URL, or the whole input if it has no prefix.
pub fn data_url_payload(data_url: &str) -> &str {
    match DATA_URL_RE.captures(data_url) {
        Some(caps) => {
            let mime = caps.name("mime_type").map(|m| m.as_str()).unwrap_or("");
            debug!("Pasted image declared as '{}'", mime);
            caps.name("data").map(|m| m.as_str()).unwrap_or("")
        }
        None => data_url
            .split_once(',')
            .map(|(_, data)| data)
            .unwrap_or(data_url),
    }
}

/// Decode a pasted `data:image/...;base64,...` string into an image.
pub fn decode_pasted_image(data_url: &str) -> Result<DynamicImage, AppError> {
    let payload: String = data_url_payload(data_url)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| AppError::UndecodableImage(format!("invalid base64: {e}")))?;
    image::load_from_memory(&bytes)
        .map_err(|e| AppError::UndecodableImage(format!("invalid image data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use std::io::Cursor;

    fn png_data_url(w: u32, h: u32) -> String {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(w, h)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(buf.into_inner()))
    }

    #[test]
    fn secure_filename_basics() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(secure_filename("scan.PDF"), "scan.PDF");
    }

    #[test]
    fn secure_filename_strips_edges_and_specials() {
        assert_eq!(secure_filename("..hidden.pdf"), "hidden.pdf");
        assert_eq!(secure_filename("__init__.png"), "init__.png");
        assert_eq!(secure_filename("a<b>c|d?.jpg"), "abcd.jpg");
        assert_eq!(secure_filename("C:\\Users\\me\\scan.jpg"), "C_Users_me_scan.jpg");
        assert_eq!(secure_filename("\u{0436}\u{0443}\u{0440}.pdf"), "pdf");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn secure_filename_prefixes_device_names() {
        assert_eq!(secure_filename("con.pdf"), "_con.pdf");
        assert_eq!(secure_filename("LPT1"), "_LPT1");
        assert_eq!(secure_filename("console.pdf"), "console.pdf");
    }

    #[test]
    fn secure_filename_is_idempotent() {
        for s in ["My cool movie.mov", "../a b/c.pdf", "con.pdf", "\u{e9}t\u{e9}.jpg"] {
            let once = secure_filename(s);
            assert_eq!(secure_filename(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn docx_name_replaces_last_extension() {
        assert_eq!(docx_name_for("scan.jpg"), "scan.docx");
        assert_eq!(docx_name_for("report.v2.pdf"), "report.v2.docx");
    }

    #[test]
    fn pasted_name_uses_day_hour_minute() {
        let t = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 59)
            .unwrap();
        assert_eq!(pasted_docx_name(&t), "pasted_image_070905.docx");

        let name = pasted_docx_name(&Utc::now());
        assert_eq!(name.len(), "pasted_image_DDHHMM.docx".len());
    }

    #[test]
    fn flags() {
        assert!(parse_flag("on"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("1"));
    }

    #[test]
    fn payload_extraction() {
        assert_eq!(data_url_payload("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(data_url_payload("data:,QUJD"), "QUJD");
        assert_eq!(data_url_payload("whatever,QUJD"), "QUJD");
        assert_eq!(data_url_payload("QUJD"), "QUJD");
    }

    #[test]
    fn decodes_pasted_png() {
        let img = decode_pasted_image(&png_data_url(3, 2)).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
    }

    #[test]
    fn tolerates_line_wrapped_base64() {
        let url = png_data_url(2, 2);
        let (prefix, data) = url.split_once(',').unwrap();
        let wrapped: Vec<String> = data
            .as_bytes()
            .chunks(20)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        let img = decode_pasted_image(&format!("{prefix},{}", wrapped.join("\n"))).unwrap();
        assert_eq!(img.width(), 2);
    }

    #[test]
    fn rejects_bad_base64_and_non_images() {
        assert!(matches!(
            decode_pasted_image("data:image/png;base64,@@@"),
            Err(AppError::UndecodableImage(_))
        ));
        let not_image = format!("data:image/png;base64,{}", STANDARD.encode(b"hello"));
        assert!(matches!(
            decode_pasted_image(&not_image),
            Err(AppError::UndecodableImage(_))
        ));
    }
}
