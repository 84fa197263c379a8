//! Input resolution: validate a source path and classify it by extension.
//!
//! The kind decides the whole pipeline branch (every page of a PDF vs. one
//! raster image), so it is computed once up front. Classification is by
//! extension only, case-insensitively; content sniffing happens later when
//! the image is decoded.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by the upload gate and the pipeline.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// What kind of source document the pipeline is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Multi-page PDF; every page is rasterised.
    Pdf,
    /// Single raster image (png, jpg, jpeg).
    Image,
}

impl SourceKind {
    /// Classify an extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(SourceKind::Image),
            _ => None,
        }
    }
}

/// A validated source path together with its kind.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Whether `filename` ends in one of [`ALLOWED_EXTENSIONS`].
///
/// The name needs a dot: `pdf` on its own is not an allowed file.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .and_then(|(_, ext)| SourceKind::from_extension(ext))
        .is_some()
}

/// Validate that `path` exists and has a supported extension.
pub fn resolve_source(path: &Path) -> Result<ResolvedSource, ConvertError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let kind = SourceKind::from_extension(&extension).ok_or_else(|| {
        ConvertError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: extension.clone(),
        }
    })?;

    if !path.is_file() {
        return Err(ConvertError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    debug!("Resolved {:?} source: {}", kind, path.display());
    Ok(ResolvedSource {
        path: path.to_path_buf(),
        kind,
    })
}

/// Reject output names that would escape the output directory.
pub fn validate_output_name(name: &str) -> Result<(), ConvertError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        Err(ConvertError::InvalidOutputName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("scan.pdf"));
        assert!(allowed_file("scan.PDF"));
        assert!(allowed_file("photo.JpEg"));
        assert!(allowed_file("archive.tar.png"));
        assert!(!allowed_file("setup.exe"));
        assert!(!allowed_file("pdf"));
        assert!(!allowed_file(""));
        assert!(!allowed_file("scan."));
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(SourceKind::from_extension("PDF"), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_extension("jpg"), Some(SourceKind::Image));
        assert_eq!(SourceKind::from_extension("tiff"), None);
    }

    #[test]
    fn resolve_rejects_unknown_extension_before_touching_disk() {
        let err = resolve_source(Path::new("/definitely/not/here.exe")).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn resolve_missing_file() {
        let err = resolve_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Scan.JPG");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        let resolved = resolve_source(&path).unwrap();
        assert_eq!(resolved.kind, SourceKind::Image);
    }

    #[test]
    fn output_name_validation() {
        assert!(validate_output_name("scan.docx").is_ok());
        assert!(validate_output_name("../scan.docx").is_err());
        assert!(validate_output_name("a/b.docx").is_err());
        assert!(validate_output_name("a\\b.docx").is_err());
        assert!(validate_output_name("").is_err());
        assert!(validate_output_name("..").is_err());
    }
}
