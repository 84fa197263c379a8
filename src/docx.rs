//! DOCX writer and paragraph reader on top of `docx-rs`.
//!
//! One page of text becomes one `<w:p>`. Inside a paragraph, `\n` / `\r\n` /
//! `\r` become text-wrapping breaks and `\t` becomes a tab, matching how word
//! processors represent soft line breaks typed into a single paragraph.

use crate::error::ConvertError;
use crate::pipeline::sanitize::sanitize_text;
use docx_rs::{
    read_docx, BreakType, Docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild,
};
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;

/// Errors reading a DOCX back.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a readable DOCX: {0}")]
    Read(String),
}

/// An in-memory document: an ordered list of paragraphs.
#[derive(Debug, Clone, Default)]
pub struct DocxDocument {
    paragraphs: Vec<String>,
}

impl DocxDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one paragraph. Characters XML 1.0 cannot carry are dropped.
    pub fn add_paragraph(&mut self, text: impl AsRef<str>) {
        self.paragraphs.push(sanitize_text(text.as_ref()));
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    fn to_docx(&self) -> Docx {
        self.paragraphs
            .iter()
            .fold(Docx::new(), |docx, text| docx.add_paragraph(paragraph(text)))
    }

    /// Serialise the whole package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConvertError> {
        let mut buf = Cursor::new(Vec::new());
        self.to_docx()
            .build()
            .pack(&mut buf)
            .map_err(|e| ConvertError::DocxBuildFailed(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Write the package to `path` atomically.
    ///
    /// The bytes go to a uniquely named hidden temp file in the same
    /// directory which is then renamed over `path`, so readers never see a
    /// partial document and concurrent writers of the same name cannot
    /// interleave.
    pub fn save(&self, path: &Path) -> Result<(), ConvertError> {
        let bytes = self.to_bytes()?;
        let write_failed = |source: std::io::Error| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".scan2docx-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(write_failed)?;
        tmp.write_all(&bytes).map_err(write_failed)?;
        tmp.as_file().sync_all().map_err(write_failed)?;
        tmp.persist(path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }
}

fn paragraph(text: &str) -> Paragraph {
    if text.is_empty() {
        return Paragraph::new();
    }

    let mut run = Run::new();
    let mut pending = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' | '\t' => {
                if !pending.is_empty() {
                    run = run.add_text(std::mem::take(&mut pending));
                }
                if c == '\t' {
                    run = run.add_tab();
                } else {
                    if c == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    run = run.add_break(BreakType::TextWrapping);
                }
            }
            _ => pending.push(c),
        }
    }
    if !pending.is_empty() {
        run = run.add_text(pending);
    }
    Paragraph::new().add_run(run)
}

/// Read the paragraphs of a DOCX file, in document order.
///
/// Breaks read back as `\n` and tabs as `\t`. Empty paragraphs are kept.
pub fn read_paragraphs(path: &Path) -> Result<Vec<String>, DocxError> {
    let bytes = std::fs::read(path)?;
    read_paragraphs_from(&bytes)
}

/// Like [`read_paragraphs`], over the bytes of a package.
pub fn read_paragraphs_from(bytes: &[u8]) -> Result<Vec<String>, DocxError> {
    let docx = read_docx(bytes).map_err(|e| DocxError::Read(e.to_string()))?;
    Ok(docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect())
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Break(_) => text.push('\n'),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}
