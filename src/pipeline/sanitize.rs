//! Text sanitisation: keep only characters XML 1.0 documents can carry.
//!
//! OCR output routinely contains form feeds (tesseract ends every page with
//! `\x0c`), stray control bytes from misread noise, and occasionally
//! non-characters. Any of them makes `document.xml` ill-formed and Word
//! refuses to open the file, so they are dropped before the text reaches the
//! corrector or the document.

/// Whether `c` survives sanitisation.
///
/// Allowed: tab, LF, CR, U+0020–U+007E, U+00A0–U+D7FF, U+E000–U+FFFD.
/// Everything else (C0/C1 controls, DEL, U+FFFE/U+FFFF, supplementary planes)
/// is removed. Surrogates cannot occur in a Rust `char`.
pub fn is_allowed_char(c: char) -> bool {
    matches!(c,
        '\u{09}' | '\u{0A}' | '\u{0D}'
        | '\u{20}'..='\u{7E}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}')
}

/// Remove every character outside the allowed set. Idempotent.
pub fn sanitize_text(input: &str) -> String {
    input.chars().filter(|&c| is_allowed_char(c)).collect()
}
