//! Prompts for the AI text-correction step.
//!
//! Kept in one place so the wording can be inspected in tests and changed
//! without touching the provider or fallback logic in
//! [`crate::pipeline::correct`]. Callers can override the system prompt via
//! [`crate::config::ConversionConfig::system_prompt`].

/// Default system prompt for correcting OCR output.
///
/// The page text itself goes in the user turn, see [`correction_request`].
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a text corrector.";

/// Build the user message carrying one page of OCR text.
pub fn correction_request(text: &str) -> String {
    format!("Correct the following text:\n\n{}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_embeds_text_after_instruction() {
        let msg = correction_request("Tbe qu1ck fox");
        assert!(msg.starts_with("Correct the following text:\n\n"));
        assert!(msg.ends_with("Tbe qu1ck fox"));
    }
}
