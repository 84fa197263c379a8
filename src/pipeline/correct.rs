//! AI text correction: send one page of OCR text to a chat model.
//!
//! Correction is strictly best-effort. [`TextCorrector::correct`] returns a
//! typed [`CorrectionError`] instead of swallowing failures, and
//! [`correct_or_original`] is the single place that turns any error into a
//! fallback to the uncorrected text. There is no retry: a page either gets
//! corrected on the first call or keeps its OCR text.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, CorrectionError};
use crate::output::CorrectionOutcome;
use crate::pipeline::sanitize::sanitize_text;
use crate::prompts::{correction_request, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Rewrites OCR text. May be unavailable at any time.
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str) -> Result<String, CorrectionError>;
}

/// Correct `text` if asked to, falling back to `text` on any error.
///
/// The model's reply goes through the same sanitiser as OCR output.
///
/// Blank pages are never sent: there is nothing to correct and models tend
/// to answer an empty request with filler.
pub async fn correct_or_original(
    corrector: Option<&Arc<dyn TextCorrector>>,
    page_num: usize,
    text: String,
    use_ai: bool,
) -> (String, CorrectionOutcome) {
    if !use_ai {
        return (text, CorrectionOutcome::NotRequested);
    }
    if text.trim().is_empty() {
        return (text, CorrectionOutcome::SkippedBlank);
    }

    let result = match corrector {
        Some(c) => c.correct(&text).await,
        None => Err(CorrectionError::NotConfigured),
    };

    match result {
        Ok(corrected) => {
            let corrected = sanitize_text(&corrected);
            debug!(
                "Page {}: corrected {} → {} chars",
                page_num,
                text.len(),
                corrected.len()
            );
            (corrected, CorrectionOutcome::Applied)
        }
        Err(e) => {
            warn!("Page {}: correction unavailable, keeping OCR text: {}", page_num, e);
            (text, CorrectionOutcome::FellBack(e))
        }
    }
}

/// [`TextCorrector`] backed by an `edgequake-llm` chat provider.
pub struct LlmCorrector {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    max_tokens: usize,
    timeout_secs: u64,
}

impl LlmCorrector {
    /// Wrap an existing provider, taking prompt and limits from `config`.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: config.correction_max_tokens,
            timeout_secs: config.correction_timeout_secs,
        }
    }

    /// Build an OpenAI-backed corrector for `config.correction_model`.
    ///
    /// The provider factory reads `OPENAI_API_KEY` from the environment.
    pub fn openai(config: &ConversionConfig) -> Result<Self, ConvertError> {
        let provider = create_provider("openai", &config.correction_model)?;
        Ok(Self::new(provider, config))
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TextCorrector for LlmCorrector {
    async fn correct(&self, text: &str) -> Result<String, CorrectionError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(correction_request(text)),
        ];
        let options = self.build_options();

        let response = timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| CorrectionError::Timeout {
            secs: self.timeout_secs,
        })?
        .map_err(|e| CorrectionError::Provider(e.to_string()))?;

        debug!(
            "Correction used {} input / {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        let corrected = response.content.trim();
        if corrected.is_empty() {
            return Err(CorrectionError::EmptyResponse);
        }
        Ok(corrected.to_string())
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ConvertError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ConvertError::InvalidConfig(format!(
            "text corrector provider '{provider_name}' is not available: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl TextCorrector for Upper {
        async fn correct(&self, text: &str) -> Result<String, CorrectionError> {
            Ok(text.to_uppercase())
        }
    }

    struct Offline;

    #[async_trait]
    impl TextCorrector for Offline {
        async fn correct(&self, _text: &str) -> Result<String, CorrectionError> {
            Err(CorrectionError::Provider("connection refused".into()))
        }
    }

    struct Noisy;

    #[async_trait]
    impl TextCorrector for Noisy {
        async fn correct(&self, _text: &str) -> Result<String, CorrectionError> {
            Ok("The quick\u{0B}fox\u{1B}[0m\u{FFFE}".into())
        }
    }

    #[tokio::test]
    async fn corrected_text_is_sanitised() {
        let c: Arc<dyn TextCorrector> = Arc::new(Noisy);
        let (text, outcome) = correct_or_original(Some(&c), 1, "the quick fox".into(), true).await;
        assert_eq!(text, "The quickfox[0m");
        assert_eq!(outcome, CorrectionOutcome::Applied);
    }

    #[tokio::test]
    async fn not_requested_leaves_text_alone() {
        let c: Arc<dyn TextCorrector> = Arc::new(Upper);
        let (text, outcome) = correct_or_original(Some(&c), 1, "abc".into(), false).await;
        assert_eq!(text, "abc");
        assert_eq!(outcome, CorrectionOutcome::NotRequested);
    }

    #[tokio::test]
    async fn applied_when_corrector_answers() {
        let c: Arc<dyn TextCorrector> = Arc::new(Upper);
        let (text, outcome) = correct_or_original(Some(&c), 1, "abc".into(), true).await;
        assert_eq!(text, "ABC");
        assert_eq!(outcome, CorrectionOutcome::Applied);
    }

    #[tokio::test]
    async fn falls_back_on_provider_error() {
        let c: Arc<dyn TextCorrector> = Arc::new(Offline);
        let (text, outcome) = correct_or_original(Some(&c), 2, "abc".into(), true).await;
        assert_eq!(text, "abc");
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn falls_back_when_not_configured() {
        let (text, outcome) = correct_or_original(None, 1, "abc".into(), true).await;
        assert_eq!(text, "abc");
        assert_eq!(
            outcome,
            CorrectionOutcome::FellBack(CorrectionError::NotConfigured)
        );
    }

    #[tokio::test]
    async fn blank_pages_are_not_sent() {
        let c: Arc<dyn TextCorrector> = Arc::new(Offline);
        let (text, outcome) = correct_or_original(Some(&c), 1, " \n".into(), true).await;
        assert_eq!(text, " \n");
        assert_eq!(outcome, CorrectionOutcome::SkippedBlank);
    }
}
