//! The recognition gateway: image in, canonical LaTeX out.
//!
//! [`RecognitionGateway`] is the seam between the orchestrator and the
//! outside world. The production implementation ([`VisionGateway`]) drives
//! a vision LLM through `edgequake-llm`; tests substitute an in-memory
//! scripted gateway, which is why the trait object (not a concrete client)
//! is what the orchestrator receives.
//!
//! ## Error classification
//!
//! Gateways report failures as [`RecognitionError`] carrying a structured
//! [`RecognitionErrorKind`]. Providers that surface only free-form message
//! text go through [`RecognitionError::from_message`], which classifies by
//! case-insensitive substring match ("rate"/"quota"/"429"/"exceeded" →
//! rate-limited). The substring rule is a compatibility shim for gateways
//! whose error text cannot be changed; anything built fresh should
//! construct the structured kind directly.

use crate::config::BatchConfig;
use crate::error::Math2AnyError;
use crate::output::Expression;
use crate::pipeline::encode::EncodedImage;
use crate::prompts::RECOGNITION_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

// ── Errors ───────────────────────────────────────────────────────────────

/// How a recognition failure should shape the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Provider asked us to slow down (429 / quota). Retried with
    /// exponential, capped backoff.
    RateLimited,
    /// Anything that may clear on its own (5xx, timeout, network blip).
    /// Retried with linear backoff.
    Transient,
    /// Retrying cannot help (invalid key, unsupported model). Fails the
    /// item on the first attempt.
    Fatal,
}

/// A recognition failure from the gateway.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RecognitionError {
    pub kind: RecognitionErrorKind,
    pub message: String,
}

impl RecognitionError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: RecognitionErrorKind::RateLimited,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: RecognitionErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: RecognitionErrorKind::Fatal,
            message: message.into(),
        }
    }

    /// Classify a message-only error by substring matching.
    ///
    /// Compatibility shim for providers whose errors arrive as opaque text.
    /// Never produces `Fatal` — a shim cannot tell a bad key from a bad
    /// day, so it always leaves the retry budget available.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let rate_limited = ["rate", "quota", "429", "exceeded"]
            .iter()
            .any(|needle| lower.contains(needle));
        Self {
            kind: if rate_limited {
                RecognitionErrorKind::RateLimited
            } else {
                RecognitionErrorKind::Transient
            },
            message,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == RecognitionErrorKind::RateLimited
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == RecognitionErrorKind::Fatal
    }
}

// ── Gateway trait ────────────────────────────────────────────────────────

/// External OCR oracle converting one image into one canonical expression.
#[async_trait]
pub trait RecognitionGateway: Send + Sync {
    /// Recognize the mathematical content of `image` as LaTeX.
    async fn recognize(&self, image: &EncodedImage) -> Result<Expression, RecognitionError>;

    /// Human-readable provider name for logs and error messages.
    fn name(&self) -> &str;
}

// ── Response cleaning ────────────────────────────────────────────────────

static RE_OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:latex|tex|math)?[ \t]*\n?").unwrap());
static RE_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n?```\s*$").unwrap());

/// Strip markdown fencing and backtick wrapping from a model response.
///
/// Models wrap output in ` ```latex ` fences or single backticks despite
/// the prompt forbidding it; the canonical expression must contain neither.
pub fn clean_response(text: &str) -> String {
    let mut cleaned = text.trim().to_string();

    cleaned = RE_OPEN_FENCE.replace(&cleaned, "").to_string();
    cleaned = RE_CLOSE_FENCE.replace(&cleaned, "").to_string();

    if cleaned.starts_with('`') && cleaned.ends_with('`') && cleaned.len() >= 2 {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }

    cleaned.trim().to_string()
}

// ── Production gateway ───────────────────────────────────────────────────

/// Recognition gateway backed by an `edgequake-llm` vision provider.
pub struct VisionGateway {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    prompt: String,
    temperature: f32,
    max_tokens: usize,
}

impl VisionGateway {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        config: &BatchConfig,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            prompt: config
                .recognition_prompt
                .clone()
                .unwrap_or_else(|| RECOGNITION_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl RecognitionGateway for VisionGateway {
    async fn recognize(&self, image: &EncodedImage) -> Result<Expression, RecognitionError> {
        // The empty user text is intentional: vision APIs require at least
        // one user turn, but the image carries all the actual content.
        let messages = vec![
            ChatMessage::system(&self.prompt),
            ChatMessage::user_with_images(
                "",
                vec![ImageData::new(image.base64.clone(), image.mime_type).with_detail("high")],
            ),
        ];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| RecognitionError::from_message(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider_name, response.prompt_tokens, response.completion_tokens
        );

        let latex = clean_response(&response.content);
        if latex.is_empty() {
            return Err(RecognitionError::transient(
                "provider returned an empty response",
            ));
        }

        Ok(Expression::new(latex))
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

// ── Gateway resolution ───────────────────────────────────────────────────

/// Resolve the recognition gateway, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built gateway** (`config.gateway`) — the caller constructed and
///    configured the gateway entirely; we use it as-is. Used by tests and
///    by callers that need custom middleware.
///
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment
///    via [`ProviderFactory::create_llm_provider`].
///
/// 3. **Environment pair** (`MATH2ANY_PROVIDER` + `MATH2ANY_MODEL`) — both
///    set means the execution environment (Makefile, shell script, CI)
///    chose for us; checked before auto-detection so the model choice is
///    honoured even when multiple API keys are present.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — scans all
///    known API key variables and picks the first available provider, with
///    an explicit preference for OpenAI when its key is present.
///
/// Any failure here aborts before a single batch item is touched.
pub fn resolve_gateway(config: &BatchConfig) -> Result<Arc<dyn RecognitionGateway>, Math2AnyError> {
    // 1) User-provided gateway takes priority
    if let Some(ref gateway) = config.gateway {
        return Ok(Arc::clone(gateway));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4o");
        let provider = create_vision_provider(name, model)?;
        return Ok(Arc::new(VisionGateway::new(provider, name.clone(), config)));
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("MATH2ANY_PROVIDER"),
        std::env::var("MATH2ANY_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let provider = create_vision_provider(&prov, &model)?;
            return Ok(Arc::new(VisionGateway::new(provider, prov, config)));
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a predictable default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4o");
            let provider = create_vision_provider("openai", model)?;
            return Ok(Arc::new(VisionGateway::new(provider, "openai", config)));
        }
    }

    // 4) Full auto-detection
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Math2AnyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(VisionGateway::new(llm_provider, "auto", config)))
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Math2AnyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Math2AnyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
