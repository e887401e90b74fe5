//! Configuration types for batch recognition runs.
//!
//! All run behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls, serialise the plain fields for
//! logging, and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::Math2AnyError;
use crate::progress::ProgressCallback;
use crate::provider::RecognitionGateway;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a batch recognition run.
///
/// Built via [`BatchConfig::builder()`] or using
/// [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use math2any::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4o")
///     .max_retries(3)
///     .inter_item_delay_ms(1500)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Recognition provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `gateway`, the provider is auto-detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// Vision model identifier, e.g. "gpt-4o", "claude-sonnet-4-20250514".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Pre-constructed recognition gateway. Takes precedence over
    /// `provider_name`. This is the injection point for tests and for
    /// callers that need custom middleware (caching, rate-limiting).
    pub gateway: Option<Arc<dyn RecognitionGateway>>,

    /// Format ids exporters act on. Default: latex, mathml, asciimath,
    /// markdown. The transcoding engine always renders the full catalog;
    /// this list only narrows what exports include.
    pub formats: Vec<String>,

    /// Maximum total attempts per item (first try included). Default: 3.
    ///
    /// Rate-limit and transient provider errors are frequent under batch
    /// load; three attempts catch the vast majority without stalling the
    /// queue for long. A structured fatal error fails the item immediately
    /// regardless of this setting.
    pub max_retries: u32,

    /// Base retry delay in milliseconds. Default: 1000.
    ///
    /// Rate-limited failures back off exponentially from this base
    /// (`base·2^attempt`, capped by `backoff_cap_ms`); other failures back
    /// off linearly (`base·attempt`). The split matters: a 429 means the
    /// provider needs breathing room that grows until it recovers, while a
    /// flaky 5xx usually clears on the next try.
    pub retry_backoff_ms: u64,

    /// Upper bound on a single backoff sleep in milliseconds. Default: 30000.
    pub backoff_cap_ms: u64,

    /// Delay between consecutive items in milliseconds. Default: 1000.
    ///
    /// Applied between processed items (never after the last) so a full
    /// queue does not hammer the provider at its burst limit. Skipped once
    /// cancellation is observed.
    pub inter_item_delay_ms: u64,

    /// Poll interval while paused, in milliseconds. Default: 500.
    ///
    /// The pause loop re-checks the control flags at this interval. It is a
    /// config knob rather than a constant so tests can run the pause
    /// machinery in milliseconds.
    pub pause_poll_ms: u64,

    /// Sampling temperature for the recognition call. Default: 0.1.
    ///
    /// Low temperature keeps the model deterministic and faithful to what
    /// it sees in the image — exactly what you want for transcription.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 4096.
    pub max_tokens: usize,

    /// Custom recognition prompt. If None, uses the built-in default.
    pub recognition_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Progress event sink. Default: none (derived queue progress is always
    /// available regardless).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            gateway: None,
            formats: vec![
                "latex".to_string(),
                "mathml".to_string(),
                "asciimath".to_string(),
                "markdown".to_string(),
            ],
            max_retries: 3,
            retry_backoff_ms: 1000,
            backoff_cap_ms: 30_000,
            inter_item_delay_ms: 1000,
            pause_poll_ms: 500,
            temperature: 0.1,
            max_tokens: 4096,
            recognition_prompt: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("gateway", &self.gateway.as_ref().map(|_| "<dyn RecognitionGateway>"))
            .field("formats", &self.formats)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("backoff_cap_ms", &self.backoff_cap_ms)
            .field("inter_item_delay_ms", &self.inter_item_delay_ms)
            .field("pause_poll_ms", &self.pause_poll_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Inter-item delay as a [`Duration`].
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }

    /// Pause poll interval as a [`Duration`].
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn RecognitionGateway>) -> Self {
        self.config.gateway = Some(gateway);
        self
    }

    pub fn formats(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.formats = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn backoff_cap_ms(mut self, ms: u64) -> Self {
        self.config.backoff_cap_ms = ms;
        self
    }

    pub fn inter_item_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_item_delay_ms = ms;
        self
    }

    pub fn pause_poll_ms(mut self, ms: u64) -> Self {
        self.config.pause_poll_ms = ms.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn recognition_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.recognition_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Math2AnyError> {
        let c = &self.config;
        if c.max_retries == 0 {
            return Err(Math2AnyError::InvalidConfig(
                "max_retries must be ≥ 1".into(),
            ));
        }
        if let Some(bad) = c
            .formats
            .iter()
            .find(|id| !crate::catalog::is_known_format(id))
        {
            return Err(Math2AnyError::InvalidConfig(format!(
                "unknown output format '{bad}'"
            )));
        }
        Ok(self.config)
    }
}
