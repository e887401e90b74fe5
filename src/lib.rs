//! # math2any
//!
//! Convert images of mathematical expressions to LaTeX and a dozen target
//! formats using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classical math OCR engines emit a single output format and stumble on
//! handwriting, mixed scripts, and multi-line derivations. Instead this
//! crate hands the image to a vision model, takes back one canonical LaTeX
//! expression, and transcodes it deterministically into every format the
//! catalog knows — MathML (presentation and content), AsciiMath, SymPy,
//! Wolfram, Maple, Typst, Markdown, XHTML, and plain Unicode.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image(s)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Encode     magic-byte sniff → base64 payload
//!  ├─ 3. Recognize  vision-LLM OCR call (gpt-4o / claude / gemini / …)
//!  ├─ 4. Transcode  LaTeX → 12-format output bundle
//!  └─ 5. Export     flat text, XHTML+MathML table, or zip archive
//! ```
//!
//! Batch runs drive steps 1–4 sequentially across a queue with retry,
//! backoff, pause, and cancellation; see [`batch`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use math2any::{convert_image, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = BatchConfig::default();
//!     let bundle = convert_image("formula.png", &config).await?;
//!     println!("{}", bundle.latex());
//!     println!("{}", bundle.get("mathml").unwrap());
//!     Ok(())
//! }
//! ```
//!
//! Batch processing:
//!
//! ```rust,no_run
//! use math2any::{run_batch, BatchConfig, BatchQueue, BatchRunContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut queue = BatchQueue::new();
//!     queue.enqueue("scan-01.png");
//!     queue.enqueue("scan-02.png");
//!
//!     let ctx = BatchRunContext::with_queue(queue);
//!     let report = run_batch(&ctx, &BatchConfig::default()).await?;
//!     println!("{}/{} completed", report.completed, report.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `math2any` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! math2any = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod transcode;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    retry_failed, run_batch, BatchItem, BatchProgress, BatchQueue, BatchRunContext, ItemStatus,
    RunControl,
};
pub use catalog::{format_by_id, FormatCategory, OutputFormat, FORMATS};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use error::{ItemError, Math2AnyError};
pub use output::{BatchRunReport, Expression, OutputBundle};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{RecognitionError, RecognitionErrorKind, RecognitionGateway, VisionGateway};
pub use transcode::transcode;

use tracing::info;

/// Recognize and transcode a single image (the one-shot flow).
///
/// Resolves the gateway, reads or downloads the image, runs one
/// recognition call, and returns the full output bundle. Unlike a batch
/// run there is no retry here — interactive callers would rather see the
/// error immediately than wait out a backoff schedule.
///
/// # Errors
/// Fatal only: unreadable input, unconfigured provider, or a failed
/// recognition call.
pub async fn convert_image(
    input: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<OutputBundle, Math2AnyError> {
    let input = input.as_ref();
    let gateway = provider::resolve_gateway(config)?;

    let resolved = pipeline::input::resolve_input(input, config.download_timeout_secs).await?;
    let encoded = pipeline::encode::encode_image(&resolved.bytes)?;

    let expression = gateway
        .recognize(&encoded)
        .await
        .map_err(|e| Math2AnyError::RecognitionFailed {
            detail: e.to_string(),
        })?;

    info!(
        "'{}' recognized via {}: {} chars of LaTeX",
        resolved.name,
        gateway.name(),
        expression.as_str().len()
    );

    Ok(transcode(&expression))
}
