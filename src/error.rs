//! Error types for the math2any library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Math2AnyError`] — **Fatal**: the run cannot proceed at all (bad input
//!   file, provider not configured, export destination unwritable). Returned
//!   as `Err(Math2AnyError)` from the top-level entry points.
//!
//! * [`ItemError`] — **Non-fatal**: a single batch item failed (unreadable
//!   image, recognition exhausted its retries) but the rest of the queue is
//!   fine. Stored inside [`crate::batch::BatchItem`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad image.
//!
//! Transcoding never appears in either taxonomy: the engine absorbs its own
//! failures and degrades to a fallback rendering per format.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the math2any library.
///
/// Item-level failures use [`ItemError`] and are stored on the batch item
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum Math2AnyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a supported image format.
    #[error("File is not a supported image (png/jpeg/gif/webp/bmp): '{path}'\nFirst bytes: {magic:?}")]
    NotAnImage { path: PathBuf, magic: [u8; 4] },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    ///
    /// Checked once before a run starts; no batch item is touched when this
    /// is returned.
    #[error("Recognition provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// One-shot recognition failed (single-image API; batch items record
    /// [`ItemError`] instead).
    #[error("Recognition failed: {detail}")]
    RecognitionFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zip archive assembly failed.
    #[error("Failed to build zip archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single batch item.
///
/// Stored on the [`crate::batch::BatchItem`] when it ends `Failed`.
/// The overall run continues past a failed item.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The image could not be read or encoded for the provider.
    #[error("'{name}': image could not be prepared: {detail}")]
    ImageUnreadable { name: String, detail: String },

    /// Recognition failed after all retries.
    #[error("'{name}': recognition failed after {attempts} attempts: {detail}")]
    RecognitionFailed {
        name: String,
        attempts: u32,
        detail: String,
    },
}
