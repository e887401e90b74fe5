//! Pipeline stages between an image reference and a recognition request.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ provider ──▶ transcode
//! (URL/path) (base64)  (VLM OCR)    (12 formats)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to raw image
//!    bytes, validating magic bytes up front
//! 2. [`encode`] — sniff the MIME type and base64-wrap the bytes for the
//!    multimodal API request body (re-encoding to PNG when the source
//!    format is outside the provider-accepted set)
//!
//! Recognition itself lives in [`crate::provider`]; everything after the
//! canonical expression lives in [`crate::transcode`].

pub mod encode;
pub mod input;
