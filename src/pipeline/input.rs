//! Input resolution: normalise a user-supplied path or URL to image bytes.
//!
//! ## Why validate magic bytes here?
//!
//! Vision APIs reject malformed payloads with opaque provider-specific
//! errors, and a batch run should not burn a network round-trip (plus
//! retries) on a file that was never an image. Sniffing the first bytes up
//! front turns "HTTP 400 from provider X" into a precise local error before
//! any item is marked processing.

use crate::error::Math2AnyError;
use crate::pipeline::encode;
use std::path::PathBuf;
use tracing::{debug, info};

/// Raw image bytes plus the display name they were resolved under.
#[derive(Debug)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    /// Basename of the path or final URL segment; used for item display
    /// names and export filenames.
    pub name: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to validated image bytes.
///
/// If the input is a URL, download it (bounded by `timeout_secs`).
/// If the input is a local file, read it directly.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedImage, Math2AnyError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Read a local file, validating existence and image magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedImage, Math2AnyError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Math2AnyError::FileNotFound { path });
    }

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Math2AnyError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Math2AnyError::FileNotFound { path });
        }
    };

    validate_magic(&bytes, &path)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Resolved local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedImage { bytes, name })
}

/// Download a URL and return the validated bytes.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedImage, Math2AnyError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Math2AnyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Math2AnyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Math2AnyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Math2AnyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Math2AnyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    validate_magic(&bytes, &PathBuf::from(&name))?;

    info!("Downloaded {} bytes as '{}'", bytes.len(), name);
    Ok(ResolvedImage { bytes, name })
}

fn validate_magic(bytes: &[u8], path: &std::path::Path) -> Result<(), Math2AnyError> {
    if encode::sniff_mime(bytes).is_none() {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Math2AnyError::NotAnImage {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal valid PNG header followed by junk; enough for magic sniffing.
    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/eq.png"));
        assert!(is_url("http://example.com/eq.png"));
        assert!(!is_url("/tmp/eq.png"));
        assert!(!is_url("eq.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn local_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formula.png");
        std::fs::write(&path, PNG_HEADER).unwrap();

        let resolved = resolve_local(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved.name, "formula.png");
        assert_eq!(resolved.bytes, PNG_HEADER);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local("/no/such/file.png").unwrap_err();
        assert!(matches!(err, Math2AnyError::FileNotFound { .. }));
    }

    #[test]
    fn non_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"just some text").unwrap();

        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Math2AnyError::NotAnImage { .. }));
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(
            extract_filename("https://example.com/scans/eq-01.png"),
            "eq-01.png"
        );
        assert_eq!(extract_filename("https://example.com/"), "downloaded.png");
    }
}
