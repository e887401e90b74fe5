//! Image encoding: raw bytes → base64 payload for the vision API.
//!
//! Vision APIs (OpenAI, Anthropic, Gemini) accept images as base64 data
//! embedded in the JSON request body, tagged with a MIME type. The type is
//! sniffed from content rather than the file extension — batch inputs come
//! from arbitrary sources and extensions lie. PNG/JPEG/GIF/WEBP pass
//! through untouched; BMP is re-encoded to PNG because no provider accepts
//! it directly.

use crate::error::Math2AnyError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Cursor;
use tracing::debug;

/// A base64-encoded image ready for the recognition gateway.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 of the (possibly re-encoded) image bytes.
    pub base64: String,
    /// MIME type matching `base64`.
    pub mime_type: &'static str,
}

/// Sniff the MIME type from magic bytes.
///
/// Returns `None` for anything outside the supported set
/// (png/jpeg/gif/webp/bmp).
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(b"RIFF") && bytes.len() >= 12 && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

/// Encode image bytes as a base64 payload.
///
/// BMP input is decoded and re-encoded as PNG; everything else is passed
/// through byte-for-byte so no quality is lost on already-supported
/// formats.
pub fn encode_image(bytes: &[u8]) -> Result<EncodedImage, Math2AnyError> {
    let mime = sniff_mime(bytes).ok_or_else(|| Math2AnyError::Internal(
        "encode_image called on unvalidated bytes".to_string(),
    ))?;

    if mime == "image/bmp" {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Math2AnyError::Internal(format!("BMP decode failed: {e}")))?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| Math2AnyError::Internal(format!("PNG re-encode failed: {e}")))?;
        let b64 = STANDARD.encode(&buf);
        debug!("Re-encoded BMP → PNG, {} bytes base64", b64.len());
        return Ok(EncodedImage {
            base64: b64,
            mime_type: "image/png",
        });
    }

    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());
    Ok(EncodedImage {
        base64: b64,
        mime_type: mime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn sniff_known_formats() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0, 0]), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"GIF89a......"), Some("image/gif"));
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"BM\x00\x00"), Some("image/bmp"));
        assert_eq!(sniff_mime(b"%PDF-1.7"), None);
        assert_eq!(sniff_mime(b""), None);
    }

    #[test]
    fn png_passes_through() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let encoded = encode_image(&png).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        let decoded = STANDARD.decode(&encoded.base64).unwrap();
        assert_eq!(decoded, png);
    }

    #[test]
    fn bmp_is_reencoded_to_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut bmp = Vec::new();
        img.write_to(&mut Cursor::new(&mut bmp), image::ImageFormat::Bmp)
            .unwrap();

        let encoded = encode_image(&bmp).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        let decoded = STANDARD.decode(&encoded.base64).unwrap();
        assert_eq!(sniff_mime(&decoded), Some("image/png"));
    }
}
