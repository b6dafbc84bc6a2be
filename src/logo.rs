use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mime::Mime;
use tracing::{info, warn};

use crate::error::LogoError;
use crate::models::Logo;

/// Read an image file into a logo. The extension must name an image type
/// and the content must match it; anything else is rejected untouched.
pub fn load_logo(path: &Path) -> Result<Logo, LogoError> {
    let bytes = fs::read(path).map_err(|source| LogoError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let declared = media_type_from_extension(path);
    let detected = sniff_media_type(&bytes);

    match (declared, detected) {
        (Some(declared), Some(detected)) if declared == detected && declared.type_() == mime::IMAGE => {
            info!(path = %path.display(), media_type = %detected, bytes = bytes.len(), "Logo accepted");
            Ok(Logo {
                media_type: detected.to_string(),
                data: STANDARD.encode(&bytes),
            })
        }
        _ => {
            warn!(path = %path.display(), "Rejected logo file that is not an image");
            Err(LogoError::NotAnImage {
                path: path.to_path_buf(),
            })
        }
    }
}

fn media_type_from_extension(path: &Path) -> Option<Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(mime::IMAGE_PNG),
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "gif" => Some(mime::IMAGE_GIF),
        "bmp" => Some(mime::IMAGE_BMP),
        "svg" => Some(mime::IMAGE_SVG),
        "webp" => "image/webp".parse().ok(),
        _ => None,
    }
}

fn sniff_media_type(bytes: &[u8]) -> Option<Mime> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(mime::IMAGE_PNG)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(mime::IMAGE_JPEG)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(mime::IMAGE_GIF)
    } else if bytes.starts_with(b"BM") {
        Some(mime::IMAGE_BMP)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp".parse().ok()
    } else if looks_like_svg(bytes) {
        Some(mime::IMAGE_SVG)
    } else {
        None
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    String::from_utf8_lossy(head).contains("<svg")
}
