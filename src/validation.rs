//! Local input checks run before any request is issued.

use crate::config::{
    MAX_FILE_SIZE_BYTES, MAX_FOLDER_NAME_LEN, RESERVED_FOLDER_NAME_CHARS,
    SUPPORTED_IMAGE_MIME_TYPES,
};
use crate::error::ValidationError;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches names free of reserved characters.
static FOLDER_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let reserved: String = RESERVED_FOLDER_NAME_CHARS
        .iter()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    Regex::new(&format!("^[^{}]+$", reserved)).expect("reserved characters form a valid class")
});

/// Validates a folder name and returns it trimmed.
pub fn validate_folder_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFolderName);
    }

    let len = trimmed.chars().count();
    if len > MAX_FOLDER_NAME_LEN {
        return Err(ValidationError::FolderNameTooLong {
            max: MAX_FOLDER_NAME_LEN,
            actual: len,
        });
    }

    if !FOLDER_NAME_PATTERN.is_match(trimmed) || trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFolderNameCharacters);
    }

    Ok(trimmed.to_string())
}

/// Validates an upload and returns the sniffed MIME type of the image data.
pub fn validate_image_upload(
    name: &str,
    folder_id: Option<&str>,
    bytes: &[u8],
) -> Result<&'static str, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyImageName);
    }
    if folder_id.is_none_or(|id| id.trim().is_empty()) {
        return Err(ValidationError::FolderRequired);
    }
    if bytes.is_empty() {
        return Err(ValidationError::MissingImageData);
    }
    if bytes.len() > MAX_FILE_SIZE_BYTES {
        return Err(ValidationError::ImageTooLarge {
            max_bytes: MAX_FILE_SIZE_BYTES,
            actual: bytes.len(),
        });
    }

    let mime = sniff_mime_type(bytes).ok_or(ValidationError::UnsupportedImageType)?;
    if SUPPORTED_IMAGE_MIME_TYPES.contains(&mime) {
        Ok(mime)
    } else {
        Err(ValidationError::UnsupportedImageType)
    }
}

/// Detects the MIME type from the leading bytes of the data.
fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Some("image/jpeg"),
        Ok(ImageFormat::Png) => Some("image/png"),
        Ok(ImageFormat::Gif) => Some("image/gif"),
        Ok(ImageFormat::WebP) => Some("image/webp"),
        Ok(format) => Some(format.to_mime_type()),
        // SVG is text and has no magic number
        Err(_) if looks_like_svg(bytes) => Some("image/svg+xml"),
        Err(_) => None,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with("<?xml") || text.starts_with("<svg")) && text.contains("<svg")
}
