//! Upload validation: only PNG and JPEG are accepted.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::IntakeError;

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// MIME type sent to providers.
    pub fn media_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// File extensions the upload surface accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Check that a path carries one of the allowed extensions (case-insensitive).
pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Detect the image kind from content, rejecting anything but PNG/JPEG.
///
/// The extension is not trusted: a `.jpg` holding a GIF is rejected.
pub fn sniff(name: &str, bytes: &[u8]) -> Result<ImageKind, IntakeError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok(ImageKind::Png),
        Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
        _ => Err(IntakeError::UnsupportedFormat {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_sniff_png() {
        assert_eq!(sniff("a.png", PNG_HEADER).unwrap(), ImageKind::Png);
    }

    #[test]
    fn test_sniff_jpeg() {
        assert_eq!(sniff("a.jpg", JPEG_HEADER).unwrap(), ImageKind::Jpeg);
    }

    #[test]
    fn test_sniff_rejects_gif() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00";
        let err = sniff("cat.gif", gif).unwrap_err();
        assert!(err.to_string().contains("cat.gif"));
    }

    #[test]
    fn test_sniff_rejects_garbage() {
        assert!(sniff("notes.jpg", b"hello world").is_err());
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension(Path::new("beach.PNG")));
        assert!(has_allowed_extension(Path::new("beach.jpeg")));
        assert!(!has_allowed_extension(Path::new("beach.webp")));
        assert!(!has_allowed_extension(Path::new("beach")));
    }

    #[test]
    fn test_media_types() {
        assert_eq!(ImageKind::Png.media_type(), "image/png");
        assert_eq!(ImageKind::Jpeg.media_type(), "image/jpeg");
    }
}
