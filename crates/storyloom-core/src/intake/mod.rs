//! Image intake: reading uploads, format checks, and the per-story image cap.
//!
//! Uploads beyond the configured maximum are dropped with a warning rather
//! than rejected, keeping the first `max_images` in upload order.

mod validate;

pub use validate::{has_allowed_extension, sniff, ImageKind, ALLOWED_EXTENSIONS};

use std::path::{Path, PathBuf};

use crate::config::LimitsConfig;
use crate::error::IntakeError;

/// One uploaded image held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name shown in messages
    pub name: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// Detected format
    pub kind: ImageKind,
}

impl ImageUpload {
    /// Accept an in-memory upload after sniffing its format.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IntakeError> {
        let name = name.into();
        let kind = sniff(&name, &bytes)?;
        Ok(Self { name, bytes, kind })
    }

    /// Read an upload from disk, enforcing extension and size limits.
    pub async fn read(path: &Path, max_size_mb: u64) -> Result<Self, IntakeError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        if !has_allowed_extension(path) {
            return Err(IntakeError::UnsupportedFormat { name });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IntakeError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let max_bytes = max_size_mb * 1024 * 1024;
        if bytes.len() as u64 > max_bytes {
            return Err(IntakeError::TooLarge {
                name,
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: max_size_mb,
            });
        }

        Self::from_bytes(name, bytes)
    }
}

/// Ordered images for one story, capped at the configured maximum.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: Vec<ImageUpload>,
}

impl ImageSet {
    /// Keep the first `max_images` uploads, returning a user-facing warning
    /// when anything was dropped.
    pub fn clamp(mut uploads: Vec<ImageUpload>, max_images: usize) -> (Self, Option<String>) {
        let warning = if uploads.len() > max_images {
            let dropped = uploads.len() - max_images;
            uploads.truncate(max_images);
            tracing::warn!("Dropped {dropped} image(s) over the limit of {max_images}");
            Some(format!(
                "You can only upload up to {max_images} images. \
                 Selecting only the first {max_images} images."
            ))
        } else {
            None
        };
        (Self { images: uploads }, warning)
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageUpload> {
        self.images.iter()
    }

    /// Sum of raw image sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(|i| i.bytes.len()).sum()
    }
}

/// Images accepted from a list of paths, plus warnings for the user.
#[derive(Debug, Default)]
pub struct IntakeReport {
    pub images: ImageSet,
    pub warnings: Vec<String>,
}

/// Read image files in order, skipping unusable ones with a warning and
/// clamping the rest to `limits.max_images`.
pub async fn load_images(paths: &[PathBuf], limits: &LimitsConfig) -> IntakeReport {
    let mut uploads = Vec::with_capacity(paths.len().min(limits.max_images));
    let mut warnings = Vec::new();

    for path in paths {
        match ImageUpload::read(path, limits.max_image_size_mb).await {
            Ok(upload) => {
                tracing::debug!(
                    "Accepted {} ({}, {} bytes)",
                    upload.name,
                    upload.kind.media_type(),
                    upload.bytes.len()
                );
                uploads.push(upload);
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {e}", path);
                warnings.push(e.to_string());
            }
        }
    }

    let (images, clamp_warning) = ImageSet::clamp(uploads, limits.max_images);
    warnings.extend(clamp_warning);

    IntakeReport { images, warnings }
}
