//! Preview providers
//!
//! [`ThumbnailPreviews`] renders a small PNG next to other previews in a scratch
//! directory and deletes it on release. [`NoPreviews`] is for headless runs where
//! nothing is ever displayed.

use std::io;
use std::path::PathBuf;

use fooddash_core::models::UploadFile;
use fooddash_core::{AppError, PreviewHandle, PreviewProvider};
use image::ImageFormat;
use uuid::Uuid;

/// Longest edge of a rendered thumbnail, in pixels.
pub const THUMBNAIL_SIZE: u32 = 128;

pub struct ThumbnailPreviews {
    dir: PathBuf,
    size: u32,
}

impl ThumbnailPreviews {
    /// Render previews into `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            size: THUMBNAIL_SIZE,
        })
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size.max(1);
        self
    }
}

impl PreviewProvider for ThumbnailPreviews {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle, AppError> {
        let img = image::load_from_memory(&file.data).map_err(|e| {
            AppError::Internal(format!("Failed to decode {} for preview: {}", file.name, e))
        })?;
        let thumbnail = img.thumbnail(self.size, self.size);

        let path = self.dir.join(format!("{}.png", Uuid::new_v4()));
        thumbnail
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| AppError::Internal(format!("Failed to write preview: {}", e)))?;

        tracing::debug!(file = %file.name, path = %path.display(), "Preview rendered");
        Ok(PreviewHandle::new(path.to_string_lossy()))
    }

    fn release(&self, handle: PreviewHandle) {
        match std::fs::remove_file(handle.location()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = handle.location(), error = %e, "Failed to delete preview")
            }
        }
    }
}

/// Provider that renders nothing. The handle's location is the file name.
pub struct NoPreviews;

impl PreviewProvider for NoPreviews {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle, AppError> {
        Ok(PreviewHandle::new(file.name.clone()))
    }

    fn release(&self, _handle: PreviewHandle) {}
}
