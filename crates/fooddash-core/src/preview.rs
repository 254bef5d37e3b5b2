//! Preview handles
//!
//! A preview is a client-local rendering of a file that has not finished uploading,
//! e.g. a thumbnail on disk. Handles are not `Clone`: releasing one
//! consumes it, so a handle cannot be released twice.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::UploadFile;

#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: Uuid,
    location: String,
}

impl PreviewHandle {
    /// Construct a handle. Only [`PreviewProvider`] implementations should call this.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            location: location.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Renderable location (a path or URL) of the preview.
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Creates and releases preview handles.
pub trait PreviewProvider: Send + Sync {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle, AppError>;

    fn release(&self, handle: PreviewHandle);
}
