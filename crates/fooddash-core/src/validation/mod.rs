//! Validation modules

pub mod upload;

pub use upload::{
    content_type_matches, UploadPolicy, DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_UPLOAD_BYTES,
};
