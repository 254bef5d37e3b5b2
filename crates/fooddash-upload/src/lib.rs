//! Fooddash Upload Library
//!
//! Client-side file uploads: acceptance checks, eager previews for images, progress
//! tracking and cancellation. The transport is any
//! [`UploadTransport`](fooddash_core::UploadTransport); production code passes the
//! `ApiClient`.

pub mod pipeline;
pub mod preview;

pub use pipeline::{SubmitReport, UploadPipeline};
pub use preview::{NoPreviews, ThumbnailPreviews, THUMBNAIL_SIZE};
