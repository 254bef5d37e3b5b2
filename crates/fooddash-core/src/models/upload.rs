use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub type TaskId = Uuid;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file picked by the user, held in memory until its upload finishes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into().to_lowercase(),
            data,
        }
    }

    /// Read a file from disk, deriving its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(AppError::Internal(format!(
                "Invalid path: {}",
                path.display()
            )));
        }

        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let content_type = content_type_for(&name);

        Ok(Self::new(name, content_type, Bytes::from(data)))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Guess a content type from a file name's extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("exe") => "application/x-msdownload",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    InProgress,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadStatus::InProgress)
    }
}

/// Something that happened to a task's transport exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// Completion percentage reported by the transport.
    Progress(f64),
    Completed { file_url: String },
    Failed { reason: String },
    Cancelled,
}

/// One file's journey through the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTask {
    pub id: TaskId,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub progress: u8,
    pub status: UploadStatus,
    pub preview: Option<String>,
    pub error_message: Option<String>,
    pub file_url: Option<String>,
    pub cancelled: bool,
}

/// Clamp a reported percentage into `0..=100`. NaN counts as zero.
pub fn clamp_progress(percent: f64) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0).floor() as u8
}

impl UploadTask {
    pub fn new(file: &UploadFile, preview: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: file.name.clone(),
            size: file.size(),
            content_type: file.content_type.clone(),
            progress: 0,
            status: UploadStatus::InProgress,
            preview,
            error_message: None,
            file_url: None,
            cancelled: false,
        }
    }

    /// Next state after `event`. Terminal tasks are returned unchanged, and progress
    /// never moves backwards.
    pub fn apply(&self, event: TaskEvent) -> UploadTask {
        if self.status.is_terminal() {
            return self.clone();
        }

        let mut next = self.clone();
        match event {
            TaskEvent::Progress(percent) => {
                next.progress = self.progress.max(clamp_progress(percent));
            }
            TaskEvent::Completed { file_url } => {
                next.status = UploadStatus::Completed;
                next.progress = 100;
                next.file_url = Some(file_url);
            }
            TaskEvent::Failed { reason } => {
                next.status = UploadStatus::Failed;
                next.error_message = Some(reason);
            }
            TaskEvent::Cancelled => {
                next.status = UploadStatus::Failed;
                next.error_message = Some("Upload cancelled".to_string());
                next.cancelled = true;
            }
        }
        next
    }
}

/// Response of `POST /files/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    #[serde(default)]
    pub success: bool,
    pub file_path: Option<String>,
    pub file_url: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> UploadFile {
        UploadFile::new("logo.png", "image/png", Bytes::from_static(b"\x89PNG"))
    }

    #[test]
    fn test_progress_is_monotonic_and_bounded() {
        let mut task = UploadTask::new(&png(), None);
        for reported in [10.0, 40.0, 25.0, 140.0, -3.0, f64::NAN, 99.9] {
            let next = task.apply(TaskEvent::Progress(reported));
            assert!(next.progress >= task.progress);
            assert!(next.progress <= 100);
            task = next;
        }
        assert_eq!(task.progress, 100);
        assert_eq!(task.status, UploadStatus::InProgress);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let task = UploadTask::new(&png(), None)
            .apply(TaskEvent::Progress(40.0))
            .apply(TaskEvent::Completed {
                file_url: "/f/1".to_string(),
            });
        assert_eq!(task.status, UploadStatus::Completed);
        assert_eq!(task.progress, 100);

        let after = task
            .apply(TaskEvent::Failed {
                reason: "late".to_string(),
            })
            .apply(TaskEvent::Cancelled);
        assert_eq!(after, task);
    }

    #[test]
    fn test_cancellation_is_distinguishable_failure() {
        let task = UploadTask::new(&png(), None).apply(TaskEvent::Cancelled);
        assert_eq!(task.status, UploadStatus::Failed);
        assert!(task.cancelled);

        let failed = UploadTask::new(&png(), None).apply(TaskEvent::Failed {
            reason: "Only image files are allowed".to_string(),
        });
        assert_eq!(failed.status, UploadStatus::Failed);
        assert!(!failed.cancelled);
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("menu.pdf"), "application/pdf");
        assert_eq!(content_type_for("noext"), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dish.webp");
        tokio::fs::write(&path, b"RIFF").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "dish.webp");
        assert_eq!(file.content_type, "image/webp");
        assert_eq!(file.size(), 4);
        assert!(file.is_image());
    }
}
