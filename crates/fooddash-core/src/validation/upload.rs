//! Client-side acceptance rules for the upload pipeline
//!
//! A file that fails these checks never becomes a task.

use crate::error::ValidationError;
use crate::models::UploadFile;

/// 10 MB, matching the dashboard drop zone.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_size_bytes: u64,
    /// Exact types (`image/png`) or wildcards (`image/*`, `*/*`).
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn images_only(max_size_bytes: u64) -> Self {
        Self {
            max_size_bytes,
            allowed_content_types: vec!["image/*".to_string()],
        }
    }

    pub fn validate(&self, file: &UploadFile) -> Result<(), ValidationError> {
        if file.size() == 0 {
            return Err(ValidationError::EmptyFile {
                name: file.name.clone(),
            });
        }

        if file.size() > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                name: file.name.clone(),
                size: file.size(),
                max: self.max_size_bytes,
            });
        }

        let allowed = self
            .allowed_content_types
            .iter()
            .any(|pattern| content_type_matches(pattern, &file.content_type));
        if !allowed {
            return Err(ValidationError::UnsupportedType {
                name: file.name.clone(),
                content_type: file.content_type.clone(),
            });
        }

        Ok(())
    }
}

/// Match a content type against an allow-list entry. Parameters (`; charset=…`) are ignored.
pub fn content_type_matches(pattern: &str, content_type: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if pattern == "*/*" || pattern == "*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(top_level) => essence
            .split_once('/')
            .map(|(ty, _)| ty == top_level)
            .unwrap_or(false),
        None => pattern == essence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file(name: &str, content_type: &str, size: usize) -> UploadFile {
        UploadFile::new(name, content_type, Bytes::from(vec![0u8; size]))
    }

    #[test]
    fn test_wildcard_matching() {
        assert!(content_type_matches("image/*", "image/png"));
        assert!(content_type_matches("image/*", "IMAGE/JPEG"));
        assert!(!content_type_matches("image/*", "application/x-exe"));
        assert!(content_type_matches("text/csv", "text/csv; charset=utf-8"));
        assert!(content_type_matches("*/*", "application/pdf"));
        assert!(!content_type_matches("image/png", "image/jpeg"));
    }

    #[test]
    fn test_rejects_disallowed_type() {
        let policy = UploadPolicy::images_only(DEFAULT_MAX_UPLOAD_BYTES);
        let err = policy
            .validate(&file("setup.exe", "application/x-exe", 10))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert_eq!(err.file_name(), "setup.exe");
    }

    #[test]
    fn test_rejects_oversized_and_empty() {
        let policy = UploadPolicy {
            max_size_bytes: 8,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(&file("big.png", "image/png", 9)),
            Err(ValidationError::FileTooLarge { size: 9, max: 8, .. })
        ));
        assert!(matches!(
            policy.validate(&file("empty.png", "image/png", 0)),
            Err(ValidationError::EmptyFile { .. })
        ));
        assert!(policy.validate(&file("ok.png", "image/png", 8)).is_ok());
    }
}
