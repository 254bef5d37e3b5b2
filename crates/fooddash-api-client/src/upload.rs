//! Streamed multipart upload with progress reporting and cancellation.
//!
//! The file body is fed to reqwest in fixed-size chunks; progress is reported as each
//! chunk is handed to the connection. Once the cancellation token fires no further
//! chunks (and no further progress) are produced and the exchange resolves to
//! [`TransportError::Cancelled`].

use async_trait::async_trait;
use bytes::Bytes;
use fooddash_core::models::{FileUploadResponse, UploadFile};
use fooddash_core::{ProgressFn, TransportError, UploadTransport};
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;

use crate::{decode_json, ApiClient};

pub const UPLOAD_PATH: &str = "/files/upload";

/// Size of each body chunk handed to the connection.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

fn split_chunks(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(data.len() / chunk_size + 1);
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk_size).min(data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }
    chunks
}

/// Body that reports the share of bytes handed over so far.
fn progress_body(data: &Bytes, progress: ProgressFn, cancel: CancellationToken) -> reqwest::Body {
    let total = data.len().max(1) as f64;
    let mut sent = 0usize;

    let stream = futures::stream::iter(split_chunks(data, UPLOAD_CHUNK_SIZE).into_iter().map(
        move |chunk| {
            if cancel.is_cancelled() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "upload cancelled",
                ));
            }
            sent += chunk.len();
            progress(sent as f64 / total * 100.0);
            Ok::<Bytes, std::io::Error>(chunk)
        },
    ));

    reqwest::Body::wrap_stream(stream)
}

impl ApiClient {
    /// Upload `file` into `folder`, reporting progress and honouring `cancel`.
    pub async fn upload_file(
        &self,
        file: &UploadFile,
        folder: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<FileUploadResponse, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let body = progress_body(&file.data, progress, cancel.clone());
        let part = Part::stream_with_length(body, file.size())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| TransportError::Network(format!("Invalid content type: {}", e)))?;
        let form = Form::new().text("folder", folder.to_string()).part("file", part);

        let request = self.client.post(self.build_url(UPLOAD_PATH)).multipart(form);

        tracing::debug!(file = %file.name, size = file.size(), folder, "Starting upload");

        let exchange = async {
            let response = self.execute(request, UPLOAD_PATH).await?;
            decode_json::<FileUploadResponse>(response).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = exchange => {
                if cancel.is_cancelled() {
                    return Err(TransportError::Cancelled);
                }
                result
            }
        }
    }
}

#[async_trait]
impl UploadTransport for ApiClient {
    async fn upload(
        &self,
        file: &UploadFile,
        folder: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<FileUploadResponse, TransportError> {
        self.upload_file(file, folder, progress, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticCredentials;
    use mockito::Matcher;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p| sink.lock().push(p));
        (progress, seen)
    }

    #[test]
    fn test_split_chunks_covers_data() {
        let data = Bytes::from(vec![1u8; UPLOAD_CHUNK_SIZE * 2 + 10]);
        let chunks = split_chunks(&data, UPLOAD_CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 10);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), data.len());
        assert!(split_chunks(&Bytes::new(), 4).is_empty());
    }

    #[tokio::test]
    async fn test_upload_reports_progress_and_location() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", UPLOAD_PATH)
            .match_header("authorization", "Bearer tok123")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(Matcher::Regex("name=\"folder\"".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"filePath":"general/abc.png","fileUrl":"http://localhost/uploads/general/abc.png","fileName":"logo.png","fileSize":200000,"contentType":"image/png"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5))
            .unwrap()
            .with_credentials(Arc::new(StaticCredentials::with_token("tok123")));
        let file = UploadFile::new("logo.png", "image/png", Bytes::from(vec![7u8; 200_000]));
        let (progress, seen) = recorder();

        let response = client
            .upload_file(&file, "general", progress, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            response.file_url,
            "http://localhost/uploads/general/abc.png"
        );
        let seen = seen.lock().clone();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(100.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_rejection_carries_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", UPLOAD_PATH)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Only image files are allowed"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let file = UploadFile::new("notes.txt", "text/plain", Bytes::from_static(b"hi"));
        let (progress, _) = recorder();

        let err = client
            .upload_file(&file, "general", progress, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.server_message(), Some("Only image files are allowed"));
    }

    #[tokio::test]
    async fn test_cancelled_upload_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", UPLOAD_PATH)
            .expect(0)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let file = UploadFile::new("logo.png", "image/png", Bytes::from(vec![1u8; 1024]));
        let (progress, seen) = recorder();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .upload_file(&file, "general", progress, cancel)
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Cancelled);
        assert!(seen.lock().is_empty());
        mock.assert_async().await;
    }
}
