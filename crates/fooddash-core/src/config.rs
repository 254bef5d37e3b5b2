//! Configuration module
//!
//! Client settings are read from the environment (and `.env` via dotenvy). Every
//! value has a development default so the CLI works against a local API.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::validation::{UploadPolicy, DEFAULT_ALLOWED_CONTENT_TYPES};

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_UPLOAD_MB: u64 = 10;
const UPLOAD_FOLDER: &str = "general";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub upload_policy: UploadPolicy,
    pub upload_folder: String,
    pub session_file: PathBuf,
    pub preview_dir: PathBuf,
    pub environment: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            upload_policy: UploadPolicy::default(),
            upload_folder: UPLOAD_FOLDER.to_string(),
            session_file: default_session_file(),
            preview_dir: env::temp_dir().join("fooddash-previews"),
            environment: "development".to_string(),
        }
    }
}

fn default_session_file() -> PathBuf {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    home.join(".fooddash").join("session.json")
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("FOODDASH_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout_secs = env::var("FOODDASH_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("FOODDASH_REQUEST_TIMEOUT_SECS must be a valid number"))?;

        let max_upload_mb = env::var("FOODDASH_MAX_UPLOAD_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_UPLOAD_MB);

        let allowed_content_types = env::var("FOODDASH_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_CONTENT_TYPES.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = ClientConfig {
            api_base_url,
            request_timeout_secs,
            upload_policy: UploadPolicy {
                max_size_bytes: max_upload_mb * 1024 * 1024,
                allowed_content_types,
            },
            upload_folder: env::var("FOODDASH_UPLOAD_FOLDER")
                .unwrap_or_else(|_| UPLOAD_FOLDER.to_string()),
            session_file: env::var("FOODDASH_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_session_file()),
            preview_dir: env::var("FOODDASH_PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("fooddash-previews")),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "FOODDASH_API_URL must start with http:// or https://"
            ));
        }

        if self.is_production() && self.api_base_url.starts_with("http://") {
            tracing::warn!("Using plain HTTP API URL in production; credentials are sent unencrypted");
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "FOODDASH_REQUEST_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.upload_policy.max_size_bytes == 0 {
            return Err(anyhow::anyhow!("FOODDASH_MAX_UPLOAD_MB must be greater than zero"));
        }

        if self.upload_policy.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "FOODDASH_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if self.upload_folder.contains("..") || self.upload_folder.contains('/') {
            return Err(anyhow::anyhow!(
                "FOODDASH_UPLOAD_FOLDER must be a single folder name"
            ));
        }

        Ok(())
    }

    /// Check if the client is configured for production
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
