use fooddash_core::models::{UploadStatus, UploadTask};
use fooddash_core::{Route, Router};
use serde::Serialize;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable size with up to two decimals: `0 Bytes`, `1.5 KB`, `5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// One-line status of a task for the upload table.
pub fn describe_task(task: &UploadTask) -> String {
    match task.status {
        UploadStatus::InProgress => format!("uploading {}%", task.progress),
        UploadStatus::Completed => task
            .file_url
            .as_deref()
            .map(|url| format!("done {}", url))
            .unwrap_or_else(|| "done".to_string()),
        UploadStatus::Failed if task.cancelled => "cancelled".to_string(),
        UploadStatus::Failed => format!(
            "failed: {}",
            task.error_message.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}

/// Terminal stand-in for page navigation.
pub struct CliRouter;

impl Router for CliRouter {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => {
                eprintln!("Not logged in. Run `fooddash login --email <email> --password <password>`.")
            }
            Route::Dashboard => tracing::debug!(path = route.path(), "Navigation requested"),
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
