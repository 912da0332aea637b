//! Remote download port interface

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Progress callback for downloads: (bytes_received, content_length)
pub type DownloadProgress = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Download errors.
///
/// `Cancelled` is consumed by the orchestrator as the `Cancelled` download
/// state, not surfaced as a failure.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote content is not audio or video: {0}")]
    UnsupportedContent(String),

    #[error("Failed to write downloaded data: {0}")]
    Write(String),

    #[error("Download was cancelled")]
    Cancelled,
}

/// Port for fetching remote audio/video to a local temporary file.
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Stream `url` to a temporary location, validating the content looks
    /// like audio or video.
    ///
    /// URL syntax is validated before any network call. The cancel flag is
    /// observed between chunks; cancellation deletes partial data and
    /// returns `Cancelled`.
    async fn fetch(
        &self,
        url: &str,
        on_progress: Option<DownloadProgress>,
        cancel: Arc<AtomicBool>,
    ) -> Result<PathBuf, DownloadError>;
}
