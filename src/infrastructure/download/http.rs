//! Streaming HTTP downloader for remote audio

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::application::ports::{AudioDownloader, DownloadError, DownloadProgress};

/// Content-type prefixes accepted as downloadable media.
///
/// `application/octet-stream` is allowed because many file hosts serve
/// audio under it; the post-download probe rejects non-media payloads.
const ACCEPTED_CONTENT_PREFIXES: &[&str] = &["audio/", "video/", "application/octet-stream"];

/// Downloader that streams the response body to a temporary file,
/// observing a cancel flag between chunks.
pub struct HttpDownloader {
    client: reqwest::Client,
    target_dir: PathBuf,
}

impl HttpDownloader {
    /// Create a downloader writing into the system temp directory
    pub fn new() -> Self {
        Self::with_target_dir(std::env::temp_dir())
    }

    /// Create a downloader writing into `target_dir`
    pub fn with_target_dir(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            target_dir: target_dir.into(),
        }
    }

    /// Validate URL syntax without touching the network
    fn parse_url(url: &str) -> Result<Url, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(DownloadError::InvalidUrl(format!(
                "Unsupported scheme: {}",
                other
            ))),
        }
    }

    fn content_type_accepted(content_type: Option<&str>) -> bool {
        match content_type {
            // Absent header is tolerated; the probe catches garbage later
            None => true,
            Some(value) => ACCEPTED_CONTENT_PREFIXES
                .iter()
                .any(|prefix| value.starts_with(prefix)),
        }
    }

    /// Pick a local file name from the URL path
    fn target_path(&self, url: &Url) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("download");
        self.target_dir.join(format!("{}-{}", stamp, name))
    }

    async fn remove_partial(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Could not remove partial download");
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDownloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        on_progress: Option<DownloadProgress>,
        cancel: Arc<AtomicBool>,
    ) -> Result<PathBuf, DownloadError> {
        let parsed = Self::parse_url(url)?;

        if cancel.load(Ordering::SeqCst) {
            return Err(DownloadError::Cancelled);
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Network(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        if !Self::content_type_accepted(content_type.as_deref()) {
            return Err(DownloadError::UnsupportedContent(
                content_type.unwrap_or_default(),
            ));
        }

        let content_length = response.content_length();
        let path = self.target_path(&parsed);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| DownloadError::Write(e.to_string()))?;

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            if cancel.load(Ordering::SeqCst) {
                drop(file);
                Self::remove_partial(&path).await;
                return Err(DownloadError::Cancelled);
            }

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    Self::remove_partial(&path).await;
                    return Err(DownloadError::Network(e.to_string()));
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                Self::remove_partial(&path).await;
                return Err(DownloadError::Write(e.to_string()));
            }

            received += chunk.len() as u64;
            if let Some(ref progress) = on_progress {
                progress(received, content_length);
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::Write(e.to_string()))?;

        debug!(url, received, path = %path.display(), "Download complete");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        assert!(matches!(
            HttpDownloader::parse_url("not a url"),
            Err(DownloadError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(matches!(
            HttpDownloader::parse_url("ftp://example.com/a.wav"),
            Err(DownloadError::InvalidUrl(_))
        ));
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(HttpDownloader::parse_url("http://example.com/a.wav").is_ok());
        assert!(HttpDownloader::parse_url("https://example.com/a.wav").is_ok());
    }

    #[test]
    fn content_type_filtering() {
        assert!(HttpDownloader::content_type_accepted(Some("audio/wav")));
        assert!(HttpDownloader::content_type_accepted(Some("video/mp4")));
        assert!(HttpDownloader::content_type_accepted(Some(
            "application/octet-stream"
        )));
        assert!(HttpDownloader::content_type_accepted(None));
        assert!(!HttpDownloader::content_type_accepted(Some("text/html")));
        assert!(!HttpDownloader::content_type_accepted(Some(
            "application/json"
        )));
    }

    #[test]
    fn target_path_uses_url_file_name() {
        let downloader = HttpDownloader::with_target_dir("/tmp/dl");
        let url = Url::parse("https://example.com/media/episode.mp3").unwrap();
        let path = downloader.target_path(&url);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("episode.mp3"));
        assert!(path.starts_with("/tmp/dl"));
    }

    #[test]
    fn target_path_falls_back_without_file_name() {
        let downloader = HttpDownloader::with_target_dir("/tmp/dl");
        let url = Url::parse("https://example.com/").unwrap();
        let path = downloader.target_path(&url);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("download"));
    }
}
