//! Local media probing backed by hound

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{MediaError, MediaProbe};
use crate::domain::audio::AudioHandle;

/// Extensions accepted without header inspection. Duration stays unknown
/// until the engine decodes them.
const PASSTHROUGH_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "ogg", "opus", "flac", "mp4", "webm"];

/// Probe that reads WAV headers for an exact duration and admits other
/// common media formats by extension.
pub struct FileProbe;

impl FileProbe {
    pub fn new() -> Self {
        Self
    }

    fn probe_blocking(path: PathBuf) -> Result<AudioHandle, MediaError> {
        if !path.is_file() {
            return Err(MediaError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "wav" {
            let reader = hound::WavReader::open(&path)
                .map_err(|e| MediaError::UnsupportedFormat(e.to_string()))?;
            let spec = reader.spec();
            if spec.sample_rate == 0 {
                return Err(MediaError::UnsupportedFormat(
                    "WAV header declares a sample rate of zero".to_string(),
                ));
            }
            let frames = reader.duration() as u64;
            let duration_ms = frames * 1000 / spec.sample_rate as u64;
            debug!(path = %path.display(), duration_ms, "Probed WAV header");
            return Ok(AudioHandle::from_file(path, duration_ms));
        }

        if PASSTHROUGH_EXTENSIONS.contains(&extension.as_str()) {
            debug!(path = %path.display(), %extension, "Admitted by extension");
            return Ok(AudioHandle::from_file(path, 0));
        }

        Err(MediaError::UnsupportedFormat(format!(
            "Unrecognized media extension: {:?}",
            extension
        )))
    }
}

impl Default for FileProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaProbe for FileProbe {
    async fn probe(&self, path: &Path) -> Result<AudioHandle, MediaError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::probe_blocking(path))
            .await
            .map_err(|e| MediaError::UnsupportedFormat(format!("Task join error: {}", e)))?
    }
}
