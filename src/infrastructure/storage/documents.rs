//! Documents-folder storage adapter

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::application::ports::{DocumentStore, StorageError};
use crate::domain::audio::CapturedAudio;

/// Store writing into the user's documents folder (or any directory).
pub struct DocumentsStore {
    dir: PathBuf,
}

impl DocumentsStore {
    /// Create a store rooted at the platform documents directory
    pub fn new() -> Result<Self, StorageError> {
        let dir = dirs::document_dir()
            .ok_or_else(|| StorageError::Write("No documents directory on this system".into()))?;
        Ok(Self::with_dir(dir))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a non-clobbering path for `suggested_name`
    fn unique_path(&self, suggested_name: &str) -> PathBuf {
        let candidate = self.dir.join(suggested_name);
        if !candidate.exists() {
            return candidate;
        }

        let stem = Path::new(suggested_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let extension = Path::new(suggested_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        for n in 1.. {
            let name = match &extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            };
            let candidate = self.dir.join(name);
            if !candidate.exists() {
                return candidate;
            }
        }
        unreachable!()
    }

    fn write_wav_blocking(path: &Path, audio: &CapturedAudio) -> Result<(), StorageError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer =
            WavWriter::create(path, spec).map_err(|e| StorageError::Write(e.to_string()))?;
        for &sample in &audio.samples {
            writer
                .write_sample(sample)
                .map_err(|e| StorageError::Write(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| StorageError::Write(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for DocumentsStore {
    async fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        let path = self.unique_path(suggested_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;
        info!(path = %path.display(), "Saved to documents");
        Ok(path)
    }

    async fn write_audio(
        &self,
        audio: &CapturedAudio,
        suggested_name: &str,
    ) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        let path = self.unique_path(suggested_name);
        let audio = audio.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || Self::write_wav_blocking(&target, &audio))
            .await
            .map_err(|e| StorageError::Write(format!("Task join error: {}", e)))??;
        info!(path = %path.display(), "Saved recording to documents");
        Ok(path)
    }
}
