//! Document storage port interface

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::CapturedAudio;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Failed to write file: {0}")]
    Write(String),
}

/// Port for the "save to documents folder" collaborator.
///
/// A write failure never loses the in-memory audio it was asked to
/// persist; callers keep their handle and surface the failure as a
/// warning.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write raw bytes under a suggested name, returning the final path.
    async fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, StorageError>;

    /// Persist captured PCM as a playable audio file.
    async fn write_audio(
        &self,
        audio: &CapturedAudio,
        suggested_name: &str,
    ) -> Result<PathBuf, StorageError>;
}
