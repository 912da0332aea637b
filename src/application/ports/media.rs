//! Local media probing port interface

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::AudioHandle;

/// Media probing errors
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),
}

/// Port for opening local media files.
///
/// Probing reads header/duration only, never the full payload; decode is
/// the transcription engine's problem.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Open a local file and produce a handle describing it.
    async fn probe(&self, path: &Path) -> Result<AudioHandle, MediaError>;
}
