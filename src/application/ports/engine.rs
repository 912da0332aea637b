//! Transcription engine port interface

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::AudioHandle;
use crate::domain::job::FailureKind;
use crate::domain::options::TranscriptionOptions;
use crate::domain::segment::Segment;

/// Progress callback for engine runs: 0..=100, advisory, non-decreasing
pub type EngineProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// Engine errors, mapped from engine-specific failure codes
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Engine ran out of memory")]
    OutOfMemory,

    #[error("Audio decode failed: {0}")]
    Decode(String),

    #[error("Engine crashed: {0}")]
    Crash(String),

    #[error("Transcription was cancelled")]
    Cancelled,
}

impl EngineError {
    /// Map to the job failure kind shown to the session.
    ///
    /// `Cancelled` has no failure kind; the job transitions to Cancelled
    /// instead of Failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::UnknownModel(_) => Some(FailureKind::UnknownModel),
            Self::ModelLoad(_) => Some(FailureKind::ModelLoad),
            Self::OutOfMemory => Some(FailureKind::OutOfMemory),
            Self::Decode(_) => Some(FailureKind::Decode),
            Self::Crash(_) => Some(FailureKind::EngineCrash),
            Self::Cancelled => None,
        }
    }
}

/// Port for the external transcription engine.
///
/// Engine selection and model loading are the engine's responsibility;
/// this core only submits work and consumes the event stream.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Whether `model_id` names a model this engine can run. Checked
    /// before any work is submitted.
    fn is_known_model(&self, model_id: &str) -> bool;

    /// Run one transcription to completion.
    ///
    /// Progress is reported through `on_progress`; the final report of 100
    /// coincides with or immediately precedes the returned segments. The
    /// cancel flag is observed at chunk checkpoints and surfaces as
    /// `EngineError::Cancelled`.
    async fn transcribe(
        &self,
        audio: &AudioHandle,
        options: &TranscriptionOptions,
        on_progress: Option<EngineProgress>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<Segment>, EngineError>;
}
