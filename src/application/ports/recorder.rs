//! Capture recorder port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::CapturedAudio;
use crate::domain::device::Device;

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Recording stopped with zero captured samples")]
    EmptyRecording,

    #[error("No capture in progress")]
    NotRecording,

    #[error("Capture already in progress")]
    AlreadyRecording,

    #[error("No audio device available")]
    NoDevice,
}

/// Port for signal-controlled microphone/loopback capture.
///
/// One input and at most one output (loopback) device are held open per
/// capture; starting a new capture must see the previous one closed on
/// every exit path, including error.
#[async_trait]
pub trait CaptureRecorder: Send + Sync {
    /// Begin streaming capture into a growable buffer.
    ///
    /// `output` is an optional loopback source mixed with the microphone.
    async fn start(&self, input: &Device, output: Option<&Device>) -> Result<(), CaptureError>;

    /// Finalize the buffer into captured PCM.
    ///
    /// A capture that produced zero samples fails with `EmptyRecording`;
    /// it never yields an empty success.
    async fn stop(&self) -> Result<CapturedAudio, CaptureError>;

    /// Discard the capture without producing audio.
    async fn cancel(&self) -> Result<(), CaptureError>;

    /// Check if currently capturing
    fn is_recording(&self) -> bool;

    /// Elapsed capture time in milliseconds
    fn elapsed_ms(&self) -> u64;
}
