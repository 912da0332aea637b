//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and state machines.
//! This layer has no dependencies on external systems.

pub mod audio;
pub mod device;
pub mod error;
pub mod job;
pub mod options;
pub mod preferences;
pub mod segment;
pub mod session;

// Re-export common types
pub use audio::{AudioHandle, AudioOrigin, AudioPayload, CapturedAudio, SourceKind};
pub use device::{Device, DeviceId, DeviceKind, DeviceSet};
pub use error::PreferenceError;
pub use job::{FailureKind, JobId, JobState};
pub use options::TranscriptionOptions;
pub use preferences::Preferences;
pub use segment::{IndexError, Segment, SegmentStore};
pub use session::{AudioInfo, DownloadState, Session, Snapshot, StartJobError, Tab};
