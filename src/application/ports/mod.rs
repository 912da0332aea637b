//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod devices;
pub mod downloader;
pub mod engine;
pub mod media;
pub mod preferences;
pub mod recorder;
pub mod storage;

// Re-export common types
pub use devices::{DeviceEnumerator, DeviceError};
pub use downloader::{AudioDownloader, DownloadError, DownloadProgress};
pub use engine::{EngineError, EngineProgress, TranscriptionEngine};
pub use media::{MediaError, MediaProbe};
pub use preferences::PreferenceStore;
pub use recorder::{CaptureError, CaptureRecorder};
pub use storage::{DocumentStore, StorageError};
