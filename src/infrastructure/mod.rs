//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, the Whisper HTTP backend, the filesystem, etc.

pub mod devices;
pub mod download;
pub mod engine;
pub mod media;
pub mod preferences;
pub mod recording;
pub mod storage;

// Re-export adapters
pub use devices::CpalEnumerator;
pub use download::HttpDownloader;
pub use engine::WhisperHttpEngine;
pub use media::FileProbe;
pub use preferences::XdgPreferenceStore;
pub use recording::CpalCapture;
pub use storage::DocumentsStore;
