//! Murmur - audio transcription sessions from microphone, file or URL
//!
//! This crate records from audio devices, opens local media, or downloads
//! remote files, and turns the result into a time-aligned, editable
//! transcript through a cancellable transcription job.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, segments, devices, options
//! - **Application**: The orchestrator use case and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, Whisper HTTP, filesystem)
//! - **CLI**: Command-line interface, argument parsing, and rendering

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
