//! Transcription engine infrastructure module

mod whisper_http;

pub use whisper_http::WhisperHttpEngine;
