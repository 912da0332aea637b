//! Whisper-compatible HTTP transcription engine adapter

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::debug;

use crate::infrastructure::recording::flac::{encode_to_flac, resample, TARGET_SAMPLE_RATE};
use crate::application::ports::{EngineError, EngineProgress, TranscriptionEngine};
use crate::domain::audio::{AudioHandle, AudioPayload};
use crate::domain::options::TranscriptionOptions;
use crate::domain::segment::Segment;

/// Models the backend advertises. Submissions naming anything else are
/// rejected before any upload.
const KNOWN_MODELS: &[&str] = &[
    "whisper-1",
    "tiny",
    "tiny.en",
    "base",
    "base.en",
    "small",
    "small.en",
    "medium",
    "medium.en",
    "large-v3",
];

// Response types for the verbose_json format

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    segments: Option<Vec<ResponseSegment>>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    code: Option<String>,
}

/// Engine adapter speaking the Whisper HTTP transcription protocol.
///
/// Captured PCM is resampled to 16kHz and uploaded as FLAC; file-backed
/// audio is uploaded as-is and decoded server-side.
pub struct WhisperHttpEngine {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl WhisperHttpEngine {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, options: &TranscriptionOptions) -> String {
        if options.translate {
            format!("{}/audio/translations", self.base_url)
        } else {
            format!("{}/audio/transcriptions", self.base_url)
        }
    }

    /// Build the upload payload: (bytes, file name, mime type)
    async fn build_payload(
        audio: &AudioHandle,
        cancel: &AtomicBool,
    ) -> Result<(Vec<u8>, String, &'static str), EngineError> {
        match audio.payload() {
            AudioPayload::Pcm(captured) => {
                let samples = captured.samples.clone();
                let rate = captured.sample_rate;
                // Resample + FLAC is CPU-bound
                let bytes = tokio::task::spawn_blocking(move || {
                    let resampled = resample(&samples, rate, TARGET_SAMPLE_RATE)
                        .map_err(|e| EngineError::Decode(e.to_string()))?;
                    encode_to_flac(&resampled).map_err(|e| EngineError::Decode(e.to_string()))
                })
                .await
                .map_err(|e| EngineError::Crash(format!("Task join error: {}", e)))??;

                if cancel.load(Ordering::SeqCst) {
                    return Err(EngineError::Cancelled);
                }
                Ok((bytes, "capture.flac".to_string(), "audio/flac"))
            }
            AudioPayload::LocalFile(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| EngineError::Decode(e.to_string()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "audio".to_string());
                let mime = mime_for_extension(
                    path.extension().and_then(|e| e.to_str()).unwrap_or(""),
                );
                Ok((bytes, name, mime))
            }
        }
    }

    fn build_form(
        bytes: Vec<u8>,
        file_name: String,
        mime: &str,
        options: &TranscriptionOptions,
    ) -> Result<multipart::Form, EngineError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| EngineError::Crash(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", options.model_id.clone())
            .text("response_format", "verbose_json");

        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &options.init_prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(temperature) = options.temperature {
            form = form.text("temperature", temperature.to_string());
        }
        if options.word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }
        Ok(form)
    }

    /// Map an error body to the engine failure taxonomy
    fn map_api_error(status: reqwest::StatusCode, body: &str) -> EngineError {
        let parsed: Option<ApiError> = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|r| r.error);

        let message = parsed
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {}", status));
        let code = parsed.and_then(|e| e.code).unwrap_or_default();
        let lowered = message.to_lowercase();

        if code == "model_not_found" || lowered.contains("model not found") {
            return EngineError::UnknownModel(message);
        }
        if lowered.contains("failed to load model") || lowered.contains("model load") {
            return EngineError::ModelLoad(message);
        }
        if lowered.contains("out of memory") {
            return EngineError::OutOfMemory;
        }
        if lowered.contains("decode") || lowered.contains("invalid file format") {
            return EngineError::Decode(message);
        }
        EngineError::Crash(message)
    }

    fn parse_segments(body: &str) -> Result<Vec<Segment>, EngineError> {
        let response: TranscriptionResponse =
            serde_json::from_str(body).map_err(|e| EngineError::Crash(e.to_string()))?;

        if let Some(segments) = response.segments {
            return Ok(segments
                .into_iter()
                .map(|s| {
                    Segment::new(
                        (s.start * 1000.0) as u64,
                        (s.end * 1000.0) as u64,
                        s.text.trim(),
                    )
                })
                .collect());
        }

        // Some backends return plain text for very short audio
        match response.text {
            Some(text) if !text.trim().is_empty() => {
                Ok(vec![Segment::new(0, 0, text.trim())])
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/aac",
        "ogg" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

async fn wait_for_cancel(cancel: Arc<AtomicBool>) {
    loop {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperHttpEngine {
    fn is_known_model(&self, model_id: &str) -> bool {
        KNOWN_MODELS.contains(&model_id)
    }

    async fn transcribe(
        &self,
        audio: &AudioHandle,
        options: &TranscriptionOptions,
        on_progress: Option<EngineProgress>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<Segment>, EngineError> {
        let report = |value: u8| {
            if let Some(ref cb) = on_progress {
                cb(value);
            }
        };

        if cancel.load(Ordering::SeqCst) {
            return Err(EngineError::Cancelled);
        }
        report(5);

        let (bytes, file_name, mime) = Self::build_payload(audio, &cancel).await?;
        report(25);

        let form = Self::build_form(bytes, file_name, mime, options)?;
        let request = self
            .client
            .post(self.endpoint(options))
            .multipart(form);
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        // The upload itself has no checkpoints; cancellation races the
        // response and aborts the request by dropping it.
        let response = tokio::select! {
            result = request.send() => {
                result.map_err(|e| EngineError::Crash(e.to_string()))?
            }
            _ = wait_for_cancel(Arc::clone(&cancel)) => {
                return Err(EngineError::Cancelled);
            }
        };
        report(80);

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Crash(e.to_string()))?;

        if cancel.load(Ordering::SeqCst) {
            return Err(EngineError::Cancelled);
        }
        if !status.is_success() {
            return Err(Self::map_api_error(status, &body));
        }

        let segments = Self::parse_segments(&body)?;
        debug!(count = segments.len(), "Parsed transcription segments");
        report(100);
        Ok(segments)
    }
}
