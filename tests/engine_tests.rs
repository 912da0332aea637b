//! Engine adapter integration tests against a mocked Whisper HTTP backend

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};
use murmur::application::ports::{EngineError, TranscriptionEngine};
use murmur::domain::audio::{AudioHandle, CapturedAudio};
use murmur::domain::options::TranscriptionOptions;
use murmur::infrastructure::WhisperHttpEngine;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> WhisperHttpEngine {
    WhisperHttpEngine::new(server.uri(), None)
}

fn no_cancel() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn write_wav(target: &Path) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(target, spec).unwrap();
    for _ in 0..1600 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn verbose_json_body() -> &'static str {
    r#"{
        "text": "hello world again",
        "segments": [
            {"id": 0, "start": 0.0, "end": 1.2, "text": " hello"},
            {"id": 1, "start": 1.2, "end": 2.0, "text": " world"},
            {"id": 2, "start": 2.0, "end": 3.5, "text": " again"}
        ]
    }"#
}

#[tokio::test]
async fn transcribes_file_to_ordered_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(verbose_json_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let segments = engine_for(&server)
        .transcribe(&handle, &TranscriptionOptions::default(), None, no_cancel())
        .await
        .unwrap();

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].start_ms, 0);
    assert_eq!(segments[0].end_ms, 1200);
    assert_eq!(segments[0].text, "hello");
    assert_eq!(segments[2].start_ms, 2000);
    assert_eq!(segments[2].end_ms, 3500);
    // Non-overlapping and ordered along the timeline
    assert!(segments
        .windows(2)
        .all(|w| w[0].end_ms <= w[1].start_ms));
}

#[tokio::test]
async fn uploads_captured_pcm_as_flac() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(verbose_json_body()),
        )
        .mount(&server)
        .await;

    let handle = AudioHandle::recorded(CapturedAudio {
        samples: vec![0i16; 16000],
        sample_rate: 16000,
    });

    engine_for(&server)
        .transcribe(&handle, &TranscriptionOptions::default(), None, no_cancel())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    // The multipart body carries a FLAC payload and the model field
    assert!(body.windows(4).any(|w| w == b"fLaC"));
    assert!(body.windows(9).any(|w| w == b"whisper-1"));
}

#[tokio::test]
async fn translate_hits_the_translation_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/translations"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"text": "hello"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let options = TranscriptionOptions {
        translate: true,
        ..Default::default()
    };
    let segments = engine_for(&server)
        .transcribe(&handle, &options, None, no_cancel())
        .await
        .unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "hello");
}

#[tokio::test]
async fn progress_reports_are_non_decreasing_and_end_at_100() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(verbose_json_body()),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_cb = Arc::clone(&seen);
    let on_progress: murmur::application::ports::EngineProgress = Arc::new(move |value| {
        seen_cb.lock().unwrap().push(value);
    });
    engine_for(&server)
        .transcribe(
            &handle,
            &TranscriptionOptions::default(),
            Some(on_progress),
            no_cancel(),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), 100);
}

#[tokio::test]
async fn unknown_model_error_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"error": {"message": "Model not found", "code": "model_not_found"}}"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let err = engine_for(&server)
        .transcribe(&handle, &TranscriptionOptions::default(), None, no_cancel())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnknownModel(_)));
}

#[tokio::test]
async fn backend_oom_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            r#"{"error": {"message": "whisper runner out of memory"}}"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let err = engine_for(&server)
        .transcribe(&handle, &TranscriptionOptions::default(), None, no_cancel())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::OutOfMemory));
}

#[tokio::test]
async fn pre_cancelled_job_never_reaches_the_backend() {
    let server = MockServer::start().await;
    // No mocks: a request would fail the test via the error path assert

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("talk.wav");
    write_wav(&wav);
    let handle = AudioHandle::from_file(wav, 100);

    let err = engine_for(&server)
        .transcribe(
            &handle,
            &TranscriptionOptions::default(),
            None,
            Arc::new(AtomicBool::new(true)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    assert!(server.received_requests().await.unwrap().is_empty());
}
