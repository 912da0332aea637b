//! Audio handle value objects

use std::fmt;
use std::path::PathBuf;

/// Where an audio handle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Recorded,
    File,
    Downloaded,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::File => "file",
            Self::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional origin of a handle: the path it was opened from or the URL it
/// was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOrigin {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for AudioOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => write!(f, "{}", u),
        }
    }
}

/// Raw PCM captured from a recording session.
///
/// Interleaved mono samples at the device sample rate; downmixing happens
/// in the capture adapter before finalization.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// The decoded/recorded audio behind a handle
#[derive(Debug, Clone)]
pub enum AudioPayload {
    /// In-memory PCM from the microphone path
    Pcm(CapturedAudio),
    /// On-disk media file (opened directly or produced by a download)
    LocalFile(PathBuf),
}

/// Opaque reference to audio usable as transcription input.
///
/// Owned exclusively by the session until lent to a job via `Arc` for the
/// job's lifetime only.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    source: SourceKind,
    duration_ms: u64,
    origin: Option<AudioOrigin>,
    payload: AudioPayload,
}

impl AudioHandle {
    /// Wrap a finished recording. The capture adapter guarantees the
    /// buffer is non-empty before this is reached.
    pub fn recorded(audio: CapturedAudio) -> Self {
        Self {
            source: SourceKind::Recorded,
            duration_ms: audio.duration_ms(),
            origin: None,
            payload: AudioPayload::Pcm(audio),
        }
    }

    /// Wrap a directly-opened local file
    pub fn from_file(path: PathBuf, duration_ms: u64) -> Self {
        Self {
            source: SourceKind::File,
            duration_ms,
            origin: Some(AudioOrigin::Path(path.clone())),
            payload: AudioPayload::LocalFile(path),
        }
    }

    /// Wrap a downloaded file. Downstream consumers cannot tell this apart
    /// from a directly-opened file except by `source()`/`origin()`.
    pub fn downloaded(path: PathBuf, duration_ms: u64, url: impl Into<String>) -> Self {
        Self {
            source: SourceKind::Downloaded,
            duration_ms,
            origin: Some(AudioOrigin::Url(url.into())),
            payload: AudioPayload::LocalFile(path),
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn origin(&self) -> Option<&AudioOrigin> {
        self.origin.as_ref()
    }

    pub fn payload(&self) -> &AudioPayload {
        &self.payload
    }
}
