//! Transcription job state machine

use std::fmt;

/// Identity of one transcription job.
///
/// Progress and completion events carry the id of the job that produced
/// them; events from a cancelled or superseded job are discarded by
/// identity, never by sequence alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Why a job ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnknownModel,
    ModelLoad,
    OutOfMemory,
    Decode,
    EngineCrash,
}

impl FailureKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownModel => "unknown model",
            Self::ModelLoad => "model load failed",
            Self::OutOfMemory => "out of memory",
            Self::Decode => "audio decode failed",
            Self::EngineCrash => "engine crashed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of the session's transcription job slot.
///
/// State machine:
///   Idle -> Running -> { Completed | Failed | Cancelled }
///
/// Terminal states require a new submission to return to Running; exactly
/// one Running job exists per session at any time. Every presentation flag
/// ("is transcribing", "is aborting", ...) derives from this variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running {
        id: JobId,
        /// Monotonically non-decreasing, 0..=100, advisory only
        progress: u8,
        cancel_requested: bool,
    },
    Completed {
        id: JobId,
    },
    Failed {
        id: JobId,
        kind: FailureKind,
    },
    Cancelled {
        id: JobId,
    },
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// The id of the currently Running job, if any
    pub fn running_id(&self) -> Option<JobId> {
        match self {
            Self::Running { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Running { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    pub fn cancel_requested(&self) -> bool {
        matches!(
            self,
            Self::Running {
                cancel_requested: true,
                ..
            }
        )
    }
}
