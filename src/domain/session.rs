//! Session aggregate: the single source of truth behind the presentation layer

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::audio::{AudioHandle, SourceKind};
use super::device::{DeviceId, DeviceKind, DeviceSet};
use super::job::{FailureKind, JobId, JobState};
use super::segment::{Segment, SegmentStore};

/// The three input-source tabs of the home surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Record,
    File,
    Url,
}

impl Tab {
    /// Stable index used for preference persistence
    pub const fn index(&self) -> u8 {
        match self {
            Self::Record => 0,
            Self::File => 1,
            Self::Url => 2,
        }
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Record),
            1 => Some(Self::File),
            2 => Some(Self::Url),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::File => "file",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sub-state of the URL tab's download workflow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading {
        received: u64,
        total: Option<u64>,
    },
    Ready,
    Failed {
        message: String,
    },
    Cancelled,
}

impl DownloadState {
    pub fn is_downloading(&self) -> bool {
        matches!(self, Self::Downloading { .. })
    }
}

/// Error starting a job from the session's current state
#[derive(Debug, Clone, Error)]
pub enum StartJobError {
    #[error("A transcription job is already running")]
    AlreadyRunning,

    #[error("No audio loaded; record, open or download audio first")]
    NoAudio,
}

/// Read-only projection of the session for rendering.
///
/// Published after every mutation; the presentation layer never touches
/// session fields directly.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub active_tab: Tab,
    pub selected_input: Option<DeviceId>,
    pub selected_output: Option<DeviceId>,
    pub job: JobState,
    pub segments: Vec<Segment>,
    pub download: DownloadState,
    pub audio: Option<AudioInfo>,
    pub recording: bool,
}

/// Summary of the loaded audio handle, without the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    pub duration_ms: u64,
    pub source: SourceKind,
    pub origin: Option<String>,
}

/// Aggregate root for one process-lifetime session.
///
/// All mutations are serialized behind one lock by the orchestrator; the
/// methods here enforce the invariants:
/// - at most one non-terminal job at any time
/// - the loaded handle is cleared when the active tab changes
/// - job events apply only when their id matches the running job
#[derive(Debug, Default)]
pub struct Session {
    active_tab: Tab,
    selected_input: Option<DeviceId>,
    selected_output: Option<DeviceId>,
    current_handle: Option<Arc<AudioHandle>>,
    job: JobState,
    store: SegmentStore,
    download: DownloadState,
    next_job_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn job(&self) -> &JobState {
        &self.job
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SegmentStore {
        &mut self.store
    }

    pub fn download(&self) -> &DownloadState {
        &self.download
    }

    pub fn handle(&self) -> Option<&Arc<AudioHandle>> {
        self.current_handle.as_ref()
    }

    pub fn selected_input(&self) -> Option<&DeviceId> {
        self.selected_input.as_ref()
    }

    pub fn selected_output(&self) -> Option<&DeviceId> {
        self.selected_output.as_ref()
    }

    /// Switch the active tab.
    ///
    /// Clears the loaded handle so a stale handle can never feed a job
    /// started from the new tab. A Running job keeps running in the
    /// background and its terminal result is retained; an in-flight
    /// download likewise continues.
    pub fn switch_tab(&mut self, tab: Tab) {
        if tab != self.active_tab {
            self.active_tab = tab;
            self.current_handle = None;
        }
    }

    pub fn select_input(&mut self, id: Option<DeviceId>) {
        self.selected_input = id;
    }

    pub fn select_output(&mut self, id: Option<DeviceId>) {
        self.selected_output = id;
    }

    /// Degrade selections whose ids vanished from a refreshed device set
    pub fn validate_selections(&mut self, devices: &DeviceSet) {
        if devices
            .resolve(self.selected_input.as_ref(), DeviceKind::Input)
            .is_none()
        {
            self.selected_input = None;
        }
        if devices
            .resolve(self.selected_output.as_ref(), DeviceKind::Output)
            .is_none()
        {
            self.selected_output = None;
        }
    }

    pub fn set_handle(&mut self, handle: AudioHandle) {
        self.current_handle = Some(Arc::new(handle));
    }

    pub fn clear_handle(&mut self) {
        self.current_handle = None;
    }

    /// Start a new job from the loaded handle.
    ///
    /// The returned `Arc` is the job's borrow of the handle; the session
    /// keeps its own reference so a follow-up job can reuse the audio.
    pub fn begin_job(&mut self) -> Result<(JobId, Arc<AudioHandle>), StartJobError> {
        if self.job.is_running() {
            return Err(StartJobError::AlreadyRunning);
        }
        let handle = self
            .current_handle
            .as_ref()
            .ok_or(StartJobError::NoAudio)?
            .clone();

        self.next_job_id += 1;
        let id = JobId::new(self.next_job_id);
        self.job = JobState::Running {
            id,
            progress: 0,
            cancel_requested: false,
        };
        Ok((id, handle))
    }

    /// Apply a progress report. Ignored unless `id` is the running job;
    /// progress never decreases and saturates at 100.
    pub fn job_progress(&mut self, id: JobId, value: u8) -> bool {
        match &mut self.job {
            JobState::Running {
                id: running,
                progress,
                ..
            } if *running == id => {
                *progress = (*progress).max(value.min(100));
                true
            }
            _ => false,
        }
    }

    /// Mark cancellation as requested. Idempotent; ignored for non-running
    /// or mismatched ids.
    pub fn request_cancel(&mut self, id: JobId) -> bool {
        match &mut self.job {
            JobState::Running {
                id: running,
                cancel_requested,
                ..
            } if *running == id => {
                *cancel_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Complete the running job and replace the transcript with its output.
    ///
    /// Returns false (and changes nothing) for stale ids, so output from a
    /// superseded job can never overwrite a newer job's transcript.
    pub fn complete_job(&mut self, id: JobId, segments: Vec<Segment>) -> bool {
        if self.job.running_id() != Some(id) {
            return false;
        }
        self.job = JobState::Completed { id };
        self.store.replace_all(segments);
        true
    }

    pub fn fail_job(&mut self, id: JobId, kind: FailureKind) -> bool {
        if self.job.running_id() != Some(id) {
            return false;
        }
        self.job = JobState::Failed { id, kind };
        true
    }

    pub fn cancel_job(&mut self, id: JobId) -> bool {
        if self.job.running_id() != Some(id) {
            return false;
        }
        self.job = JobState::Cancelled { id };
        true
    }

    // Download sub-state transitions. Guarded the same way job events are:
    // a transition that does not fit the current state is ignored.

    pub fn begin_download(&mut self) -> bool {
        if self.download.is_downloading() {
            return false;
        }
        self.download = DownloadState::Downloading {
            received: 0,
            total: None,
        };
        true
    }

    pub fn download_progress(&mut self, bytes: u64, content_length: Option<u64>) -> bool {
        match &mut self.download {
            DownloadState::Downloading { received, total } => {
                *received = bytes.max(*received);
                if content_length.is_some() {
                    *total = content_length;
                }
                true
            }
            _ => false,
        }
    }

    pub fn download_ready(&mut self) -> bool {
        if !self.download.is_downloading() {
            return false;
        }
        self.download = DownloadState::Ready;
        true
    }

    pub fn download_failed(&mut self, message: impl Into<String>) -> bool {
        if !self.download.is_downloading() {
            return false;
        }
        self.download = DownloadState::Failed {
            message: message.into(),
        };
        true
    }

    pub fn download_cancelled(&mut self) -> bool {
        if !self.download.is_downloading() {
            return false;
        }
        self.download = DownloadState::Cancelled;
        true
    }

    /// Build a read-only projection. `recording` comes from the capture
    /// adapter, which the session does not observe directly.
    pub fn snapshot(&self, recording: bool) -> Snapshot {
        Snapshot {
            active_tab: self.active_tab,
            selected_input: self.selected_input.clone(),
            selected_output: self.selected_output.clone(),
            job: self.job.clone(),
            segments: self.store.segments().to_vec(),
            download: self.download.clone(),
            audio: self.current_handle.as_ref().map(|h| AudioInfo {
                duration_ms: h.duration_ms(),
                source: h.source(),
                origin: h.origin().map(|o| o.to_string()),
            }),
            recording,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::CapturedAudio;
    use crate::domain::device::Device;

    fn handle() -> AudioHandle {
        AudioHandle::recorded(CapturedAudio {
            samples: vec![1i16; 16000],
            sample_rate: 16000,
        })
    }

    fn session_with_audio() -> Session {
        let mut session = Session::new();
        session.set_handle(handle());
        session
    }

    #[test]
    fn begin_job_without_audio_fails() {
        let mut session = Session::new();
        assert!(matches!(
            session.begin_job(),
            Err(StartJobError::NoAudio)
        ));
    }

    #[test]
    fn begin_job_while_running_fails() {
        let mut session = session_with_audio();
        let (first, _) = session.begin_job().unwrap();

        let err = session.begin_job().unwrap_err();
        assert!(matches!(err, StartJobError::AlreadyRunning));
        // The original job is untouched
        assert_eq!(session.job().running_id(), Some(first));
    }

    #[test]
    fn job_ids_are_unique() {
        let mut session = session_with_audio();
        let (first, _) = session.begin_job().unwrap();
        session.cancel_job(first);
        let (second, _) = session.begin_job().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn progress_is_monotonic_and_saturating() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();

        assert!(session.job_progress(id, 30));
        assert!(session.job_progress(id, 20));
        assert_eq!(session.job().progress(), Some(30));

        assert!(session.job_progress(id, 250));
        assert_eq!(session.job().progress(), Some(100));
    }

    #[test]
    fn stale_job_events_are_discarded() {
        let mut session = session_with_audio();
        let (old, _) = session.begin_job().unwrap();
        session.cancel_job(old);
        let (new, _) = session.begin_job().unwrap();

        assert!(!session.job_progress(old, 80));
        assert!(!session.complete_job(old, vec![Segment::new(0, 1, "stale")]));
        assert!(session.store().is_empty());
        assert_eq!(session.job().running_id(), Some(new));
    }

    #[test]
    fn events_after_terminal_state_are_discarded() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();
        session.cancel_job(id);

        // The overtaken runner finishes late; its output must not apply
        assert!(!session.complete_job(id, vec![Segment::new(0, 1, "late")]));
        assert_eq!(session.job(), &JobState::Cancelled { id });
        assert!(session.store().is_empty());
    }

    #[test]
    fn request_cancel_is_idempotent() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();

        assert!(session.request_cancel(id));
        assert!(session.request_cancel(id));
        assert!(session.job().cancel_requested());
    }

    #[test]
    fn complete_job_replaces_transcript() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();

        assert!(session.complete_job(id, vec![Segment::new(0, 1000, "done")]));
        assert!(session.job().is_terminal());
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn new_job_allowed_after_cancel_on_same_handle() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();
        session.cancel_job(id);

        assert!(session.handle().is_some());
        assert!(session.begin_job().is_ok());
    }

    #[test]
    fn switch_tab_clears_handle_but_not_job() {
        let mut session = session_with_audio();
        let (id, _) = session.begin_job().unwrap();

        session.switch_tab(Tab::Url);
        assert!(session.handle().is_none());
        assert_eq!(session.job().running_id(), Some(id));

        // Terminal result is retained for when the tab is revisited
        session.complete_job(id, vec![Segment::new(0, 500, "kept")]);
        session.switch_tab(Tab::Record);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn switch_to_same_tab_keeps_handle() {
        let mut session = session_with_audio();
        session.switch_tab(Tab::Record);
        assert!(session.handle().is_some());
    }

    #[test]
    fn stale_device_selection_degrades_to_unset() {
        let mut session = Session::new();
        session.select_input(Some(DeviceId::from("mic-0")));
        session.select_output(Some(DeviceId::from("spk-0")));

        let refreshed = DeviceSet::new(vec![Device::new(
            "spk-0",
            "Speakers",
            DeviceKind::Output,
        )]);
        session.validate_selections(&refreshed);

        assert!(session.selected_input().is_none());
        assert_eq!(session.selected_output(), Some(&DeviceId::from("spk-0")));
    }

    #[test]
    fn download_state_machine() {
        let mut session = Session::new();
        assert!(session.begin_download());
        assert!(!session.begin_download());

        assert!(session.download_progress(1024, Some(4096)));
        assert_eq!(
            session.download(),
            &DownloadState::Downloading {
                received: 1024,
                total: Some(4096)
            }
        );

        assert!(session.download_ready());
        assert!(!session.download_progress(2048, None));
    }

    #[test]
    fn download_cancel_only_while_downloading() {
        let mut session = Session::new();
        assert!(!session.download_cancelled());
        session.begin_download();
        assert!(session.download_cancelled());
        assert_eq!(session.download(), &DownloadState::Cancelled);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut session = session_with_audio();
        session.select_input(Some(DeviceId::from("mic-0")));
        let (id, _) = session.begin_job().unwrap();
        session.job_progress(id, 55);

        let snapshot = session.snapshot(false);
        assert_eq!(snapshot.job.progress(), Some(55));
        assert_eq!(snapshot.audio.as_ref().unwrap().duration_ms, 1000);
        assert_eq!(snapshot.audio.unwrap().source, SourceKind::Recorded);
        assert_eq!(snapshot.selected_input, Some(DeviceId::from("mic-0")));
    }

    #[test]
    fn tab_index_round_trip() {
        for tab in [Tab::Record, Tab::File, Tab::Url] {
            assert_eq!(Tab::from_index(tab.index()), Some(tab));
        }
        assert_eq!(Tab::from_index(9), None);
    }
}
