//! Session orchestrator use case
//!
//! Ties source selection, job lifecycle and the transcript model into one
//! race-free state machine. All session mutations happen under a single
//! lock; capture, download and the engine run as independent async
//! operations that report back through callbacks applied at that lock,
//! guarded by job identity.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::audio::AudioHandle;
use crate::domain::device::{DeviceId, DeviceKind, DeviceSet};
use crate::domain::job::{FailureKind, JobId};
use crate::domain::options::TranscriptionOptions;
use crate::domain::preferences::Preferences;
use crate::domain::segment::IndexError;
use crate::domain::session::{Session, Snapshot, StartJobError, Tab};

use super::ports::{
    AudioDownloader, CaptureError, CaptureRecorder, DeviceEnumerator, DeviceError, DocumentStore,
    DownloadError, EngineError, MediaError, MediaProbe, StorageError, TranscriptionEngine,
};

/// Errors rejecting a job submission
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("A transcription job is already running")]
    AlreadyRunning,

    #[error("No audio loaded; record, open or download audio first")]
    NoAudio,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Transcript has user edits; confirm replacement to submit again")]
    EditsNotConfirmed,
}

impl From<StartJobError> for SubmitError {
    fn from(err: StartJobError) -> Self {
        match err {
            StartJobError::AlreadyRunning => Self::AlreadyRunning,
            StartJobError::NoAudio => Self::NoAudio,
        }
    }
}

/// Errors from orchestrator operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Edit error: {0}")]
    Edit(#[from] IndexError),

    #[error("A download is already in progress")]
    DownloadInProgress,

    #[error("No input device selected")]
    NoInputSelected,
}

/// Outcome of a finished recording
#[derive(Debug)]
pub struct RecordingOutcome {
    pub duration_ms: u64,
    /// Documents-folder copy, when requested and successful
    pub saved_to: Option<PathBuf>,
    /// Persistence failure, surfaced without losing the in-memory handle
    pub storage_error: Option<StorageError>,
}

/// Tuning knobs for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long a cancel request may stay unobserved before the job is
    /// force-transitioned to Cancelled and its runner's events discarded.
    pub cancel_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cancel_grace: Duration::from_secs(5),
        }
    }
}

fn publish_snapshot(session: &Mutex<Session>, recording: bool, tx: &watch::Sender<Snapshot>) {
    let snapshot = session.lock().unwrap().snapshot(recording);
    tx.send_replace(snapshot);
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The single logical owner of the session.
///
/// Presentation layers call these operations and render the snapshots
/// published on the watch channel; they never mutate session state.
pub struct Orchestrator<D, R, M, W, E, S>
where
    D: DeviceEnumerator + 'static,
    R: CaptureRecorder + 'static,
    M: MediaProbe + 'static,
    W: AudioDownloader + 'static,
    E: TranscriptionEngine + 'static,
    S: DocumentStore + 'static,
{
    devices: Arc<D>,
    recorder: Arc<R>,
    media: Arc<M>,
    downloader: Arc<W>,
    engine: Arc<E>,
    storage: Arc<S>,
    config: OrchestratorConfig,
    session: Arc<Mutex<Session>>,
    device_set: Mutex<DeviceSet>,
    job_cancel: Mutex<Option<(JobId, Arc<AtomicBool>)>>,
    download_cancel: Mutex<Option<Arc<AtomicBool>>>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<D, R, M, W, E, S> Orchestrator<D, R, M, W, E, S>
where
    D: DeviceEnumerator + 'static,
    R: CaptureRecorder + 'static,
    M: MediaProbe + 'static,
    W: AudioDownloader + 'static,
    E: TranscriptionEngine + 'static,
    S: DocumentStore + 'static,
{
    pub fn new(
        devices: D,
        recorder: R,
        media: M,
        downloader: W,
        engine: E,
        storage: S,
        config: OrchestratorConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Self {
            devices: Arc::new(devices),
            recorder: Arc::new(recorder),
            media: Arc::new(media),
            downloader: Arc::new(downloader),
            engine: Arc::new(engine),
            storage: Arc::new(storage),
            config,
            session: Arc::new(Mutex::new(Session::new())),
            device_set: Mutex::new(DeviceSet::default()),
            job_cancel: Mutex::new(None),
            download_cancel: Mutex::new(None),
            snapshot_tx,
        }
    }

    /// Subscribe to read-only snapshots, published after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session
            .lock()
            .unwrap()
            .snapshot(self.recorder.is_recording())
    }

    fn publish(&self) {
        publish_snapshot(
            &self.session,
            self.recorder.is_recording(),
            &self.snapshot_tx,
        );
    }

    /// Re-query the platform's devices and degrade stale selections
    pub async fn refresh_devices(&self) -> Result<DeviceSet, CoreError> {
        let set = self.devices.list_devices().await?;
        debug!(devices = set.devices().len(), "Device set refreshed");
        self.session.lock().unwrap().validate_selections(&set);
        *self.device_set.lock().unwrap() = set.clone();
        self.publish();
        Ok(set)
    }

    pub fn select_input(&self, id: Option<DeviceId>) {
        self.session.lock().unwrap().select_input(id);
        self.publish();
    }

    pub fn select_output(&self, id: Option<DeviceId>) {
        self.session.lock().unwrap().select_output(id);
        self.publish();
    }

    /// Switch the active tab. A running job or download keeps going in the
    /// background; only the loaded handle is cleared.
    pub fn switch_tab(&self, tab: Tab) {
        self.session.lock().unwrap().switch_tab(tab);
        self.publish();
    }

    /// Apply persisted preferences to the session
    pub fn apply_preferences(&self, prefs: &Preferences) {
        let mut session = self.session.lock().unwrap();
        if let Some(tab) = prefs.last_tab.and_then(Tab::from_index) {
            session.switch_tab(tab);
        }
        session.select_input(prefs.input_device.as_deref().map(DeviceId::from));
        session.select_output(prefs.output_device.as_deref().map(DeviceId::from));
        drop(session);
        self.publish();
    }

    /// Begin microphone (and optional loopback) capture
    pub async fn start_recording(&self) -> Result<(), CoreError> {
        let (input, output) = {
            let session = self.session.lock().unwrap();
            let set = self.device_set.lock().unwrap();
            let input = set
                .resolve(session.selected_input(), DeviceKind::Input)
                .cloned()
                .ok_or(CoreError::NoInputSelected)?;
            let output = set
                .resolve(session.selected_output(), DeviceKind::Output)
                .cloned();
            (input, output)
        };

        self.recorder.start(&input, output.as_ref()).await?;
        info!(device = %input.id, "Capture started");
        self.publish();
        Ok(())
    }

    /// Stop capture and finalize the buffer into the session's handle.
    ///
    /// With `store_to_documents`, a copy is persisted; persistence failure
    /// is reported in the outcome but never discards the recording.
    pub async fn stop_recording(
        &self,
        store_to_documents: bool,
    ) -> Result<RecordingOutcome, CoreError> {
        let captured = self.recorder.stop().await?;
        let duration_ms = captured.duration_ms();
        info!(duration_ms, "Capture stopped");

        let mut saved_to = None;
        let mut storage_error = None;
        if store_to_documents {
            let name = format!("recording-{}.wav", epoch_secs());
            match self.storage.write_audio(&captured, &name).await {
                Ok(path) => saved_to = Some(path),
                Err(e) => {
                    warn!(error = %e, "Keeping recording in memory; documents copy failed");
                    storage_error = Some(e);
                }
            }
        }

        self.session
            .lock()
            .unwrap()
            .set_handle(AudioHandle::recorded(captured));
        self.publish();

        Ok(RecordingOutcome {
            duration_ms,
            saved_to,
            storage_error,
        })
    }

    /// Discard an in-progress capture
    pub async fn cancel_recording(&self) -> Result<(), CoreError> {
        self.recorder.cancel().await?;
        self.publish();
        Ok(())
    }

    /// Open a local media file and load it as the session's handle
    pub async fn open_file(&self, path: &Path) -> Result<(), CoreError> {
        let handle = self.media.probe(path).await?;
        info!(path = %path.display(), duration_ms = handle.duration_ms(), "File loaded");
        self.session.lock().unwrap().set_handle(handle);
        self.publish();
        Ok(())
    }

    /// Fetch a remote URL and load the result as the session's handle.
    ///
    /// Drives the `Idle -> Downloading -> {Ready | Failed | Cancelled}`
    /// sub-state; cancellation is not an error and leaves no partial file.
    pub async fn download(&self, url: &str, store_to_documents: bool) -> Result<(), CoreError> {
        if !self.session.lock().unwrap().begin_download() {
            return Err(CoreError::DownloadInProgress);
        }
        self.publish();

        let cancel = Arc::new(AtomicBool::new(false));
        *self.download_cancel.lock().unwrap() = Some(cancel.clone());

        let session = Arc::clone(&self.session);
        let recorder = Arc::clone(&self.recorder);
        let tx = self.snapshot_tx.clone();
        let on_progress: super::ports::DownloadProgress =
            Arc::new(move |received, total| {
                if session.lock().unwrap().download_progress(received, total) {
                    publish_snapshot(&session, recorder.is_recording(), &tx);
                }
            });

        let result = self
            .downloader
            .fetch(url, Some(on_progress), cancel)
            .await;
        *self.download_cancel.lock().unwrap() = None;

        match result {
            Ok(path) => {
                // Probe before accepting, so a payload that downloaded fine
                // but is not decodable media fails the download.
                let probed = match self.media.probe(&path).await {
                    Ok(h) => h,
                    Err(e) => {
                        if let Err(rm) = tokio::fs::remove_file(&path).await {
                            warn!(path = %path.display(), error = %rm, "Could not remove rejected download");
                        }
                        self.session.lock().unwrap().download_failed(e.to_string());
                        self.publish();
                        return Err(e.into());
                    }
                };

                if store_to_documents {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("download-{}", epoch_secs()));
                    match tokio::fs::read(&path).await {
                        Ok(bytes) => {
                            if let Err(e) = self.storage.write(&bytes, &name).await {
                                warn!(error = %e, "Documents copy of download failed");
                            }
                        }
                        Err(e) => warn!(error = %e, "Could not re-read download for documents copy"),
                    }
                }

                let handle = AudioHandle::downloaded(path, probed.duration_ms(), url);
                let mut session = self.session.lock().unwrap();
                session.set_handle(handle);
                session.download_ready();
                drop(session);
                info!(url, "Download ready");
                self.publish();
                Ok(())
            }
            Err(DownloadError::Cancelled) => {
                self.session.lock().unwrap().download_cancelled();
                info!(url, "Download cancelled");
                self.publish();
                Ok(())
            }
            Err(e) => {
                self.session.lock().unwrap().download_failed(e.to_string());
                warn!(url, error = %e, "Download failed");
                self.publish();
                Err(e.into())
            }
        }
    }

    /// Request cancellation of an in-flight download. Takes effect at the
    /// downloader's next chunk; partial data is deleted.
    pub fn cancel_download(&self) {
        if let Some(flag) = self.download_cancel.lock().unwrap().as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Submit the loaded handle to the engine as a new job.
    ///
    /// Options are snapshotted here; later edits never reach the running
    /// job. Replacing a transcript that carries user edits requires
    /// `confirm_replace`.
    pub async fn submit_transcription(
        &self,
        options: TranscriptionOptions,
        confirm_replace: bool,
    ) -> Result<JobId, CoreError> {
        if !self.engine.is_known_model(&options.model_id) {
            return Err(SubmitError::UnknownModel(options.model_id).into());
        }

        let (id, handle) = {
            let mut session = self.session.lock().unwrap();
            if session.job().is_running() {
                return Err(SubmitError::AlreadyRunning.into());
            }
            if session.store().has_edits() && !confirm_replace {
                return Err(SubmitError::EditsNotConfirmed.into());
            }
            session.begin_job().map_err(SubmitError::from)?
        };

        let cancel = Arc::new(AtomicBool::new(false));
        *self.job_cancel.lock().unwrap() = Some((id, cancel.clone()));

        let engine = Arc::clone(&self.engine);
        let session = Arc::clone(&self.session);
        let recorder = Arc::clone(&self.recorder);
        let tx = self.snapshot_tx.clone();

        info!(%id, model = %options.model_id, "Job submitted");
        tokio::spawn(async move {
            let progress_session = Arc::clone(&session);
            let progress_recorder = Arc::clone(&recorder);
            let progress_tx = tx.clone();
            let on_progress: crate::application::ports::EngineProgress = Arc::new(move |value| {
                if progress_session.lock().unwrap().job_progress(id, value) {
                    publish_snapshot(
                        &progress_session,
                        progress_recorder.is_recording(),
                        &progress_tx,
                    );
                }
            });

            let result = engine
                .transcribe(&handle, &options, Some(on_progress), cancel)
                .await;

            let mut locked = session.lock().unwrap();
            let applied = match result {
                Ok(segments) => {
                    let applied = locked.complete_job(id, segments);
                    if applied {
                        info!(%id, "Job completed");
                    }
                    applied
                }
                Err(EngineError::Cancelled) => {
                    let applied = locked.cancel_job(id);
                    if applied {
                        info!(%id, "Job cancelled");
                    }
                    applied
                }
                Err(e) => {
                    let kind = e.failure_kind().unwrap_or(FailureKind::EngineCrash);
                    let applied = locked.fail_job(id, kind);
                    if applied {
                        warn!(%id, error = %e, "Job failed");
                    }
                    applied
                }
            };
            if !applied {
                debug!(%id, "Discarded event from superseded job");
            }
            drop(locked);
            publish_snapshot(&session, recorder.is_recording(), &tx);
            // `handle` drops here, releasing the job's borrow of the audio.
        });

        self.publish();
        Ok(id)
    }

    /// Request cooperative cancellation of a running job.
    ///
    /// Idempotent. The engine observes the flag at its next checkpoint; if
    /// it stays unobserved past the configured grace period, the job is
    /// force-transitioned to Cancelled and the runner's late events are
    /// discarded by identity.
    pub fn request_cancel(&self, id: JobId) {
        let applied = self.session.lock().unwrap().request_cancel(id);
        if !applied {
            return;
        }

        if let Some((cancel_id, flag)) = self.job_cancel.lock().unwrap().as_ref() {
            if *cancel_id == id {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.publish();

        let session = Arc::clone(&self.session);
        let recorder = Arc::clone(&self.recorder);
        let tx = self.snapshot_tx.clone();
        let grace = self.config.cancel_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if session.lock().unwrap().cancel_job(id) {
                warn!(%id, "Cancel unobserved within grace period; job force-cancelled");
                publish_snapshot(&session, recorder.is_recording(), &tx);
            }
        });
    }

    /// Edit one transcript segment's text in place
    pub fn apply_edit(&self, index: usize, new_text: &str) -> Result<(), CoreError> {
        self.session
            .lock()
            .unwrap()
            .store_mut()
            .apply_edit(index, new_text)?;
        self.publish();
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.recorder.elapsed_ms()
    }
}
