//! Main app runners wiring the orchestrator to the terminal

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use crate::application::ports::{DeviceEnumerator, PreferenceStore};
use crate::application::{Orchestrator, OrchestratorConfig};
use crate::domain::device::DeviceId;
use crate::domain::job::JobState;
use crate::domain::options::TranscriptionOptions;
use crate::domain::preferences::Preferences;
use crate::domain::session::{DownloadState, Snapshot, Tab};
use crate::infrastructure::{
    CpalCapture, CpalEnumerator, DocumentsStore, FileProbe, HttpDownloader, WhisperHttpEngine,
    XdgPreferenceStore,
};

use super::args::{ModelArgs, SaveArgs};
use super::presenter::Presenter;

/// Exit codes. Usage errors exit with clap's own code 2.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;

type App = Orchestrator<
    CpalEnumerator,
    CpalCapture,
    FileProbe,
    HttpDownloader,
    WhisperHttpEngine,
    DocumentsStore,
>;

fn build_orchestrator(model: &ModelArgs, presenter: &Presenter) -> Arc<App> {
    let storage = match DocumentsStore::new() {
        Ok(store) => store,
        Err(e) => {
            presenter.warn(&format!(
                "{}; saving to the temp directory instead",
                e
            ));
            DocumentsStore::with_dir(std::env::temp_dir())
        }
    };

    Arc::new(Orchestrator::new(
        CpalEnumerator::new(),
        CpalCapture::new(),
        FileProbe::new(),
        HttpDownloader::new(),
        WhisperHttpEngine::new(model.api_url.clone(), model.api_key.clone()),
        storage,
        OrchestratorConfig::default(),
    ))
}

/// List input and output devices, marking the saved selections
pub async fn run_devices() -> ExitCode {
    let presenter = Presenter::new();
    let prefs = load_preferences().await;

    let set = match CpalEnumerator::new().list_devices().await {
        Ok(set) => set,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let marker = |saved: &Option<String>, id: &DeviceId| {
        if saved.as_deref() == Some(id.as_str()) {
            " (saved)"
        } else {
            ""
        }
    };

    presenter.info("Input devices:");
    for device in set.inputs() {
        presenter.output(&format!(
            "  {}{}",
            device.display_name,
            marker(&prefs.input_device, &device.id)
        ));
    }
    presenter.info("Output devices:");
    for device in set.outputs() {
        presenter.output(&format!(
            "  {}{}",
            device.display_name,
            marker(&prefs.output_device, &device.id)
        ));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Record until Ctrl-C, then transcribe
pub async fn run_record(
    input: Option<String>,
    output: Option<String>,
    model: ModelArgs,
    save: SaveArgs,
) -> ExitCode {
    let mut presenter = Presenter::new();
    let prefs = load_preferences().await;
    let orch = build_orchestrator(&model, &presenter);
    orch.apply_preferences(&prefs);
    orch.switch_tab(Tab::Record);

    let set = match orch.refresh_devices().await {
        Ok(set) => set,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Flag beats preference beats first available device
    if let Some(name) = input {
        orch.select_input(Some(DeviceId::from(name.as_str())));
    } else if orch.snapshot().selected_input.is_none() {
        match set.inputs().next() {
            Some(device) => orch.select_input(Some(device.id.clone())),
            None => {
                presenter.error("No input devices available");
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }
    if let Some(name) = output {
        orch.select_output(Some(DeviceId::from(name.as_str())));
    }

    if let Err(e) = orch.start_recording().await {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.start_spinner("Recording... press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {
                presenter.update_spinner(&format!(
                    "Recording {}  press Ctrl-C to stop",
                    presenter.format_elapsed(orch.elapsed_ms())
                ));
            }
        }
    }

    let store_copy = save.save_to_documents || prefs.store_in_documents_or_default();
    let outcome = match orch.stop_recording(store_copy).await {
        Ok(outcome) => outcome,
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.spinner_success(&format!(
        "Recording complete ({})",
        super::presenter::format_timestamp(outcome.duration_ms)
    ));
    if let Some(path) = &outcome.saved_to {
        presenter.success(&format!("Saved to {}", path.display()));
    }
    if let Some(e) = &outcome.storage_error {
        presenter.warn(&format!("Recording kept in memory; {}", e));
    }

    let options = model.to_options(&prefs.model_options_or_default());
    let code = match run_job(&orch, &mut presenter, options.clone()).await {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            presenter.error(&e);
            EXIT_ERROR
        }
    };

    save_preferences(&orch.snapshot(), &options, save.save_to_documents, &presenter).await;
    ExitCode::from(code)
}

/// Transcribe a local file
pub async fn run_file(path: &Path, model: ModelArgs) -> ExitCode {
    let mut presenter = Presenter::new();
    let prefs = load_preferences().await;
    let orch = build_orchestrator(&model, &presenter);
    orch.apply_preferences(&prefs);
    orch.switch_tab(Tab::File);

    if let Err(e) = orch.open_file(path).await {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }
    presenter.info(&format!("Loaded {}", path.display()));

    let options = model.to_options(&prefs.model_options_or_default());
    let code = match run_job(&orch, &mut presenter, options.clone()).await {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            presenter.error(&e);
            EXIT_ERROR
        }
    };

    save_preferences(&orch.snapshot(), &options, false, &presenter).await;
    ExitCode::from(code)
}

/// Download a remote file, then transcribe it
pub async fn run_download(url: String, model: ModelArgs, save: SaveArgs) -> ExitCode {
    let mut presenter = Presenter::new();
    let prefs = load_preferences().await;
    let orch = build_orchestrator(&model, &presenter);
    orch.apply_preferences(&prefs);
    orch.switch_tab(Tab::Url);

    let store_copy = save.save_to_documents || prefs.store_in_documents_or_default();
    let mut rx = orch.subscribe();

    presenter.start_spinner("Downloading... press Ctrl-C to cancel");
    let task_orch = Arc::clone(&orch);
    let task_url = url.clone();
    let mut download = tokio::spawn(async move { task_orch.download(&task_url, store_copy).await });

    let result = loop {
        tokio::select! {
            result = &mut download => {
                break result.map_err(|e| e.to_string());
            }
            changed = rx.changed() => {
                if changed.is_ok() {
                    let state = rx.borrow_and_update().download.clone();
                    if let DownloadState::Downloading { received, total } = state {
                        presenter.update_spinner(&format!(
                            "Downloading {}  press Ctrl-C to cancel",
                            presenter.format_download(received, total)
                        ));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orch.cancel_download();
                presenter.update_spinner("Cancelling download...");
            }
        }
    };

    match result {
        Ok(Ok(())) => match orch.snapshot().download {
            DownloadState::Ready => presenter.spinner_success("Download ready"),
            DownloadState::Cancelled => {
                presenter.spinner_fail("Download cancelled");
                return ExitCode::from(EXIT_SUCCESS);
            }
            other => {
                presenter.spinner_fail(&format!("Unexpected download state: {:?}", other));
                return ExitCode::from(EXIT_ERROR);
            }
        },
        Ok(Err(e)) => {
            presenter.stop_spinner();
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.stop_spinner();
            presenter.error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let options = model.to_options(&prefs.model_options_or_default());
    let code = match run_job(&orch, &mut presenter, options.clone()).await {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            presenter.error(&e);
            EXIT_ERROR
        }
    };

    save_preferences(&orch.snapshot(), &options, save.save_to_documents, &presenter).await;
    ExitCode::from(code)
}

/// Submit a job and render its progress until it settles.
///
/// Returns Ok(true) when the transcript printed, Ok(false) when the job
/// was cancelled by the user.
async fn run_job(
    orch: &App,
    presenter: &mut Presenter,
    options: TranscriptionOptions,
) -> Result<bool, String> {
    let mut rx = orch.subscribe();
    let id = orch
        .submit_transcription(options, true)
        .await
        .map_err(|e| e.to_string())?;

    presenter.start_spinner("Transcribing... press Ctrl-C to cancel");
    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed.map_err(|_| "Session closed unexpectedly".to_string())?;
                let job = rx.borrow_and_update().job.clone();
                match job {
                    JobState::Running { progress, cancel_requested, .. } => {
                        if cancel_requested {
                            presenter.update_spinner("Cancelling...");
                        } else {
                            presenter.update_spinner(&format!("Transcribing... {}%", progress));
                        }
                    }
                    JobState::Completed { id: done } if done == id => {
                        presenter.spinner_success("Transcription complete");
                        break;
                    }
                    JobState::Cancelled { id: done } if done == id => {
                        presenter.spinner_fail("Transcription cancelled");
                        return Ok(false);
                    }
                    JobState::Failed { id: done, kind } if done == id => {
                        presenter.spinner_fail("Transcription failed");
                        return Err(format!("Transcription failed: {}", kind));
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orch.request_cancel(id);
                presenter.update_spinner("Cancelling...");
            }
        }
    }

    let snapshot = orch.snapshot();
    if snapshot.segments.is_empty() {
        presenter.warn("No speech detected");
    }
    for segment in &snapshot.segments {
        presenter.segment(segment);
    }
    Ok(true)
}

async fn load_preferences() -> Preferences {
    XdgPreferenceStore::new()
        .load()
        .await
        .unwrap_or_else(|_| Preferences::empty())
}

/// Persist selections and options for the next run
async fn save_preferences(
    snapshot: &Snapshot,
    options: &TranscriptionOptions,
    saved_to_documents: bool,
    presenter: &Presenter,
) {
    let store = XdgPreferenceStore::new();
    let mut prefs = store.load().await.unwrap_or_else(|_| Preferences::empty());

    prefs.input_device = snapshot
        .selected_input
        .as_ref()
        .map(|id| id.as_str().to_string());
    prefs.output_device = snapshot
        .selected_output
        .as_ref()
        .map(|id| id.as_str().to_string());
    prefs.last_tab = Some(snapshot.active_tab.index());
    prefs.model_options = Some(options.clone());
    if saved_to_documents {
        prefs.store_in_documents = Some(true);
    }

    if let Err(e) = store.save(&prefs).await {
        presenter.warn(&format!("Could not save preferences: {}", e));
    }
}
