//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::options::TranscriptionOptions;

/// Murmur - record, open or download audio and transcribe it
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(version)]
#[command(about = "Audio transcription sessions from microphone, file or URL")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input and output devices
    Devices,
    /// Record from a microphone (plus optional loopback) and transcribe
    Record {
        /// Input device name (defaults to the saved preference)
        #[arg(short, long, value_name = "DEVICE")]
        input: Option<String>,

        /// Output device to capture as loopback alongside the microphone
        #[arg(short, long, value_name = "DEVICE")]
        output: Option<String>,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        save: SaveArgs,
    },
    /// Transcribe a local audio file
    File {
        /// Path to the audio file
        path: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },
    /// Download a remote audio file and transcribe it
    Download {
        /// URL of the remote audio or video file
        url: String,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        save: SaveArgs,
    },
}

/// Engine and model options shared by the transcribing subcommands
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model to run
    #[arg(short, long, default_value = "whisper-1")]
    pub model: String,

    /// Spoken language hint (ISO code), auto-detect when omitted
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Initial prompt fed to the decoder
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Sampling temperature
    #[arg(long, value_name = "T")]
    pub temperature: Option<f32>,

    /// Translate to English instead of transcribing
    #[arg(long)]
    pub translate: bool,

    /// Request word-level timestamps
    #[arg(long)]
    pub word_timestamps: bool,

    /// Transcription backend base URL
    #[arg(
        long,
        env = "MURMUR_API_URL",
        value_name = "URL",
        default_value = "http://localhost:8080/v1"
    )]
    pub api_url: String,

    /// API key for the transcription backend
    #[arg(long, env = "MURMUR_API_KEY", value_name = "KEY")]
    pub api_key: Option<String>,
}

impl ModelArgs {
    /// Build job options from the flags, falling back to saved preferences
    /// for everything the flags leave unset
    pub fn to_options(&self, saved: &TranscriptionOptions) -> TranscriptionOptions {
        TranscriptionOptions {
            model_id: self.model.clone(),
            language: self.language.clone().or_else(|| saved.language.clone()),
            n_threads: saved.n_threads,
            init_prompt: self.prompt.clone().or_else(|| saved.init_prompt.clone()),
            temperature: self.temperature.or(saved.temperature),
            translate: self.translate,
            word_timestamps: self.word_timestamps || saved.word_timestamps,
            max_sentence_len: saved.max_sentence_len,
        }
    }
}

/// Documents-folder options
#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Keep a copy of the audio in the documents folder
    #[arg(long)]
    pub save_to_documents: bool,
}
