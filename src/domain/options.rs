//! Transcription options value object

use serde::{Deserialize, Serialize};

/// Options for one transcription job.
///
/// An immutable snapshot is taken at submission time; edits made afterwards
/// never reach an in-flight job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOptions {
    /// Engine model identifier, validated against the engine before work starts
    pub model_id: String,
    /// Spoken language hint (ISO code), `None` for auto-detect
    pub language: Option<String>,
    pub n_threads: Option<i32>,
    pub init_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub translate: bool,
    pub word_timestamps: bool,
    pub max_sentence_len: Option<i32>,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            model_id: "whisper-1".to_string(),
            language: None,
            n_threads: None,
            init_prompt: None,
            temperature: None,
            translate: false,
            word_timestamps: false,
            max_sentence_len: None,
        }
    }
}

impl TranscriptionOptions {
    pub fn with_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model() {
        let options = TranscriptionOptions::default();
        assert_eq!(options.model_id, "whisper-1");
        assert!(options.language.is_none());
        assert!(!options.translate);
    }

    #[test]
    fn with_model() {
        let options = TranscriptionOptions::with_model("base.en");
        assert_eq!(options.model_id, "base.en");
    }

    #[test]
    fn toml_round_trip() {
        let options = TranscriptionOptions {
            language: Some("en".into()),
            n_threads: Some(4),
            ..Default::default()
        };
        let text = toml::to_string(&options).unwrap();
        let parsed: TranscriptionOptions = toml::from_str(&text).unwrap();
        assert_eq!(parsed, options);
    }
}
