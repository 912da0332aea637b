//! User preference value object

use serde::{Deserialize, Serialize};

use super::options::TranscriptionOptions;

/// Persisted user preferences.
///
/// Preferences are an external collaborator's concern; this is only the
/// shape stored and re-applied at startup. All fields are optional so a
/// missing or partial file never fails a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Last selected input device id
    pub input_device: Option<String>,
    /// Last selected output (loopback) device id
    pub output_device: Option<String>,
    /// Keep a copy of recordings and downloads in the documents folder
    pub store_in_documents: Option<bool>,
    /// Last active tab index (0 record, 1 file, 2 url)
    pub last_tab: Option<u8>,
    /// Last used model options
    pub model_options: Option<TranscriptionOptions>,
}

impl Preferences {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn store_in_documents_or_default(&self) -> bool {
        self.store_in_documents.unwrap_or(false)
    }

    pub fn model_options_or_default(&self) -> TranscriptionOptions {
        self.model_options.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_values() {
        let prefs = Preferences::empty();
        assert!(prefs.input_device.is_none());
        assert!(!prefs.store_in_documents_or_default());
    }

    #[test]
    fn toml_round_trip() {
        let prefs = Preferences {
            input_device: Some("mic-0".into()),
            store_in_documents: Some(true),
            last_tab: Some(2),
            model_options: Some(TranscriptionOptions::with_model("base.en")),
            ..Default::default()
        };
        let text = toml::to_string(&prefs).unwrap();
        let parsed: Preferences = toml::from_str(&text).unwrap();
        assert_eq!(parsed, prefs);
    }

    #[test]
    fn partial_toml_parses() {
        let parsed: Preferences = toml::from_str("store_in_documents = true").unwrap();
        assert!(parsed.store_in_documents_or_default());
        assert!(parsed.input_device.is_none());
    }
}
