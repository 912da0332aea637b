//! XDG preference store adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::PreferenceStore;
use crate::domain::error::PreferenceError;
use crate::domain::preferences::Preferences;

/// XDG-compliant preference store
pub struct XdgPreferenceStore {
    path: PathBuf,
}

impl XdgPreferenceStore {
    /// Create a store at the default XDG path
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("murmur");

        Self {
            path: config_dir.join("preferences.toml"),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<Preferences, PreferenceError> {
        toml::from_str(content).map_err(|e| PreferenceError::ParseError(e.to_string()))
    }

    fn to_toml(preferences: &Preferences) -> Result<String, PreferenceError> {
        toml::to_string_pretty(preferences).map_err(|e| PreferenceError::WriteError(e.to_string()))
    }
}

impl Default for XdgPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for XdgPreferenceStore {
    async fn load(&self) -> Result<Preferences, PreferenceError> {
        if !self.path.exists() {
            // First run: no file is not an error
            return Ok(Preferences::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| PreferenceError::ReadError(e.to_string()))?;

        Self::parse_toml(&content)
    }

    async fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PreferenceError::WriteError(e.to_string()))?;
        }

        let content = Self::to_toml(preferences)?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| PreferenceError::WriteError(e.to_string()))?;

        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }
}
