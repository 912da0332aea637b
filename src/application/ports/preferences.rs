//! Preference storage port interface

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::error::PreferenceError;
use crate::domain::preferences::Preferences;

/// Port for preference persistence
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load preferences from storage.
    ///
    /// A missing file yields empty preferences, not an error.
    async fn load(&self) -> Result<Preferences, PreferenceError>;

    /// Save preferences to storage.
    async fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError>;

    /// Get the preferences file path.
    fn path(&self) -> PathBuf;
}
