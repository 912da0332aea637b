//! Device enumeration port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::device::DeviceSet;

/// Device registry errors
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),
}

/// Port for enumerating the platform's audio devices.
///
/// Enumeration is a pure system query; devices are re-queried on explicit
/// refresh and stale selections degrade to unset rather than erroring.
#[async_trait]
pub trait DeviceEnumerator: Send + Sync {
    /// List all currently available input and output devices.
    async fn list_devices(&self) -> Result<DeviceSet, DeviceError>;
}
