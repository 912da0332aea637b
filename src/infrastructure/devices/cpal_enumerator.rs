//! Audio device enumeration using cpal

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use crate::application::ports::{DeviceEnumerator, DeviceError};
use crate::domain::device::{Device, DeviceKind, DeviceSet};

/// Enumerator over the default cpal host.
///
/// The device name doubles as the stable id; cpal exposes no better
/// identifier across hosts.
pub struct CpalEnumerator;

impl CpalEnumerator {
    pub fn new() -> Self {
        Self
    }

    fn list_blocking() -> Result<DeviceSet, DeviceError> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        let inputs = host
            .input_devices()
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;
        for device in inputs {
            match device.name() {
                Ok(name) => devices.push(Device::new(name.clone(), name, DeviceKind::Input)),
                Err(e) => debug!(error = %e, "Skipping unnamed input device"),
            }
        }

        let outputs = host
            .output_devices()
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;
        for device in outputs {
            match device.name() {
                Ok(name) => devices.push(Device::new(name.clone(), name, DeviceKind::Output)),
                Err(e) => debug!(error = %e, "Skipping unnamed output device"),
            }
        }

        Ok(DeviceSet::new(devices))
    }
}

impl Default for CpalEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceEnumerator for CpalEnumerator {
    async fn list_devices(&self) -> Result<DeviceSet, DeviceError> {
        // cpal touches platform audio APIs; keep it off the async runtime
        tokio::task::spawn_blocking(Self::list_blocking)
            .await
            .map_err(|e| DeviceError::Enumeration(format!("Task join error: {}", e)))?
    }
}
