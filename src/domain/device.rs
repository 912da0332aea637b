//! Audio device value objects

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an audio device.
///
/// Device ids come from the platform enumeration and are only meaningful
/// against the snapshot they were enumerated in. Selections hold an id, not
/// a device, so a stale selection degrades to unset instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Direction of an audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Input,
    Output,
}

impl DeviceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An enumerated audio device. Immutable once enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub display_name: String,
    pub kind: DeviceKind,
}

impl Device {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: DeviceId::new(id),
            display_name: display_name.into(),
            kind,
        }
    }
}

/// One enumeration pass over the platform's audio devices.
///
/// Refreshed on demand; selections are resolved against the most recent set.
#[derive(Debug, Clone, Default)]
pub struct DeviceSet {
    devices: Vec<Device>,
}

impl DeviceSet {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.kind == DeviceKind::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.kind == DeviceKind::Output)
    }

    /// Resolve a selection against this set.
    ///
    /// Returns `None` when the id is absent, so callers can prompt for
    /// re-selection instead of failing mid-session.
    pub fn resolve(&self, selection: Option<&DeviceId>, kind: DeviceKind) -> Option<&Device> {
        let id = selection?;
        self.devices.iter().find(|d| &d.id == id && d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
