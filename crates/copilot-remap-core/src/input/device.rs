// Copilot Remap Input Layer - Device Detection
// Device capability analysis used by discovery and listing

use std::collections::HashSet;
use std::path::PathBuf;

use crate::Key;

/// Device capabilities extracted from an evdev device
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported key codes (EV_KEY capability codes)
    pub supported_keys: HashSet<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: impl IntoIterator<Item = u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys: supported_keys.into_iter().collect(),
        }
    }

    /// Check if a specific key is supported
    pub fn supports_key(&self, key: Key) -> bool {
        self.has_ev_key && self.supported_keys.contains(&key.code())
    }

    /// Device advertises the chord trigger key (F23)
    pub fn has_trigger_key(&self) -> bool {
        self.supports_key(Key::F23)
    }

    /// Device looks like a typing keyboard (both A and Z are present)
    pub fn is_keyboard(&self) -> bool {
        self.supports_key(Key::A) && self.supports_key(Key::Z)
    }
}

/// Identity of an input device, captured once at discovery time
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub capabilities: DeviceCapabilities,
}

impl DeviceInfo {
    /// Short capability markers used by `--list`
    pub fn markers(&self) -> String {
        let mut markers = String::new();
        if self.capabilities.has_trigger_key() {
            markers.push_str(" [F23]");
        }
        if self.capabilities.is_keyboard() {
            markers.push_str(" [Keyboard]");
        }
        markers
    }
}

/// Check if a device is a virtual device created by this program.
///
/// Such devices must never be picked as the source, otherwise the remapper
/// would read back its own output.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}
