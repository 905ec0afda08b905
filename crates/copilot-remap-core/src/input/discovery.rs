// Copilot Remap Input Layer - Device Discovery
// Enumerate input devices and pick the keyboard to remap

use std::path::Path;
#[cfg(feature = "evdev-backend")]
use std::path::PathBuf;

use crate::input::{is_virtual_device, DeviceInfo};

/// Name prefix of the uinput device this program creates
pub const VIRTUAL_DEVICE_PREFIX: &str = "copilot-remap (virtual)";

/// Numeric suffix of `/dev/input/eventN`, used to order devices like the kernel does
fn event_index(path: &Path) -> u32 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("event"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

/// Sort devices by event number (event2 before event10)
pub fn sort_devices(devices: &mut [DeviceInfo]) {
    devices.sort_by_key(|d| (event_index(&d.path), d.path.clone()));
}

/// Pick the device to remap.
///
/// The first device advertising F23 wins; otherwise the first device that
/// looks like a typing keyboard. Our own virtual device is never chosen.
pub fn choose_device(devices: &[DeviceInfo]) -> Option<&DeviceInfo> {
    let candidates = || {
        devices
            .iter()
            .filter(|d| !is_virtual_device(&d.name, VIRTUAL_DEVICE_PREFIX))
    };

    candidates()
        .find(|d| d.capabilities.has_trigger_key())
        .or_else(|| candidates().find(|d| d.capabilities.is_keyboard()))
}

/// List every input device that reports key events
#[cfg(feature = "evdev-backend")]
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices: Vec<DeviceInfo> = evdev::enumerate()
        .map(|(path, device)| DeviceInfo {
            name: device.name().unwrap_or("Unknown").to_string(),
            capabilities: super::source::capabilities_of(&device),
            path,
        })
        .filter(|info| info.capabilities.has_ev_key)
        .collect();
    sort_devices(&mut devices);
    devices
}

/// Find a keyboard to remap when no device path was given
#[cfg(feature = "evdev-backend")]
pub fn find_keyboard_device() -> Option<PathBuf> {
    let devices = list_devices();
    let chosen = choose_device(&devices)?;
    log::debug!("Auto-selected {} ({})", chosen.path.display(), chosen.name);
    Some(chosen.path.clone())
}
