// Copilot Remap Input Layer
// Raw events, device detection and the grabbed source device

mod device;
pub mod discovery;
mod event;
mod source;

pub use device::{is_virtual_device, DeviceCapabilities, DeviceInfo};
pub use discovery::{choose_device, VIRTUAL_DEVICE_PREFIX};
pub use event::{EventKind, RawEvent, EV_KEY, EV_SYN, SYN_REPORT};
pub use source::{EventSource, InputError, ReadOutcome};

#[cfg(feature = "evdev-backend")]
pub use discovery::{find_keyboard_device, list_devices};
#[cfg(feature = "evdev-backend")]
pub use source::InputDevice;
