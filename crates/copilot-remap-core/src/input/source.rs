// Copilot Remap Input Layer - Event Sources
// Blocking event stream from a single grabbed device

use std::path::PathBuf;

use crate::input::RawEvent;
use crate::Key;

#[cfg(feature = "evdev-backend")]
use std::collections::VecDeque;
#[cfg(feature = "evdev-backend")]
use std::os::unix::io::AsRawFd;
#[cfg(feature = "evdev-backend")]
use std::path::Path;
#[cfg(feature = "evdev-backend")]
use std::time::Duration;

#[cfg(feature = "evdev-backend")]
use crate::input::{DeviceCapabilities, DeviceInfo};

/// Errors raised by an input source
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Device not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied opening {} (are you running as root?)", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{} does not report key events", .0.display())]
    NotAKeyboard(PathBuf),

    #[error("Failed to grab device: {0} (is another program grabbing it, or are you not root?)")]
    Grab(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Event(RawEvent),
    /// Nothing available yet ("try again"); not an error
    Retry,
}

/// A source of raw input events.
///
/// `next_event` may block, but only for a bounded time so that callers can
/// observe a stop request between reads.
pub trait EventSource {
    /// Read the next event, or report that none is available yet
    fn next_event(&mut self) -> Result<ReadOutcome, InputError>;

    /// Keys the device currently reports as held down
    fn pressed_keys(&self) -> Vec<Key> {
        Vec::new()
    }

    /// Give up exclusive access to the device
    fn release(&mut self) {}
}

/// A physical evdev device opened read-only.
#[cfg(feature = "evdev-backend")]
pub struct InputDevice {
    device: evdev::Device,
    path: PathBuf,
    pending: VecDeque<RawEvent>,
    poll_timeout: Duration,
    grabbed: bool,
}

#[cfg(feature = "evdev-backend")]
impl InputDevice {
    /// Default upper bound for one blocking wait on the device
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open a device by path.
    ///
    /// Fails with `NotAKeyboard` when the device has no EV_KEY capability.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref().to_path_buf();
        let device = evdev::Device::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InputError::NotFound(path.clone()),
            std::io::ErrorKind::PermissionDenied => InputError::PermissionDenied(path.clone()),
            _ => InputError::Io(e),
        })?;

        if !device.supported_events().contains(evdev::EventType::KEY) {
            return Err(InputError::NotAKeyboard(path));
        }

        Ok(Self {
            device,
            path,
            pending: VecDeque::new(),
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
            grabbed: false,
        })
    }

    /// Take exclusive ownership of the device
    pub fn grab(&mut self) -> Result<(), InputError> {
        self.device.grab().map_err(InputError::Grab)?;
        self.grabbed = true;
        Ok(())
    }

    /// Release the exclusive grab (no-op when not grabbed)
    pub fn ungrab(&mut self) {
        if self.grabbed {
            if let Err(e) = self.device.ungrab() {
                log::warn!("Failed to ungrab {}: {}", self.path.display(), e);
            }
            self.grabbed = false;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.device.name().unwrap_or("Unknown")
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        capabilities_of(&self.device)
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            path: self.path.clone(),
            name: self.name().to_string(),
            capabilities: self.capabilities(),
        }
    }

    /// Underlying evdev handle, used to mirror its capabilities into uinput
    pub fn device(&self) -> &evdev::Device {
        &self.device
    }

    /// Wait until the device fd is readable, at most `poll_timeout`.
    ///
    /// Returns false on timeout or EINTR (a signal was delivered).
    fn wait_readable(&self) -> Result<bool, InputError> {
        let mut fds = [libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        }];
        let timeout_ms = self.poll_timeout.as_millis().min(i32::MAX as u128) as i32;

        let poll_result = unsafe { libc::poll(fds.as_mut_ptr(), 1, timeout_ms) };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(false);
            }
            return Err(InputError::Io(err));
        }

        Ok(poll_result > 0)
    }
}

#[cfg(feature = "evdev-backend")]
impl EventSource for InputDevice {
    fn next_event(&mut self) -> Result<ReadOutcome, InputError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(ReadOutcome::Event(event));
        }

        if !self.wait_readable()? {
            return Ok(ReadOutcome::Retry);
        }

        match self.device.fetch_events() {
            Ok(events) => self.pending.extend(events.map(RawEvent::from)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Ok(ReadOutcome::Retry);
            }
            Err(e) => return Err(InputError::Io(e)),
        }

        Ok(self
            .pending
            .pop_front()
            .map_or(ReadOutcome::Retry, ReadOutcome::Event))
    }

    fn pressed_keys(&self) -> Vec<Key> {
        match self.device.get_key_state() {
            Ok(state) => state.iter().map(|key| Key(key.code())).collect(),
            Err(e) => {
                log::warn!("Could not read key state of {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn release(&mut self) {
        self.ungrab();
    }
}

/// Dropping the device always gives the keyboard back, even on panic unwind.
#[cfg(feature = "evdev-backend")]
impl Drop for InputDevice {
    fn drop(&mut self) {
        self.ungrab();
    }
}

#[cfg(feature = "evdev-backend")]
pub(crate) fn capabilities_of(device: &evdev::Device) -> DeviceCapabilities {
    let has_ev_key = device.supported_events().contains(evdev::EventType::KEY);
    let keys = device
        .supported_keys()
        .map(|keys| keys.iter().map(|key| key.code()).collect::<Vec<_>>())
        .unwrap_or_default();
    DeviceCapabilities::new(has_ev_key, keys)
}
