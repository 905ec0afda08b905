// Copilot Remap Output Layer - uinput
// Virtual device mirroring the grabbed keyboard, plus the remap target key

use std::path::PathBuf;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, InputEvent};

use super::sink::{OutputSink, UInputError};
use crate::input::{InputDevice, RawEvent, VIRTUAL_DEVICE_PREFIX};
use crate::Key;

/// uinput rejects names of UINPUT_MAX_NAME_SIZE (80) bytes or more
const MAX_NAME_LEN: usize = 79;

/// Events of the frame being assembled, up to the next sync report
#[derive(Debug, Default)]
struct FrameBuffer {
    events: Vec<InputEvent>,
}

impl FrameBuffer {
    /// Add an event. Returns true when it closes the frame.
    ///
    /// The sync report itself is not stored, `emit` appends its own.
    fn push(&mut self, event: RawEvent) -> bool {
        if event.is_sync_report() {
            return true;
        }
        self.events.push(event.into());
        false
    }
}

/// Virtual uinput keyboard the translated stream is written to.
///
/// Events are buffered until a sync report, then emitted as one batch so the
/// kernel sees the same frames the source device produced.
pub struct VirtualOutput {
    device: evdev::uinput::VirtualDevice,
    frame: FrameBuffer,
}

fn creation_error(e: std::io::Error) -> UInputError {
    UInputError::DeviceCreation(e.to_string())
}

impl VirtualOutput {
    /// Create a virtual device with the source's capabilities plus `target`.
    ///
    /// Misc, relative axis and switch capabilities are mirrored too, otherwise
    /// the kernel would drop those events when they are forwarded.
    pub fn from_device(source: &InputDevice, target: Key) -> Result<Self, UInputError> {
        let src = source.device();

        let mut keys = AttributeSet::<evdev::Key>::new();
        if let Some(supported) = src.supported_keys() {
            for key in supported.iter() {
                keys.insert(key);
            }
        }
        keys.insert(evdev::Key::new(target.code()));

        let name = virtual_name(source.name());

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(creation_error)?
            .name(name.as_str())
            .input_id(src.input_id())
            .with_keys(&keys)
            .map_err(creation_error)?;

        if let Some(misc) = src.misc_properties() {
            builder = builder.with_msc(misc).map_err(creation_error)?;
        }
        if let Some(axes) = src.supported_relative_axes() {
            builder = builder.with_relative_axes(axes).map_err(creation_error)?;
        }
        if let Some(switches) = src.supported_switches() {
            builder = builder.with_switches(switches).map_err(creation_error)?;
        }

        let device = builder.build().map_err(creation_error)?;

        log::debug!("Created virtual device '{}'", name);

        Ok(Self {
            device,
            frame: FrameBuffer::default(),
        })
    }

    /// Device node of the virtual device (e.g. /dev/input/event21)
    pub fn devnode(&mut self) -> Option<PathBuf> {
        let mut nodes = self.device.enumerate_dev_nodes_blocking().ok()?;
        nodes.next()?.ok()
    }
}

impl OutputSink for VirtualOutput {
    fn write(&mut self, event: RawEvent) -> Result<(), UInputError> {
        if self.frame.push(event) {
            return self.sync();
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), UInputError> {
        // emit appends the SYN_REPORT
        let result = self
            .device
            .emit(&self.frame.events)
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()));
        self.frame.events.clear();
        result
    }
}

fn virtual_name(source_name: &str) -> String {
    let mut name = format!("{} {}", VIRTUAL_DEVICE_PREFIX, source_name);
    if name.len() > MAX_NAME_LEN {
        let mut end = MAX_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}
