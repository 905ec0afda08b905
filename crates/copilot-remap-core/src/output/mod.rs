// Copilot Remap Output Layer
// Sink interface, the single writer thread, and the uinput device

mod sink;
mod writer;

#[cfg(feature = "evdev-backend")]
mod uinput;

pub use sink::{OutputSink, UInputError};
pub use writer::{OutputCommand, OutputWriter};

#[cfg(feature = "evdev-backend")]
pub use uinput::VirtualOutput;
