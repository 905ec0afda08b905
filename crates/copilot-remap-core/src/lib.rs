// Copilot Remap Core Library
// Chord detection, delayed release and device plumbing for the Copilot key remapper

pub mod action;
pub mod chord;
pub mod event;
pub mod input;
pub mod key;
pub mod output;
pub mod scheduler;
pub mod settings;

pub use action::Action;
pub use chord::{Chord, ChordPhase, ChordTracker, Decision, ModifierState};
pub use event::{EventLoop, EventLoopError, EventLoopResult, LoopState, RemapConfig, StopReason};
pub use input::{
    DeviceCapabilities, DeviceInfo, EventKind, EventSource, InputError, RawEvent, ReadOutcome,
};
pub use key::Key;
pub use output::{OutputSink, OutputWriter, UInputError};
pub use scheduler::{PendingRelease, ReleaseScheduler};
pub use settings::{Settings, SettingsError};

#[cfg(feature = "evdev-backend")]
pub use input::InputDevice;
#[cfg(feature = "evdev-backend")]
pub use output::VirtualOutput;
