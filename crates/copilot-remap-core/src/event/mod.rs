// Copilot Remap Event Handling
// Event loop orchestrating tracker, scheduler and output

pub mod r#loop;

pub use r#loop::{
    EventLoop, EventLoopError, EventLoopResult, LoopState, LoopStats, RemapConfig, StopReason,
};
