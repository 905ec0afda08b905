// Copilot Remap Output Layer - Sink Interface

use crate::input::RawEvent;

/// Error types for output operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Output writer has stopped")]
    WriterStopped,
}

/// Somewhere translated events are written to.
///
/// Events written with `write` may be buffered until `sync`. A sync report
/// passed to `write` counts as a sync. The sink is destroyed when dropped.
pub trait OutputSink {
    fn write(&mut self, event: RawEvent) -> Result<(), UInputError>;

    fn sync(&mut self) -> Result<(), UInputError>;
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn write(&mut self, event: RawEvent) -> Result<(), UInputError> {
        (**self).write(event)
    }

    fn sync(&mut self) -> Result<(), UInputError> {
        (**self).sync()
    }
}
