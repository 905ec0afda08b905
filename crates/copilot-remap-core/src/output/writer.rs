// Copilot Remap Output Layer - Single Writer Thread
// Owns the output sink; every write to it happens on this thread
//
// The event loop sends commands over a channel. Pending-release expiry is
// handled here as well, so forwarded events and the delayed release can never
// interleave on the sink.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

use super::sink::{OutputSink, UInputError};
use crate::input::RawEvent;
use crate::scheduler::{ReleaseScheduler, SharedSlot};
use crate::{Action, Key};

/// Messages to the writer thread
#[derive(Debug, Clone, Copy)]
pub enum OutputCommand {
    /// Write an event as-is
    Write(RawEvent),
    /// Write a key event followed by a sync, as one unit
    Emit(Key, Action),
    /// The pending release changed, re-arm the deadline
    Wake,
    /// Finish and hand the sink back
    Stop,
}

/// Handle on the writer thread
pub struct OutputWriter<S: OutputSink + Send + 'static> {
    commands: Sender<OutputCommand>,
    handle: Option<JoinHandle<S>>,
}

impl<S: OutputSink + Send + 'static> OutputWriter<S> {
    /// Start the writer thread and the scheduler that feeds it
    pub fn spawn(sink: S) -> std::io::Result<(Self, ReleaseScheduler)> {
        let (tx, rx) = mpsc::channel();
        let slot = SharedSlot::default();
        let writer_slot = slot.clone();

        let handle = std::thread::Builder::new()
            .name("output-writer".to_string())
            .spawn(move || run_writer(sink, rx, writer_slot))?;

        let writer = Self {
            commands: tx.clone(),
            handle: Some(handle),
        };
        Ok((writer, ReleaseScheduler::new(slot, tx)))
    }

    /// Queue an event to be written unchanged
    pub fn forward(&self, event: RawEvent) -> Result<(), UInputError> {
        self.send(OutputCommand::Write(event))
    }

    /// Queue a key event plus sync
    pub fn emit(&self, key: Key, action: Action) -> Result<(), UInputError> {
        self.send(OutputCommand::Emit(key, action))
    }

    fn send(&self, command: OutputCommand) -> Result<(), UInputError> {
        self.commands
            .send(command)
            .map_err(|_| UInputError::WriterStopped)
    }

    /// Flush everything queued, stop the thread and return the sink.
    ///
    /// Returns `None` if the writer thread panicked.
    pub fn stop(mut self) -> Option<S> {
        self.join()
    }

    fn join(&mut self) -> Option<S> {
        let handle = self.handle.take()?;
        let _ = self.commands.send(OutputCommand::Stop);
        match handle.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                log::error!("Output writer thread panicked");
                None
            }
        }
    }
}

impl<S: OutputSink + Send + 'static> Drop for OutputWriter<S> {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_writer<S: OutputSink>(
    mut sink: S,
    commands: Receiver<OutputCommand>,
    slot: SharedSlot,
) -> S {
    loop {
        let command = match slot.next_due() {
            Some(due) => commands.recv_timeout(due.saturating_duration_since(Instant::now())),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(OutputCommand::Write(event)) => {
                if let Err(e) = sink.write(event) {
                    log::warn!("Error forwarding {:?}: {}", event, e);
                }
            }
            Ok(OutputCommand::Emit(key, action)) => emit_key(&mut sink, key, action),
            Ok(OutputCommand::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(OutputCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(release) = slot.take_due(Instant::now()) {
            log::debug!("Release #{} of {} fired", release.generation, release.key);
            emit_key(&mut sink, release.key, Action::Release);
        }
    }
    sink
}

fn emit_key<S: OutputSink>(sink: &mut S, key: Key, action: Action) {
    let result = sink
        .write(RawEvent::key(key, action))
        .and_then(|_| sink.sync());
    if let Err(e) = result {
        log::warn!("Error sending {} {}: {}", key, action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Instant, RawEvent)>>>);

    impl Recorder {
        fn events(&self) -> Vec<RawEvent> {
            self.0.lock().iter().map(|(_, e)| *e).collect()
        }

        fn timed(&self) -> Vec<(Instant, RawEvent)> {
            self.0.lock().clone()
        }
    }

    impl OutputSink for Recorder {
        fn write(&mut self, event: RawEvent) -> Result<(), UInputError> {
            self.0.lock().push((Instant::now(), event));
            Ok(())
        }

        fn sync(&mut self) -> Result<(), UInputError> {
            self.write(RawEvent::sync())
        }
    }

    #[test]
    fn test_forward_and_emit_keep_order() {
        let recorder = Recorder::default();
        let (writer, _scheduler) = OutputWriter::spawn(recorder.clone()).unwrap();

        writer.forward(RawEvent::key(Key::A, Action::Press)).unwrap();
        writer.forward(RawEvent::sync()).unwrap();
        writer.emit(Key::RIGHT_CTRL, Action::Press).unwrap();
        assert!(writer.stop().is_some());

        assert_eq!(
            recorder.events(),
            vec![
                RawEvent::key(Key::A, Action::Press),
                RawEvent::sync(),
                RawEvent::key(Key::RIGHT_CTRL, Action::Press),
                RawEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_scheduled_release_fires_after_delay() {
        let recorder = Recorder::default();
        let (writer, scheduler) = OutputWriter::spawn(recorder.clone()).unwrap();

        let scheduled_at = Instant::now();
        scheduler.schedule(Key::RIGHT_CTRL, Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(200));
        assert!(!scheduler.is_pending());
        writer.stop();

        let timed = recorder.timed();
        assert_eq!(timed.len(), 2);
        assert_eq!(timed[0].1, RawEvent::key(Key::RIGHT_CTRL, Action::Release));
        assert_eq!(timed[1].1, RawEvent::sync());
        assert!(timed[0].0.duration_since(scheduled_at) >= Duration::from_millis(50));
    }

    #[test]
    fn test_cancelled_release_never_fires() {
        let recorder = Recorder::default();
        let (writer, scheduler) = OutputWriter::spawn(recorder.clone()).unwrap();

        scheduler.schedule(Key::RIGHT_CTRL, Duration::from_millis(40));
        assert!(scheduler.cancel());
        std::thread::sleep(Duration::from_millis(120));
        writer.stop();

        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_release_fires_while_events_keep_flowing() {
        let recorder = Recorder::default();
        let (writer, scheduler) = OutputWriter::spawn(recorder.clone()).unwrap();

        scheduler.schedule(Key::RIGHT_CTRL, Duration::from_millis(30));
        for _ in 0..20 {
            writer.forward(RawEvent::key(Key::A, Action::Repeat)).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        writer.stop();

        let releases = recorder
            .events()
            .into_iter()
            .filter(|e| *e == RawEvent::key(Key::RIGHT_CTRL, Action::Release))
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn test_emit_after_stop_reports_writer_stopped() {
        let recorder = Recorder::default();
        let (writer, _scheduler) = OutputWriter::spawn(recorder).unwrap();
        let commands = writer.commands.clone();
        writer.stop();

        assert!(commands.send(OutputCommand::Wake).is_err());
    }
}
