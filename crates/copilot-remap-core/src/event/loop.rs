// Copilot Remap Event Loop
// Reads the grabbed device, runs the chord tracker, drives the output writer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::chord::{Chord, ChordTracker, Decision};
use crate::input::{EventSource, RawEvent, ReadOutcome};
use crate::output::{OutputSink, OutputWriter};
use crate::scheduler::ReleaseScheduler;
use crate::{Action, Key};

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Failed to start output writer: {0}")]
    Io(#[from] std::io::Error),
}

/// What the remapper produces and how long the release lingers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapConfig {
    pub chord: Chord,
    /// Key pressed while the chord is held
    pub target_key: Key,
    /// Delay between the chord release and the target key release
    pub release_delay: Duration,
}

impl RemapConfig {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            chord: Chord::default(),
            target_key: Key::RIGHT_CTRL,
            release_delay: Self::DEFAULT_DELAY,
        }
    }
}

/// Lifecycle of the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
    Stopped,
}

/// Why `run` returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop flag was cleared (signal or caller request)
    Shutdown,
    /// The device could not be read any more
    ReadError(String),
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub events: u64,
    pub forwarded: u64,
    pub suppressed: u64,
    pub chord_presses: u64,
}

/// Event loop over a single source device.
///
/// Owns the chord tracker, the release scheduler and the output writer
/// thread. Dropping the loop drains it, so the synthetic key is released and
/// the device ungrabbed on every exit path.
pub struct EventLoop<E: EventSource, S: OutputSink + Send + 'static> {
    source: E,
    tracker: ChordTracker,
    scheduler: ReleaseScheduler,
    writer: Option<OutputWriter<S>>,
    config: RemapConfig,
    running: Arc<AtomicBool>,
    state: LoopState,
    stats: LoopStats,
}

impl<E: EventSource, S: OutputSink + Send + 'static> EventLoop<E, S> {
    /// Create the loop and start its output writer.
    ///
    /// The loop keeps reading while `running` is true.
    pub fn new(
        source: E,
        sink: S,
        config: RemapConfig,
        running: Arc<AtomicBool>,
    ) -> EventLoopResult<Self> {
        let (writer, scheduler) = OutputWriter::spawn(sink)?;
        Ok(Self {
            source,
            tracker: ChordTracker::with_chord(config.chord),
            scheduler,
            writer: Some(writer),
            config,
            running,
            state: LoopState::Running,
            stats: LoopStats::default(),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn tracker(&self) -> &ChordTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &ReleaseScheduler {
        &self.scheduler
    }

    /// Run until the stop flag clears or the device fails, then drain.
    pub fn run(&mut self) -> StopReason {
        if self.state != LoopState::Running {
            return StopReason::Shutdown;
        }

        self.release_held_keys();
        let reason = self.read_until_stopped();
        self.drain();

        log::info!(
            "Stopped after {} events ({} forwarded, {} suppressed, {} chord presses)",
            self.stats.events,
            self.stats.forwarded,
            self.stats.suppressed,
            self.stats.chord_presses
        );
        reason
    }

    /// Keys held at startup would otherwise never see their release on the
    /// virtual device.
    fn release_held_keys(&mut self) {
        let held = self.source.pressed_keys();
        if held.is_empty() {
            return;
        }
        log::debug!("Releasing {} key(s) held at startup", held.len());
        for key in held {
            self.write(RawEvent::key(key, Action::Release));
        }
        self.write(RawEvent::sync());
    }

    fn read_until_stopped(&mut self) -> StopReason {
        while self.running.load(Ordering::SeqCst) {
            match self.source.next_event() {
                Ok(ReadOutcome::Event(event)) => self.process_event(event),
                Ok(ReadOutcome::Retry) => continue,
                Err(e) => {
                    log::error!("Error reading event: {}", e);
                    return StopReason::ReadError(e.to_string());
                }
            }
        }
        StopReason::Shutdown
    }

    /// Handle one raw event
    pub fn process_event(&mut self, event: RawEvent) {
        self.stats.events += 1;
        let decision = self.tracker.process(&event);
        if decision != Decision::Forward {
            log::debug!("{:?} -> {:?}", event, decision);
        }

        match decision {
            Decision::Forward => {
                self.stats.forwarded += 1;
                self.write(event);
            }
            Decision::Suppress => self.stats.suppressed += 1,
            Decision::EmitChordPress => {
                self.stats.chord_presses += 1;
                // A cancelled release means the target key never went up
                if self.scheduler.cancel() {
                    log::debug!("Chord re-pressed within the decay window");
                } else {
                    self.emit(self.config.target_key, Action::Press);
                }
            }
            Decision::ReaffirmChord => {
                self.scheduler.cancel();
            }
            Decision::EmitChordRelease => {
                self.scheduler
                    .schedule(self.config.target_key, self.config.release_delay);
            }
        }
    }

    fn write(&self, event: RawEvent) {
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.forward(event) {
                log::warn!("Error sending output: {}", e);
            }
        }
    }

    fn emit(&self, key: Key, action: Action) {
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.emit(key, action) {
                log::warn!("Error sending output: {}", e);
            }
        }
    }

    /// Cancel the pending release, force the target key up, destroy the
    /// output and give the device back. Safe to call more than once.
    pub fn drain(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Draining;

        let pending = self.scheduler.shutdown();
        if pending.is_some() || self.tracker.is_active() {
            log::info!("Releasing {} before exit", self.config.target_key);
            self.emit(self.config.target_key, Action::Release);
        }

        if let Some(writer) = self.writer.take() {
            // Joining drops the sink, which destroys the virtual device
            drop(writer.stop());
        }
        self.source.release();

        self.state = LoopState::Stopped;
    }
}

/// Drop implementation for EventLoop
///
/// Makes sure the target key is released and the device ungrabbed even when
/// the loop is abandoned early or unwinding from a panic.
impl<E: EventSource, S: OutputSink + Send + 'static> Drop for EventLoop<E, S> {
    fn drop(&mut self) {
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputError;
    use crate::output::UInputError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<RawEvent>>>);

    impl OutputSink for Recorder {
        fn write(&mut self, event: RawEvent) -> Result<(), UInputError> {
            self.0.lock().push(event);
            Ok(())
        }

        fn sync(&mut self) -> Result<(), UInputError> {
            self.write(RawEvent::sync())
        }
    }

    struct Script {
        steps: VecDeque<Result<ReadOutcome, InputError>>,
        held: Vec<Key>,
        released: Arc<AtomicBool>,
    }

    impl Script {
        fn new(steps: Vec<Result<ReadOutcome, InputError>>) -> Self {
            Self {
                steps: steps.into(),
                held: Vec::new(),
                released: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl EventSource for Script {
        fn next_event(&mut self) -> Result<ReadOutcome, InputError> {
            self.steps.pop_front().unwrap_or_else(|| {
                Err(InputError::Io(std::io::Error::from_raw_os_error(libc::ENODEV)))
            })
        }

        fn pressed_keys(&self) -> Vec<Key> {
            self.held.clone()
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn ev(key: Key, action: Action) -> Result<ReadOutcome, InputError> {
        Ok(ReadOutcome::Event(RawEvent::key(key, action)))
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn test_read_error_drains_and_stops() {
        let script = Script::new(vec![ev(Key::A, Action::Press), ev(Key::A, Action::Release)]);
        let released = script.released.clone();
        let recorder = Recorder::default();

        let mut event_loop =
            EventLoop::new(script, recorder.clone(), RemapConfig::default(), running()).unwrap();
        let reason = event_loop.run();

        assert!(matches!(reason, StopReason::ReadError(_)));
        assert_eq!(event_loop.state(), LoopState::Stopped);
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(event_loop.stats().forwarded, 2);
        assert_eq!(
            *recorder.0.lock(),
            vec![RawEvent::key(Key::A, Action::Press), RawEvent::key(Key::A, Action::Release)]
        );
    }

    #[test]
    fn test_retry_is_a_noop() {
        let script = Script::new(vec![
            Ok(ReadOutcome::Retry),
            Ok(ReadOutcome::Retry),
            ev(Key::A, Action::Press),
            Ok(ReadOutcome::Retry),
        ]);
        let recorder = Recorder::default();

        let mut event_loop =
            EventLoop::new(script, recorder.clone(), RemapConfig::default(), running()).unwrap();
        event_loop.run();

        assert_eq!(event_loop.stats().events, 1);
        assert_eq!(*recorder.0.lock(), vec![RawEvent::key(Key::A, Action::Press)]);
    }

    #[test]
    fn test_held_keys_released_at_startup() {
        let mut script = Script::new(vec![]);
        script.held = vec![Key::LEFT_CTRL, Key::A];
        let recorder = Recorder::default();

        let mut event_loop =
            EventLoop::new(script, recorder.clone(), RemapConfig::default(), running()).unwrap();
        event_loop.run();

        assert_eq!(
            *recorder.0.lock(),
            vec![
                RawEvent::key(Key::LEFT_CTRL, Action::Release),
                RawEvent::key(Key::A, Action::Release),
                RawEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_stop_flag_prevents_reading() {
        let script = Script::new(vec![ev(Key::A, Action::Press)]);
        let recorder = Recorder::default();
        let flag = Arc::new(AtomicBool::new(false));

        let mut event_loop =
            EventLoop::new(script, recorder.clone(), RemapConfig::default(), flag).unwrap();
        assert_eq!(event_loop.run(), StopReason::Shutdown);
        assert!(recorder.0.lock().is_empty());

        // A second run on a stopped loop does nothing
        assert_eq!(event_loop.run(), StopReason::Shutdown);
    }

    #[test]
    fn test_drop_releases_active_chord() {
        let script = Script::new(vec![]);
        let released = script.released.clone();
        let recorder = Recorder::default();

        {
            let mut event_loop =
                EventLoop::new(script, recorder.clone(), RemapConfig::default(), running())
                    .unwrap();
            event_loop.process_event(RawEvent::key(Key::LEFT_META, Action::Press));
            event_loop.process_event(RawEvent::key(Key::LEFT_SHIFT, Action::Press));
            event_loop.process_event(RawEvent::key(Key::F23, Action::Press));
            assert!(event_loop.tracker().is_active());
        }

        assert!(released.load(Ordering::SeqCst));
        let events = recorder.0.lock().clone();
        assert_eq!(
            events[events.len() - 2..],
            [RawEvent::key(Key::RIGHT_CTRL, Action::Release), RawEvent::sync()]
        );
    }
}
