// Copilot Remap Delayed Release Scheduler
// Single-slot, cancelable "release the target key after N ms"
//
// The slot is shared between the event loop thread (schedule/cancel) and the
// output writer thread (expiry). Every check-and-act on it happens under one
// mutex, and the release itself is written by the writer thread after the
// slot has been emptied, so a cancelled release can never fire.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::output::OutputCommand;
use crate::Key;

/// A release that will be written once `due` has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRelease {
    pub key: Key,
    pub due: Instant,
    /// Increases with every schedule; identifies which release intent this is
    pub generation: u64,
}

#[derive(Debug, Default)]
struct ReleaseSlot {
    pending: Option<PendingRelease>,
    generation: u64,
}

/// Handle on the pending-release slot used by the writer thread
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedSlot(Arc<Mutex<ReleaseSlot>>);

impl SharedSlot {
    /// Deadline of the pending release, if any
    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.0.lock().pending.map(|p| p.due)
    }

    /// Take the pending release if it is still pending and its deadline has passed
    pub(crate) fn take_due(&self, now: Instant) -> Option<PendingRelease> {
        let mut slot = self.0.lock();
        match slot.pending {
            Some(pending) if pending.due <= now => slot.pending.take(),
            _ => None,
        }
    }
}

/// Schedules and cancels the delayed release of the synthetic key.
///
/// At most one release is pending at any time. Scheduling replaces the
/// current one, cancelling takes it out of the slot. The writer thread is
/// woken after each schedule so it can re-arm its wait.
pub struct ReleaseScheduler {
    slot: SharedSlot,
    wake: Sender<OutputCommand>,
}

impl ReleaseScheduler {
    pub(crate) fn new(slot: SharedSlot, wake: Sender<OutputCommand>) -> Self {
        Self { slot, wake }
    }

    /// Replace any pending release with a release of `key` after `delay`.
    ///
    /// Returns the release that was superseded, if there was one.
    pub fn schedule(&self, key: Key, delay: Duration) -> Option<PendingRelease> {
        let (replaced, generation) = {
            let mut slot = self.slot.0.lock();
            slot.generation += 1;
            let generation = slot.generation;
            let replaced = slot.pending.replace(PendingRelease {
                key,
                due: Instant::now() + delay,
                generation,
            });
            (replaced, generation)
        };

        if let Some(old) = replaced {
            log::debug!("Release #{} superseded by #{}", old.generation, generation);
        }
        log::debug!("Release #{} of {} scheduled in {:?}", generation, key, delay);

        if self.wake.send(OutputCommand::Wake).is_err() {
            log::warn!("Output writer is gone, release of {} will not fire", key);
        }
        replaced
    }

    /// Cancel the pending release. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        let cancelled = self.slot.0.lock().pending.take();
        if let Some(release) = cancelled {
            log::debug!("Release #{} of {} cancelled", release.generation, release.key);
        }
        cancelled.is_some()
    }

    /// Cancel for good, reporting what was pending so the caller can force it.
    ///
    /// Once the writer thread has been stopped no release can fire afterwards.
    pub fn shutdown(&self) -> Option<PendingRelease> {
        self.slot.0.lock().pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.0.lock().pending.is_some()
    }

    pub fn pending(&self) -> Option<PendingRelease> {
        self.slot.0.lock().pending
    }
}
