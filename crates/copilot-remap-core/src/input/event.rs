// Copilot Remap Input Layer - Raw Events
// Normalized form of a kernel input_event

use crate::{Action, Key};

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type code
pub const EV_KEY: u16 = 0x01;
/// SYN_REPORT code within EV_SYN
pub const SYN_REPORT: u16 = 0x00;

/// Event type of a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Sync,
    Key,
    /// Any other event type (EV_MSC, EV_LED, ...), carrying the raw type
    Other(u16),
}

impl EventKind {
    pub fn from_type(event_type: u16) -> Self {
        match event_type {
            EV_SYN => EventKind::Sync,
            EV_KEY => EventKind::Key,
            other => EventKind::Other(other),
        }
    }

    pub fn to_type(self) -> u16 {
        match self {
            EventKind::Sync => EV_SYN,
            EventKind::Key => EV_KEY,
            EventKind::Other(other) => other,
        }
    }
}

/// A single input event read from a device or written to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// Key event for `key` with the given action
    pub fn key(key: Key, action: Action) -> Self {
        Self::new(EventKind::Key, key.code(), action.to_i32())
    }

    /// SYN_REPORT marker
    pub fn sync() -> Self {
        Self::new(EventKind::Sync, SYN_REPORT, 0)
    }

    pub fn is_key(&self) -> bool {
        self.kind == EventKind::Key
    }

    pub fn is_sync_report(&self) -> bool {
        self.kind == EventKind::Sync && self.code == SYN_REPORT
    }

    /// Key code, for key events only
    pub fn as_key(&self) -> Option<Key> {
        self.is_key().then_some(Key(self.code))
    }

    /// Key action, for key events with a known value
    pub fn action(&self) -> Option<Action> {
        if self.is_key() {
            Action::from_i32(self.value)
        } else {
            None
        }
    }
}

#[cfg(feature = "evdev-backend")]
impl From<evdev::InputEvent> for RawEvent {
    fn from(event: evdev::InputEvent) -> Self {
        Self::new(
            EventKind::from_type(event.event_type().0),
            event.code(),
            event.value(),
        )
    }
}

#[cfg(feature = "evdev-backend")]
impl From<RawEvent> for evdev::InputEvent {
    fn from(event: RawEvent) -> Self {
        evdev::InputEvent::new(evdev::EventType(event.kind.to_type()), event.code, event.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_from_type() {
        assert_eq!(EventKind::from_type(0x00), EventKind::Sync);
        assert_eq!(EventKind::from_type(0x01), EventKind::Key);
        assert_eq!(EventKind::from_type(0x04), EventKind::Other(0x04)); // EV_MSC
        assert_eq!(EventKind::Other(0x11).to_type(), 0x11); // EV_LED
    }

    #[test]
    fn test_key_event_accessors() {
        let event = RawEvent::key(Key::F23, Action::Press);
        assert!(event.is_key());
        assert_eq!(event.as_key(), Some(Key::F23));
        assert_eq!(event.action(), Some(Action::Press));
        assert!(!event.is_sync_report());
    }

    #[test]
    fn test_sync_event_has_no_key() {
        let event = RawEvent::sync();
        assert!(event.is_sync_report());
        assert_eq!(event.as_key(), None);
        assert_eq!(event.action(), None);
    }

    #[test]
    fn test_unknown_key_value_has_no_action() {
        let event = RawEvent::new(EventKind::Key, Key::A.code(), 7);
        assert_eq!(event.as_key(), Some(Key::A));
        assert_eq!(event.action(), None);
    }
}
