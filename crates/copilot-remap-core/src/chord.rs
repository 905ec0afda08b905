// Copilot Remap Chord Tracker
// Detects Meta+Shift+F23 and decides what happens to every raw event

use crate::input::RawEvent;
use crate::{Action, Key};

/// Modifier and chord state, owned by the event loop thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub meta_pressed: bool,
    pub shift_pressed: bool,
    /// True between the synthetic press and the scheduling of its release
    pub chord_active: bool,
}

/// Coarse view of [`ModifierState`], mostly for logs and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordPhase {
    Idle,
    ModifiersHeld,
    ChordActive,
}

impl ModifierState {
    pub fn modifiers_held(&self) -> bool {
        self.meta_pressed && self.shift_pressed
    }

    pub fn phase(&self) -> ChordPhase {
        if self.chord_active {
            ChordPhase::ChordActive
        } else if self.modifiers_held() {
            ChordPhase::ModifiersHeld
        } else {
            ChordPhase::Idle
        }
    }
}

/// What the event loop must do with one raw event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Write the event to the output unchanged
    Forward,
    /// Drop the event
    Suppress,
    /// Cancel any pending release, then press the target key
    EmitChordPress,
    /// Chord pressed again while already active: cancel any pending release, write nothing
    ReaffirmChord,
    /// Schedule the delayed release of the target key
    EmitChordRelease,
}

/// The three physical keys a Copilot key press produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub meta: Key,
    pub shift: Key,
    pub trigger: Key,
}

impl Default for Chord {
    fn default() -> Self {
        Self {
            meta: Key::LEFT_META,
            shift: Key::LEFT_SHIFT,
            trigger: Key::F23,
        }
    }
}

impl Chord {
    fn involves(&self, key: Key) -> bool {
        key == self.meta || key == self.shift || key == self.trigger
    }
}

/// Per-event chord detection.
///
/// Pure state: it never touches the output or the scheduler, the event loop
/// acts on the returned [`Decision`].
#[derive(Debug, Clone, Default)]
pub struct ChordTracker {
    chord: Chord,
    state: ModifierState,
}

impl ChordTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chord(chord: Chord) -> Self {
        Self {
            chord,
            state: ModifierState::default(),
        }
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.chord_active
    }

    pub fn process(&mut self, event: &RawEvent) -> Decision {
        let Some(key) = event.as_key() else {
            return Decision::Forward;
        };
        if !self.chord.involves(key) {
            return Decision::Forward;
        }

        if key == self.chord.meta || key == self.chord.shift {
            let down = event.action().map_or(true, Action::is_down);
            if key == self.chord.meta {
                self.state.meta_pressed = down;
            } else {
                self.state.shift_pressed = down;
            }
            return self.suppress_while_active();
        }

        self.process_trigger(event.action())
    }

    fn process_trigger(&mut self, action: Option<Action>) -> Decision {
        if !self.state.modifiers_held() {
            // A release while active still has to end the chord, otherwise the
            // target key would stay down forever.
            if self.state.chord_active && action == Some(Action::Release) {
                self.state.chord_active = false;
                return Decision::EmitChordRelease;
            }
            return self.suppress_while_active();
        }

        match action {
            Some(Action::Press) if self.state.chord_active => Decision::ReaffirmChord,
            Some(Action::Press) => {
                self.state.chord_active = true;
                Decision::EmitChordPress
            }
            Some(Action::Release) if self.state.chord_active => {
                self.state.chord_active = false;
                Decision::EmitChordRelease
            }
            _ => Decision::Suppress,
        }
    }

    fn suppress_while_active(&self) -> Decision {
        if self.state.chord_active {
            Decision::Suppress
        } else {
            Decision::Forward
        }
    }
}
