use std::fmt;

/// Represents the value of a key event.
///
/// From `evtest` output, the "magic numbers" for assignment to enums:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    /// Returns true if the key is held down (PRESS or REPEAT)
    pub fn is_down(self) -> bool {
        !matches!(self, Action::Release)
    }

    /// Create Action from i32 value (from evdev)
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Action::Release),
            1 => Some(Action::Press),
            2 => Some(Action::Repeat),
            _ => None,
        }
    }

    /// Convert Action to its i32 representation
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Release => write!(f, "release"),
            Action::Press => write!(f, "press"),
            Action::Repeat => write!(f, "repeat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_is_down() {
        assert!(Action::Press.is_down());
        assert!(Action::Repeat.is_down());
        assert!(!Action::Release.is_down());
    }

    #[test]
    fn test_action_from_i32() {
        assert_eq!(Action::from_i32(0), Some(Action::Release));
        assert_eq!(Action::from_i32(1), Some(Action::Press));
        assert_eq!(Action::from_i32(2), Some(Action::Repeat));
        assert_eq!(Action::from_i32(3), None);
        assert_eq!(Action::from_i32(-1), None);
    }

    #[test]
    fn test_action_to_i32() {
        assert_eq!(Action::Release.to_i32(), 0);
        assert_eq!(Action::Press.to_i32(), 1);
        assert_eq!(Action::Repeat.to_i32(), 2);
    }
}
