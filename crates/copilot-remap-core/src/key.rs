// Copilot Remap Key Type
// Linux key codes from input-event-codes.h and their display names

use std::fmt;
use std::str::FromStr;

/// Represents a single keyboard key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const LEFT_CTRL: Key = Key(29);
    pub const A: Key = Key(30);
    pub const LEFT_SHIFT: Key = Key(42);
    pub const Z: Key = Key(44);
    pub const RIGHT_SHIFT: Key = Key(54);
    pub const RIGHT_CTRL: Key = Key(97);
    pub const RIGHT_ALT: Key = Key(100);
    pub const LEFT_META: Key = Key(125);
    pub const RIGHT_META: Key = Key(126);
    pub const F23: Key = Key(193);

    /// Highest key code the kernel accepts (KEY_MAX)
    pub const MAX_CODE: u16 = 0x2ff;

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

// First entry for a code is its display name, later ones are aliases.
const KEY_NAMES: &[(&str, u16)] = &[
    ("ESC", 1),
    ("ESCAPE", 1),
    ("BACKSPACE", 14),
    ("TAB", 15),
    ("ENTER", 28),
    ("LEFT_CTRL", 29),
    ("A", 30),
    ("LEFT_SHIFT", 42),
    ("Z", 44),
    ("RIGHT_SHIFT", 54),
    ("LEFT_ALT", 56),
    ("SPACE", 57),
    ("CAPSLOCK", 58),
    ("F1", 59),
    ("F2", 60),
    ("F3", 61),
    ("F4", 62),
    ("F5", 63),
    ("F6", 64),
    ("F7", 65),
    ("F8", 66),
    ("F9", 67),
    ("F10", 68),
    ("F11", 87),
    ("F12", 88),
    ("RIGHT_CTRL", 97),
    ("RCTRL", 97),
    ("RIGHT_ALT", 100),
    ("RALT", 100),
    ("ALTGR", 100),
    ("HOME", 102),
    ("END", 107),
    ("INSERT", 110),
    ("DELETE", 111),
    ("LEFT_META", 125),
    ("RIGHT_META", 126),
    ("COMPOSE", 127),
    ("MENU", 139),
    ("F13", 183),
    ("F14", 184),
    ("F15", 185),
    ("F16", 186),
    ("F17", 187),
    ("F18", 188),
    ("F19", 189),
    ("F20", 190),
    ("F21", 191),
    ("F22", 192),
    ("F23", 193),
    ("F24", 194),
];

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    KEY_NAMES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
        .unwrap_or("UNKNOWN")
}

/// Try to parse a key name to a key code.
///
/// Accepts the names above case-insensitively, an optional `KEY_` prefix
/// (`KEY_RIGHTCTRL` style names from evtest are normalised by dropping
/// underscores), or a plain decimal code.
pub fn key_from_name(name: &str) -> Option<Key> {
    let trimmed = name.trim();
    if let Ok(code) = trimmed.parse::<u16>() {
        return (code <= Key::MAX_CODE).then_some(Key(code));
    }

    let upper_name = trimmed.to_uppercase();
    let upper = upper_name
        .strip_prefix("KEY_")
        .unwrap_or(upper_name.as_str());
    let squashed: String = upper.chars().filter(|c| *c != '_').collect();

    KEY_NAMES
        .iter()
        .find(|(n, _)| *n == upper || n.replace('_', "") == squashed)
        .map(|(_, code)| Key(*code))
}
