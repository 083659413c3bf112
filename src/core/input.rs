//! Key codes and the escape-sequence table.

pub(crate) const ESC: u8 = 0x1b;
pub(crate) const DEL: u8 = 0x7f;

/// A decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable input.
    Char(char),
    /// Ctrl plus a letter, for control bytes without a dedicated variant.
    /// Always a lowercase ASCII letter.
    Ctrl(char),
    Null,
    Tab,
    LineFeed,
    Enter,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    ShiftTab,
    /// Function key, 1-based.
    F(u8),
}

impl Key {
    /// Maps a single byte that is below 27 or equal to 127.
    ///
    /// Returns `None` for bytes outside the control range.
    pub fn from_control_byte(byte: u8) -> Option<Self> {
        let key = match byte {
            0 => Self::Null,
            9 => Self::Tab,
            10 => Self::LineFeed,
            13 => Self::Enter,
            DEL => Self::Backspace,
            1..=26 => Self::Ctrl((b'a' + byte - 1) as char),
            _ => return None,
        };
        Some(key)
    }
}

/// Result of matching the bytes collected after an escape marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuffixMatch {
    Key(Key),
    /// Still a proper prefix of some known suffix.
    Partial,
    Unknown,
}

/// Suffixes recognized after the escape byte.
const ESCAPE_SUFFIXES: &[(&[u8], Key)] = &[
    (b"[A", Key::Up),
    (b"[B", Key::Down),
    (b"[C", Key::Right),
    (b"[D", Key::Left),
    (b"[H", Key::Home),
    (b"[F", Key::End),
    (b"[Z", Key::ShiftTab),
    (b"OA", Key::Up),
    (b"OB", Key::Down),
    (b"OC", Key::Right),
    (b"OD", Key::Left),
    (b"OH", Key::Home),
    (b"OF", Key::End),
    (b"OP", Key::F(1)),
    (b"OQ", Key::F(2)),
    (b"OR", Key::F(3)),
    (b"OS", Key::F(4)),
    (b"[1~", Key::Home),
    (b"[2~", Key::Insert),
    (b"[3~", Key::Delete),
    (b"[4~", Key::End),
    (b"[5~", Key::PageUp),
    (b"[6~", Key::PageDown),
];

pub(crate) fn match_escape_suffix(suffix: &[u8]) -> SuffixMatch {
    let mut partial = false;
    for (candidate, key) in ESCAPE_SUFFIXES {
        if *candidate == suffix {
            return SuffixMatch::Key(*key);
        }
        if candidate.starts_with(suffix) {
            partial = true;
        }
    }
    if partial {
        SuffixMatch::Partial
    } else {
        SuffixMatch::Unknown
    }
}
