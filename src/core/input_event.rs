//! Events delivered from the terminal controller to its consumer.

use crate::core::input::Key;

/// A decoded key together with the exact bytes it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub raw: Vec<u8>,
}

impl KeyEvent {
    pub fn new(key: Key, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            raw: raw.into(),
        }
    }
}

/// Event produced by a running terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize { columns: u16, rows: u16 },
}

impl InputEvent {
    pub fn key(key: Key, raw: impl Into<Vec<u8>>) -> Self {
        Self::Key(KeyEvent::new(key, raw))
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}
