//! Raw-mode terminal control and single-line editing for Unix terminals.
//!
//! Invariant: the terminal is in raw mode only between `Terminal::start` and
//! `Terminal::stop`, and every exit path out of [`Prompt::prompt`] stops it.
//!
//! # Public API Overview
//! - Read lines with history browsing and tab completion via [`Prompt`].
//! - Drive a raw-mode device directly with [`ProcessTerminal`], guarded by [`TerminalGuard`].
//! - Decode raw byte streams with [`KeyDecoder`].
//! - Write cursor, clear and color commands through [`TerminalOutputExt`] or batch them in an
//!   [`OutputGate`].

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod editor;
pub mod history;
pub mod platform;

/// Line editing front end.
pub use crate::editor::{Completer, Prompt};
pub use crate::history::History;

/// Error types.
pub use crate::error::{PromptError, TerminalError};

/// Keyboard input and terminal events.
pub use crate::core::input::Key;
pub use crate::core::input_event::{InputEvent, KeyEvent};
pub use crate::platform::key_decoder::{KeyDecoder, DEFAULT_ESCAPE_TIMEOUT};

/// Output commands and primitives.
pub use crate::core::output::{Color, OutputGate, TerminalCmd, TerminalOutputExt};

/// Terminal interfaces and process-backed implementation.
pub use crate::core::terminal::{Terminal, TerminalGuard};
pub use crate::platform::process_terminal::{
    install_signal_handlers, ModeRestorer, ProcessTerminal, SignalHookGuard,
};

pub use crate::config::EnvConfig;
