//! Terminal trait and lifecycle guard.

use std::ops::{Deref, DerefMut};

use crate::core::input_event::InputEvent;
use crate::error::TerminalError;

/// Minimal terminal interface consumed by the line editor.
pub trait Terminal {
    /// Enter raw mode and begin producing events.
    fn start(&mut self) -> Result<(), TerminalError>;

    /// Restore the original mode and stop producing events.
    ///
    /// Calling `stop` on a terminal that is not running is a successful no-op.
    fn stop(&mut self) -> Result<(), TerminalError>;

    /// Block until the next event. `Ok(None)` means the event queue is closed.
    fn next_event(&mut self) -> Result<Option<InputEvent>, TerminalError>;

    /// Write output to the terminal.
    fn write(&mut self, data: &str) -> Result<(), TerminalError>;

    /// Terminal dimensions.
    fn columns(&self) -> u16;
    fn rows(&self) -> u16;
}

/// RAII guard that stops a started terminal when dropped.
///
/// Errors from the implicit stop in `drop` are logged; call [`TerminalGuard::stop`] to observe
/// them.
pub struct TerminalGuard<'a, T: Terminal + ?Sized> {
    terminal: Option<&'a mut T>,
}

impl<'a, T: Terminal + ?Sized> TerminalGuard<'a, T> {
    /// Start `terminal` and guard it.
    ///
    /// If start fails, stop is still attempted so nothing is left half-configured.
    pub fn start(terminal: &'a mut T) -> Result<Self, TerminalError> {
        if let Err(err) = terminal.start() {
            if let Err(stop_err) = terminal.stop() {
                log::warn!("stop after failed start also failed: {stop_err}");
            }
            return Err(err);
        }
        Ok(Self {
            terminal: Some(terminal),
        })
    }

    /// Stop the terminal now and report the result.
    pub fn stop(mut self) -> Result<(), TerminalError> {
        match self.terminal.take() {
            Some(terminal) => terminal.stop(),
            None => Ok(()),
        }
    }
}

impl<T: Terminal + ?Sized> Deref for TerminalGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.terminal
            .as_deref()
            .expect("terminal already released from guard")
    }
}

impl<T: Terminal + ?Sized> DerefMut for TerminalGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.terminal
            .as_deref_mut()
            .expect("terminal already released from guard")
    }
}

impl<T: Terminal + ?Sized> Drop for TerminalGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            if let Err(err) = terminal.stop() {
                log::warn!("failed to stop terminal while dropping guard: {err}");
            }
        }
    }
}
