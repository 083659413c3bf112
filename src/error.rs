//! Error types for terminal sessions and interactive reads.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    /// A termios call failed while entering or leaving raw mode.
    #[error("failed to {operation} terminal mode: {source}")]
    Mode {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("terminal session already started")]
    AlreadyStarted,

    #[error("terminal device {device} already has an active raw-mode session")]
    DeviceBusy { device: String },
}

impl TerminalError {
    #[must_use]
    pub fn mode(operation: &'static str, source: io::Error) -> Self {
        Self::Mode { operation, source }
    }

    #[must_use]
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    /// Underlying OS error code, when the failure came from a syscall.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Mode { source, .. } | Self::Io { source, .. } => source.raw_os_error(),
            Self::AlreadyStarted | Self::DeviceBusy { .. } => None,
        }
    }
}

/// Outcome of an interactive read that did not produce a line.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Ctrl-C was pressed.
    #[error("prompt aborted")]
    Aborted,

    /// Ctrl-D was pressed, or the input stream closed.
    #[error("prompt ended")]
    Ended,

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}
