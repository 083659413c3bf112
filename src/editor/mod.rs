//! Interactive line reading on top of a [`Terminal`].

pub mod completion;
pub mod state;

pub use completion::{longest_common_prefix, Completer};
pub use state::{LineEditor, Outcome};

use crate::core::terminal::{Terminal, TerminalGuard};
use crate::error::PromptError;
use crate::history::History;

use crate::config::EnvConfig;
use crate::platform::process_terminal::ProcessTerminal;

/// Reads lines from a terminal with history browsing and tab completion.
///
/// The terminal is in raw mode only while [`Prompt::prompt`] runs.
pub struct Prompt<T: Terminal> {
    terminal: T,
    history: History,
    completer: Option<Box<dyn Completer>>,
}

impl Prompt<ProcessTerminal> {
    /// Prompt on `/dev/tty`.
    pub fn new() -> Self {
        Self::with_terminal(ProcessTerminal::new())
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::with_terminal(ProcessTerminal::from_config(config))
    }
}

impl Default for Prompt<ProcessTerminal> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Terminal> Prompt<T> {
    pub fn with_terminal(terminal: T) -> Self {
        Self {
            terminal,
            history: History::new(),
            completer: None,
        }
    }

    pub fn set_completer<C: Completer + 'static>(&mut self, completer: C) {
        self.completer = Some(Box::new(completer));
    }

    pub fn set_completion_fn<F>(&mut self, completion: F)
    where
        F: FnMut(&str) -> Vec<String> + 'static,
    {
        self.set_completer(completion);
    }

    pub fn clear_completer(&mut self) {
        self.completer = None;
    }

    /// History as newline-joined text.
    pub fn export_history(&self) -> String {
        self.history.export()
    }

    /// Replace the history with the lines of `text`.
    pub fn load_history(&mut self, text: &str) {
        self.history.load(text);
    }

    pub fn append_history(&mut self, line: impl Into<String>) {
        self.history.push(line);
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// The underlying terminal, for output between prompts.
    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Show `prompt` and read one line.
    ///
    /// Raw mode is entered for the duration of the call and restored on every return path,
    /// including unwinding. Committed lines are not added to the history; use
    /// [`Prompt::append_history`].
    pub fn prompt(&mut self, prompt: &str) -> Result<String, PromptError> {
        let Self {
            terminal,
            history,
            completer,
        } = self;
        let completer: Option<&mut dyn Completer> = match completer.as_mut() {
            Some(completer) => Some(&mut **completer),
            None => None,
        };

        let mut guard = TerminalGuard::start(terminal)?;
        let mut editor = LineEditor::new(prompt, history, completer);
        editor.begin(&mut *guard)?;

        let outcome = loop {
            let Some(event) = guard.next_event()? else {
                log::debug!("event stream closed while prompting");
                break Outcome::Ended;
            };
            match editor.handle_event(event, &mut *guard)? {
                Outcome::Pending => continue,
                done => break done,
            }
        };
        guard.stop()?;

        match outcome {
            Outcome::Committed(line) => Ok(line),
            Outcome::Aborted => Err(PromptError::Aborted),
            Outcome::Ended | Outcome::Pending => Err(PromptError::Ended),
        }
    }
}
