//! Single-line edit state machine.
//!
//! The editor never reads from the terminal itself. It is fed one event at a time and renders
//! synchronously after every state change, so it needs no locking.

use unicode_segmentation::UnicodeSegmentation;

use crate::core::input::Key;
use crate::core::input_event::InputEvent;
use crate::core::output::{OutputGate, TerminalCmd};
use crate::core::terminal::Terminal;
use crate::editor::completion::{longest_common_prefix, Completer};
use crate::error::TerminalError;
use crate::history::History;

/// Result of feeding one event to a [`LineEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading events.
    Pending,
    Committed(String),
    /// Ctrl-C.
    Aborted,
    /// Ctrl-D, or the event stream ended.
    Ended,
}

/// Edit buffer, history cursor and completion cache for one prompt invocation.
pub struct LineEditor<'a> {
    prompt: &'a str,
    history: &'a History,
    completer: Option<&'a mut dyn Completer>,
    line: String,
    /// `None` while the live buffer is effective.
    history_index: Option<usize>,
    candidates: Option<Vec<String>>,
    gate: OutputGate,
}

impl<'a> LineEditor<'a> {
    pub fn new(
        prompt: &'a str,
        history: &'a History,
        completer: Option<&'a mut dyn Completer>,
    ) -> Self {
        Self {
            prompt,
            history,
            completer,
            line: String::new(),
            history_index: None,
            candidates: None,
            gate: OutputGate::new(),
        }
    }

    /// The live buffer, or the browsed history entry while browsing.
    pub fn effective_line(&self) -> &str {
        match self.history_index {
            Some(index) => self.history.get(index).unwrap_or_default(),
            None => &self.line,
        }
    }

    pub fn history_index(&self) -> Option<usize> {
        self.history_index
    }

    pub fn is_completing(&self) -> bool {
        self.candidates.is_some()
    }

    /// Write the prompt at the current cursor position.
    pub fn begin<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        self.gate.push(TerminalCmd::text(self.prompt));
        self.gate.flush(term)
    }

    pub fn handle_event<T: Terminal + ?Sized>(
        &mut self,
        event: InputEvent,
        term: &mut T,
    ) -> Result<Outcome, TerminalError> {
        let key = match event {
            InputEvent::Key(event) => event.key,
            InputEvent::Resize { .. } => {
                self.render(term)?;
                return Ok(Outcome::Pending);
            }
        };

        match key {
            Key::Char(ch) => self.edit(term, |line| line.push(ch))?,
            Key::Backspace | Key::Ctrl('h') => self.edit(term, pop_grapheme)?,
            Key::Ctrl('u') => self.edit(term, String::clear)?,
            Key::Up => self.history_previous(term)?,
            Key::Down => self.history_next(term)?,
            Key::Tab => self.complete(term)?,
            Key::Enter | Key::LineFeed => return self.commit(term),
            Key::Ctrl('c') => return Ok(Outcome::Aborted),
            Key::Ctrl('d') => return Ok(Outcome::Ended),
            Key::Ctrl('l') => {
                self.gate.push(TerminalCmd::Clear);
                self.render(term)?;
            }
            other => log::trace!("ignoring {other:?}"),
        }
        Ok(Outcome::Pending)
    }

    fn render<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        let width = usize::from(term.columns());
        let line = format!("{}{}", self.prompt, self.effective_line());
        self.gate.extend([
            TerminalCmd::SetCursorColumn(0),
            TerminalCmd::Text(" ".repeat(width)),
            TerminalCmd::SetCursorColumn(0),
            TerminalCmd::Text(line),
        ]);
        self.gate.flush(term)
    }

    fn queue_candidates(&mut self) {
        let Some(candidates) = self.candidates.as_ref() else {
            return;
        };
        self.gate.push(TerminalCmd::Newline);
        for candidate in candidates {
            self.gate.push(TerminalCmd::text(candidate.as_str()));
            self.gate.push(TerminalCmd::Newline);
        }
    }

    /// Make the browsed history entry the live buffer.
    fn collapse_history(&mut self) {
        if let Some(index) = self.history_index.take() {
            self.line = self.history.get(index).unwrap_or_default().to_string();
        }
    }

    fn edit<T, F>(&mut self, term: &mut T, mutate: F) -> Result<(), TerminalError>
    where
        T: Terminal + ?Sized,
        F: FnOnce(&mut String),
    {
        self.collapse_history();
        mutate(&mut self.line);
        self.candidates = None;
        self.render(term)
    }

    fn history_previous<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        let next = match self.history_index {
            None => self.history.last_index(),
            Some(0) => return Ok(()),
            Some(index) => Some(index - 1),
        };
        if next.is_none() {
            return Ok(());
        }
        self.history_index = next;
        self.candidates = None;
        self.render(term)
    }

    fn history_next<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        let Some(index) = self.history_index else {
            return Ok(());
        };
        self.history_index = if Some(index) == self.history.last_index() {
            None
        } else {
            Some(index + 1)
        };
        self.candidates = None;
        self.render(term)
    }

    fn complete<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        if self.candidates.is_some() {
            self.queue_candidates();
            return self.render(term);
        }
        let line = self.effective_line().to_string();
        let Some(completer) = self.completer.as_deref_mut() else {
            return Ok(());
        };

        let candidates = completer.complete(&line);
        if candidates.is_empty() {
            return Ok(());
        }

        self.collapse_history();
        let prefix = longest_common_prefix(&candidates).to_string();
        let unchanged = prefix == self.line;
        self.line = prefix;
        self.candidates = Some(candidates);
        if self.candidates.as_ref().is_some_and(|list| list.len() > 1) {
            self.queue_candidates();
        }
        if !unchanged {
            self.candidates = None;
        }
        self.render(term)
    }

    fn commit<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<Outcome, TerminalError> {
        self.collapse_history();
        self.candidates = None;
        self.gate.push(TerminalCmd::Newline);
        self.gate.flush(term)?;
        Ok(Outcome::Committed(std::mem::take(&mut self.line)))
    }
}

fn pop_grapheme(line: &mut String) {
    if let Some((start, _)) = line.grapheme_indices(true).next_back() {
        line.truncate(start);
    }
}
