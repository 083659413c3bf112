//! Typed terminal output commands, a batching output gate, and the output primitives exposed
//! on every [`Terminal`].

use std::fmt::{self, Write as _};

use crate::core::terminal::Terminal;
use crate::error::TerminalError;

/// The 16-color palette: 8 base colors, the terminal default, and 8 bright colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Purple,
    Cyan,
    LightGray,
    Default,
    Gray,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightPurple,
    BrightCyan,
    White,
}

impl Color {
    /// Brightness flag and base offset (0-7, or 9 for the default color).
    pub fn sgr_parts(self) -> (u8, u8) {
        match self {
            Self::Black => (0, 0),
            Self::Red => (0, 1),
            Self::Green => (0, 2),
            Self::Yellow => (0, 3),
            Self::Blue => (0, 4),
            Self::Purple => (0, 5),
            Self::Cyan => (0, 6),
            Self::LightGray => (0, 7),
            Self::Default => (0, 9),
            Self::Gray => (1, 0),
            Self::BrightRed => (1, 1),
            Self::BrightGreen => (1, 2),
            Self::BrightYellow => (1, 3),
            Self::BrightBlue => (1, 4),
            Self::BrightPurple => (1, 5),
            Self::BrightCyan => (1, 6),
            Self::White => (1, 7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Text or raw control sequences, written verbatim.
    Text(String),
    /// Home the cursor and clear the whole screen.
    Clear,
    /// Clear from the cursor to the end of the line.
    ClearLine,
    /// Zero-based absolute cursor position.
    SetCursor { x: u16, y: u16 },
    /// Zero-based column on the current row.
    SetCursorColumn(u16),
    /// Line feed followed by a return to column 0.
    ///
    /// Raw mode disables output post-processing, so a bare `\n` keeps the column.
    Newline,
    HideCursor,
    ShowCursor,
    Foreground(Color),
    Background(Color),
    /// Reset all attributes.
    Reset,
    EnterAlternateScreen,
    ExitAlternateScreen,
}

impl TerminalCmd {
    pub fn text(data: impl Into<String>) -> Self {
        Self::Text(data.into())
    }

    /// Append the encoded form of this command to `out`.
    pub fn encode_into(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            Self::Text(data) => {
                out.push_str(data);
                Ok(())
            }
            Self::Clear => write!(out, "\x1b[H\x1b[J"),
            Self::ClearLine => write!(out, "\x1b[0K"),
            Self::SetCursor { x, y } => {
                write!(out, "\x1b[{};{}H", u32::from(*y) + 1, u32::from(*x) + 1)
            }
            Self::SetCursorColumn(x) => write!(out, "\x1b[{}G", u32::from(*x) + 1),
            Self::Newline => write!(out, "\n\x1b[1G"),
            Self::HideCursor => write!(out, "\x1b[?25l"),
            Self::ShowCursor => write!(out, "\x1b[?25h"),
            Self::Foreground(color) => {
                let (bright, base) = color.sgr_parts();
                write!(out, "\x1b[{};{}m", bright, 30 + base)
            }
            Self::Background(color) => {
                let (bright, base) = color.sgr_parts();
                write!(out, "\x1b[{};{}m", bright, 40 + base)
            }
            Self::Reset => write!(out, "\x1b[0m"),
            Self::EnterAlternateScreen => write!(out, "\x1b[?1049h"),
            Self::ExitAlternateScreen => write!(out, "\x1b[r\x1b[?1049l"),
        };
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }
}

/// Buffers commands and flushes them to a terminal as one write.
#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    /// Encode every buffered command and write the result in a single call.
    ///
    /// The buffer is emptied even when the write fails.
    pub fn flush<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<(), TerminalError> {
        if self.cmds.is_empty() {
            return Ok(());
        }
        let mut out = String::new();
        for cmd in self.cmds.drain(..) {
            cmd.encode_into(&mut out);
        }
        term.write(&out)
    }
}

/// Output primitives available on every terminal.
pub trait TerminalOutputExt: Terminal {
    fn apply(&mut self, cmd: TerminalCmd) -> Result<(), TerminalError> {
        self.write(&cmd.encode())
    }

    fn puts(&mut self, text: &str) -> Result<(), TerminalError> {
        self.write(text)
    }

    /// Formatted write, for use with `format_args!`.
    fn print_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), TerminalError> {
        match args.as_str() {
            Some(text) => self.write(text),
            None => self.write(&args.to_string()),
        }
    }

    fn clear(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::Clear)
    }

    fn clear_line(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::ClearLine)
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::SetCursor { x, y })
    }

    fn set_cursor_column(&mut self, x: u16) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::SetCursorColumn(x))
    }

    fn show_cursor(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::ShowCursor)
    }

    fn hide_cursor(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::HideCursor)
    }

    fn set_fg(&mut self, color: Color) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::Foreground(color))
    }

    fn set_bg(&mut self, color: Color) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::Background(color))
    }

    fn reset(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::Reset)
    }

    /// Move to the start of a fresh line, in raw or cooked mode.
    fn newline(&mut self) -> Result<(), TerminalError> {
        self.apply(TerminalCmd::Newline)
    }
}

impl<T: Terminal + ?Sized> TerminalOutputExt for T {}
