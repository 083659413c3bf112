//! In-memory history of committed lines.

/// Ordered committed lines, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse newline-joined text, one entry per `\n`-separated segment.
    ///
    /// Inverse of [`History::export`]: empty text is empty history, and a trailing newline is a
    /// trailing empty entry. Carriage returns are kept as entry content.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::new();
        }
        Self {
            entries: text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Replace the current entries with those parsed from `text`.
    pub fn load(&mut self, text: &str) {
        *self = Self::from_text(text);
    }

    /// Newline-joined entries, without a trailing newline.
    pub fn export(&self) -> String {
        self.entries.join("\n")
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for History {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
