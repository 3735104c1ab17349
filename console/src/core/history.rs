//! Navigable input history.

/// Cursor position inside the history.
///
/// `Idle` is the "not navigating" state entered on every submit. `At(len)` is
/// the "past the newest entry" state, reachable only through Down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Idle,
    At(usize),
}

/// Append-only list of submitted raw lines plus a navigation cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    cursor: Cursor,
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: Cursor::Idle,
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a submitted line. Duplicates are kept.
    pub fn push(&mut self, raw: &str) {
        self.entries.push(raw.to_string());
        self.cursor = Cursor::Idle;
    }

    /// Step towards older entries, clamping at the oldest.
    ///
    /// Returns the text to display, or `None` when history is empty.
    pub fn up(&mut self) -> Option<String> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        let mut idx = match self.cursor {
            Cursor::Idle => len,
            Cursor::At(idx) => idx,
        };
        if idx > 0 {
            idx -= 1;
        }
        self.cursor = Cursor::At(idx);
        Some(self.entries[idx].clone())
    }

    /// Step towards newer entries. Moving past the newest clears the input.
    ///
    /// Returns the text to display (empty string for the cleared input), or
    /// `None` when history is empty. From `Idle` the next index is 0.
    pub fn down(&mut self) -> Option<String> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        let next = match self.cursor {
            Cursor::Idle => 0,
            Cursor::At(idx) => idx + 1,
        };
        if next < len {
            self.cursor = Cursor::At(next);
            Some(self.entries[next].clone())
        } else {
            self.cursor = Cursor::At(len);
            Some(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(lines: &[&str]) -> History {
        let mut history = History::new();
        for line in lines {
            history.push(line);
        }
        history
    }

    #[test]
    fn empty_history_ignores_navigation() {
        let mut history = History::new();
        assert_eq!(history.up(), None);
        assert_eq!(history.down(), None);
        assert_eq!(history.cursor(), Cursor::Idle);
    }

    #[test]
    fn up_clamps_and_down_clears_past_newest() {
        let mut history = history(&["a", "b", "c"]);
        let shown: Vec<String> = [
            history.up(),
            history.up(),
            history.up(),
            history.up(),
            history.down(),
            history.down(),
            history.down(),
        ]
        .into_iter()
        .map(|text| text.expect("non-empty history"))
        .collect();
        assert_eq!(shown, vec!["c", "b", "a", "a", "b", "c", ""]);
        assert_eq!(history.cursor(), Cursor::At(3));
    }

    #[test]
    fn down_from_idle_starts_at_oldest() {
        let mut history = history(&["a", "b"]);
        assert_eq!(history.down().as_deref(), Some("a"));
    }

    #[test]
    fn up_after_clearing_past_newest_shows_newest() {
        let mut history = history(&["a", "b"]);
        history.down();
        history.down();
        assert_eq!(history.down().as_deref(), Some(""));
        assert_eq!(history.up().as_deref(), Some("b"));
    }

    #[test]
    fn push_resets_cursor_and_keeps_duplicates() {
        let mut history = history(&["a"]);
        history.up();
        history.push("a");
        assert_eq!(history.cursor(), Cursor::Idle);
        assert_eq!(history.entries(), ["a", "a"]);
    }
}
