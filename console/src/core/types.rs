//! Shared deterministic types for console core logic.
//!
//! These types are the contract between the shell and whatever host renders
//! it (terminal, web page). They carry no I/O and serialize stably so the web
//! host can forward them verbatim.

use serde::{Deserialize, Serialize};

/// Presentation class attached to a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Plain,
    /// Echo of the submitted input, prefixed with the prompt.
    Prompt,
    Error,
    Success,
    /// Highlighted status line (grants, downloads).
    Pulse,
    Accent,
}

impl LineStyle {
    /// CSS class used by the page transcript.
    pub fn css_class(self) -> &'static str {
        match self {
            LineStyle::Plain => "",
            LineStyle::Prompt => "prompt-text",
            LineStyle::Error => "cli-error",
            LineStyle::Success => "cli-success",
            LineStyle::Pulse => "p-status pulse",
            LineStyle::Accent => "cli-accent",
        }
    }
}

/// One line appended to the transcript. Markup in `content` is passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub content: String,
    pub style: LineStyle,
}

impl OutputLine {
    pub fn new(content: impl Into<String>, style: LineStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, LineStyle::Plain)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(content, LineStyle::Error)
    }
}

/// Control keys the host forwards to the shell.
///
/// Ordinary characters are edited by the host and arrive as a whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Up,
    Down,
    Enter,
    /// Global open/close toggle (backtick on the page).
    Toggle,
    Escape,
    /// Mini-game jump (space bar).
    Jump,
    /// Cancel running ticking commands (Ctrl-C).
    Interrupt,
}

/// Page sections reachable through `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    About,
    Work,
    Contact,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::About, Section::Work, Section::Contact];

    pub fn name(self) -> &'static str {
        match self {
            Section::About => "about",
            Section::Work => "work",
            Section::Contact => "contact",
        }
    }

    /// First section whose name occurs in `arg` (`about.txt` opens `about`).
    pub fn find_in(arg: &str) -> Option<Section> {
        Section::ALL
            .into_iter()
            .find(|section| arg.contains(section.name()))
    }
}

/// Which panel of the console is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Transcript,
    Game,
}
