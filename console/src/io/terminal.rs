//! Host that renders the shell into a plain terminal.
//!
//! Page effects have no terminal equivalent, so they are reported as dim
//! status lines. Remote lookups are not wired up and always report offline.

use std::io::Write;

use tracing::{info, warn};

use crate::core::game::Frame;
use crate::core::theme::Theme;
use crate::core::types::{LineStyle, OutputLine, Section, View};
use crate::io::host::{
    CollaboratorError, OutputSink, PageControl, RemoteData, SystemInfo, VisitorLocation, Weather,
};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const CLEAR: &str = "\x1b[2J\x1b[H";

pub struct TerminalHost<W: Write> {
    out: W,
    color: bool,
    theme: Theme,
    reload_requested: bool,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            theme: Theme::default(),
            reload_requested: false,
        }
    }

    /// True once `reboot` (or a crash) asked for a reload. The REPL restarts
    /// the session when it sees this.
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn style_prefix(&self, style: LineStyle) -> &'static str {
        if !self.color {
            return "";
        }
        match style {
            LineStyle::Plain => "",
            LineStyle::Prompt => "\x1b[1m",
            LineStyle::Error => "\x1b[31m",
            LineStyle::Success => "\x1b[32m",
            LineStyle::Pulse => "\x1b[1;32m",
            LineStyle::Accent => match self.theme {
                Theme::Green => "\x1b[32m",
                Theme::Blue => "\x1b[36m",
                Theme::Red => "\x1b[31m",
                Theme::Purple => "\x1b[35m",
            },
        }
    }

    fn emit(&mut self, text: &str, prefix: &str) {
        let reset = if prefix.is_empty() { "" } else { RESET };
        if let Err(err) = writeln!(self.out, "{prefix}{text}{reset}").and_then(|()| self.out.flush())
        {
            warn!(error = %err, "terminal write failed");
        }
    }

    fn status(&mut self, text: &str) {
        let prefix = if self.color { DIM } else { "" };
        self.emit(&format!("[{text}]"), prefix);
    }
}

impl<W: Write> OutputSink for TerminalHost<W> {
    fn print_line(&mut self, line: &OutputLine) {
        let prefix = self.style_prefix(line.style);
        self.emit(&line.content, prefix);
    }

    fn clear_output(&mut self) {
        if self.color {
            if let Err(err) = write!(self.out, "{CLEAR}") {
                warn!(error = %err, "terminal clear failed");
            }
        } else {
            self.status("cleared");
        }
    }

    // The terminal owns its own line editor; recalled text is shown, not injected.
    fn set_input(&mut self, text: &str) {
        if !text.is_empty() {
            self.status(&format!("recalled: {text}"));
        }
    }

    fn show_view(&mut self, view: View) {
        match view {
            View::Game => self.status("runner: press Enter on an empty line to jump"),
            View::Transcript => self.status("transcript"),
        }
    }

    fn render_game(&mut self, frame: &Frame) {
        let text = format!("{}  {}", frame.screen(), frame.scoreboard());
        self.emit(&text, "");
    }
}

impl<W: Write> PageControl for TerminalHost<W> {
    fn scroll_to_section(&mut self, section: Section) {
        self.status(&format!("scroll: #{}", section.name()));
    }

    fn trigger_download(&mut self, path: &str, filename: &str) {
        info!(path, filename, "download requested");
        self.status(&format!("download: {path} as {filename}"));
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.status(&format!("accent: {}", theme.accent()));
    }

    fn set_console_visible(&mut self, visible: bool) {
        self.status(if visible { "console open" } else { "console closed" });
    }

    fn toggle_matrix(&mut self) {
        self.status("matrix rain toggled");
    }

    fn show_crash_screen(&mut self) {
        self.status("BLUE SCREEN");
    }

    fn reload(&mut self) {
        self.reload_requested = true;
        self.status("reloading");
    }

    fn system_info(&self) -> SystemInfo {
        SystemInfo::local()
    }
}

impl<W: Write> RemoteData for TerminalHost<W> {
    fn fetch_current_weather(
        &mut self,
        _lat: f64,
        _long: f64,
    ) -> Result<Weather, CollaboratorError> {
        Err(CollaboratorError::Offline)
    }

    fn fetch_visitor_location(&mut self) -> Result<VisitorLocation, CollaboratorError> {
        Err(CollaboratorError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(host: TerminalHost<Vec<u8>>) -> String {
        String::from_utf8(host.into_inner()).expect("utf8")
    }

    #[test]
    fn plain_mode_writes_bare_lines() {
        let mut host = TerminalHost::new(Vec::new(), false);
        host.print_line(&OutputLine::error("boom"));
        host.scroll_to_section(Section::Work);
        assert_eq!(output(host), "boom\n[scroll: #work]\n");
    }

    #[test]
    fn color_mode_wraps_styled_lines() {
        let mut host = TerminalHost::new(Vec::new(), true);
        host.print_line(&OutputLine::error("boom"));
        assert_eq!(output(host), "\x1b[31mboom\x1b[0m\n");
    }

    #[test]
    fn reload_is_taken_once() {
        let mut host = TerminalHost::new(Vec::new(), false);
        host.reload();
        assert!(host.take_reload());
        assert!(!host.take_reload());
    }
}
