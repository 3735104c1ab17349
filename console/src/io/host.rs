//! Collaborator seams between the shell and the page (or terminal) hosting it.
//!
//! The shell never renders, navigates or fetches anything itself. It calls
//! these traits, and each host decides what the call means.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::game::Frame;
use crate::core::theme::Theme;
use crate::core::types::{OutputLine, Section, View};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator offline")]
    Offline,
    #[error("collaborator failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorLocation {
    pub lat: f64,
    pub long: f64,
    pub city: String,
    pub ip: String,
}

/// Details shown by `sys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    pub resolution: String,
    pub cores: usize,
    pub agent: String,
}

impl SystemInfo {
    /// Best description of the machine running this process.
    pub fn local() -> Self {
        Self {
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            resolution: "80x24".to_string(),
            cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            agent: format!("site-console/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Transcript and view rendering.
pub trait OutputSink {
    /// Append one line and keep the transcript scrolled to the bottom.
    fn print_line(&mut self, line: &OutputLine);
    fn clear_output(&mut self);
    /// Replace the text in the input field (history navigation).
    fn set_input(&mut self, text: &str);
    fn show_view(&mut self, view: View);
    fn render_game(&mut self, frame: &Frame);
}

/// Page-level side effects.
pub trait PageControl {
    fn scroll_to_section(&mut self, section: Section);
    fn trigger_download(&mut self, path: &str, filename: &str);
    fn apply_theme(&mut self, theme: Theme);
    fn set_console_visible(&mut self, visible: bool);
    fn toggle_matrix(&mut self);
    fn show_crash_screen(&mut self);
    fn reload(&mut self);
    fn system_info(&self) -> SystemInfo;
}

/// Best-effort remote lookups.
pub trait RemoteData {
    fn fetch_current_weather(&mut self, lat: f64, long: f64)
    -> Result<Weather, CollaboratorError>;
    fn fetch_visitor_location(&mut self) -> Result<VisitorLocation, CollaboratorError>;
}

/// Everything a shell handler may touch outside the shell itself.
pub trait Host: OutputSink + PageControl + RemoteData {}

impl<T: OutputSink + PageControl + RemoteData> Host for T {}

/// A host call, captured as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Line { line: OutputLine },
    Cleared,
    Input { text: String },
    View { view: View },
    Frame { frame: Frame },
    Scroll { section: Section },
    Download { path: String, filename: String },
    Theme { theme: Theme, accent: String },
    Visible { visible: bool },
    Matrix,
    CrashScreen,
    Reload,
}

/// Host that queues every call as a [`HostEvent`] for someone else to apply.
///
/// Remote lookups answer from the configured results, so the same type serves
/// the web host (which forwards events to the page) and tests.
#[derive(Debug, Clone)]
pub struct BufferedHost {
    events: Vec<HostEvent>,
    pub weather: Result<Weather, CollaboratorError>,
    pub location: Result<VisitorLocation, CollaboratorError>,
    pub system: SystemInfo,
    pub remote_calls: u32,
}

impl Default for BufferedHost {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            weather: Err(CollaboratorError::Offline),
            location: Err(CollaboratorError::Offline),
            system: SystemInfo::local(),
            remote_calls: 0,
        }
    }
}

impl BufferedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    /// Transcript lines in emission order.
    pub fn lines(&self) -> Vec<&OutputLine> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Line { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Transcript line contents in emission order.
    pub fn contents(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|line| line.content.clone())
            .collect()
    }
}

impl OutputSink for BufferedHost {
    fn print_line(&mut self, line: &OutputLine) {
        self.events.push(HostEvent::Line { line: line.clone() });
    }

    fn clear_output(&mut self) {
        self.events.push(HostEvent::Cleared);
    }

    fn set_input(&mut self, text: &str) {
        self.events.push(HostEvent::Input {
            text: text.to_string(),
        });
    }

    fn show_view(&mut self, view: View) {
        self.events.push(HostEvent::View { view });
    }

    fn render_game(&mut self, frame: &Frame) {
        self.events.push(HostEvent::Frame {
            frame: frame.clone(),
        });
    }
}

impl PageControl for BufferedHost {
    fn scroll_to_section(&mut self, section: Section) {
        self.events.push(HostEvent::Scroll { section });
    }

    fn trigger_download(&mut self, path: &str, filename: &str) {
        self.events.push(HostEvent::Download {
            path: path.to_string(),
            filename: filename.to_string(),
        });
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.events.push(HostEvent::Theme {
            theme,
            accent: theme.accent().to_string(),
        });
    }

    fn set_console_visible(&mut self, visible: bool) {
        self.events.push(HostEvent::Visible { visible });
    }

    fn toggle_matrix(&mut self) {
        self.events.push(HostEvent::Matrix);
    }

    fn show_crash_screen(&mut self) {
        self.events.push(HostEvent::CrashScreen);
    }

    fn reload(&mut self) {
        self.events.push(HostEvent::Reload);
    }

    fn system_info(&self) -> SystemInfo {
        self.system.clone()
    }
}

impl RemoteData for BufferedHost {
    fn fetch_current_weather(
        &mut self,
        _lat: f64,
        _long: f64,
    ) -> Result<Weather, CollaboratorError> {
        self.remote_calls += 1;
        self.weather.clone()
    }

    fn fetch_visitor_location(&mut self) -> Result<VisitorLocation, CollaboratorError> {
        self.remote_calls += 1;
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = HostEvent::Scroll {
            section: Section::Work,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert_eq!(json, r#"{"type":"scroll","section":"work"}"#);
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut host = BufferedHost::new();
        host.print_line(&OutputLine::plain("one"));
        host.toggle_matrix();
        assert_eq!(host.contents(), vec!["one"]);
        assert_eq!(host.drain().len(), 2);
        assert!(host.events().is_empty());
    }
}
