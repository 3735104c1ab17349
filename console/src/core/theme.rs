//! Accent palette for the `theme` command.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Green,
    Blue,
    Red,
    Purple,
}

impl Theme {
    /// Resolve a user-supplied name. Unknown or missing names give the default.
    pub fn from_arg(arg: Option<&str>) -> Theme {
        match arg {
            Some("blue") => Theme::Blue,
            Some("red") => Theme::Red,
            Some("purple") => Theme::Purple,
            _ => Theme::Green,
        }
    }

    /// CSS colour for `--accent` and `--phosphor`.
    pub fn accent(self) -> &'static str {
        match self {
            Theme::Green => "#33ff33",
            Theme::Blue => "#3b82f6",
            Theme::Red => "#ef4444",
            Theme::Purple => "#a855f7",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Green => "STANDARD_GREEN",
            Theme::Blue => "CYAN_PROTOCOL",
            Theme::Red => "RED_ALERT",
            Theme::Purple => "NEON_PURPLE",
        }
    }
}
