//! Closed command table for the shell.

/// Every command the shell understands. Aliases collapse onto one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Whoami,
    Ascii,
    Ls,
    Open,
    Sys,
    Ip,
    Weather,
    Socials,
    Cv,
    Theme,
    Ping,
    Calc,
    Hack,
    Matrix,
    Game,
    Uplink,
    Panic,
    Reboot,
    Exit,
    /// Name that matched nothing; carries the lower-cased name for the error line.
    Unknown(String),
}

impl Command {
    pub fn from_name(name: &str) -> Command {
        match name {
            "help" => Command::Help,
            "clear" | "cls" => Command::Clear,
            "whoami" => Command::Whoami,
            "ascii" => Command::Ascii,
            "ls" => Command::Ls,
            "open" => Command::Open,
            "sys" | "neofetch" => Command::Sys,
            "ip" | "locate" => Command::Ip,
            "weather" => Command::Weather,
            "socials" | "connect" => Command::Socials,
            "cv" | "resume" => Command::Cv,
            "theme" => Command::Theme,
            "ping" => Command::Ping,
            "calc" => Command::Calc,
            "hack" => Command::Hack,
            "matrix" => Command::Matrix,
            "game" => Command::Game,
            "uplink" => Command::Uplink,
            "panic" => Command::Panic,
            "reboot" => Command::Reboot,
            "exit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// `(usage, description)` rows printed by `help`, in display order.
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("HELP", "List all commands"),
    ("CLEAR / CLS", "Clear terminal buffer"),
    ("WHOAMI", "Identify user"),
    ("ASCII", "Display system logo"),
    ("LS", "List directory files"),
    ("OPEN [file]", "Nav: about, work, contact"),
    ("SYS", "Display system specs"),
    ("IP / LOCATE", "Trace network origin"),
    ("WEATHER", "Local atmospheric scan"),
    ("SOCIALS", "Establish comms uplink"),
    ("CV / RESUME", "Download personnel file"),
    ("THEME [clr]", "Set: red, blue, purple"),
    ("PING [addr]", "Test network latency"),
    ("CALC [eq]", "Calculate (e.g. 5*5)"),
    ("HACK [trgt]", "Run brute force sim"),
    ("MATRIX", "Toggle visualizer"),
    ("GAME", "Execute 'Hacker Run'"),
    ("UPLINK", "Show transmission lock"),
    ("PANIC", "Trigger kernel error"),
    ("REBOOT", "Restart system"),
    ("EXIT", "Terminate session"),
];
