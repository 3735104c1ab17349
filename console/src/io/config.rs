//! Console configuration stored in `.console/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::game::GameRules;

/// Upper bound for lock and flag lifetimes (about a century).
pub const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Console configuration (TOML).
///
/// Every section defaults independently, so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Directory holding the file-backed storage backends and the outbox.
    pub store_dir: PathBuf,
    pub backends: BackendConfig,
    pub lock: LockConfig,
    pub shell: ShellConfig,
    pub game: GameRules,
    pub profile: Profile,
    pub geo: GeoFallback,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".console/store"),
            backends: BackendConfig::default(),
            lock: LockConfig::default(),
            shell: ShellConfig::default(),
            game: GameRules::default(),
            profile: Profile::default(),
            geo: GeoFallback::default(),
        }
    }
}

/// Which storage backends participate in replication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// In-memory, lives as long as the process.
    pub session: bool,
    /// JSON file without expiry.
    pub persistent: bool,
    /// JSON file whose records carry an expiry.
    pub cookie: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            session: true,
            persistent: true,
            cookie: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LockConfig {
    /// Cooldown applied after a successful contact submission.
    pub cooldown_secs: u64,
    /// Lifetime of the returning-visitor flag in expiring backends.
    pub flag_ttl_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30 * 60,
            flag_ttl_secs: 365 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Text echoed before each submitted line.
    pub prompt: String,
    /// Fixed PRNG seed; random per session when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub ping_period_ms: u64,
    pub ping_count: u32,
    pub hack_period_ms: u64,
    pub hack_attempts: u32,
    pub download_delay_ms: u64,
    pub reboot_delay_ms: u64,
    pub panic_delay_ms: u64,
    /// Time the crash screen stays up before the page reloads.
    pub crash_screen_ms: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: r"CM:\admin\visitor>".to_string(),
            seed: None,
            ping_period_ms: 500,
            ping_count: 4,
            hack_period_ms: 400,
            hack_attempts: 6,
            download_delay_ms: 800,
            reboot_delay_ms: 1500,
            panic_delay_ms: 1500,
            crash_screen_ms: 4000,
        }
    }
}

/// Owner details printed by `whoami`, `socials` and `cv`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub github: String,
    pub linkedin: String,
    pub email: String,
    pub resume_path: String,
    pub resume_filename: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Site Operator".to_string(),
            title: "Fullstack Engineer".to_string(),
            github: "https://github.com/".to_string(),
            linkedin: "https://linkedin.com/".to_string(),
            email: "operator@example.com".to_string(),
            resume_path: "resume/resume.pdf".to_string(),
            resume_filename: "resume.pdf".to_string(),
        }
    }
}

/// Location used until (or instead of) a successful visitor lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoFallback {
    pub lat: f64,
    pub long: f64,
    pub city: String,
    pub visitor_log: String,
}

impl Default for GeoFallback {
    fn default() -> Self {
        Self {
            lat: 14.5995,
            long: 120.9842,
            city: "Manila".to_string(),
            visitor_log: "CITY: MANILA // LOCALHOST DETECTED".to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shell.prompt.trim().is_empty() {
            return Err(anyhow!("shell.prompt must be non-empty"));
        }
        let periods = [
            ("shell.ping_period_ms", self.shell.ping_period_ms),
            ("shell.hack_period_ms", self.shell.hack_period_ms),
            ("game.tick_ms", self.game.tick_ms),
            ("game.jump_ms", self.game.jump_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(anyhow!("{name} must be > 0"));
            }
        }
        if self.shell.ping_count == 0 || self.shell.hack_attempts == 0 {
            return Err(anyhow!("shell.ping_count and shell.hack_attempts must be > 0"));
        }
        if self.game.player_slot >= self.game.track_len {
            return Err(anyhow!("game.player_slot must be < game.track_len"));
        }
        if self.game.spawn >= self.game.track_len {
            return Err(anyhow!("game.spawn must be < game.track_len"));
        }
        if self.lock.cooldown_secs == 0 {
            return Err(anyhow!("lock.cooldown_secs must be > 0"));
        }
        let lifetimes = [
            ("lock.cooldown_secs", self.lock.cooldown_secs),
            ("lock.flag_ttl_secs", self.lock.flag_ttl_secs),
        ];
        for (name, value) in lifetimes {
            if value > MAX_LIFETIME_SECS {
                return Err(anyhow!("{name} must be <= {MAX_LIFETIME_SECS}"));
            }
        }
        Ok(())
    }

    /// How long a successful contact submission locks the uplink.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.lock.cooldown_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConsoleConfig::default()`.
pub fn load_config(path: &Path) -> Result<ConsoleConfig> {
    if !path.exists() {
        let cfg = ConsoleConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConsoleConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConsoleConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
