//! Site console CLI.
//!
//! Runs the interactive shell in a terminal and exposes the store-backed
//! page flows (boot check, uplink status, contact form) as one-shot commands.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use site_console::contact::{ContactMessage, SubmitOutcome, submit};
use site_console::core::game::GameState;
use site_console::core::types::{Key, LineStyle, OutputLine};
use site_console::exit_codes;
use site_console::io::clock::{Clock, ManualClock, SystemClock};
use site_console::io::config::{ConsoleConfig, load_config, write_config};
use site_console::io::host::Host;
use site_console::io::outbox::OutboxMailer;
use site_console::io::terminal::TerminalHost;
use site_console::logging;
use site_console::shell::Shell;
use site_console::store::{ReplicatedStore, SUBMISSION_LOCK_KEY};
use site_console::visitor::{Visit, check_visit, mark_visited};

/// Upper bound on how long `run` lets scheduled tasks play out after each line.
const RUN_SETTLE_MS: u64 = 120_000;
const IDLE_WAKE_MS: u64 = 60_000;

#[derive(Parser)]
#[command(
    name = "console",
    version,
    about = "Terminal-style site console with replicated visitor state"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = ".console/config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive shell. `:up`, `:down`, `:enter`, `:toggle`, `:esc` send keys;
    /// an empty line jumps while the runner game is on screen.
    Repl {
        /// Disable ANSI colors.
        #[arg(long)]
        no_color: bool,
    },
    /// Run each argument as a command line, letting scheduled output finish.
    Run {
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Write a default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Report whether this client is new or returning, then remember it.
    Boot,
    /// Report whether the contact uplink is locked.
    Uplink,
    /// Submit a contact message through the outbox.
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    if let Command::Init { force } = cli.command {
        return cmd_init(&cli.config, force);
    }
    let cfg = load_config(&cli.config)?;
    match cli.command {
        Command::Repl { no_color } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?;
            runtime.block_on(cmd_repl(&cfg, !no_color && std::io::stdout().is_terminal()))
        }
        Command::Run { lines } => cmd_run(&cfg, &lines),
        Command::Init { .. } => Ok(exit_codes::OK),
        Command::Boot => cmd_boot(&cfg),
        Command::Uplink => cmd_uplink(&cfg),
        Command::Contact {
            name,
            email,
            message,
        } => cmd_contact(&cfg, &name, &email, &message),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &ConsoleConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

/// Page-load sequence: boot check, remember the visitor, open a fresh shell.
fn boot_shell<H: Host>(cfg: &ConsoleConfig, clock: Arc<dyn Clock>, host: &mut H) -> Shell {
    let mut store = ReplicatedStore::from_config(cfg, clock.clone());
    let banner = match check_visit(&mut store) {
        Visit::Returning => ">> SYSTEM: RESTORING_SESSION",
        Visit::New => ">> SYSTEM: NEW_CONNECTION",
    };
    if let Err(err) = mark_visited(&mut store) {
        warn!(error = %err, "visitor flag not persisted");
    }
    let mut shell = Shell::new(cfg.clone(), store, clock.now_ms());
    shell.init_vitals(host);
    host.print_line(&OutputLine::new(banner, LineStyle::Success));
    shell.key(Key::Toggle, host);
    shell
}

/// Key sent by a REPL control line, if it is one.
fn control_key(line: &str) -> Option<Key> {
    match line.trim() {
        ":up" => Some(Key::Up),
        ":down" => Some(Key::Down),
        ":enter" => Some(Key::Enter),
        ":toggle" => Some(Key::Toggle),
        ":esc" => Some(Key::Escape),
        _ => None,
    }
}

fn handle_line<H: Host>(shell: &mut Shell, line: &str, host: &mut H) {
    if line.trim().is_empty() && shell.game_state() == Some(GameState::Running) {
        shell.key(Key::Jump, host);
    } else if let Some(key) = control_key(line) {
        shell.key(key, host);
    } else {
        shell.submit(line, host);
    }
}

async fn cmd_repl(cfg: &ConsoleConfig, color: bool) -> Result<i32> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut host = TerminalHost::new(std::io::stdout(), color);
    let mut shell = boot_shell(cfg, clock.clone(), &mut host);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let wait = shell
            .next_due_ms()
            .map_or(IDLE_WAKE_MS, |due| due.saturating_sub(clock.now_ms()));
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                shell.advance(clock.now_ms(), &mut host);
                handle_line(&mut shell, &line, &mut host);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for ctrl-c")?;
                shell.key(Key::Interrupt, &mut host);
            }
            () = tokio::time::sleep(Duration::from_millis(wait)) => {}
        }
        shell.advance(clock.now_ms(), &mut host);
        if host.take_reload() {
            info!("reloading session");
            shell = boot_shell(cfg, clock.clone(), &mut host);
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_run(cfg: &ConsoleConfig, lines: &[String]) -> Result<i32> {
    let clock = ManualClock::new(SystemClock.now_ms());
    let mut host = TerminalHost::new(std::io::stdout(), false);
    let mut shell = boot_shell(cfg, Arc::new(clock.clone()), &mut host);
    for line in lines {
        handle_line(&mut shell, line, &mut host);
        let limit = shell.now_ms() + RUN_SETTLE_MS;
        clock.set(shell.run_until_idle(limit, &mut host));
    }
    Ok(exit_codes::OK)
}

fn cmd_boot(cfg: &ConsoleConfig) -> Result<i32> {
    let mut store = ReplicatedStore::from_config(cfg, Arc::new(SystemClock));
    match check_visit(&mut store) {
        Visit::Returning => println!("returning"),
        Visit::New => println!("new"),
    }
    let report = mark_visited(&mut store)?;
    info!(accepted = ?report.accepted, rejected = ?report.rejected, "visitor marked");
    Ok(exit_codes::OK)
}

fn cmd_uplink(cfg: &ConsoleConfig) -> Result<i32> {
    let mut store = ReplicatedStore::from_config(cfg, Arc::new(SystemClock));
    match store.lock_until(SUBMISSION_LOCK_KEY) {
        Some(until) => {
            println!("locked until {until}");
            Ok(exit_codes::LOCKED)
        }
        None => {
            println!("ready");
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_contact(cfg: &ConsoleConfig, name: &str, email: &str, message: &str) -> Result<i32> {
    let mut store = ReplicatedStore::from_config(cfg, Arc::new(SystemClock));
    let mut mailer = OutboxMailer::in_dir(&cfg.store_dir);
    let msg = ContactMessage::new(name, email, message, &cfg.geo.visitor_log, store.now_ms());
    let cooldown = cfg.cooldown();
    match submit(&mut store, &mut mailer, &msg, cooldown) {
        SubmitOutcome::Sent {
            unlock_at,
            lock_persisted,
        } => {
            println!("UPLINK_ESTABLISHED. MESSAGE SENT.");
            if !lock_persisted {
                warn!("cooldown lock could not be stored");
            }
            info!(unlock_at, outbox = %mailer.path().display(), "message queued");
            Ok(exit_codes::OK)
        }
        SubmitOutcome::Locked { until } => {
            println!("UPLINK_LOCKED until {until}");
            Ok(exit_codes::LOCKED)
        }
        SubmitOutcome::Failed { error } => {
            eprintln!("TRANSMISSION_FAILED: {error}");
            Ok(exit_codes::UNDELIVERED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repl_no_color() {
        let cli = Cli::try_parse_from(["console", "repl", "--no-color"]).expect("parse");
        assert!(matches!(cli.command, Command::Repl { no_color: true }));
    }

    #[test]
    fn parse_run_requires_lines() {
        assert!(Cli::try_parse_from(["console", "run"]).is_err());
        let cli = Cli::try_parse_from(["console", "run", "calc 1+1", "ls"]).expect("parse");
        match cli.command {
            Command::Run { lines } => assert_eq!(lines, vec!["calc 1+1", "ls"]),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["console", "uplink", "--config", "x.toml"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn control_lines_map_to_keys() {
        assert_eq!(control_key(" :up "), Some(Key::Up));
        assert_eq!(control_key(":esc"), Some(Key::Escape));
        assert_eq!(control_key("up"), None);
    }
}
