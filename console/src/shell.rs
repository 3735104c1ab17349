//! The interactive console session.
//!
//! A [`Shell`] owns every piece of mutable console state: input history, the
//! current input, theme, visibility, the mini-game and the task scheduler.
//! Hosts feed it keys and lines and drive it with [`Shell::advance`]; all
//! rendering and page effects go back out through the [`Host`] traits.
//!
//! Scheduling is cooperative and single-threaded. Nothing runs between calls:
//! a task due at time `t` runs during the first `advance(now)` with `now >= t`,
//! and tasks due in the same call run in due order.

use std::time::Duration;

use tracing::{debug, warn};

use crate::core::calc::{evaluate, format_result};
use crate::core::command::{Command, HELP_ENTRIES};
use crate::core::game::{GameState, RunnerGame};
use crate::core::history::History;
use crate::core::parse::{ParsedLine, parse_line};
use crate::core::theme::Theme;
use crate::core::ticking::{Probe, Scheduler, TaskId, tick_rng};
use crate::core::types::{Key, LineStyle, OutputLine, Section, View};
use crate::io::config::{ConsoleConfig, GeoFallback};
use crate::io::host::Host;
use crate::store::{ReplicatedStore, SUBMISSION_LOCK_KEY};

const LOGO: [&str; 6] = [
    "██████╗███╗   ███╗",
    "██╔════╝████╗ ████║",
    "██║     ██╔████╔██║",
    "██║     ██║╚██╔╝██║",
    "╚██████╗██║ ╚═╝ ██║",
    " ╚═════╝╚═╝     ╚═╝",
];

const FILES: [&str; 3] = ["about.txt", "work.json", "contact.exe"];

/// Work the scheduler runs on the shell's behalf.
#[derive(Debug, Clone)]
enum Job {
    Probe(Probe),
    /// One frame of the running mini-game.
    GameFrame,
    /// Return from the crash screen to the transcript.
    GameOver,
    /// One-shot effect after a delay (or after yielding, for remote calls).
    Deferred(Deferred),
}

#[derive(Debug, Clone)]
enum Deferred {
    Download,
    Weather { lat: f64, long: f64, city: String },
    CrashScreen,
    Reload,
}

enum TickResult {
    Continue,
    Done,
}

/// Per-dispatch view of a parsed line.
struct CommandContext<'a> {
    args: &'a [String],
    arg1: Option<&'a str>,
}

/// Where the visitor appears to be.
#[derive(Debug, Clone, PartialEq)]
pub struct Geo {
    pub lat: f64,
    pub long: f64,
    pub city: String,
}

pub struct Shell {
    config: ConsoleConfig,
    store: ReplicatedStore,
    history: History,
    input: String,
    theme: Theme,
    visible: bool,
    view: View,
    game: Option<RunnerGame>,
    scheduler: Scheduler<Job>,
    seed: u64,
    now_ms: u64,
    geo: Geo,
    visitor_log: Option<String>,
}

impl Shell {
    pub fn new(config: ConsoleConfig, store: ReplicatedStore, now_ms: u64) -> Self {
        let seed = config.shell.seed.unwrap_or_else(rand::random);
        let GeoFallback {
            lat, long, city, ..
        } = config.geo.clone();
        Self {
            config,
            store,
            history: History::new(),
            input: String::new(),
            theme: Theme::default(),
            visible: false,
            view: View::Transcript,
            game: None,
            scheduler: Scheduler::new(),
            seed,
            now_ms,
            geo: Geo { lat, long, city },
            visitor_log: None,
        }
    }

    /// Look up the visitor's location, keeping the configured fallback on failure.
    pub fn init_vitals<H: Host>(&mut self, host: &mut H) {
        match host.fetch_visitor_location() {
            Ok(location) => {
                self.visitor_log = Some(format!(
                    "CITY: {} | IP: {}",
                    location.city, location.ip
                ));
                self.geo = Geo {
                    lat: location.lat,
                    long: location.long,
                    city: location.city,
                };
            }
            Err(err) => {
                debug!(error = %err, "visitor lookup failed; using fallback location");
                self.visitor_log = Some(self.config.geo.visitor_log.clone());
            }
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn geo(&self) -> &Geo {
        &self.geo
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn store_mut(&mut self) -> &mut ReplicatedStore {
        &mut self.store
    }

    pub fn visitor_log(&self) -> &str {
        self.visitor_log.as_deref().unwrap_or("UNKNOWN_ORIGIN")
    }

    /// State of the current mini-game, if one is on screen.
    pub fn game_state(&self) -> Option<GameState> {
        self.game.as_ref().map(RunnerGame::state)
    }

    /// True when no task is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty()
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.scheduler.next_due_ms()
    }

    /// Replace the current input text (the host owns character editing).
    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    /// Type `raw` and press Enter.
    pub fn submit<H: Host>(&mut self, raw: &str, host: &mut H) {
        self.set_input(raw);
        self.key(Key::Enter, host);
    }

    pub fn key<H: Host>(&mut self, key: Key, host: &mut H) {
        match key {
            Key::Up => {
                if let Some(text) = self.history.up() {
                    self.show_input(text, host);
                }
            }
            Key::Down => {
                if let Some(text) = self.history.down() {
                    self.show_input(text, host);
                }
            }
            Key::Enter => self.enter(host),
            Key::Toggle => {
                self.visible = !self.visible;
                host.set_console_visible(self.visible);
            }
            Key::Escape => {
                if self.visible {
                    self.visible = false;
                    host.set_console_visible(false);
                }
            }
            Key::Jump => {
                let now = self.now_ms;
                match self.game.as_mut() {
                    Some(game) if game.state() == GameState::Running => {
                        game.press_jump(now);
                    }
                    _ => debug!("jump ignored: no game listening"),
                }
            }
            Key::Interrupt => {
                let cancelled = self.scheduler.cancel_where(|job| matches!(job, Job::Probe(_)));
                debug!(cancelled, "interrupt");
                host.print_line(&OutputLine::plain("^C"));
            }
        }
    }

    /// Run every task due at or before `now_ms`, in due order.
    pub fn advance<H: Host>(&mut self, now_ms: u64, host: &mut H) {
        while let Some(mut task) = self.scheduler.pop_due(now_ms) {
            if task.cancelled {
                debug!(task = task.id, "dropping cancelled task");
                continue;
            }
            // Effects spawned from inside a tick are timed from the tick itself.
            self.now_ms = self.now_ms.max(task.next_due_ms);
            task.tick_count += 1;
            match self.run_job(task.id, &task.job, task.tick_count, host) {
                TickResult::Continue => self.scheduler.reschedule(task),
                TickResult::Done => debug!(task = task.id, ticks = task.tick_count, "task done"),
            }
        }
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Keep advancing to each next due time until no task remains or
    /// `limit_ms` is reached. Returns the final clock value.
    pub fn run_until_idle<H: Host>(&mut self, limit_ms: u64, host: &mut H) -> u64 {
        while let Some(due) = self.next_due_ms() {
            if due > limit_ms {
                break;
            }
            self.advance(due, host);
        }
        self.now_ms
    }

    fn show_input<H: Host>(&mut self, text: String, host: &mut H) {
        host.set_input(&text);
        self.input = text;
    }

    fn enter<H: Host>(&mut self, host: &mut H) {
        let raw = std::mem::take(&mut self.input);
        let Some(parsed) = parse_line(&raw) else {
            self.input = raw;
            return;
        };
        self.history.push(&raw);
        host.set_input("");
        host.print_line(&OutputLine::new(
            format!("{} {}", self.config.shell.prompt, raw),
            LineStyle::Prompt,
        ));
        self.dispatch(&parsed, host);
    }

    fn dispatch<H: Host>(&mut self, parsed: &ParsedLine, host: &mut H) {
        let ctx = CommandContext {
            args: &parsed.args,
            arg1: parsed.arg1.as_deref(),
        };
        match Command::from_name(&parsed.name) {
            Command::Help => self.help(host),
            Command::Clear => host.clear_output(),
            Command::Whoami => {
                let profile = &self.config.profile;
                host.print_line(&OutputLine::plain(format!("> {}", profile.name)));
                host.print_line(&OutputLine::plain(format!("> {}", profile.title)));
            }
            Command::Ascii => {
                for row in LOGO {
                    host.print_line(&OutputLine::new(row, LineStyle::Accent));
                }
            }
            Command::Ls => {
                for file in FILES {
                    host.print_line(&OutputLine::new(file, LineStyle::Accent));
                }
            }
            Command::Open => self.open(&ctx, host),
            Command::Sys => self.sys(host),
            Command::Ip => {
                host.print_line(&OutputLine::plain(">> SCANNING_NETWORK_NODE..."));
                host.print_line(&OutputLine::new(
                    format!(">> CLIENT_DATA: {}", self.visitor_log()),
                    LineStyle::Success,
                ));
            }
            Command::Weather => self.weather(host),
            Command::Socials => self.socials(host),
            Command::Cv => {
                host.print_line(&OutputLine::plain(">> RETRIEVING_SECURE_FILE..."));
                self.defer(Deferred::Download, self.config.shell.download_delay_ms);
            }
            Command::Theme => {
                self.theme = Theme::from_arg(ctx.arg1);
                host.apply_theme(self.theme);
                host.print_line(&OutputLine::plain(format!(
                    ">> Theme set to: {}",
                    self.theme.label()
                )));
            }
            Command::Ping => {
                let probe = Probe::Ping {
                    host: ctx.arg1.unwrap_or("127.0.0.1").to_string(),
                    count: self.config.shell.ping_count,
                };
                self.start_probe(probe, self.config.shell.ping_period_ms, host);
            }
            Command::Calc => self.calc(&ctx, host),
            Command::Hack => {
                let probe = Probe::Hack {
                    target: ctx.arg1.unwrap_or("mainframe").to_string(),
                    attempts: self.config.shell.hack_attempts,
                };
                self.start_probe(probe, self.config.shell.hack_period_ms, host);
            }
            Command::Matrix => {
                host.print_line(&OutputLine::plain(">> INITIATING_OVERRIDE..."));
                host.toggle_matrix();
            }
            Command::Game => self.start_game(host),
            Command::Uplink => self.uplink(host),
            Command::Panic => {
                host.print_line(&OutputLine::error(
                    "KERNEL PANIC: VFS: Unable to mount root fs on unknown-block(0,0)",
                ));
                host.print_line(&OutputLine::error(
                    "CPU: 0 PID: 1 Comm: init Not tainted 4.1.2 #1",
                ));
                self.defer(Deferred::CrashScreen, self.config.shell.panic_delay_ms);
            }
            Command::Reboot => {
                host.print_line(&OutputLine::plain(">> SYSTEM REBOOT INITIATED..."));
                self.defer(Deferred::Reload, self.config.shell.reboot_delay_ms);
            }
            Command::Exit => {
                self.visible = false;
                host.set_console_visible(false);
            }
            Command::Unknown(name) => {
                host.print_line(&OutputLine::error(format!(
                    "Command not found: {name}. Type 'help'."
                )));
            }
        }
    }

    fn help<H: Host>(&self, host: &mut H) {
        for (usage, description) in HELP_ENTRIES {
            host.print_line(&OutputLine::plain(format!("{usage:<14} {description}")));
        }
    }

    fn open<H: Host>(&mut self, ctx: &CommandContext<'_>, host: &mut H) {
        let Some(arg) = ctx.arg1 else {
            host.print_line(&OutputLine::error("Usage: open [filename]"));
            return;
        };
        match Section::find_in(arg) {
            Some(section) => {
                host.scroll_to_section(section);
                host.print_line(&OutputLine::plain(format!(
                    ">> Opening {}...",
                    section.name()
                )));
            }
            None => host.print_line(&OutputLine::error(format!("File '{arg}' not found."))),
        }
    }

    fn sys<H: Host>(&self, host: &mut H) {
        let info = host.system_info();
        let rows = [
            "USER: visitor@guest".to_string(),
            format!("OS: {}", info.platform),
            format!("RES: {}", info.resolution),
            format!("CORES: {}", info.cores),
            format!("BROWSER: {}", info.agent),
        ];
        for row in rows {
            host.print_line(&OutputLine::new(
                format!("██████████████   {row}"),
                LineStyle::Accent,
            ));
        }
    }

    fn socials<H: Host>(&self, host: &mut H) {
        let profile = &self.config.profile;
        host.print_line(&OutputLine::plain(">> ESTABLISHING_LINK_CHANNELS:"));
        for (label, target) in [
            ("GITHUB", profile.github.clone()),
            ("LINKEDIN", profile.linkedin.clone()),
            ("EMAIL_UPLINK", format!("mailto:{}", profile.email)),
        ] {
            host.print_line(&OutputLine::plain(format!(" - {label:<13}{target}")));
        }
    }

    fn calc<H: Host>(&mut self, ctx: &CommandContext<'_>, host: &mut H) {
        if ctx.args.is_empty() {
            host.print_line(&OutputLine::error(
                "Usage: calc [expression] (e.g. calc 5+5)",
            ));
            return;
        }
        let expr = ctx.args.concat();
        match evaluate(&expr) {
            Ok(value) => host.print_line(&OutputLine::plain(format!(
                ">> RESULT: {}",
                format_result(value)
            ))),
            Err(err) => {
                debug!(expr, error = %err, "calc rejected");
                host.print_line(&OutputLine::error(format!(">> MATH_ERROR: {err}")));
            }
        }
    }

    fn weather<H: Host>(&mut self, host: &mut H) {
        let Geo { lat, long, city } = self.geo.clone();
        host.print_line(&OutputLine::plain(format!(
            ">> SCANNING ATMOSPHERE AT [{lat:.2}, {long:.2}]..."
        )));
        // Yield: the lookup completes on the next scheduler pass.
        self.defer(Deferred::Weather { lat, long, city }, 0);
    }

    fn uplink<H: Host>(&mut self, host: &mut H) {
        match self.store.active_lock(SUBMISSION_LOCK_KEY) {
            Some(lock) => {
                let remaining = Duration::from_millis(lock.remaining_ms).as_secs();
                host.print_line(&OutputLine::error(format!(
                    ">> UPLINK_LOCKED. COOLDOWN: {}m {:02}s REMAINING.",
                    remaining / 60,
                    remaining % 60
                )));
            }
            None => host.print_line(&OutputLine::new(">> UPLINK_READY.", LineStyle::Success)),
        }
    }

    fn start_probe<H: Host>(&mut self, probe: Probe, period_ms: u64, host: &mut H) {
        host.print_line(&probe.banner());
        let id = self.scheduler.spawn(Job::Probe(probe), period_ms, self.now_ms);
        debug!(task = id, period_ms, "probe started");
    }

    fn start_game<H: Host>(&mut self, host: &mut H) {
        if self.game.is_some() {
            debug!("game already active");
            return;
        }
        self.game = Some(RunnerGame::new(self.config.game.clone()));
        self.view = View::Game;
        host.show_view(View::Game);
        let id = self
            .scheduler
            .spawn(Job::GameFrame, self.config.game.tick_ms, self.now_ms);
        debug!(task = id, "game started");
    }

    fn defer(&mut self, deferred: Deferred, delay_ms: u64) -> TaskId {
        self.scheduler
            .spawn(Job::Deferred(deferred), delay_ms, self.now_ms)
    }

    fn run_job<H: Host>(&mut self, id: TaskId, job: &Job, tick: u32, host: &mut H) -> TickResult {
        match job {
            Job::Probe(probe) => {
                let mut rng = tick_rng(self.seed, id, tick);
                let outcome = probe.tick(tick, &mut rng);
                for line in &outcome.lines {
                    host.print_line(line);
                }
                if outcome.finished {
                    TickResult::Done
                } else {
                    TickResult::Continue
                }
            }
            Job::GameFrame => self.game_frame(host),
            Job::GameOver => {
                let score = self.game.take().map_or(0, |game| game.score());
                self.view = View::Transcript;
                host.show_view(View::Transcript);
                host.print_line(&OutputLine::plain(format!(">> GAME_OVER. SCORE: {score}")));
                TickResult::Done
            }
            Job::Deferred(deferred) => {
                self.run_deferred(deferred, host);
                TickResult::Done
            }
        }
    }

    fn game_frame<H: Host>(&mut self, host: &mut H) -> TickResult {
        let now = self.now_ms;
        let Some(frame) = self.game.as_mut().and_then(|game| game.tick(now)) else {
            return TickResult::Done;
        };
        host.render_game(&frame);
        if frame.crashed {
            debug!(score = frame.score, "game crashed");
            self.scheduler
                .spawn(Job::GameOver, self.config.game.game_over_delay_ms, now);
            return TickResult::Done;
        }
        TickResult::Continue
    }

    fn run_deferred<H: Host>(&mut self, deferred: &Deferred, host: &mut H) {
        match deferred {
            Deferred::Download => {
                let profile = &self.config.profile;
                host.trigger_download(&profile.resume_path, &profile.resume_filename);
                host.print_line(&OutputLine::new(">> DOWNLOAD_INITIATED.", LineStyle::Pulse));
            }
            Deferred::Weather { lat, long, city } => {
                match host.fetch_current_weather(*lat, *long) {
                    Ok(weather) => {
                        host.print_line(&OutputLine::plain(format!(
                            ">> LOC: {}",
                            city.to_uppercase()
                        )));
                        host.print_line(&OutputLine::plain(format!(
                            ">> TEMP: {}°C",
                            weather.temperature
                        )));
                        host.print_line(&OutputLine::plain(format!(
                            ">> WIND: {} km/h",
                            weather.wind_speed
                        )));
                    }
                    Err(err) => {
                        warn!(error = %err, "weather lookup failed");
                        host.print_line(&OutputLine::error(">> ERROR: SENSOR_OFFLINE."));
                    }
                }
            }
            Deferred::CrashScreen => {
                host.show_crash_screen();
                self.defer(Deferred::Reload, self.config.shell.crash_screen_ms);
            }
            Deferred::Reload => host.reload(),
        }
    }
}
