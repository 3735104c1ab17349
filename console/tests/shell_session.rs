//! Session-level tests for the interactive shell.
//!
//! Each test drives a [`Shell`] through [`BufferedHost`] and asserts on the
//! recorded host events, advancing virtual time explicitly.

use site_console::core::game::GameState;
use site_console::core::history::Cursor;
use site_console::core::theme::Theme;
use site_console::core::types::{Key, LineStyle, OutputLine, Section, View};
use site_console::io::host::{BufferedHost, HostEvent};
use site_console::shell::Shell;
use site_console::store::SUBMISSION_LOCK_KEY;
use site_console::test_support::test_shell;

fn shell() -> (Shell, BufferedHost) {
    let (shell, _backends, _clock) = test_shell(0);
    (shell, BufferedHost::new())
}

fn recalled(host: &mut BufferedHost) -> Vec<String> {
    host.drain()
        .into_iter()
        .filter_map(|event| match event {
            HostEvent::Input { text } => Some(text),
            _ => None,
        })
        .collect()
}

#[test]
fn history_walks_back_and_forth() {
    let (mut shell, mut host) = shell();
    for line in ["a", "b", "c"] {
        shell.submit(line, &mut host);
    }
    host.drain();

    for _ in 0..3 {
        shell.key(Key::Up, &mut host);
    }
    for _ in 0..3 {
        shell.key(Key::Down, &mut host);
    }
    assert_eq!(recalled(&mut host), vec!["c", "b", "a", "b", "c", ""]);
    assert_eq!(shell.history().cursor(), Cursor::At(3));
}

#[test]
fn up_clamps_at_oldest_and_submit_resets_cursor() {
    let (mut shell, mut host) = shell();
    shell.submit("only", &mut host);
    host.drain();
    shell.key(Key::Up, &mut host);
    shell.key(Key::Up, &mut host);
    assert_eq!(recalled(&mut host), vec!["only", "only"]);

    shell.submit("next", &mut host);
    assert_eq!(shell.history().cursor(), Cursor::Idle);
    assert_eq!(shell.history().entries(), ["only", "next"]);
}

#[test]
fn navigation_on_empty_history_does_nothing() {
    let (mut shell, mut host) = shell();
    shell.key(Key::Up, &mut host);
    shell.key(Key::Down, &mut host);
    assert!(host.events().is_empty());
}

#[test]
fn recalled_line_can_be_resubmitted() {
    let (mut shell, mut host) = shell();
    shell.submit("calc 1+1", &mut host);
    shell.key(Key::Up, &mut host);
    assert_eq!(shell.input(), "calc 1+1");
    shell.key(Key::Enter, &mut host);
    assert_eq!(shell.history().len(), 2);
    let results: Vec<String> = host
        .contents()
        .into_iter()
        .filter(|line| line.starts_with(">> RESULT"))
        .collect();
    assert_eq!(results, vec![">> RESULT: 2", ">> RESULT: 2"]);
}

#[test]
fn command_names_are_case_insensitive_and_unknowns_report() {
    let (mut shell, mut host) = shell();
    shell.submit("LS", &mut host);
    shell.submit("frobnicate now", &mut host);
    let contents = host.contents();
    assert!(contents.contains(&"about.txt".to_string()));
    assert_eq!(
        host.lines().last().map(|line| (*line).clone()),
        Some(OutputLine::error("Command not found: frobnicate. Type 'help'."))
    );
}

#[test]
fn calc_joins_arguments_and_reports_errors() {
    let (mut shell, mut host) = shell();
    shell.submit("calc 2 + 3 * 4", &mut host);
    shell.submit("calc 7/2", &mut host);
    shell.submit("calc rm -rf", &mut host);
    shell.submit("calc", &mut host);
    let answers: Vec<String> = host
        .lines()
        .into_iter()
        .filter(|line| line.style != LineStyle::Prompt)
        .map(|line| line.content.clone())
        .collect();
    assert_eq!(
        answers,
        vec![
            ">> RESULT: 14",
            ">> RESULT: 3.5",
            ">> MATH_ERROR: Invalid characters",
            "Usage: calc [expression] (e.g. calc 5+5)",
        ]
    );
}

#[test]
fn theme_and_open_reach_the_page() {
    let (mut shell, mut host) = shell();
    shell.submit("theme purple", &mut host);
    shell.submit("theme nonsense", &mut host);
    shell.submit("open work.json", &mut host);
    shell.submit("open secrets.db", &mut host);

    assert_eq!(shell.theme(), Theme::Green);
    let events = host.events();
    assert!(events.contains(&HostEvent::Theme {
        theme: Theme::Purple,
        accent: Theme::Purple.accent().to_string(),
    }));
    assert!(events.contains(&HostEvent::Scroll {
        section: Section::Work
    }));
    let contents = host.contents();
    assert!(contents.contains(&">> Theme set to: NEON_PURPLE".to_string()));
    assert!(contents.contains(&"File 'secrets.db' not found.".to_string()));
}

#[test]
fn cv_downloads_after_delay() {
    let (mut shell, mut host) = shell();
    shell.submit("cv", &mut host);
    shell.advance(799, &mut host);
    assert!(!host
        .events()
        .iter()
        .any(|event| matches!(event, HostEvent::Download { .. })));
    shell.advance(800, &mut host);
    assert!(host.events().contains(&HostEvent::Download {
        path: "resume/resume.pdf".to_string(),
        filename: "resume.pdf".to_string(),
    }));
    assert_eq!(
        host.contents().last().map(String::as_str),
        Some(">> DOWNLOAD_INITIATED.")
    );
}

#[test]
fn ticking_tasks_interleave_by_due_time() {
    let (mut shell, mut host) = shell();
    shell.submit("ping node", &mut host);
    shell.submit("hack vault", &mut host);
    host.drain();

    shell.advance(10_000, &mut host);
    let kinds: Vec<char> = host
        .contents()
        .iter()
        .map(|line| {
            if line.starts_with("Reply") {
                'R'
            } else if line.starts_with("> KEY_ATTEMPT") {
                'K'
            } else if line.starts_with(">> Ping statistics") {
                'S'
            } else {
                'V'
            }
        })
        .collect();
    // hack every 400ms (6 attempts), ping every 500ms (4 replies); ties go to
    // the task started first.
    assert_eq!(kinds.iter().collect::<String>(), "KRKRKRKRSKKV");
    assert!(shell.is_idle());
}

#[test]
fn ticking_output_is_reproducible_for_a_seed() {
    let run = || {
        let (mut shell, mut host) = shell();
        shell.submit("ping 10.0.0.1", &mut host);
        shell.advance(5_000, &mut host);
        host.contents()
    };
    assert_eq!(run(), run());
}

#[test]
fn interrupt_stops_probes_but_not_other_tasks() {
    let (mut shell, mut host) = shell();
    shell.submit("ping node", &mut host);
    shell.submit("cv", &mut host);
    shell.advance(1_000, &mut host);
    let replies_before = host
        .contents()
        .iter()
        .filter(|line| line.starts_with("Reply"))
        .count();
    assert_eq!(replies_before, 2);

    shell.key(Key::Interrupt, &mut host);
    assert_eq!(host.contents().last().map(String::as_str), Some("^C"));
    shell.advance(10_000, &mut host);

    let replies_after = host
        .contents()
        .iter()
        .filter(|line| line.starts_with("Reply"))
        .count();
    assert_eq!(replies_after, 2);
    assert!(host.contents().contains(&">> DOWNLOAD_INITIATED.".to_string()));
    assert!(shell.is_idle());
}

#[test]
fn game_crashes_then_returns_to_transcript() {
    let (mut shell, mut host) = shell();
    shell.submit("game", &mut host);
    assert_eq!(shell.view(), View::Game);
    assert!(host.events().contains(&HostEvent::View { view: View::Game }));

    // 25 frames bring the obstacle from 28 to the player at slot 3.
    shell.advance(1_999, &mut host);
    assert_eq!(shell.game_state(), Some(GameState::Running));
    shell.advance(2_000, &mut host);
    assert_eq!(shell.game_state(), Some(GameState::Crashed));
    let crash = host.events().iter().rev().find_map(|event| match event {
        HostEvent::Frame { frame } => Some(frame.clone()),
        _ => None,
    });
    let crash = crash.expect("frame");
    assert!(crash.crashed);
    assert_eq!(crash.score, 25);
    assert!(crash.screen().ends_with(">> SYSTEM_CRASH."));

    // Still crashed: starting a new game is ignored.
    shell.submit("game", &mut host);
    shell.advance(3_999, &mut host);
    assert_eq!(shell.view(), View::Game);

    shell.advance(4_000, &mut host);
    assert_eq!(shell.view(), View::Transcript);
    assert_eq!(shell.game_state(), None);
    assert_eq!(
        host.contents().last().map(String::as_str),
        Some(">> GAME_OVER. SCORE: 25")
    );
    assert!(shell.is_idle());
}

#[test]
fn jumping_over_the_obstacle_keeps_the_game_running() {
    let (mut shell, mut host) = shell();
    shell.submit("game", &mut host);
    shell.advance(1_700, &mut host);
    shell.key(Key::Jump, &mut host);
    shell.advance(2_500, &mut host);
    assert_eq!(shell.game_state(), Some(GameState::Running));
    assert!(!host.events().iter().any(|event| matches!(
        event,
        HostEvent::Frame { frame } if frame.crashed
    )));
}

#[test]
fn jump_without_a_game_is_ignored() {
    let (mut shell, mut host) = shell();
    shell.key(Key::Jump, &mut host);
    assert!(host.events().is_empty());
    assert!(shell.is_idle());
}

#[test]
fn reboot_reloads_after_delay() {
    let (mut shell, mut host) = shell();
    shell.submit("reboot", &mut host);
    shell.advance(1_499, &mut host);
    assert!(!host.events().contains(&HostEvent::Reload));
    shell.advance(1_500, &mut host);
    assert!(host.events().contains(&HostEvent::Reload));
}

#[test]
fn uplink_reports_cooldown_and_repairs_backends() {
    let (mut shell, backends, clock) = test_shell(1_000);
    let mut host = BufferedHost::new();
    backends[1].poke(SUBMISSION_LOCK_KEY, "91000");

    shell.submit("uplink", &mut host);
    assert_eq!(
        host.lines().last().map(|line| (*line).clone()),
        Some(OutputLine::error(
            ">> UPLINK_LOCKED. COOLDOWN: 1m 30s REMAINING."
        ))
    );
    for backend in &backends {
        assert_eq!(backend.peek(SUBMISSION_LOCK_KEY).as_deref(), Some("91000"));
    }

    clock.set(91_000);
    shell.submit("uplink", &mut host);
    assert_eq!(
        host.contents().last().map(String::as_str),
        Some(">> UPLINK_READY.")
    );
}

#[test]
fn runaway_calc_nesting_is_reported_and_shell_keeps_going() {
    let (mut shell, mut host) = shell();
    shell.submit(&format!("calc {}1", "(".repeat(100_000)), &mut host);
    assert_eq!(
        host.contents().last().map(String::as_str),
        Some(">> MATH_ERROR: Expression nested too deeply")
    );
    shell.submit("calc 1+1", &mut host);
    assert_eq!(
        host.contents().last().map(String::as_str),
        Some(">> RESULT: 2")
    );
}
