//! "Hacker Run": a one-button reflex game rendered as two text rows.
//!
//! An obstacle scrolls left along a fixed track and wraps to the spawn
//! position. The player occupies a fixed slot and can jump for a fixed time.
//! Meeting the obstacle on the ground ends the run.

use serde::{Deserialize, Serialize};

const PLAYER: char = '웃';
const OBSTACLE: char = '█';
const FLOOR: char = '_';
const CRASH_BANNER: &str = ">> SYSTEM_CRASH.";

/// Tunables for a run. Loaded from the `[game]` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameRules {
    /// Number of cells per row.
    pub track_len: usize,
    /// Fixed horizontal cell of the player.
    pub player_slot: usize,
    /// Cell the obstacle starts from and wraps back to.
    pub spawn: usize,
    /// Frame period.
    pub tick_ms: u64,
    /// How long a jump keeps the player in the air.
    pub jump_ms: u64,
    /// Pause between the crash frame and returning to the transcript.
    pub game_over_delay_ms: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            track_len: 30,
            player_slot: 3,
            spawn: 28,
            tick_ms: 80,
            jump_ms: 400,
            game_over_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Running,
    Crashed,
}

/// One rendered frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub sky: String,
    pub ground: String,
    pub score: u32,
    pub crashed: bool,
}

impl Frame {
    /// Screen text: sky row, ground row and the crash banner when over.
    pub fn screen(&self) -> String {
        if self.crashed {
            format!("{}\n{}\n\n{}", self.sky, self.ground, CRASH_BANNER)
        } else {
            format!("{}\n{}", self.sky, self.ground)
        }
    }

    pub fn scoreboard(&self) -> String {
        format!("SCORE: {:03}", self.score)
    }
}

#[derive(Debug, Clone)]
pub struct RunnerGame {
    rules: GameRules,
    state: GameState,
    obstacle: usize,
    airborne_until: Option<u64>,
    score: u32,
}

impl RunnerGame {
    pub fn new(rules: GameRules) -> Self {
        let obstacle = rules.spawn;
        Self {
            rules,
            state: GameState::Running,
            obstacle,
            airborne_until: None,
            score: 0,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn obstacle(&self) -> usize {
        self.obstacle
    }

    pub fn is_airborne(&self, now_ms: u64) -> bool {
        self.airborne_until.is_some_and(|until| now_ms < until)
    }

    /// Start a jump if running and on the ground. Returns whether it took.
    pub fn press_jump(&mut self, now_ms: u64) -> bool {
        if self.state != GameState::Running || self.is_airborne(now_ms) {
            return false;
        }
        self.airborne_until = Some(now_ms + self.rules.jump_ms);
        true
    }

    /// Advance one frame. Returns `None` once crashed.
    pub fn tick(&mut self, now_ms: u64) -> Option<Frame> {
        if self.state == GameState::Crashed {
            return None;
        }
        if !self.is_airborne(now_ms) {
            self.airborne_until = None;
        }

        self.score += 1;
        self.obstacle = match self.obstacle {
            0 => self.rules.spawn,
            pos => pos - 1,
        };

        let grounded = !self.is_airborne(now_ms);
        if grounded && self.obstacle == self.rules.player_slot {
            self.state = GameState::Crashed;
        }
        Some(self.render(grounded))
    }

    fn render(&self, grounded: bool) -> Frame {
        let slot = self.rules.player_slot;
        let sky: String = (0..self.rules.track_len)
            .map(|i| if i == slot && !grounded { PLAYER } else { ' ' })
            .collect();
        let ground: String = (0..self.rules.track_len)
            .map(|i| {
                if i == self.obstacle {
                    OBSTACLE
                } else if i == slot && grounded {
                    PLAYER
                } else {
                    FLOOR
                }
            })
            .collect();
        Frame {
            sky,
            ground,
            score: self.score,
            crashed: self.state == GameState::Crashed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: u64 = 80;

    /// Tick until the obstacle sits one cell right of the player.
    fn run_until_adjacent(game: &mut RunnerGame) -> u64 {
        let mut now = 0;
        while game.obstacle() != game.rules().player_slot + 1 {
            now += TICK;
            game.tick(now).expect("running");
        }
        now
    }

    #[test]
    fn grounded_collision_crashes_and_stops_ticking() {
        let mut game = RunnerGame::new(GameRules::default());
        let now = run_until_adjacent(&mut game);

        let frame = game.tick(now + TICK).expect("crash frame");
        assert!(frame.crashed);
        assert_eq!(game.state(), GameState::Crashed);
        assert_eq!(game.tick(now + 2 * TICK), None);
        assert!(frame.screen().ends_with(">> SYSTEM_CRASH."));
    }

    #[test]
    fn jump_clears_the_obstacle() {
        let mut game = RunnerGame::new(GameRules::default());
        let now = run_until_adjacent(&mut game);

        assert!(game.press_jump(now));
        let frame = game.tick(now + TICK).expect("frame");
        assert!(!frame.crashed);
        assert_eq!(game.state(), GameState::Running);
        assert_eq!(frame.sky.chars().nth(3), Some('웃'));
        assert_eq!(frame.ground.chars().nth(3), Some('█'));
    }

    #[test]
    fn jump_auto_clears_after_duration() {
        let mut game = RunnerGame::new(GameRules::default());
        assert!(game.press_jump(0));
        assert!(!game.press_jump(100));
        assert!(game.is_airborne(399));
        assert!(!game.is_airborne(400));
        assert!(game.press_jump(400));
    }

    #[test]
    fn obstacle_wraps_to_spawn() {
        let rules = GameRules {
            spawn: 5,
            player_slot: 20,
            ..GameRules::default()
        };
        let mut game = RunnerGame::new(rules);
        let mut seen = Vec::new();
        for i in 1..=7 {
            game.tick(i * TICK).expect("running");
            seen.push(game.obstacle());
        }
        assert_eq!(seen, vec![4, 3, 2, 1, 0, 5, 4]);
    }

    #[test]
    fn frame_rows_are_fixed_width() {
        let mut game = RunnerGame::new(GameRules::default());
        let frame = game.tick(TICK).expect("frame");
        assert_eq!(frame.sky.chars().count(), 30);
        assert_eq!(frame.ground.chars().count(), 30);
        assert_eq!(frame.scoreboard(), "SCORE: 001");
    }
}
