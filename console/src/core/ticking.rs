//! Fixed-period cooperative scheduling and the simulated network probes.
//!
//! The scheduler never runs anything itself. The owner pops due tasks in due
//! order, checks the cancellation flag, runs one tick and hands the task back
//! if it wants another one. That keeps the clock and all side effects with
//! the owner and makes every interleaving reproducible in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::{LineStyle, OutputLine};

pub type TaskId = u64;

/// A cooperatively scheduled unit of repeated work.
#[derive(Debug, Clone)]
pub struct TickingTask<J> {
    pub id: TaskId,
    pub job: J,
    pub cancelled: bool,
    /// Ticks already run. Incremented by the owner before each tick.
    pub tick_count: u32,
    pub period_ms: u64,
    pub next_due_ms: u64,
}

/// Pending tasks ordered by due time, ties broken by spawn order.
#[derive(Debug)]
pub struct Scheduler<J> {
    next_id: TaskId,
    tasks: Vec<TickingTask<J>>,
}

impl<J> Default for Scheduler<J> {
    fn default() -> Self {
        Self {
            next_id: 1,
            tasks: Vec::new(),
        }
    }
}

impl<J> Scheduler<J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `job` to first run one `period_ms` after `now_ms`.
    pub fn spawn(&mut self, job: J, period_ms: u64, now_ms: u64) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(TickingTask {
            id,
            job,
            cancelled: false,
            tick_count: 0,
            period_ms,
            next_due_ms: now_ms + period_ms,
        });
        id
    }

    /// Flag every live task whose job matches; flagged tasks are dropped when
    /// they next come due. Returns how many were flagged.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&J) -> bool) -> usize {
        let mut flagged = 0;
        for task in self.tasks.iter_mut().filter(|task| !task.cancelled) {
            if pred(&task.job) {
                task.cancelled = true;
                flagged += 1;
            }
        }
        flagged
    }

    /// Remove and return the earliest task due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TickingTask<J>> {
        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.next_due_ms <= now_ms)
            .min_by_key(|(_, task)| (task.next_due_ms, task.id))
            .map(|(idx, _)| idx)?;
        Some(self.tasks.swap_remove(idx))
    }

    /// Put a task back for its next period.
    pub fn reschedule(&mut self, mut task: TickingTask<J>) {
        task.next_due_ms += task.period_ms;
        self.tasks.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.tasks.iter().map(|task| task.next_due_ms).min()
    }
}

/// Fresh generator for one tick of one task.
pub fn tick_rng(seed: u64, task: TaskId, tick: u32) -> StdRng {
    let mixed = seed
        ^ task.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ u64::from(tick).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    StdRng::seed_from_u64(mixed)
}

/// Simulated network commands that print one line per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Latency probe: `count` replies, then statistics.
    Ping { host: String, count: u32 },
    /// Brute-force theatre: `attempts` failed keys, then a verdict.
    Hack { target: String, attempts: u32 },
}

/// Lines produced by one probe tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTick {
    pub lines: Vec<OutputLine>,
    pub finished: bool,
}

impl Probe {
    /// Line printed when the command is submitted.
    pub fn banner(&self) -> OutputLine {
        match self {
            Probe::Ping { host, .. } => OutputLine::plain(format!(">> PING {host} (32 bytes):")),
            Probe::Hack { target, .. } => OutputLine::plain(format!(
                ">> INITIATING BRUTE FORCE ON [{}]...",
                target.to_uppercase()
            )),
        }
    }

    /// Run tick number `tick` (1-based).
    pub fn tick(&self, tick: u32, rng: &mut impl Rng) -> ProbeTick {
        match self {
            Probe::Ping { host, count } => {
                let time: u32 = rng.gen_range(10..50);
                let mut lines = vec![OutputLine::plain(format!(
                    "Reply from {host}: bytes=32 time={time}ms TTL=54"
                ))];
                let finished = tick >= *count;
                if finished {
                    lines.push(OutputLine::plain(format!(
                        ">> Ping statistics for {host}: Packets: Sent = {count}, Received = {count}, Loss = 0%"
                    )));
                }
                ProbeTick { lines, finished }
            }
            Probe::Hack { attempts, .. } => {
                let key: u32 = rng.r#gen();
                let mut lines = vec![OutputLine::plain(format!(
                    "> KEY_ATTEMPT: 0x{key:08x}... FAIL"
                ))];
                let finished = tick >= *attempts;
                if finished {
                    let roll: f64 = rng.r#gen();
                    lines.push(if roll > 0.3 {
                        OutputLine::new(
                            ">> ACCESS GRANTED. ROOT PRIVILEGES ACQUIRED.",
                            LineStyle::Pulse,
                        )
                    } else {
                        OutputLine::error(">> ACCESS DENIED. FIREWALL TRIGGERED.")
                    });
                }
                ProbeTick { lines, finished }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order_then_spawn_order() {
        let mut scheduler = Scheduler::new();
        let slow = scheduler.spawn("slow", 500, 0);
        let fast = scheduler.spawn("fast", 400, 0);
        let tie = scheduler.spawn("tie", 500, 0);

        assert!(scheduler.pop_due(399).is_none());
        assert_eq!(scheduler.pop_due(1000).map(|t| t.id), Some(fast));
        assert_eq!(scheduler.pop_due(1000).map(|t| t.id), Some(slow));
        assert_eq!(scheduler.pop_due(1000).map(|t| t.id), Some(tie));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn reschedule_advances_by_period() {
        let mut scheduler = Scheduler::new();
        scheduler.spawn((), 500, 100);
        let task = scheduler.pop_due(600).expect("due");
        assert_eq!(task.next_due_ms, 600);
        scheduler.reschedule(task);
        assert_eq!(scheduler.next_due_ms(), Some(1100));
    }

    #[test]
    fn cancellation_is_a_flag_not_a_removal() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.spawn("ping", 500, 0);
        scheduler.spawn("cv", 800, 0);
        assert_eq!(scheduler.cancel_where(|job| *job == "ping"), 1);
        assert_eq!(scheduler.cancel_where(|job| *job == "ping"), 0);
        let task = scheduler.pop_due(500).expect("still due");
        assert_eq!(task.id, id);
        assert!(task.cancelled);
        assert!(!scheduler.is_empty());
    }

    #[test]
    fn ping_finishes_after_count_with_statistics() {
        let probe = Probe::Ping {
            host: "10.0.0.1".to_string(),
            count: 4,
        };
        let early = probe.tick(3, &mut tick_rng(7, 1, 3));
        assert!(!early.finished);
        assert_eq!(early.lines.len(), 1);
        assert!(early.lines[0].content.starts_with("Reply from 10.0.0.1"));

        let last = probe.tick(4, &mut tick_rng(7, 1, 4));
        assert!(last.finished);
        assert!(last.lines[1].content.contains("Sent = 4, Received = 4"));
    }

    #[test]
    fn hack_prints_eight_hex_digits_and_a_verdict() {
        let probe = Probe::Hack {
            target: "mainframe".to_string(),
            attempts: 6,
        };
        assert!(probe.banner().content.contains("[MAINFRAME]"));
        let last = probe.tick(6, &mut tick_rng(1, 2, 6));
        assert!(last.finished);
        let attempt = &last.lines[0].content;
        let hex = attempt
            .trim_start_matches("> KEY_ATTEMPT: 0x")
            .trim_end_matches("... FAIL");
        assert_eq!(hex.len(), 8);
        assert!(last.lines[1].content.starts_with(">> ACCESS"));
    }

    #[test]
    fn tick_rng_is_reproducible_per_tick() {
        let a: u64 = tick_rng(42, 3, 1).r#gen();
        let b: u64 = tick_rng(42, 3, 1).r#gen();
        let c: u64 = tick_rng(42, 3, 2).r#gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
