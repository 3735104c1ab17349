//! Shared application state for the console server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use site_console::io::clock::Clock;
use site_console::io::config::ConsoleConfig;
use site_console::io::host::{BufferedHost, HostEvent};
use site_console::shell::Shell;
use site_console::store::ReplicatedStore;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// Longest the ticker sleeps, so tasks spawned by requests start on time.
const MAX_TICK_WAIT: Duration = Duration::from_millis(250);

/// Events broadcast to SSE clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Something the shell asked the page to do.
    Host(HostEvent),
    /// A store file changed on disk and was re-reconciled.
    StoreChanged { file: String },
}

/// Shared state accessible from all request handlers.
///
/// The server hosts one console session; every client sees the same shell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConsoleConfig>,
    pub clock: Arc<dyn Clock>,
    pub shell: Arc<Mutex<Shell>>,
    /// Broadcast sender for host and store events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
}

impl AppState {
    pub fn new(config: ConsoleConfig, clock: Arc<dyn Clock>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let store = ReplicatedStore::from_config(&config, clock.clone());
        let shell = Shell::new(config.clone(), store, clock.now_ms());
        Self {
            config: Arc::new(config),
            clock,
            shell: Arc::new(Mutex::new(shell)),
            event_tx: Arc::new(event_tx),
        }
    }

    /// Directory holding the file-backed store and the outbox.
    pub fn store_dir(&self) -> PathBuf {
        self.config.store_dir.clone()
    }

    /// Run `f` against the shell after catching up on due tasks, then
    /// broadcast and return every host event produced.
    pub async fn with_shell<R>(
        &self,
        f: impl FnOnce(&mut Shell, &mut BufferedHost) -> R,
    ) -> (R, Vec<HostEvent>) {
        let mut shell = self.shell.lock().await;
        let mut host = BufferedHost::new();
        shell.advance(self.clock.now_ms(), &mut host);
        let out = f(&mut shell, &mut host);
        let events = host.drain();
        for event in &events {
            // No subscribers is fine; the HTTP response carries the events too.
            let _ = self.event_tx.send(ChangeEvent::Host(event.clone()));
        }
        (out, events)
    }

    /// How long the ticker may sleep before the next task is due.
    pub async fn tick_wait(&self) -> Duration {
        let next_due = self.shell.lock().await.next_due_ms();
        match next_due {
            Some(due) => {
                Duration::from_millis(due.saturating_sub(self.clock.now_ms())).min(MAX_TICK_WAIT)
            }
            None => MAX_TICK_WAIT,
        }
    }
}

/// Drive scheduled shell tasks in the background.
pub fn start_ticker(state: AppState) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(state.tick_wait().await).await;
            let ((), events) = state.with_shell(|_, _| ()).await;
            if !events.is_empty() {
                debug!(count = events.len(), "ticker emitted events");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_console::io::clock::ManualClock;

    fn state(dir: &std::path::Path, clock: &ManualClock) -> AppState {
        let mut config = ConsoleConfig::default();
        config.store_dir = dir.to_path_buf();
        config.shell.seed = Some(3);
        AppState::new(config, Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn with_shell_catches_up_and_broadcasts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let clock = ManualClock::new(0);
        let state = state(temp.path(), &clock);
        let mut rx = state.event_tx.subscribe();

        state.with_shell(|shell, host| shell.submit("cv", host)).await;
        clock.set(800);
        let ((), events) = state.with_shell(|_, _| ()).await;
        assert!(events
            .iter()
            .any(|event| matches!(event, HostEvent::Download { .. })));

        let mut broadcast = Vec::new();
        while let Ok(event) = rx.try_recv() {
            broadcast.push(event);
        }
        assert!(broadcast
            .iter()
            .any(|event| matches!(event, ChangeEvent::Host(HostEvent::Download { .. }))));
    }

    #[tokio::test]
    async fn tick_wait_is_capped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let clock = ManualClock::new(0);
        let state = state(temp.path(), &clock);
        assert_eq!(state.tick_wait().await, MAX_TICK_WAIT);

        state.with_shell(|shell, host| shell.submit("game", host)).await;
        assert_eq!(state.tick_wait().await, Duration::from_millis(80));
    }
}
