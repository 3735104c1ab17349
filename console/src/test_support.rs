//! Test-only helpers for building stores, shells and mailers.

use std::sync::Arc;

use crate::contact::{ContactMessage, Mailer, Template};
use crate::io::backend::{Backend, MemoryBackend};
use crate::io::clock::ManualClock;
use crate::io::config::ConsoleConfig;
use crate::io::host::CollaboratorError;
use crate::shell::Shell;
use crate::store::ReplicatedStore;

/// Backend names in store order.
pub const BACKEND_NAMES: [&str; 3] = ["session", "persistent", "cookie"];

/// Store over three in-memory backends with the host keys registered.
///
/// The returned backends share storage with the store, so tests can wipe,
/// poke or disable them behind the store's back.
pub fn memory_store(now_ms: u64) -> (ReplicatedStore, Vec<MemoryBackend>, ManualClock) {
    let clock = ManualClock::new(now_ms);
    let backends: Vec<MemoryBackend> = BACKEND_NAMES.into_iter().map(MemoryBackend::new).collect();
    let boxed = backends
        .iter()
        .map(|backend| Box::new(backend.clone()) as Box<dyn Backend>)
        .collect();
    let store = ReplicatedStore::new(boxed, Arc::new(clock.clone()))
        .with_host_keys(&ConsoleConfig::default());
    (store, backends, clock)
}

/// Config with a fixed seed so ticking output is reproducible.
pub fn seeded_config(seed: u64) -> ConsoleConfig {
    let mut cfg = ConsoleConfig::default();
    cfg.shell.seed = Some(seed);
    cfg
}

/// Shell over [`memory_store`] with a fixed seed.
pub fn test_shell(now_ms: u64) -> (Shell, Vec<MemoryBackend>, ManualClock) {
    let (store, backends, clock) = memory_store(now_ms);
    let shell = Shell::new(seeded_config(7), store, now_ms);
    (shell, backends, clock)
}

/// Mailer that records templates instead of sending.
#[derive(Debug, Default)]
pub struct ScriptedMailer {
    pub sent: Vec<Template>,
    pub messages: Vec<ContactMessage>,
    fail: bool,
}

impl ScriptedMailer {
    /// Mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl Mailer for ScriptedMailer {
    fn send(
        &mut self,
        template: Template,
        message: &ContactMessage,
    ) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Failed("scripted failure".to_string()));
        }
        self.sent.push(template);
        self.messages.push(message.clone());
        Ok(())
    }
}
