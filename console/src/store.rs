//! Replicated key/value store with read-repair.
//!
//! Every write fans out to all backends; every read reconciles what the
//! backends hold and writes the canonical value back to any that lag behind.
//! A single backend failing never fails an operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::reconcile::{KeyKind, Observation, parse_timestamp, reconcile};
use crate::io::backend::{Backend, FileBackend, MemoryBackend};
use crate::io::clock::Clock;
use crate::io::config::ConsoleConfig;

/// Boolean flag: has this client been seen before.
pub const RETURNING_VISITOR_KEY: &str = "returning_visitor";
/// Timestamp (ms) before which contact submissions are refused.
pub const SUBMISSION_LOCK_KEY: &str = "tx_lock";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no storage backend accepted the write for {key}")]
    AllBackendsUnavailable { key: String },
}

/// Reconciliation rule and repair lifetime for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub kind: KeyKind,
    pub ttl: Option<Duration>,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            kind: KeyKind::Flag,
            ttl: None,
        }
    }
}

/// Which backends took a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// A lock still in force, measured against one clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLock {
    pub until: u64,
    pub remaining_ms: u64,
}

pub struct ReplicatedStore {
    backends: Vec<Box<dyn Backend>>,
    policies: HashMap<String, KeyPolicy>,
    clock: Arc<dyn Clock>,
}

impl ReplicatedStore {
    pub fn new(backends: Vec<Box<dyn Backend>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backends,
            policies: HashMap::new(),
            clock,
        }
    }

    /// Build the configured backends and register the two host keys.
    pub fn from_config(cfg: &ConsoleConfig, clock: Arc<dyn Clock>) -> Self {
        let mut backends: Vec<Box<dyn Backend>> = Vec::new();
        if cfg.backends.session {
            backends.push(Box::new(MemoryBackend::new("session")));
        }
        if cfg.backends.persistent {
            backends.push(Box::new(FileBackend::persistent(&cfg.store_dir)));
        }
        if cfg.backends.cookie {
            backends.push(Box::new(FileBackend::expiring(&cfg.store_dir)));
        }
        Self::new(backends, clock).with_host_keys(cfg)
    }

    /// Register the returning-visitor flag and the submission lock.
    pub fn with_host_keys(self, cfg: &ConsoleConfig) -> Self {
        self.with_policy(
            RETURNING_VISITOR_KEY,
            KeyPolicy {
                kind: KeyKind::Flag,
                ttl: Some(Duration::from_secs(cfg.lock.flag_ttl_secs)),
            },
        )
        .with_policy(
            SUBMISSION_LOCK_KEY,
            KeyPolicy {
                kind: KeyKind::Timestamp,
                ttl: Some(cfg.cooldown()),
            },
        )
    }

    pub fn with_policy(mut self, key: &str, policy: KeyPolicy) -> Self {
        self.policies.insert(key.to_string(), policy);
        self
    }

    /// Policy for `key`; unregistered keys reconcile as flags without expiry.
    pub fn policy(&self, key: &str) -> KeyPolicy {
        self.policies.get(key).copied().unwrap_or_default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Canonical value of `key`, repairing lagging backends on the way.
    pub fn read(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let observations: Vec<Observation> = self
            .backends
            .iter()
            .map(|backend| match backend.read(key, now) {
                Ok(Some(value)) => Observation::Present(value),
                Ok(None) => Observation::Absent,
                Err(err) => {
                    warn!(backend = backend.name(), key, error = %err, "backend read failed");
                    Observation::Unavailable
                }
            })
            .collect();

        let policy = self.policy(key);
        let reconciled = reconcile(policy.kind, &observations)?;
        let expiry = expiry_ms(now, policy.ttl);
        for idx in reconciled.repair {
            let backend = &mut self.backends[idx];
            match backend.write(key, &reconciled.value, expiry) {
                Ok(()) => debug!(backend = backend.name(), key, "repaired divergent backend"),
                Err(err) => {
                    debug!(backend = backend.name(), key, error = %err, "repair skipped");
                }
            }
        }
        Some(reconciled.value)
    }

    /// Write `value` to every backend. Succeeds if at least one accepted.
    pub fn write(
        &mut self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<WriteReport, StoreError> {
        let expiry = expiry_ms(self.clock.now_ms(), ttl);
        let mut report = WriteReport::default();
        for backend in &mut self.backends {
            match backend.write(key, value, expiry) {
                Ok(()) => report.accepted.push(backend.name().to_string()),
                Err(err) => {
                    warn!(backend = backend.name(), key, error = %err, "backend write failed");
                    report.rejected.push(backend.name().to_string());
                }
            }
        }
        if report.accepted.is_empty() {
            return Err(StoreError::AllBackendsUnavailable {
                key: key.to_string(),
            });
        }
        Ok(report)
    }

    /// Lock on `lock_key` if its deadline lies in the future.
    pub fn active_lock(&mut self, lock_key: &str) -> Option<ActiveLock> {
        let until = parse_timestamp(&self.read(lock_key)?);
        let now = self.clock.now_ms();
        (until > now).then(|| ActiveLock {
            until,
            remaining_ms: until - now,
        })
    }

    /// Lock deadline for `lock_key` if it lies in the future.
    pub fn lock_until(&mut self, lock_key: &str) -> Option<u64> {
        self.active_lock(lock_key).map(|lock| lock.until)
    }

    pub fn is_locked(&mut self, lock_key: &str) -> bool {
        self.lock_until(lock_key).is_some()
    }
}

fn expiry_ms(now_ms: u64, ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|ttl| now_ms.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)))
}
