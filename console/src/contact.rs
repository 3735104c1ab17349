//! Contact submission gated by the replicated cooldown lock.
//!
//! The lock is advisory: it is read and written on this side only, so it
//! slows down a well-behaved client and nothing more.

use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::io::host::CollaboratorError;
use crate::store::{ReplicatedStore, SUBMISSION_LOCK_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    /// Visitor location line, attached for the site owner.
    pub visitor_log: String,
    pub timestamp: String,
}

impl ContactMessage {
    pub fn new(name: &str, email: &str, message: &str, visitor_log: &str, now_ms: u64) -> Self {
        let timestamp = i64::try_from(now_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            visitor_log: visitor_log.to_string(),
            timestamp,
        }
    }
}

/// Which mail goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// Notification to the site owner.
    Admin,
    /// Confirmation back to the sender.
    AutoReply,
}

/// Outbound mail delivery.
pub trait Mailer {
    fn send(&mut self, template: Template, message: &ContactMessage)
    -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered. `lock_persisted` is false when no backend took the lock.
    Sent { unlock_at: u64, lock_persisted: bool },
    /// Refused before contacting the mailer.
    Locked { until: u64 },
    /// Mailer failed; the lock is untouched so the sender can retry.
    Failed { error: CollaboratorError },
}

/// Submit `message` unless the cooldown lock is active.
pub fn submit<M: Mailer>(
    store: &mut ReplicatedStore,
    mailer: &mut M,
    message: &ContactMessage,
    cooldown: Duration,
) -> SubmitOutcome {
    if let Some(until) = store.lock_until(SUBMISSION_LOCK_KEY) {
        info!(until, "submission refused: uplink locked");
        return SubmitOutcome::Locked { until };
    }

    if let Err(error) = mailer.send(Template::Admin, message) {
        warn!(error = %error, "contact delivery failed");
        return SubmitOutcome::Failed { error };
    }

    let cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
    let unlock_at = store.now_ms().saturating_add(cooldown_ms);
    let lock_persisted = match store.write(SUBMISSION_LOCK_KEY, &unlock_at.to_string(), Some(cooldown))
    {
        Ok(_) => true,
        Err(err) => {
            warn!(error = %err, "lock not persisted; continuing");
            false
        }
    };

    if let Err(error) = mailer.send(Template::AutoReply, message) {
        warn!(error = %error, "auto-reply failed");
    }

    info!(unlock_at, lock_persisted, "contact submitted");
    SubmitOutcome::Sent {
        unlock_at,
        lock_persisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedMailer, memory_store};

    const COOLDOWN: Duration = Duration::from_secs(30 * 60);

    fn message() -> ContactMessage {
        ContactMessage::new("Ada", "ada@example.com", "hello", "CITY: X", 0)
    }

    #[test]
    fn locked_submission_never_reaches_the_mailer() {
        let (mut store, backends, _clock) = memory_store(1_000);
        backends[2].poke(SUBMISSION_LOCK_KEY, "5000");
        let mut mailer = ScriptedMailer::default();

        let outcome = submit(&mut store, &mut mailer, &message(), COOLDOWN);
        assert_eq!(outcome, SubmitOutcome::Locked { until: 5_000 });
        assert!(mailer.sent.is_empty());
    }

    #[test]
    fn submission_at_the_deadline_proceeds_and_relocks() {
        let (mut store, _backends, clock) = memory_store(1_000);
        store
            .write(SUBMISSION_LOCK_KEY, "5000", None)
            .expect("seed lock");
        clock.set(5_000);
        let mut mailer = ScriptedMailer::default();

        let outcome = submit(&mut store, &mut mailer, &message(), COOLDOWN);
        assert_eq!(
            outcome,
            SubmitOutcome::Sent {
                unlock_at: 5_000 + 1_800_000,
                lock_persisted: true
            }
        );
        assert_eq!(mailer.sent, vec![Template::Admin, Template::AutoReply]);
        assert!(store.is_locked(SUBMISSION_LOCK_KEY));
    }

    #[test]
    fn failed_delivery_leaves_lock_untouched() {
        let (mut store, _backends, _clock) = memory_store(0);
        let mut mailer = ScriptedMailer::failing();
        let outcome = submit(&mut store, &mut mailer, &message(), COOLDOWN);
        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
        assert!(!store.is_locked(SUBMISSION_LOCK_KEY));
    }

    #[test]
    fn unavailable_storage_sends_optimistically() {
        let (mut store, backends, _clock) = memory_store(0);
        for backend in &backends {
            backend.set_available(false);
        }
        let mut mailer = ScriptedMailer::default();
        let outcome = submit(&mut store, &mut mailer, &message(), COOLDOWN);
        assert!(matches!(
            outcome,
            SubmitOutcome::Sent {
                lock_persisted: false,
                ..
            }
        ));
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let msg = ContactMessage::new("a", "b", "c", "d", 0);
        assert_eq!(msg.timestamp, "1970-01-01T00:00:00+00:00");
    }
}
