//! First-visit detection backed by the replicated store.

use tracing::info;

use crate::store::{RETURNING_VISITOR_KEY, ReplicatedStore, StoreError, WriteReport};

/// How the page should boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Seen before: skip the intro and restore the session.
    Returning,
    /// First visit (or every backend wiped/unavailable): play the intro.
    New,
}

/// Check the returning-visitor flag, repairing any backend that lost it.
pub fn check_visit(store: &mut ReplicatedStore) -> Visit {
    if store.read(RETURNING_VISITOR_KEY).is_some() {
        info!(">> SYSTEM: RESTORING_SESSION");
        Visit::Returning
    } else {
        info!(">> SYSTEM: NEW_CONNECTION");
        Visit::New
    }
}

/// Remember this client in every backend.
pub fn mark_visited(store: &mut ReplicatedStore) -> Result<WriteReport, StoreError> {
    let ttl = store.policy(RETURNING_VISITOR_KEY).ttl;
    store.write(RETURNING_VISITOR_KEY, "true", ttl)
}
