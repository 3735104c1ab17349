//! Server-Sent Events stream and store watcher.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use site_console::io::backend::{COOKIE_FILE, PERSISTENT_FILE};
use site_console::store::{RETURNING_VISITOR_KEY, SUBMISSION_LOCK_KEY};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{AppState, ChangeEvent};

#[derive(Serialize)]
struct StorePayload<'a> {
    file: &'a str,
}

/// SSE event name and JSON body for a change.
fn encode(event: &ChangeEvent) -> Option<(&'static str, String)> {
    let encoded = match event {
        ChangeEvent::Host(host_event) => ("host", serde_json::to_string(host_event)),
        ChangeEvent::StoreChanged { file } => {
            ("store", serde_json::to_string(&StorePayload {
                file: file.as_str(),
            }))
        }
    };
    match encoded {
        (name, Ok(json)) => Some((name, json)),
        (name, Err(err)) => {
            warn!(event = name, error = %err, "dropping unserializable event");
            None
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    if let Some((name, json)) = encode(&change_event) {
                        yield Ok(Event::default().event(name).data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Start the store watcher in a background task.
pub fn start_store_watcher(state: AppState) {
    tokio::spawn(async move {
        if let Err(e) = run_store_watcher(state).await {
            warn!(error = %e, "store watcher failed");
        }
    });
}

async fn run_store_watcher(state: AppState) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(250)),
    )?;

    let store_dir = state.store_dir();
    std::fs::create_dir_all(&store_dir)?;
    watcher.watch(&store_dir, RecursiveMode::NonRecursive)?;
    info!(path = %store_dir.display(), "watching store directory");

    let mut pending_events: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(Duration::from_millis(250));
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending_events.push(event);
            }
            _ = flush_tick.tick() => {
                if pending_events.is_empty() {
                    continue;
                }
                let changed = changed_store_files(&store_dir, &pending_events);
                pending_events.clear();
                if !changed.is_empty() {
                    reconcile_after_change(&state, changed).await;
                }
            }
        }
    }
}

/// Store files touched by `events`, by file name.
fn changed_store_files(store_dir: &Path, events: &[NotifyEvent]) -> BTreeSet<String> {
    let watched: [PathBuf; 2] = [store_dir.join(PERSISTENT_FILE), store_dir.join(COOKIE_FILE)];
    let mut changed = BTreeSet::new();
    for event in events {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            continue;
        }
        for path in &event.paths {
            if watched.contains(path)
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                changed.insert(name.to_string());
            }
        }
    }
    changed
}

/// Re-read the host keys so an edited or wiped file is repaired, then tell
/// clients which files moved.
async fn reconcile_after_change(state: &AppState, changed: BTreeSet<String>) {
    state
        .with_shell(|shell, _| {
            let store = shell.store_mut();
            for key in [RETURNING_VISITOR_KEY, SUBMISSION_LOCK_KEY] {
                let value = store.read(key);
                debug!(key, present = value.is_some(), "re-reconciled after store change");
            }
        })
        .await;
    for file in changed {
        debug!(file = %file, "broadcasting store change");
        let _ = state.event_tx.send(ChangeEvent::StoreChanged { file });
    }
}
