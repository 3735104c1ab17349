//! HTTP route handlers for the console API.

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use site_console::contact::{ContactMessage, SubmitOutcome, submit};
use site_console::core::game::GameState;
use site_console::core::theme::Theme;
use site_console::core::types::{Key, View};
use site_console::io::host::HostEvent;
use site_console::io::outbox::OutboxMailer;
use site_console::store::SUBMISSION_LOCK_KEY;
use site_console::visitor::{Visit, check_visit, mark_visited};
use tracing::{info, warn};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/boot", post(boot))
        .route("/shell/line", post(shell_line))
        .route("/shell/key", post(shell_key))
        .route("/shell/state", get(shell_state))
        .route("/uplink", get(uplink))
        .route("/contact", post(contact))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootResponse {
    pub returning: bool,
    pub events: Vec<HostEvent>,
}

/// POST /api/boot - page load: visitor check, location lookup, flag write.
pub async fn boot(State(state): State<AppState>) -> Json<BootResponse> {
    let (visit, events) = state
        .with_shell(|shell, host| {
            let visit = check_visit(shell.store_mut());
            if let Err(err) = mark_visited(shell.store_mut()) {
                warn!(error = %err, "visitor flag not persisted");
            }
            shell.init_vitals(host);
            visit
        })
        .await;
    Json(BootResponse {
        returning: visit == Visit::Returning,
        events,
    })
}

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub line: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<HostEvent>,
}

/// POST /api/shell/line - type a line and press Enter.
pub async fn shell_line(
    State(state): State<AppState>,
    Json(request): Json<LineRequest>,
) -> Json<EventsResponse> {
    let ((), events) = state
        .with_shell(|shell, host| shell.submit(&request.line, host))
        .await;
    Json(EventsResponse { events })
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: Key,
    /// Current input text, for keys that act on it.
    #[serde(default)]
    pub input: Option<String>,
}

/// POST /api/shell/key - forward a control key.
pub async fn shell_key(
    State(state): State<AppState>,
    Json(request): Json<KeyRequest>,
) -> Json<EventsResponse> {
    let ((), events) = state
        .with_shell(|shell, host| {
            if let Some(input) = &request.input {
                shell.set_input(input);
            }
            shell.key(request.key, host);
        })
        .await;
    Json(EventsResponse { events })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShellState {
    pub input: String,
    pub theme: Theme,
    pub accent: String,
    pub view: View,
    pub visible: bool,
    pub history: Vec<String>,
    pub game: Option<GameState>,
    pub next_due_ms: Option<u64>,
}

/// GET /api/shell/state - snapshot for a freshly loaded page.
pub async fn shell_state(State(state): State<AppState>) -> Json<ShellState> {
    let (snapshot, _) = state
        .with_shell(|shell, _| ShellState {
            input: shell.input().to_string(),
            theme: shell.theme(),
            accent: shell.theme().accent().to_string(),
            view: shell.view(),
            visible: shell.is_visible(),
            history: shell.history().entries().to_vec(),
            game: shell.game_state(),
            next_due_ms: shell.next_due_ms(),
        })
        .await;
    Json(snapshot)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UplinkStatus {
    pub locked: bool,
    pub until: Option<u64>,
    pub remaining_secs: u64,
}

/// GET /api/uplink - whether the contact form is on cooldown.
pub async fn uplink(State(state): State<AppState>) -> Json<UplinkStatus> {
    let (status, _) = state
        .with_shell(|shell, _| {
            let lock = shell.store_mut().active_lock(SUBMISSION_LOCK_KEY);
            UplinkStatus {
                locked: lock.is_some(),
                until: lock.map(|lock| lock.until),
                remaining_secs: Duration::from_millis(lock.map_or(0, |lock| lock.remaining_ms))
                    .as_secs(),
            }
        })
        .await;
    Json(status)
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContactResponse {
    Sent { unlock_at: u64 },
    Locked { until: u64 },
    Failed { error: String },
}

/// POST /api/contact - submit the contact form through the outbox.
pub async fn contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> (StatusCode, Json<ContactResponse>) {
    let mut mailer = OutboxMailer::in_dir(&state.store_dir());
    let cooldown = state.config.cooldown();
    let (outcome, _) = state
        .with_shell(|shell, _| {
            let now_ms = shell.store_mut().now_ms();
            let message = ContactMessage::new(
                &request.name,
                &request.email,
                &request.message,
                shell.visitor_log(),
                now_ms,
            );
            submit(shell.store_mut(), &mut mailer, &message, cooldown)
        })
        .await;

    match outcome {
        SubmitOutcome::Sent { unlock_at, .. } => {
            info!(unlock_at, "contact accepted");
            (StatusCode::OK, Json(ContactResponse::Sent { unlock_at }))
        }
        SubmitOutcome::Locked { until } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ContactResponse::Locked { until }),
        ),
        SubmitOutcome::Failed { error } => (
            StatusCode::BAD_GATEWAY,
            Json(ContactResponse::Failed {
                error: error.to_string(),
            }),
        ),
    }
}
