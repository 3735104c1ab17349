//! File-backed mailer: each send appends one JSON line to `outbox.jsonl`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::contact::{ContactMessage, Mailer, Template};
use crate::io::host::CollaboratorError;

pub const OUTBOX_FILE: &str = "outbox.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub template: Template,
    pub sent_at: String,
    pub message: ContactMessage,
}

#[derive(Debug, Clone)]
pub struct OutboxMailer {
    path: PathBuf,
}

impl OutboxMailer {
    /// Outbox inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(OUTBOX_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &OutboxEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create outbox dir {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(entry).context("serialize outbox entry")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append {}", self.path.display()))
    }
}

impl Mailer for OutboxMailer {
    fn send(
        &mut self,
        template: Template,
        message: &ContactMessage,
    ) -> Result<(), CollaboratorError> {
        let entry = OutboxEntry {
            template,
            sent_at: Utc::now().to_rfc3339(),
            message: message.clone(),
        };
        self.append(&entry)
            .map_err(|err| CollaboratorError::Failed(format!("{err:#}")))
    }
}

/// Every entry in the outbox at `path`; a missing file is an empty outbox.
pub fn read_outbox(path: &Path) -> Result<Vec<OutboxEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse {} entry {}", path.display(), idx + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_append_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut mailer = OutboxMailer::in_dir(&temp.path().join("store"));
        let message = ContactMessage::new("Ada", "ada@example.com", "hi", "CITY: X", 0);

        mailer.send(Template::Admin, &message).expect("admin");
        mailer.send(Template::AutoReply, &message).expect("reply");

        let entries = read_outbox(mailer.path()).expect("read");
        let templates: Vec<Template> = entries.iter().map(|entry| entry.template).collect();
        assert_eq!(templates, vec![Template::Admin, Template::AutoReply]);
        assert_eq!(entries[0].message, message);
    }

    #[test]
    fn missing_outbox_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let entries = read_outbox(&temp.path().join(OUTBOX_FILE)).expect("read");
        assert!(entries.is_empty());
    }
}
