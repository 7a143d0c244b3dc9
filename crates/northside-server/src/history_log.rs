//! Plain-text history of finished events.
//!
//! When an event is deactivated its members and voted songs are appended to
//! `<HISTORY_PATH>/<event name>.txt`. Writing happens on a background task
//! after the database transaction has committed; failures are logged only.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::storage::sanitize_filename;

/// Snapshot of an event taken just before its members and votes are purged.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHistory {
    pub event_name: String,
    pub ended_at: DateTime<Utc>,
    pub members: Vec<String>,
    /// `(song name, artist name)` for every vote row, in vote order.
    pub songs: Vec<(String, String)>,
}

impl EventHistory {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Event History for {}\n\n", self.event_name));
        out.push_str(&format!("Date: {}\n\n", self.ended_at.format("%Y-%m-%d %H:%M:%S")));
        out.push_str("All Users\n---\n");
        for member in &self.members {
            out.push_str(member);
            out.push('\n');
        }
        out.push_str("\nAll Songs\n---\n");
        for (song, artist) in &self.songs {
            out.push_str(&format!("{song} by {artist}\n"));
        }
        out.push_str("\n\n");
        out
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    dir: Option<PathBuf>,
}

impl HistoryLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Distinct names can sanitise to the same file (`Party?`, `Party*`);
    /// their records then append to one shared history.
    pub fn file_for(&self, event_name: &str) -> Option<PathBuf> {
        let name = sanitize_filename(event_name);
        let name = if name.is_empty() { "event".to_string() } else { name };
        self.dir.as_ref().map(|d| d.join(format!("{name}.txt")))
    }

    /// Fire-and-forget append.
    pub fn record(&self, history: EventHistory) {
        if self.dir.is_none() {
            return;
        }
        let log = self.clone();
        tokio::spawn(async move {
            if let Err(e) = log.append(&history).await {
                tracing::warn!(event = %history.event_name, "failed to write event history: {e}");
            }
        });
    }

    pub async fn append(&self, history: &EventHistory) -> std::io::Result<()> {
        let Some(path) = self.file_for(&history.event_name) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(history.render().as_bytes()).await?;
        file.flush().await?;
        tracing::debug!(path = %path.display(), "event history appended");
        Ok(())
    }
}
