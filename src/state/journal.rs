use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlaylistError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Reorder,
    Move,
    Insert,
    Delete,
}

/// One mutating batch against the remote playlist. Audit trail only: the
/// journal is never replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub playlist_id: String,
    /// Fingerprint of the ordering the batch was computed against
    pub before: String,
    /// Fingerprint of the ordering re-fetched afterwards, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JournalEntry {
    pub fn new(op: Operation, playlist_id: &str, before: String) -> Self {
        JournalEntry {
            timestamp: Utc::now(),
            operation: op,
            playlist_id: playlist_id.to_string(),
            before,
            after: None,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            message: None,
        }
    }

    pub fn with_counts(mut self, succeeded: usize, failed: usize, skipped: usize) -> Self {
        self.succeeded = succeeded;
        self.failed = failed;
        self.skipped = skipped;
        self.attempted = succeeded + failed;
        self
    }

    pub fn with_after(mut self, after: Option<String>) -> Self {
        self.after = after;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn append(path: &Path, entry: &JournalEntry) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal {:?}", path))?;

        let line =
            serde_json::to_string(entry).with_context(|| "Failed to serialize journal entry")?;

        writeln!(file, "{}", line).with_context(|| "Failed to write to journal")
    }

    pub fn read_all(path: &Path) -> anyhow::Result<Vec<JournalEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read journal {:?}", path))?;

        content
            .lines()
            .filter(|ln| !ln.trim().is_empty())
            .map(|ln| {
                serde_json::from_str(ln)
                    .with_context(|| format!("Failed to parse journal line: {}", ln))
            })
            .collect()
    }

    /// `<data_dir>/playlists/<id>/journal.log`. The id becomes a directory
    /// name, so only the characters YouTube uses in ids are accepted.
    pub fn journal_path(data_dir: &Path, playlist_id: &str) -> Result<PathBuf> {
        let safe = !playlist_id.is_empty()
            && playlist_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(PlaylistError::Validation(format!(
                "{:?} is not a playlist id",
                playlist_id
            )));
        }

        Ok(data_dir
            .join("playlists")
            .join(playlist_id)
            .join("journal.log"))
    }
}
