//! Append-only JSONL chat transcript.
//!
//! Each line is a full snapshot of one session after an assistant reply:
//! timestamp, session id, the chat history so far and captured contacts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::chat::session::{ChatSession, ChatTurn, ContactRecord};
use crate::error::TranscriptError;

/// Default transcript location.
pub const DEFAULT_TRANSCRIPT_PATH: &str = "./chat_logs.jsonl";

/// One transcript line.
#[derive(Debug, Serialize)]
pub struct TranscriptEntry<'a> {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub chat_history: &'a [ChatTurn],
    pub contact_info: &'a [ContactRecord],
}

impl<'a> TranscriptEntry<'a> {
    /// Snapshot a session as of now.
    pub fn snapshot(session: &'a ChatSession) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session.id(),
            chat_history: session.history(),
            contact_info: session.contacts(),
        }
    }
}

/// Writes transcript entries to a JSONL file.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single JSON line.
    pub async fn append(&self, entry: &TranscriptEntry<'_>) -> Result<(), TranscriptError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|source| self.write_error(source))?;
        file.flush().await.map_err(|source| self.write_error(source))?;
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> TranscriptError {
        TranscriptError::Write {
            path: self.path.display().to_string(),
            source,
        }
    }
}
