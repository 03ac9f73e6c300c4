//! JSONL transcript of message bus traffic.
//!
//! Every publication becomes one line with the routing facts up front and
//! the full message nested under `message`:
//!
//! ```json
//! {"timestamp":"…","event":"published","kind":"request","id":"…","sender_id":"orchestrator",
//!  "topic":"code.analyze","delivered":1,"message":{…}}
//! {"timestamp":"…","event":"dropped","kind":"response","id":"…","sender_id":"analyzer",
//!  "request_id":"…","delivered":0,"reason":"unknown or expired request","message":{…}}
//! ```

use chrono::{DateTime, Utc};
use conductor_application::ports::message_journal::{JournalEntry, MessageJournal};
use conductor_domain::{AgentMessage, MessageKind};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Disposition {
    Published,
    Dropped,
}

#[derive(Serialize)]
struct JournalLine<'a> {
    timestamp: DateTime<Utc>,
    event: Disposition,
    kind: MessageKind,
    id: &'a str,
    sender_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    /// Request a response or ack refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    delivered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    message: &'a AgentMessage,
}

impl<'a> From<JournalEntry<'a>> for JournalLine<'a> {
    fn from(entry: JournalEntry<'a>) -> Self {
        let message = entry.message();
        let request_id = match message {
            AgentMessage::Response(response) => Some(response.request_id.as_str()),
            AgentMessage::Ack(ack) => Some(ack.original_message_id.as_str()),
            _ => None,
        };
        Self {
            timestamp: Utc::now(),
            event: if entry.is_dropped() {
                Disposition::Dropped
            } else {
                Disposition::Published
            },
            kind: message.kind(),
            id: message.id(),
            sender_id: message.sender_id(),
            topic: message.topic(),
            request_id,
            delivered: entry.delivered(),
            reason: entry.reason(),
            message,
        }
    }
}

/// [`MessageJournal`] appending one JSON line per bus publication.
pub struct JsonlMessageJournal {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    lines: AtomicU64,
}

impl JsonlMessageJournal {
    /// Create (or truncate) the journal file, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            lines: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines successfully written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    fn write_line(&self, line: &JournalLine<'_>) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, line)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl MessageJournal for JsonlMessageJournal {
    fn record(&self, entry: JournalEntry<'_>) {
        let line = JournalLine::from(entry);
        match self.write_line(&line) {
            Ok(()) => {
                self.lines.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => debug!(
                path = %self.path.display(),
                id = line.id,
                error = %e,
                "Could not journal message"
            ),
        }
    }
}
