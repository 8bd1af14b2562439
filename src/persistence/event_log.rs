//! Append-only JSON-lines log of applied observed events, for catch-up
//! diagnostics and crash replay. Writes go through this module; the
//! underlying file is closed exactly once on shutdown.

use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::workspace::events::ObservedEvent;

pub struct EventLog {
    file: Option<File>,
}

impl EventLog {
    pub async fn open(path: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Some(file) })
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub async fn append(&mut self, event: &ObservedEvent) -> std::io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let mut line = serde_json::to_string(&SerializedEvent::from(event))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        file.write_all(line.as_bytes()).await
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }

    /// Closed exactly once; repeated calls are a no-op.
    pub async fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }
}

/// A flattened, serializable view of an `ObservedEvent` for the log file —
/// kept separate from the in-memory enum so the on-disk shape is stable
/// even if the reducer's event kinds gain variants.
#[derive(serde::Serialize)]
struct SerializedEvent {
    cursor: u64,
    entity: String,
    summary: String,
}

impl From<&ObservedEvent> for SerializedEvent {
    fn from(event: &ObservedEvent) -> Self {
        Self {
            cursor: event.cursor,
            entity: event.entity_key().to_string(),
            summary: format!("{:?}", event.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::events::EventKind;

    #[tokio::test]
    async fn disabled_log_append_is_a_no_op() {
        let mut log = EventLog::disabled();
        let event = ObservedEvent {
            cursor: 1,
            kind: EventKind::DirectoryDelete {
                directory_id: "D".into(),
            },
        };
        log.append(&event).await.unwrap();
    }

    #[tokio::test]
    async fn appended_events_are_written_as_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut log = EventLog::open(path.clone()).await.unwrap();
        let event = ObservedEvent {
            cursor: 1,
            kind: EventKind::DirectoryDelete {
                directory_id: "D".into(),
            },
        };
        log.append(&event).await.unwrap();
        log.close().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
