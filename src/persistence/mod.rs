//! UI-state and status-file persistence, plus a debounced writer that
//! coalesces rapid mutations (pane width drags, collapse toggles) into one
//! disk write every 200 ms.

pub mod event_log;
pub mod files;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, Result};
use files::UiState;

pub const UI_STATE_DEBOUNCE_MS: u64 = 200;

fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("harness-mux"))
        .ok_or_else(|| HarnessError::Terminal("could not find config directory".to_string()))
}

pub fn ui_state_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("ui-state.json"))
}

pub fn release_notes_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("release-notes-state.json"))
}

pub fn session_order_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("session-order.json"))
}

pub fn event_log_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("events.jsonl"))
}

/// Buffers the latest `UiState` and only actually writes to disk once
/// `UI_STATE_DEBOUNCE_MS` has elapsed since the last mutation.
pub struct DebouncedUiStateWriter {
    path: PathBuf,
    pending: Option<UiState>,
    last_mutation: Instant,
}

impl DebouncedUiStateWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            pending: None,
            last_mutation: Instant::now(),
        }
    }

    pub fn mutate(&mut self, state: UiState) {
        self.pending = Some(state);
        self.last_mutation = Instant::now();
    }

    pub fn due(&self) -> bool {
        self.pending.is_some() && self.last_mutation.elapsed() >= Duration::from_millis(UI_STATE_DEBOUNCE_MS)
    }

    /// Flushes the pending state regardless of debounce, used on shutdown
    /// ("persist pending UI state").
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if let Some(state) = self.pending.take() {
            files::save_json(&self.path, &state).await?;
        }
        Ok(())
    }

    pub async fn tick(&mut self) -> std::io::Result<()> {
        if self.due() {
            self.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mutation_is_not_due_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DebouncedUiStateWriter::new(dir.path().join("ui-state.json"));
        writer.mutate(UiState::default());
        assert!(!writer.due());
    }

    #[tokio::test]
    async fn flush_writes_pending_state_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui-state.json");
        let mut writer = DebouncedUiStateWriter::new(path.clone());
        writer.mutate(UiState {
            left_pane_width_percent: 42,
            ..Default::default()
        });
        writer.flush().await.unwrap();
        let loaded: Option<UiState> = files::load_json(&path).await.unwrap();
        assert_eq!(loaded.unwrap().left_pane_width_percent, 42);
    }
}
