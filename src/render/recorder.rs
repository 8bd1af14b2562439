//! Side-channel recorder for `--recording-path` / `--recording-gif-output`:
//! appends each emitted diff to a file so a session can be replayed or
//! converted to a GIF out of band. Recording failures never affect the
//! render path itself.

use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub struct Recorder {
    file: Option<File>,
    fps: u32,
}

impl Recorder {
    pub fn disabled() -> Self {
        Self { file: None, fps: 0 }
    }

    pub async fn open(path: PathBuf, fps: u32) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self {
            file: Some(file),
            fps,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Appends `diff_bytes` if recording is enabled. Errors are logged via
    /// tracing and otherwise swallowed — recording is best-effort.
    pub async fn record(&mut self, diff_bytes: &str) {
        if diff_bytes.is_empty() {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(err) = file.write_all(diff_bytes.as_bytes()).await {
                tracing::warn!(error = %err, "recorder write failed");
            }
        }
    }

    /// Closed exactly once; errors are swallowed (per shutdown rules: "close
    /// recorder" happens unconditionally and never blocks teardown).
    pub async fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_recorder_reports_not_enabled() {
        let recorder = Recorder::disabled();
        assert!(!recorder.is_enabled());
    }

    #[tokio::test]
    async fn record_on_disabled_recorder_is_a_no_op() {
        let mut recorder = Recorder::disabled();
        recorder.record("some diff").await;
        recorder.close().await;
    }
}
