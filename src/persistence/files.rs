//! Small JSON-backed state files persisted alongside the workspace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTimelineState {
    pub version: u32,
    pub mode: String,
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(rename = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl StatusTimelineState {
    pub fn new(output_path: String, session_name: Option<String>, started_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            version: 1,
            mode: "gateway-status-timeline".to_string(),
            output_path,
            session_name,
            started_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileState {
    pub version: u32,
    pub mode: String,
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(rename = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderTraceState {
    pub version: u32,
    pub mode: String,
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(rename = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReleaseNotesState {
    pub version: u32,
    #[serde(rename = "neverShow")]
    pub never_show: bool,
    #[serde(rename = "dismissedLatestTag")]
    pub dismissed_latest_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UiState {
    #[serde(rename = "leftPaneWidthPercent")]
    pub left_pane_width_percent: u8,
    pub repositories_collapsed: bool,
    pub shortcuts_collapsed: bool,
    pub theme_preset: String,
}

/// Recorded so a restart can resume persisted conversations in the order
/// they were last active, with the last-active one reclaiming focus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionOrderState {
    pub session_ids: Vec<String>,
    #[serde(rename = "activeSessionId", skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<String>,
}

pub async fn load_json<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> std::io::Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn save_json<T: Serialize>(path: &std::path::Path, value: &T) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
