//! Maps inbound stream envelopes (`pty.output`, `pty.event`, `stream.event`)
//! to normalized mutations on the workspace, conversations, and oracles.

use base64::Engine;

use crate::controlplane::protocol::Envelope;
use crate::persistence::event_log::EventLog;
use crate::workspace::conversation::ConversationLifecycleState;
use crate::workspace::events::ObservedEvent;
use crate::workspace::Workspace;

pub mod render_trace;

/// A single output-load sample recorded for the status row (bytes of PTY
/// output observed in the most recent envelope for a conversation).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputLoadSample {
    pub bytes: usize,
}

#[derive(Default)]
pub struct EnvelopeHandler {
    pub output_load: std::collections::HashMap<String, OutputLoadSample>,
    /// Last time PTY output was observed for a directory, keyed by
    /// `directory_id`, used to drive the git-status refresh cadence.
    pub git_activity: std::collections::HashMap<String, std::time::Instant>,
}

impl EnvelopeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn note_git_activity(&mut self, directory_id: &str) {
        self.git_activity.insert(directory_id.to_string(), std::time::Instant::now());
    }

    pub fn git_activity_at(&self, directory_id: &str) -> Option<std::time::Instant> {
        self.git_activity.get(directory_id).copied()
    }

    /// Feeds one envelope into the workspace. Unknown envelope kinds never
    /// reach here because `Envelope` only has three variants; a payload
    /// that fails to decode is dropped rather than surfaced as fatal.
    pub async fn handle(&mut self, workspace: &mut Workspace, event_log: &mut EventLog, envelope: Envelope) {
        match envelope {
            Envelope::PtyOutput {
                session_id,
                chunk_base64,
                cursor,
            } => self.handle_pty_output(workspace, &session_id, &chunk_base64, cursor),
            Envelope::PtyEvent { session_id, event } => {
                self.handle_pty_event(workspace, &session_id, event)
            }
            Envelope::StreamEvent { event } => self.handle_stream_event(workspace, event_log, event).await,
        }
    }

    fn handle_pty_output(&mut self, workspace: &mut Workspace, session_id: &str, chunk_base64: &str, cursor: u64) {
        let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(chunk_base64) else {
            return;
        };
        self.output_load
            .insert(session_id.to_string(), OutputLoadSample { bytes: bytes.len() });

        let directory_id = workspace
            .projection
            .conversations
            .get(session_id)
            .and_then(|c| c.directory_id.clone());

        if let Some(conversation) = workspace.projection.conversations.get_mut(session_id) {
            conversation.oracle.feed(&bytes);
            conversation.last_output_cursor = Some(cursor);
        }

        if let Some(directory_id) = directory_id {
            self.note_git_activity(&directory_id);
        }

        if workspace.active_conversation_id.as_deref() == Some(session_id) && !workspace.selection_pinned_follow_output {
            workspace.selection = None;
        }
    }

    fn handle_pty_event(&mut self, workspace: &mut Workspace, session_id: &str, event: serde_json::Value) {
        let event_type = event.get("type").and_then(|v| v.as_str()).unwrap_or("");
        if let Some(fields) = event.get("adapterState").and_then(|v| v.as_object()) {
            if let Some(conversation) = workspace.projection.conversations.get_mut(session_id) {
                for (key, value) in fields {
                    if let Some(text) = value.as_str() {
                        conversation.adapter_state.fields.insert(key.clone(), text.to_string());
                    }
                }
                if let Some(resume_id) = event.get("resumeId").and_then(|v| v.as_str()) {
                    conversation.adapter_state.resume_id = Some(resume_id.to_string());
                }
            }
        }

        if event_type == "terminated" {
            if let Some(conversation) = workspace.projection.conversations.get_mut(session_id) {
                conversation.state = ConversationLifecycleState::Exited;
                conversation.live = false;
            }
            workspace.projection.conversations.mark_unsubscribed(session_id);
        }
    }

    async fn handle_stream_event(&mut self, workspace: &mut Workspace, event_log: &mut EventLog, event: serde_json::Value) {
        let Some(observed) = decode_observed_event(&event) else {
            return;
        };
        let _ = event_log.append(&observed).await;
        workspace.projection.apply(observed);
    }
}

/// Best-effort decode of a `stream.event` payload into an [`ObservedEvent`].
/// Malformed payloads are dropped silently, matching the "unknown envelope
/// kinds are ignored" failure mode.
fn decode_observed_event(value: &serde_json::Value) -> Option<ObservedEvent> {
    use crate::workspace::events::EventKind;

    let cursor = value.get("cursor")?.as_u64()?;
    let kind = match value.get("type")?.as_str()? {
        "directory_upsert" => EventKind::DirectoryUpsert {
            directory_id: value.get("directoryId")?.as_str()?.to_string(),
            path: value.get("path")?.as_str()?.to_string(),
        },
        "directory_delete" => EventKind::DirectoryDelete {
            directory_id: value.get("directoryId")?.as_str()?.to_string(),
        },
        "conversation_upsert" => EventKind::ConversationUpsert {
            session_id: value.get("sessionId")?.as_str()?.to_string(),
            directory_id: value.get("directoryId").and_then(|v| v.as_str()).map(str::to_string),
            agent_type: match value.get("agentType")?.as_str()? {
                "codex" => crate::workspace::conversation::AgentType::Codex,
                "claude" => crate::workspace::conversation::AgentType::Claude,
                "cursor" => crate::workspace::conversation::AgentType::Cursor,
                "critique" => crate::workspace::conversation::AgentType::Critique,
                _ => crate::workspace::conversation::AgentType::Terminal,
            },
        },
        "conversation_delete" => EventKind::ConversationDelete {
            session_id: value.get("sessionId")?.as_str()?.to_string(),
        },
        "directory_git_updated" => EventKind::DirectoryGitUpdated {
            directory_id: value.get("directoryId")?.as_str()?.to_string(),
            summary: crate::workspace::directory::GitSummary {
                branch: value.get("branch").and_then(|v| v.as_str()).map(str::to_string),
                changed_files: value.get("changedFiles").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                additions: value.get("additions").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                deletions: value.get("deletions").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
            },
            remote_url: value.get("remoteUrl").and_then(|v| v.as_str()).map(str::to_string),
        },
        "repository_upsert" => EventKind::RepositoryUpsert {
            repository_id: value.get("repositoryId")?.as_str()?.to_string(),
            name: value.get("name")?.as_str()?.to_string(),
            remote_url: value.get("remoteUrl")?.as_str()?.to_string(),
        },
        "repository_delete" => EventKind::RepositoryDelete {
            repository_id: value.get("repositoryId")?.as_str()?.to_string(),
        },
        "task_upsert" => EventKind::TaskUpsert {
            task_id: value.get("taskId")?.as_str()?.to_string(),
            repository_id: value.get("repositoryId").and_then(|v| v.as_str()).map(str::to_string),
            title: value.get("title")?.as_str()?.to_string(),
        },
        "task_delete" => EventKind::TaskDelete {
            task_id: value.get("taskId")?.as_str()?.to_string(),
        },
        "task_reorder" => EventKind::TaskReorder {
            task_id: value.get("taskId")?.as_str()?.to_string(),
            order_key: value.get("orderKey")?.as_f64()?,
        },
        _ => return None,
    };
    Some(ObservedEvent { cursor, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pty_output_feeds_oracle_and_advances_cursor() {
        let mut workspace = Workspace::new();
        workspace.projection.apply(ObservedEvent {
            cursor: 1,
            kind: crate::workspace::events::EventKind::ConversationUpsert {
                session_id: "C".into(),
                directory_id: None,
                agent_type: crate::workspace::conversation::AgentType::Codex,
            },
        });

        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        let chunk = base64::engine::general_purpose::STANDARD.encode(b"hi");
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::PtyOutput {
                    session_id: "C".to_string(),
                    chunk_base64: chunk,
                    cursor: 7,
                },
            )
            .await;

        let conversation = workspace.projection.conversations.get("C").unwrap();
        assert_eq!(conversation.last_output_cursor, Some(7));
    }

    #[tokio::test]
    async fn pty_output_notes_git_activity_for_the_owning_directory() {
        let mut workspace = Workspace::new();
        workspace.projection.apply(ObservedEvent {
            cursor: 1,
            kind: crate::workspace::events::EventKind::DirectoryUpsert {
                directory_id: "D".into(),
                path: "/p".into(),
            },
        });
        workspace.projection.apply(ObservedEvent {
            cursor: 2,
            kind: crate::workspace::events::EventKind::ConversationUpsert {
                session_id: "C".into(),
                directory_id: Some("D".into()),
                agent_type: crate::workspace::conversation::AgentType::Codex,
            },
        });

        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        let chunk = base64::engine::general_purpose::STANDARD.encode(b"hi");
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::PtyOutput {
                    session_id: "C".to_string(),
                    chunk_base64: chunk,
                    cursor: 1,
                },
            )
            .await;

        assert!(handler.git_activity_at("D").is_some());
    }

    #[tokio::test]
    async fn terminated_pty_event_marks_conversation_exited_and_unsubscribed() {
        let mut workspace = Workspace::new();
        workspace.projection.apply(ObservedEvent {
            cursor: 1,
            kind: crate::workspace::events::EventKind::ConversationUpsert {
                session_id: "C".into(),
                directory_id: None,
                agent_type: crate::workspace::conversation::AgentType::Codex,
            },
        });
        workspace.projection.conversations.mark_subscribed("C");

        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::PtyEvent {
                    session_id: "C".to_string(),
                    event: json!({"type": "terminated"}),
                },
            )
            .await;

        let conversation = workspace.projection.conversations.get("C").unwrap();
        assert_eq!(conversation.state, ConversationLifecycleState::Exited);
        assert!(!workspace.projection.conversations.is_subscribed("C"));
    }

    #[tokio::test]
    async fn stream_event_routes_through_the_projection_reducer() {
        let mut workspace = Workspace::new();
        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::StreamEvent {
                    event: json!({"type": "directory_upsert", "cursor": 1, "directoryId": "D", "path": "/p"}),
                },
            )
            .await;
        assert!(workspace.projection.directories.contains("D"));
    }

    #[tokio::test]
    async fn directory_git_updated_decodes_and_applies() {
        let mut workspace = Workspace::new();
        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::StreamEvent {
                    event: json!({
                        "type": "directory_git_updated",
                        "cursor": 1,
                        "directoryId": "D",
                        "branch": "main",
                        "changedFiles": 3,
                        "additions": 10,
                        "deletions": 2,
                        "remoteUrl": serde_json::Value::Null,
                    }),
                },
            )
            .await;
        let summary = workspace.projection.directories.git_summary("D").cloned().unwrap_or_default();
        assert_eq!(summary.branch, Some("main".to_string()));
        assert_eq!(summary.changed_files, 3);
    }

    #[tokio::test]
    async fn malformed_stream_event_is_dropped_without_panicking() {
        let mut workspace = Workspace::new();
        let mut handler = EnvelopeHandler::new();
        let mut event_log = EventLog::disabled();
        handler
            .handle(
                &mut workspace,
                &mut event_log,
                Envelope::StreamEvent {
                    event: json!({"type": "directory_upsert"}),
                },
            )
            .await;
        assert!(workspace.projection.directories.iter().count() == 0);
    }
}
