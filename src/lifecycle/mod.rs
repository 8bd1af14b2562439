//! Conversation lifecycle: start/attach/detach/activate and debounced
//! title editing, built against the conversation manager and ops queue.

use std::time::{Duration, Instant};

use crate::controlplane::protocol::StartPtySessionRequest;
use crate::controlplane::ControlPlaneClient;
use crate::error::{ControlPlaneError, HarnessError, Result};
use crate::queue::{AbortSignal, OpsQueue};
use crate::workspace::conversation::{AgentType, ConversationLifecycleState, LaunchMode};
use crate::workspace::Workspace;

pub const ACTIVATE_CONVERSATION_KEY: &str = "left-nav:activate-conversation";
pub const TITLE_EDIT_DEBOUNCE_MS: u64 = 250;

/// Builds the launch argument list from agent type + launch mode, mirroring
/// the start-command construction a PTY-hosting session manager performs,
/// generalized across agent types instead of one hardcoded binary.
pub fn build_launch_args(agent_type: AgentType, launch_mode: LaunchMode, resume_id: Option<&str>) -> Vec<String> {
    let mut args = vec![agent_binary(agent_type).to_string()];
    if let Some(id) = resume_id {
        args.push("--resume".to_string());
        args.push(id.to_string());
    }
    if launch_mode == LaunchMode::Yolo {
        args.push("--dangerously-skip-permissions".to_string());
    }
    args
}

fn agent_binary(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Codex => "codex",
        AgentType::Claude => "claude",
        AgentType::Cursor => "cursor-agent",
        AgentType::Terminal => "sh",
        AgentType::Critique => "critique",
    }
}

/// Start a conversation: serializes against its own `start_in_flight` flag
/// (the per-conversation mutex), invokes `start_pty_session`, and marks the
/// conversation unavailable without panicking on failure.
pub async fn start_conversation(
    workspace: &mut Workspace,
    client: &mut ControlPlaneClient,
    session_id: &str,
    rows: u16,
    cols: u16,
) -> Result<()> {
    let Some(conversation) = workspace.projection.conversations.get_mut(session_id) else {
        return Err(HarnessError::Projection(
            crate::error::ProjectionError::MissingEntity(session_id.to_string()),
        ));
    };
    if conversation.start_in_flight {
        return Ok(());
    }
    conversation.start_in_flight = true;
    conversation.state = ConversationLifecycleState::Starting;

    let request = StartPtySessionRequest {
        session_id: session_id.to_string(),
        directory_id: conversation.directory_id.clone(),
        agent_type: format!("{:?}", conversation.agent_type).to_lowercase(),
        launch_mode: format!("{:?}", conversation.launch_mode).to_lowercase(),
        rows,
        cols,
        resume_id: conversation.adapter_state.resume_id.clone(),
    };

    let result = client.start_pty_session(request).await;
    let Some(conversation) = workspace.projection.conversations.get_mut(session_id) else {
        return Ok(());
    };
    conversation.start_in_flight = false;
    match result {
        Ok(()) => {
            conversation.state = ConversationLifecycleState::Active;
            conversation.live = true;
            workspace.projection.conversations.mark_subscribed(session_id);
            Ok(())
        }
        Err(err) => {
            conversation.state = ConversationLifecycleState::Exited;
            workspace
                .notices
                .push(format!("failed to start conversation: {err}"), crate::workspace::NoticeLevel::Error);
            Ok(())
        }
    }
}

/// Attach is idempotent: subscribing twice for the same session has no
/// additional effect beyond the first subscription.
pub async fn attach(
    workspace: &mut Workspace,
    client: &mut ControlPlaneClient,
    session_id: &str,
) -> Result<()> {
    if workspace.projection.conversations.is_subscribed(session_id) {
        return Ok(());
    }
    let since_cursor = workspace
        .projection
        .conversations
        .get(session_id)
        .and_then(|c| c.last_output_cursor);
    match client.attach_pty(session_id.to_string(), since_cursor).await {
        Ok(()) => {
            workspace.projection.conversations.mark_subscribed(session_id);
            if let Some(conversation) = workspace.projection.conversations.get_mut(session_id) {
                conversation.state = ConversationLifecycleState::Active;
            }
            Ok(())
        }
        Err(HarnessError::ControlPlane(e)) if e.is_non_fatal() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Detach is idempotent: unsubscribes but preserves `last_output_cursor`.
pub async fn detach(
    workspace: &mut Workspace,
    client: &mut ControlPlaneClient,
    session_id: &str,
) -> Result<()> {
    if !workspace.projection.conversations.is_subscribed(session_id) {
        return Ok(());
    }
    match client.detach_pty(session_id.to_string()).await {
        Ok(()) | Err(HarnessError::ControlPlane(ControlPlaneError::SessionNotFound { .. })) => {
            workspace.projection.conversations.mark_unsubscribed(session_id);
            if let Some(conversation) = workspace.projection.conversations.get_mut(session_id) {
                conversation.state = ConversationLifecycleState::Detached;
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Enqueues an activation under the latest-wins key so rapid switches
/// cancel prior activations before they take effect. `activated` is the
/// shared cell the runtime reads `active_conversation_id` back from once
/// the op completes (the queue's futures are boxed and `'static`, so they
/// cannot hold a direct `&mut Workspace` borrow).
pub fn enqueue_activate(
    queue: &mut OpsQueue,
    activated: std::sync::Arc<std::sync::Mutex<Option<String>>>,
    session_id: String,
) {
    queue.enqueue_keyed(
        ACTIVATE_CONVERSATION_KEY,
        Box::new(move |signal: AbortSignal| {
            Box::pin(async move {
                if signal.aborted() {
                    return;
                }
                *activated.lock().unwrap() = Some(session_id);
            })
        }),
    );
}

/// Per-conversation title-edit session: keystrokes mutate a local buffer;
/// the debounce timer decides when a persist op should be queued.
pub struct TitleEditSession {
    pub session_id: String,
    pub original_title: Option<String>,
    pub buffer: String,
    last_edit: Instant,
    pub persist_pending: bool,
}

impl TitleEditSession {
    pub fn open(session_id: String, original_title: Option<String>) -> Self {
        let buffer = original_title.clone().unwrap_or_default();
        Self {
            session_id,
            original_title,
            buffer,
            last_edit: Instant::now(),
            persist_pending: false,
        }
    }

    pub fn edit(&mut self, buffer: String) {
        self.buffer = buffer;
        self.last_edit = Instant::now();
        self.persist_pending = true;
    }

    pub fn debounce_elapsed(&self) -> bool {
        self.last_edit.elapsed() >= Duration::from_millis(TITLE_EDIT_DEBOUNCE_MS)
    }

    /// Flushes the latest buffer if a persist is pending, then clears the
    /// pending flag. Closing with `persist_pending=true` always flushes
    /// before tearing down the edit, regardless of debounce elapsed.
    pub async fn flush(&mut self, client: &mut ControlPlaneClient) -> Result<()> {
        if !self.persist_pending {
            return Ok(());
        }
        client
            .update_conversation_title(self.session_id.clone(), self.buffer.clone())
            .await?;
        self.persist_pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_include_resume_and_yolo_flags() {
        let args = build_launch_args(AgentType::Claude, LaunchMode::Yolo, Some("abc"));
        assert_eq!(args, vec!["claude", "--resume", "abc", "--dangerously-skip-permissions"]);
    }

    #[test]
    fn standard_launch_mode_omits_yolo_flag() {
        let args = build_launch_args(AgentType::Codex, LaunchMode::Standard, None);
        assert_eq!(args, vec!["codex"]);
    }

    #[tokio::test]
    async fn activation_cancellation_leaves_only_the_latest_session_activated() {
        let mut queue = OpsQueue::new();
        let activated = std::sync::Arc::new(std::sync::Mutex::new(None));
        enqueue_activate(&mut queue, activated.clone(), "A".to_string());
        enqueue_activate(&mut queue, activated.clone(), "B".to_string());
        queue.wait_for_drain().await;
        assert_eq!(*activated.lock().unwrap(), Some("B".to_string()));
    }

    #[test]
    fn title_edit_flush_is_a_no_op_without_pending_changes() {
        let session = TitleEditSession::open("s1".to_string(), Some("old".to_string()));
        assert!(!session.persist_pending);
    }
}
