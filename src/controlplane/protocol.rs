//! Wire types for the control-plane RPC client.

use serde::{Deserialize, Serialize};

pub type SessionId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub tenant_id: String,
    pub user_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    StreamSubscribe { scope: Scope, after_cursor: Option<u64> },
    StreamUnsubscribe { subscription_id: String },

    StartPtySession(StartPtySessionRequest),
    AttachPty { session_id: SessionId, since_cursor: Option<u64> },
    DetachPty { session_id: SessionId },
    WritePtyInput { session_id: SessionId, bytes_base64: String },
    ResizeSession { session_id: SessionId, rows: u16, cols: u16 },
    CloseSession { session_id: SessionId },
    SignalSession { session_id: SessionId, signal: String },
    SubscribeSessionEvents { session_id: SessionId },
    SessionStatus { session_id: SessionId },
    ListSessions { worktree_id: String },
    InterruptSession { session_id: SessionId },

    UpdateConversationTitle { session_id: SessionId, title: String },
    RefreshConversationTitle { session_id: SessionId },

    DirectoryUpsert { directory_id: String, path: String },
    DirectoryDelete { directory_id: String },
    RepositoryUpsert { repository_id: String, name: String, remote_url: String },
    RepositoryDelete { repository_id: String },
    TaskUpsert { task_id: String, title: String, body: String },
    TaskDelete { task_id: String },

    GithubProjectPr { repository_id: String },
    GithubProjectReview { repository_id: String },
    GithubPrCreate { repository_id: String, title: String, body: String },
    GithubRepoMyPrsUrl { repository_id: String },
    LinearIssueImport { issue_key: String },

    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPtySessionRequest {
    pub session_id: SessionId,
    pub directory_id: Option<String>,
    pub agent_type: String,
    pub launch_mode: String,
    pub rows: u16,
    pub cols: u16,
    pub resume_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Pong,
    Subscribed { subscription_id: String, starting_cursor: u64 },
    Unsubscribed,
    SessionStarted { session_id: SessionId },
    Attached { session_id: SessionId },
    Detached { session_id: SessionId },
    InputWritten { session_id: SessionId },
    Resized { session_id: SessionId },
    Closed { session_id: SessionId },
    Signalled { session_id: SessionId },
    EventsSubscribed { session_id: SessionId },
    Status { session_id: SessionId, live: bool },
    SessionList { sessions: Vec<SessionId> },
    Interrupted { session_id: SessionId },
    TitleUpdated { session_id: SessionId },
    Ack,
    Url { url: Option<String> },
    Error { message: String, not_found: bool, not_live: bool },
}

/// Inbound stream envelope kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Envelope {
    #[serde(rename = "pty.output")]
    PtyOutput { session_id: SessionId, chunk_base64: String, cursor: u64 },
    #[serde(rename = "pty.event")]
    PtyEvent { session_id: SessionId, event: serde_json::Value },
    #[serde(rename = "stream.event")]
    StreamEvent { event: serde_json::Value },
}

/// Length-prefixed framing: a u32 little-endian byte length followed by a
/// JSON payload, generalized from a Unix-socket daemon IPC scheme to run
/// over any `AsyncRead + AsyncWrite` transport.
pub mod framing {
    use serde::{Deserialize, Serialize};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

    pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> std::io::Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
        T: Serialize,
    {
        let data = serde_json::to_vec(msg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let len = data.len() as u32;
        writer.write_all(&len.to_le_bytes()).await?;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn read_message<R, T>(reader: &mut R) -> std::io::Result<T>
    where
        R: tokio::io::AsyncRead + Unpin,
        T: for<'de> Deserialize<'de>,
    {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("message too large: {len} bytes"),
            ));
        }
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data).await?;
        serde_json::from_slice(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::framing::{read_message, write_message};
    use super::*;

    #[tokio::test]
    async fn request_round_trips_through_framing() {
        let mut buf = Vec::new();
        let req = Request::Ping;
        write_message(&mut buf, &req).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded: Request = read_message(&mut cursor).await.unwrap();
        assert!(matches!(decoded, Request::Ping));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(200u32 * 1024 * 1024).to_le_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let result: std::io::Result<Request> = read_message(&mut cursor).await;
        assert!(result.is_err());
    }
}
