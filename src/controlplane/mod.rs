//! Control-plane RPC client: the single connection shared by the ops queue
//! and the envelope handler, serialized on the one logical task per the
//! shared-resource policy (only one call in flight at a time).

pub mod envelope_stream;
pub mod protocol;
pub mod transport;

use protocol::{Request, Response, Scope};
use transport::Transport;

use crate::error::{ControlPlaneError, HarnessError, Result};

pub struct ControlPlaneClient {
    transport: Transport,
    scope: Scope,
    closed: bool,
}

impl ControlPlaneClient {
    pub async fn connect(host: &str, port: u16, scope: Scope) -> Result<Self> {
        let transport = Transport::connect(host, port).await?;
        Ok(Self {
            transport,
            scope,
            closed: false,
        })
    }

    pub async fn connect_with_retry(
        host: &str,
        port: u16,
        scope: Scope,
        retry_window_ms: u64,
        retry_delay_ms: u64,
    ) -> Result<Self> {
        let transport =
            Transport::connect_with_retry(host, port, retry_window_ms, retry_delay_ms).await?;
        Ok(Self {
            transport,
            scope,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(HarnessError::ControlPlane(ControlPlaneError::Transport(
                "client already closed".to_string(),
            )));
        }
        Ok(())
    }

    async fn call(&mut self, request: Request) -> Result<Response> {
        self.ensure_open()?;
        let response = self.transport.call(&request).await?;
        if let Response::Error {
            message,
            not_found,
            not_live,
        } = &response
        {
            if *not_found {
                return Err(HarnessError::ControlPlane(ControlPlaneError::SessionNotFound {
                    session_id: String::new(),
                }));
            }
            if *not_live {
                return Err(HarnessError::ControlPlane(ControlPlaneError::SessionNotLive {
                    session_id: String::new(),
                }));
            }
            return Err(HarnessError::ControlPlane(ControlPlaneError::Rpc(message.clone())));
        }
        Ok(response)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.call(Request::Ping).await?;
        Ok(())
    }

    pub async fn stream_subscribe(&mut self, after_cursor: Option<u64>) -> Result<(String, u64)> {
        let response = self
            .call(Request::StreamSubscribe {
                scope: self.scope.clone(),
                after_cursor,
            })
            .await?;
        match response {
            Response::Subscribed {
                subscription_id,
                starting_cursor,
            } => Ok((subscription_id, starting_cursor)),
            _ => Err(HarnessError::ControlPlane(ControlPlaneError::Rpc(
                "unexpected response to stream_subscribe".to_string(),
            ))),
        }
    }

    pub async fn stream_unsubscribe(&mut self, subscription_id: String) -> Result<()> {
        self.call(Request::StreamUnsubscribe { subscription_id }).await?;
        Ok(())
    }

    pub async fn start_pty_session(
        &mut self,
        request: protocol::StartPtySessionRequest,
    ) -> Result<()> {
        self.call(Request::StartPtySession(request)).await?;
        Ok(())
    }

    pub async fn attach_pty(&mut self, session_id: String, since_cursor: Option<u64>) -> Result<()> {
        self.call(Request::AttachPty { session_id, since_cursor }).await?;
        Ok(())
    }

    pub async fn detach_pty(&mut self, session_id: String) -> Result<()> {
        self.call(Request::DetachPty { session_id }).await?;
        Ok(())
    }

    /// Forwards pane-local keystroke bytes to the PTY's stdin.
    pub async fn write_pty_input(&mut self, session_id: String, bytes: &[u8]) -> Result<()> {
        use base64::Engine;
        let bytes_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.call(Request::WritePtyInput { session_id, bytes_base64 }).await?;
        Ok(())
    }

    pub async fn resize_session(&mut self, session_id: String, rows: u16, cols: u16) -> Result<()> {
        self.call(Request::ResizeSession { session_id, rows, cols }).await?;
        Ok(())
    }

    pub async fn close_session(&mut self, session_id: String) -> Result<()> {
        self.call(Request::CloseSession { session_id }).await?;
        Ok(())
    }

    pub async fn interrupt_session(&mut self, session_id: String) -> Result<()> {
        self.call(Request::InterruptSession { session_id }).await?;
        Ok(())
    }

    pub async fn update_conversation_title(&mut self, session_id: String, title: String) -> Result<()> {
        self.call(Request::UpdateConversationTitle { session_id, title }).await?;
        Ok(())
    }

    pub async fn refresh_conversation_title(&mut self, session_id: String) -> Result<()> {
        self.call(Request::RefreshConversationTitle { session_id }).await?;
        Ok(())
    }

    /// Closed exactly once; repeated calls are a no-op.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_client() -> ControlPlaneClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        ControlPlaneClient::connect(
            "127.0.0.1",
            addr.port(),
            Scope {
                tenant_id: "t".into(),
                user_id: "u".into(),
                workspace_id: "w".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut client = connected_client().await;
        client.close();
        client.close();
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn call_after_close_is_rejected() {
        let mut client = connected_client().await;
        client.close();
        let result = client.ping().await;
        assert!(result.is_err());
    }
}
