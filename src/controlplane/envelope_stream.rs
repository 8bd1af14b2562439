//! The push side of the control-plane connection: a second TCP stream,
//! separate from the request/response [`super::ControlPlaneClient`]
//! transport, that the control plane uses to deliver unsolicited
//! `pty.output`/`pty.event`/`stream.event` envelopes.

use tokio::net::TcpStream;

use super::protocol::{framing, Envelope};
use crate::error::{ControlPlaneError, HarnessError, Result};

pub struct EnvelopeStream {
    stream: TcpStream,
}

impl EnvelopeStream {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| HarnessError::ControlPlane(ControlPlaneError::Transport(e.to_string())))?;
        Ok(Self { stream })
    }

    pub async fn recv(&mut self) -> Result<Envelope> {
        framing::read_message(&mut self.stream)
            .await
            .map_err(|e| HarnessError::ControlPlane(ControlPlaneError::Transport(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn recv_decodes_a_pushed_envelope() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            framing::write_message(
                &mut socket,
                &Envelope::PtyOutput {
                    session_id: "s1".to_string(),
                    chunk_base64: "aGk=".to_string(),
                    cursor: 1,
                },
            )
            .await
            .unwrap();
        });

        let mut client = EnvelopeStream::connect("127.0.0.1", addr.port()).await.unwrap();
        let envelope = client.recv().await.unwrap();
        assert!(matches!(envelope, Envelope::PtyOutput { .. }));
        server.await.unwrap();
    }
}
