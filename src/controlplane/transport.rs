//! TCP transport for the control-plane client: a length-prefixed JSON
//! connection, generalized from a Unix-socket daemon IPC scheme to the
//! host/port pair the runtime is configured with.

use tokio::net::TcpStream;
use tokio::time::{sleep, Duration, Instant};

use super::protocol::{framing, Request, Response};
use crate::error::{ControlPlaneError, HarnessError, Result};

pub struct Transport {
    stream: TcpStream,
}

impl Transport {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| HarnessError::ControlPlane(ControlPlaneError::Transport(e.to_string())))?;
        Ok(Self { stream })
    }

    /// Retries the initial connection for up to `retry_window_ms`, waiting
    /// `retry_delay_ms` between attempts (`HARNESS_CONTROL_PLANE_CONNECT_RETRY_*`).
    pub async fn connect_with_retry(
        host: &str,
        port: u16,
        retry_window_ms: u64,
        retry_delay_ms: u64,
    ) -> Result<Self> {
        let deadline = Instant::now() + Duration::from_millis(retry_window_ms);
        loop {
            match Self::connect(host, port).await {
                Ok(transport) => return Ok(transport),
                Err(err) => {
                    if Instant::now() >= deadline {
                        return Err(err);
                    }
                    sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        framing::write_message(&mut self.stream, request)
            .await
            .map_err(|e| HarnessError::ControlPlane(ControlPlaneError::Transport(e.to_string())))?;
        framing::read_message(&mut self.stream)
            .await
            .map_err(|e| HarnessError::ControlPlane(ControlPlaneError::Transport(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_closed_port_surfaces_transport_error() {
        let result = Transport::connect("127.0.0.1", 1).await;
        assert!(result.is_err());
    }
}
