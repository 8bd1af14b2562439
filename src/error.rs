//! Typed error taxonomy for the runtime.
//!
//! `anyhow` is still used at the outermost boundaries (CLI entry, startup)
//! exactly as a thin CLI layer would; internally, fallible subsystems
//! return `HarnessError` so the propagation policy (recover / surface /
//! fatal) can pattern-match on a concrete kind instead of downcasting.

use thiserror::Error;

/// Top-level error kind for the runtime core.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("control-plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

/// Errors arising from control-plane RPC calls.
#[derive(Debug, Error, Clone)]
pub enum ControlPlaneError {
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("session not live: {session_id}")]
    SessionNotLive { session_id: String },

    #[error("request aborted")]
    Aborted,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ControlPlaneError {
    /// Whether this error is expected/non-fatal ("session-not-found
    /// and session-not-live errors are distinguished and non-fatal").
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            ControlPlaneError::SessionNotFound { .. }
                | ControlPlaneError::SessionNotLive { .. }
                | ControlPlaneError::Aborted
        )
    }
}

/// Errors arising from the observed-event projection reducer.
#[derive(Debug, Error, Clone)]
pub enum ProjectionError {
    #[error("event cursor {received} is not after last-applied cursor {last_applied} for {entity}")]
    StaleCursor {
        entity: String,
        received: u64,
        last_applied: u64,
    },

    #[error("referenced entity not found: {0}")]
    MissingEntity(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
