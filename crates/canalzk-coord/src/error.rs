use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by coordination-store sessions.
///
/// `Connect` is cluster-level: nothing under that endpoint can be read this
/// round. Every other variant is local to one path lookup.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("{op} {path} timed out after {after:?}")]
    Timeout {
        op: &'static str,
        path: String,
        after: Duration,
    },

    #[error("no node at {0}")]
    NoNode(String),

    #[error("read {path} failed: {reason}")]
    Path { path: String, reason: String },

    #[error("session closed")]
    SessionClosed,
}

impl CoordError {
    pub fn is_connect(&self) -> bool {
        matches!(self, CoordError::Connect { .. })
    }

    pub fn is_no_node(&self) -> bool {
        matches!(self, CoordError::NoNode(_))
    }
}

pub type CoordResult<T> = std::result::Result<T, CoordError>;
