use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors that may occur while decorating a DAP session.
#[derive(Debug, Error)]
pub enum DecorError {
    #[error("malformed DAP framing: {0}")]
    Framing(String),
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid DAP payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend binary `{binary}` could not be spawned: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("backend stdin unavailable")]
    StdinUnavailable,
    #[error("backend stdout unavailable")]
    StdoutUnavailable,
    #[error("invalid arguments for `{command}`: {source}")]
    InvalidArgs {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("backend terminated before responding")]
    BackendTerminated,
    #[error("{0}")]
    HandlerFailed(String),
    #[error("timeout")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("channel closed unexpectedly")]
    ChannelClosed,
}
