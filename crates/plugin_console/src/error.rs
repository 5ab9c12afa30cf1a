use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors from opening the client (write) side of a channel.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No viewer accepted the connection before the deadline. This is the normal
    /// "viewer not running" state, not a fault.
    #[error("no viewer bound `{endpoint}` within {timeout:?}")]
    Unavailable { endpoint: String, timeout: Duration },
    #[error("failed to connect to `{endpoint}`: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

/// Errors from binding the server (read) side of a channel.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("channel `{endpoint}` is already bound by another viewer")]
    AlreadyBound { endpoint: String },
    #[error("failed to prepare runtime directory `{path}`: {source}")]
    RuntimeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind `{endpoint}`: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

/// Errors from waiting for a producer connection.
#[derive(Debug, Error)]
pub enum AcceptError {
    #[error("accept was cancelled")]
    Cancelled,
    #[error("failed to accept a connection: {0}")]
    Io(#[source] io::Error),
}

/// Errors from locating or spawning the viewer executable.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("viewer executable not found (searched: {searched:?})")]
    NotFound { searched: Vec<PathBuf> },
    #[error("viewer `{binary}` could not be spawned: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Malformed message templates. These are caller bugs and are always surfaced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder index {index} is out of range ({len} argument(s) supplied)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unclosed placeholder starting at byte {position}")]
    UnclosedPlaceholder { position: usize },
    #[error("unexpected `}}` at byte {position}")]
    UnexpectedCloseBrace { position: usize },
    #[error("invalid placeholder at byte {position}")]
    InvalidIndex { position: usize },
    #[error("alignment {alignment} of the placeholder at byte {position} is out of range")]
    AlignmentOutOfRange { position: usize, alignment: i64 },
}

/// Errors that end the viewer loop.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Bind(#[from] BindError),
}
