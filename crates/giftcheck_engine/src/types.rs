use std::fmt;

use giftcheck_core::{AnalysisMode, BatchId, ClassificationResult};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The probe ran and the batch is committed to one mode.
    ModeSelected { batch_id: BatchId, mode: AnalysisMode },
    Progress {
        batch_id: BatchId,
        completed: usize,
        total: usize,
    },
    Result {
        batch_id: BatchId,
        result: ClassificationResult,
    },
    /// Every lane is drained. `Ok` carries the number of results produced.
    BatchCompleted {
        batch_id: BatchId,
        result: Result<usize, BatchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("invalid batch configuration: {0}")]
    InvalidConfig(&'static str),
    /// The batch task panicked or was cancelled before it could report.
    #[error("batch task failed: {0}")]
    Crashed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not set up remote client: {0}")]
    Remote(#[from] RemoteError),
    #[error("engine thread stopped")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// Body was not the JSON shape the endpoint promises.
    MalformedBody,
    /// The service answered with an `{error}` body.
    Service,
    CountMismatch { expected: usize, actual: usize },
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::InvalidUrl => write!(f, "invalid url"),
            RemoteErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            RemoteErrorKind::Timeout => write!(f, "timeout"),
            RemoteErrorKind::Network => write!(f, "network error"),
            RemoteErrorKind::MalformedBody => write!(f, "malformed response body"),
            RemoteErrorKind::Service => write!(f, "service error"),
            RemoteErrorKind::CountMismatch { expected, actual } => {
                write!(f, "expected {expected} results, got {actual}")
            }
        }
    }
}
