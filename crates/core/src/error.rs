//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delta response carried neither a next link nor a delta link")]
    MissingCursor,

    #[error("No destination record for task: {0}")]
    RecordNotFound(String),

    /// `truncated` means the destination stopped listing matches, so `count`
    /// is a lower bound
    #[error("Found {count}{} destination records for task: {task_id}", or_more(.truncated))]
    AmbiguousRecord {
        task_id: String,
        count: usize,
        truncated: bool,
    },

    #[error("Invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn or_more(truncated: &bool) -> &'static str {
    if *truncated {
        " or more"
    } else {
        ""
    }
}

impl Error {
    /// Build a `Status` error from a non-success HTTP response body
    pub fn status(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            service,
            status,
            message: message.into(),
        }
    }

    /// Whether a retry of the same remote call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status { .. } | Self::Serialization(_) | Self::MissingCursor
        )
    }
}
