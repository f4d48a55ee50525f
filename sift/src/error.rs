//! Error types for the search facade

use std::fmt;

/// Facade errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Request carries no aggregation")]
    MissingAggregation,

    #[error("Request carries no collapse directive")]
    MissingCollapse,

    #[error("Invalid index name: {0:?}")]
    InvalidIndex(String),

    #[error("Search failed with response status [{status}]")]
    EngineStatus { status: String },

    #[error("Unexpected aggregation shape: expected {expected}, found {found}")]
    UnexpectedAggregate {
        expected: &'static str,
        found: String,
    },

    #[error("Sub-aggregation not found in bucket: {0}")]
    MissingSubAggregation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before any network activity
    Precondition,
    /// The engine answered with a non-success status
    EngineStatus,
    /// Network failure or an unreadable response
    Transport,
    /// The response did not have the aggregation shape the caller asked for
    Shape,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAggregation | Self::MissingCollapse | Self::InvalidIndex(_) => {
                ErrorKind::Precondition
            }
            Self::EngineStatus { .. } => ErrorKind::EngineStatus,
            Self::Transport(_) | Self::Http(_) | Self::Decode(_) | Self::InvalidUrl(_) => {
                ErrorKind::Transport
            }
            Self::UnexpectedAggregate { .. } | Self::MissingSubAggregation(_) => ErrorKind::Shape,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::EngineStatus => "engine_status",
            Self::Transport => "transport",
            Self::Shape => "shape",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
