//! Error type for the Auditor client

use auditor_shared::{EnvelopeError, EventId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service answered with an error envelope.
    #[error("remote error: {0}")]
    Remote(String),

    /// The service refused to `set` an attribute that already holds several values.
    #[error("detail conflict: {0}")]
    DetailConflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("event {0} is closed")]
    EventClosed(EventId),

    #[error("invalid header filter: {0}")]
    InvalidFilter(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Timeouts and connection failures talking to the service
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        if value.is_decode() {
            return Self::InvalidResponse(value.to_string());
        }
        Self::Transport(value.to_string())
    }
}

impl From<EnvelopeError> for Error {
    fn from(value: EnvelopeError) -> Self {
        if value.is_detail_conflict() {
            return Self::DetailConflict(value.msg);
        }
        Self::Remote(value.msg)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidResponse(value.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(value: config::ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
