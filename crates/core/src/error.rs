//! Error types for Rostrum Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Invalid secret for channel {0}")]
    InvalidSecret(String),

    #[error("Channel already exists: {0}")]
    DuplicateChannel(String),

    #[error("Response already submitted for this phase")]
    DuplicateSubmission,

    #[error("Client is read-only in this channel")]
    ReadOnlyViolation,

    #[error("Phase is closed while the moderator reviews it")]
    AnalysisInFlight,

    #[error("AI analysis unavailable: {0}")]
    AiUnavailable(String),

    #[error("Secret error: {0}")]
    Secret(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
