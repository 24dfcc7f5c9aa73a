//! Error types for the screener client.

use crate::screener::model::AnswerValue;
use crate::screener::state::FlowPhase;

/// Message shown to the user when the questionnaire cannot be loaded.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch screener";

/// Message shown to the user when the final answer set cannot be submitted.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit answers. Please try again.";

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the screener backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Invalid screener definition: {0}")]
    InvalidScreener(String),

    #[error("Invalid {header} header value {value:?}: {reason}")]
    InvalidHeader {
        header: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised by the question flow state machine.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Failed to fetch screener: {0}")]
    Fetch(ApiError),

    #[error("Failed to submit answers: {0}")]
    Submission(ApiError),

    #[error("Answer value {value} is not one of the available options")]
    InvalidAnswer { value: AnswerValue },

    #[error("Cannot answer while the screener is {phase}")]
    NotAnswerable { phase: FlowPhase },

    #[error("Nothing to retry while the screener is {phase}")]
    NothingToRetry { phase: FlowPhase },

    #[error("A request is already in flight")]
    Busy,
}

impl FlowError {
    /// The message to show the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(_) => FETCH_FAILED_MESSAGE.to_string(),
            Self::Submission(_) => SUBMIT_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for the screener client.
pub type Result<T> = std::result::Result<T, Error>;
