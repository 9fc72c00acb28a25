use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Text shown when a request could not reach the server or was refused.
pub const CONNECTION_FAILED: &str = "Failed to connect to server";

/// Text shown when a streamed request outlives its timeout.
pub const TIMED_OUT: &str =
    "Response took too long. Please try with a shorter prompt or use the stop button.";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("request timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Form(String),
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Decode(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Decode(err.to_string())
    }
}

impl ConsoleError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConsoleError::Timeout(_))
    }

    /// What the user sees for this failure. Transport and status failures all
    /// collapse into one connection message; timeouts keep their own text.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Timeout(_) => TIMED_OUT.to_string(),
            ConsoleError::Status { .. }
            | ConsoleError::Network(_)
            | ConsoleError::Read(_)
            | ConsoleError::Decode(_) => CONNECTION_FAILED.to_string(),
            ConsoleError::Url(e) => format!("Invalid server address: {e}"),
            ConsoleError::Io(e) => e.to_string(),
            ConsoleError::Form(message) => message.clone(),
        }
    }
}

const BENIGN_FRAGMENTS: &[&str] = &[
    "channel closed",
    "message channel closed",
    "receiving end does not exist",
    "context invalidated",
];

/// Whether a background failure is shutdown noise rather than a real problem.
pub fn is_benign(message: &str) -> bool {
    let message = message.to_lowercase();
    BENIGN_FRAGMENTS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Single sink for failures of detached tasks.
pub fn report_background_error(context: &str, message: &str) {
    if is_benign(message) {
        debug!("{} (ignored): {}", context, message);
        return;
    }
    error!("{}: {}", context, message);
}
