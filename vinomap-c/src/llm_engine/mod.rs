pub mod ollama_engine;
pub mod stream;

use reqwest::{Client, StatusCode};
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub use stream::StreamAggregator;

/// Outcome of one call to the inference endpoint.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The endpoint answered but produced no text.
    #[error("inference endpoint returned no usable text")]
    EmptyResponse,
    #[error("transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },
    #[error("invalid response from inference endpoint: {0}")]
    Decode(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Refused,
    Timeout,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Refused => write!(f, "connection refused"),
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::Other => write!(f, "other"),
        }
    }
}

impl TransportKind {
    /// Fallback for errors that carry no structured signal.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Connection refused") {
            TransportKind::Refused
        } else if message.to_ascii_lowercase().contains("timeout") {
            TransportKind::Timeout
        } else {
            TransportKind::Other
        }
    }
}

impl InferenceError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        InferenceError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            InferenceError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return InferenceError::Unexpected(err.to_string());
        }
        let message = error_chain(&err);
        if err.is_decode() {
            return InferenceError::Decode(message);
        }

        let kind = if err.is_timeout() || has_io_kind(&err, io::ErrorKind::TimedOut) {
            TransportKind::Timeout
        } else if has_io_kind(&err, io::ErrorKind::ConnectionRefused) {
            TransportKind::Refused
        } else {
            TransportKind::from_message(&message)
        };
        InferenceError::Transport { kind, message }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}

fn has_io_kind(err: &(dyn StdError + 'static), kind: io::ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Re-send policy for transient upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub const RETRY_STATUSES: [StatusCode; 4] = [
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::BAD_GATEWAY,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::GATEWAY_TIMEOUT,
    ];

    pub fn should_retry(&self, status: StatusCode) -> bool {
        Self::RETRY_STATUSES.contains(&status)
    }

    /// Delay before retry number `attempt` (zero based): base, 2*base, 4*base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

pub struct OllamaEngine {
    client: Client,
    url: String,
    retry: RetryPolicy,
}
