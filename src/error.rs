use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::json_repair::BraceBalance;

/// Machine-readable category of an [`ExtractError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    RateLimited,
    TimedOut,
    BadRequest,
    InvalidResponse,
    EmptyOrUnsupportedResponse,
    MalformedJson,
    SchemaViolation,
    InvalidInput,
    Config,
}

/// One mismatch between the candidate JSON and the dish schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// JSON path of the offending field, e.g. `ingredients[2].quantity`
    pub field: String,
    /// Human-readable description of what the schema expects
    pub expected: String,
    /// The value found, `None` when the field is missing
    pub actual: Option<Value>,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(value) => write!(f, "{}: expected {}, got {}", self.field, self.expected, value),
            None => write!(f, "{}: expected {}, field is missing", self.field, self.expected),
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while extracting a dish record
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Network or backend infrastructure failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Backend throttled the request
    #[error("Rate limited by backend: {message}")]
    RateLimited { message: String },

    /// Request or model timed out
    #[error("Request timed out: {message}")]
    TimedOut { message: String },

    /// Backend rejected the request itself
    #[error("Backend rejected request ({code}): {message}")]
    BadRequest { code: String, message: String },

    /// Backend answered with an empty or non-JSON body
    #[error("Invalid response from backend: {message}")]
    InvalidResponse { message: String, body: String },

    /// No usable text could be found in the backend payload
    #[error("Model returned empty/unsupported structure")]
    EmptyOrUnsupportedResponse { raw: Value },

    /// Extracted candidate is not JSON at all
    #[error("Malformed JSON ({balance}): {message}")]
    MalformedJson {
        message: String,
        text: String,
        balance: BraceBalance,
        /// Backend payload the candidate came from
        raw: Option<Value>,
    },

    /// Candidate is JSON but does not match the dish schema
    #[error("Schema violation: {}", join_violations(.violations))]
    SchemaViolation {
        violations: Vec<FieldViolation>,
        text: String,
        balance: BraceBalance,
        /// Backend payload the candidate came from
        raw: Option<Value>,
    },

    /// Caller supplied parameters outside the accepted ranges
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No credentials available for the backend
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// Local IO failure (reading an image file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Transport { .. } => ErrorKind::Transport,
            ExtractError::RateLimited { .. } => ErrorKind::RateLimited,
            ExtractError::TimedOut { .. } => ErrorKind::TimedOut,
            ExtractError::BadRequest { .. } => ErrorKind::BadRequest,
            ExtractError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            ExtractError::EmptyOrUnsupportedResponse { .. } => {
                ErrorKind::EmptyOrUnsupportedResponse
            }
            ExtractError::MalformedJson { .. } => ErrorKind::MalformedJson,
            ExtractError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            ExtractError::InvalidInput(_) => ErrorKind::InvalidInput,
            ExtractError::MissingCredentials(_)
            | ExtractError::ConfigError(_)
            | ExtractError::Io(_) => ErrorKind::Config,
        }
    }

    /// Whether the invoker should try the call again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::RateLimited | ErrorKind::TimedOut
        )
    }

    /// Backend payload attached to a decoding failure
    pub fn raw_payload(&self) -> Option<&Value> {
        match self {
            ExtractError::EmptyOrUnsupportedResponse { raw } => Some(raw),
            ExtractError::MalformedJson { raw, .. } | ExtractError::SchemaViolation { raw, .. } => {
                raw.as_ref()
            }
            _ => None,
        }
    }

    /// Attach the backend payload to a decoding failure; other errors pass through
    pub(crate) fn with_raw(mut self, payload: &Value) -> Self {
        if let ExtractError::MalformedJson { raw, .. } | ExtractError::SchemaViolation { raw, .. } =
            &mut self
        {
            *raw = Some(payload.clone());
        }
        self
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        ExtractError::Transport {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractError::TimedOut {
                message: err.to_string(),
            }
        } else {
            ExtractError::transport(err.to_string())
        }
    }
}
