//! Error types for the requester core library
//!
//! Every failure the transport can surface is a variant of [`Error`]. The
//! display string of each variant is the message a caller shows to a user:
//! the status text for a failed request, or one of the fixed messages for
//! timeouts and exhausted retries.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Message used when the transport reports a timeout or an aborted call
pub const TIMEOUT_MESSAGE: &str = "Query timeout was reached";

/// Message used when every attempt returned a retryable status
pub const RETRY_EXHAUSTED_MESSAGE: &str = "Could not successfully complete this request";

/// Description used when a JSON error body carries neither `error` nor `message`
pub const DEFAULT_ERROR_DESCRIPTION: &str = "API Request Error";

/// Main error type for requester operations
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying network call timed out or was aborted
    #[error("{}", TIMEOUT_MESSAGE)]
    TransportTimeout,

    /// The server answered with a non-ok status outside the retryable set
    #[error("{message}")]
    RequestFailed {
        /// Status text of the failing response, e.g. "Not Found"
        message: String,
        /// Structured description plus the response it was read from
        cause: Box<FailureCause>,
    },

    /// Every attempt produced a retryable status
    #[error("{}", RETRY_EXHAUSTED_MESSAGE)]
    RetryExhausted {
        attempts: u32,
        last_status: u16,
    },

    /// A JSON-typed error body could not be parsed
    #[error("Malformed error response body: {source}")]
    MalformedErrorBody {
        #[source]
        source: serde_json::Error,
        response: Box<FailedResponse>,
    },

    /// Any other transport failure (connection refused, DNS, TLS, ...)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The endpoint and prefix do not form a valid URL
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A successful JSON response body could not be parsed
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The structured cause attached to a failed request, if any
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Error::RequestFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// The response snapshot behind this error, if the server answered at all
    pub fn response(&self) -> Option<&FailedResponse> {
        match self {
            Error::RequestFailed { cause, .. } => Some(&cause.response),
            Error::MalformedErrorBody { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status of the response behind this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RetryExhausted { last_status, .. } => Some(*last_status),
            _ => self.response().map(|r| r.status),
        }
    }
}

/// Cause attached to [`Error::RequestFailed`]
#[derive(Debug, Clone, PartialEq)]
pub struct FailureCause {
    /// Best-effort description taken from the error body
    pub description: String,
    /// The response that produced the failure
    pub response: FailedResponse,
}

/// Snapshot of a response that ended a call with an error.
///
/// The body has already been consumed to build the description, so only the
/// metadata a caller may want to introspect is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedResponse {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl FailedResponse {
    /// Look up a header by name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl fmt::Display for FailedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.status, self.status_text, self.url)
    }
}
