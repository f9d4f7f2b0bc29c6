//! Error types for the lighting test harness.
//!
//! All fallible operations in lightcheck return [`HarnessError`]. Errors carry
//! structured context and classify themselves so that test code can decide
//! between retrying, skipping, and failing.
//!
//! ## Error Categories
//!
//! - **Capture Errors**: UDP bind conflicts, lifecycle misuse, socket I/O
//! - **Transport Errors**: HTTP and WebSocket failures talking to the server
//! - **GraphQL Errors**: errors reported by the server in a GraphQL response
//! - **Data Errors**: configuration values and payloads that fail to parse
//!
//! Malformed Art-Net packets and channel mismatches are deliberately absent:
//! the decoder reports them as `None` and the comparator as data.
//!
//! ## Skipping on Bind Conflicts
//!
//! The Art-Net port is often held by other lighting software on the host.
//! Tests treat that as an environment problem rather than a failure:
//!
//! ```rust
//! use lightcheck::HarnessError;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "0.0.0.0:6454".parse().unwrap();
//! let io_err = std::io::Error::from(std::io::ErrorKind::AddrInUse);
//! let error = HarnessError::bind_failed(addr, io_err);
//!
//! if error.is_bind_conflict() {
//!     println!("skipping: {}", error);
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::graphql::GraphqlError;

/// Result type alias for harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("Failed to bind Art-Net socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Receiver is already listening on {addr}")]
    AlreadyListening { addr: SocketAddr },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {duration:?} waiting for {waiting_for}")]
    Timeout { duration: Duration, waiting_for: String },

    #[error("Invalid configuration for {key}: {details}")]
    Config { key: String, details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("HTTP request to {endpoint} failed")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {endpoint}: {body}")]
    HttpStatus { endpoint: String, status: u16, body: String },

    #[error("GraphQL error: {}", summarize_graphql_errors(.errors))]
    Graphql { errors: Vec<GraphqlError> },

    #[error("GraphQL response for {operation} carried no data")]
    MissingData { operation: String },

    #[error("WebSocket failure: {reason}")]
    WebSocket {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Subscription protocol violation: {details}")]
    SubscriptionProtocol { details: String },
}

fn summarize_graphql_errors(errors: &[GraphqlError]) -> String {
    match errors {
        [] => "no error details".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

impl HarnessError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarnessError::Bind { .. } => true,
            HarnessError::Timeout { .. } => true,
            HarnessError::Http { .. } => true,
            HarnessError::WebSocket { .. } => true,
            HarnessError::HttpStatus { status, .. } => *status >= 500,
            HarnessError::AlreadyListening { .. } => false,
            HarnessError::Io { .. } => false,
            HarnessError::Config { .. } => false,
            HarnessError::Parse { .. } => false,
            HarnessError::Graphql { .. } => false,
            HarnessError::MissingData { .. } => false,
            HarnessError::SubscriptionProtocol { .. } => false,
        }
    }

    /// Returns true when the capture port was already taken by another socket.
    ///
    /// Callers skip the dependent test in this case instead of failing it.
    pub fn is_bind_conflict(&self) -> bool {
        matches!(
            self,
            HarnessError::Bind { source, .. } if source.kind() == std::io::ErrorKind::AddrInUse
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            HarnessError::Bind { .. } => vec![
                "Stop other Art-Net software listening on the same port",
                "Bind to a loopback address or an alternate port",
                "Skip capture-dependent tests on this host",
            ],
            HarnessError::AlreadyListening { .. } => {
                vec!["Call stop() before starting the receiver again"]
            }
            HarnessError::Io { .. } => vec![
                "Check network interface availability",
                "Verify socket permissions",
            ],
            HarnessError::Timeout { .. } => vec![
                "Increase the wait timeout",
                "Check that the server is transmitting Art-Net to this host",
                "Verify the universe numbering (wire universes are 0-indexed)",
            ],
            HarnessError::Config { .. } => vec![
                "Check environment variable values",
                "Validate the YAML configuration file",
            ],
            HarnessError::Parse { .. } => vec![
                "Check the server's GraphQL schema against the expected response shape",
                "Verify source data integrity",
            ],
            HarnessError::Http { .. } => vec![
                "Ensure the lighting server is running",
                "Check the GraphQL endpoint URL",
                "Retry after the server finishes starting",
            ],
            HarnessError::HttpStatus { .. } => vec![
                "Check the GraphQL endpoint path",
                "Inspect the server logs for the failing request",
            ],
            HarnessError::Graphql { .. } => vec![
                "Check the query against the server schema",
                "Verify variable values (API universes are 1-indexed)",
            ],
            HarnessError::MissingData { .. } => {
                vec!["Check that the operation selects at least one field"]
            }
            HarnessError::WebSocket { .. } => vec![
                "Ensure the subscription endpoint is reachable",
                "Check the WebSocket URL scheme (ws:// or wss://)",
            ],
            HarnessError::SubscriptionProtocol { .. } => {
                vec!["Verify the server speaks the graphql-transport-ws protocol"]
            }
        }
    }

    /// Helper constructor for bind failures.
    pub fn bind_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        HarnessError::Bind { addr, source }
    }

    /// Helper constructor for I/O errors with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HarnessError::Io { context: context.into(), source }
    }

    /// Helper constructor for timeouts.
    pub fn timeout(duration: Duration, waiting_for: impl Into<String>) -> Self {
        HarnessError::Timeout { duration, waiting_for: waiting_for.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(key: impl Into<String>, details: impl Into<String>) -> Self {
        HarnessError::Config { key: key.into(), details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        HarnessError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for WebSocket failures.
    pub fn websocket(reason: impl Into<String>) -> Self {
        HarnessError::WebSocket { reason: reason.into(), source: None }
    }

    /// Helper constructor for WebSocket failures with source.
    pub fn websocket_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        HarnessError::WebSocket { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for subscription protocol violations.
    pub fn protocol(details: impl Into<String>) -> Self {
        HarnessError::SubscriptionProtocol { details: details.into() }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io { context: "<unknown>".to_string(), source: err }
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|url| url.to_string()).unwrap_or_else(|| "<unknown>".into());
        HarnessError::Http { endpoint, source: err }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Parse { context: "JSON".to_string(), details: err.to_string() }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for HarnessError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        HarnessError::WebSocket { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}
