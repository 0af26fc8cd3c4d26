use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a failed resource call.
///
/// Derived from the HTTP status when the service answered, or from the
/// transport failure when it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// No response: connection refused, DNS failure, timeout.
    Network,
    /// 4xx: validation, auth, not found.
    Client,
    /// 5xx.
    Server,
    /// Malformed response or local misconfiguration.
    Internal,
}

/// Top-level error type for the `campus-api` crate.
///
/// Covers every failure mode of a resource adapter. `campus-core` maps
/// these into its own cloneable error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Service responses ───────────────────────────────────────────
    /// The service rejected the request (HTTP 4xx).
    #[error("Request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// The service failed to handle the request (HTTP 5xx).
    #[error("Service error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// A timeout after `after`, reported in whole seconds.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            timeout_secs: timeout_secs(after),
        }
    }

    /// Classify this error as network, client, server, or internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) => match e.status() {
                Some(s) if s.is_client_error() => ErrorKind::Client,
                Some(s) if s.is_server_error() => ErrorKind::Server,
                _ if e.is_decode() || e.is_builder() => ErrorKind::Internal,
                _ => ErrorKind::Network,
            },
            Self::Timeout { .. } => ErrorKind::Network,
            Self::Client { .. } => ErrorKind::Client,
            Self::Server { .. } => ErrorKind::Server,
            Self::InvalidUrl(_) | Self::Tls(_) | Self::Deserialization { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status code, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Seconds to report for a timeout, rounding any fraction up so a
/// sub-second limit never reads as `0s`.
pub fn timeout_secs(after: Duration) -> u64 {
    after.as_secs() + u64::from(after.subsec_nanos() > 0)
}
