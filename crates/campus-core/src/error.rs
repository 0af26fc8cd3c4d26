// ── Core error types ──
//
// Errors surfaced by the cache layer. Unlike `campus_api::Error` these are
// `Clone`, because one failed fetch is delivered to every caller attached
// to it and stored in the cache entry itself.

use std::time::Duration;

use thiserror::Error;

use campus_api::{ErrorKind, ResourceKind};

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Network errors (no response) ─────────────────────────────────
    #[error("Service unreachable: {message}")]
    Network { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Service responses ────────────────────────────────────────────
    /// 4xx; `message` is the service's own text, fit for form-level display.
    #[error("{message}")]
    Client { status: u16, message: String },

    #[error("Service error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    Deserialization { message: String },

    // ── Cache layer ──────────────────────────────────────────────────
    #[error("No resource source registered for {resource}")]
    NoSource { resource: ResourceKind },

    /// A fetch finished after a newer one was recorded for the same key.
    /// Logged and dropped; never reaches consumers.
    #[error("Discarded fetch #{seq} for {key}: fetch #{latest} supersedes it")]
    CacheConsistency { key: String, seq: u64, latest: u64 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// A timeout after `after`, reported in whole seconds rounded up.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            timeout_secs: campus_api::timeout_secs(after),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Client { .. } => ErrorKind::Client,
            Self::Server { .. } => ErrorKind::Server,
            Self::Deserialization { .. }
            | Self::NoSource { .. }
            | Self::CacheConsistency { .. }
            | Self::Config { .. }
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether an automatic retry may succeed. Client errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<campus_api::Error> for CoreError {
    fn from(err: campus_api::Error) -> Self {
        match err {
            campus_api::Error::Transport(ref e) => {
                // Adapters turn reqwest timeouts into `Timeout` themselves.
                if let Some(status) = e.status() {
                    if status.is_client_error() {
                        CoreError::Client {
                            status: status.as_u16(),
                            message: e.to_string(),
                        }
                    } else {
                        CoreError::Server {
                            status: status.as_u16(),
                            message: e.to_string(),
                        }
                    }
                } else if e.is_decode() {
                    CoreError::Deserialization {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Network {
                        message: e.to_string(),
                    }
                }
            }
            campus_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            campus_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            campus_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            campus_api::Error::Client { status, message } => CoreError::Client { status, message },
            campus_api::Error::Server { status, message } => CoreError::Server { status, message },
            campus_api::Error::Deserialization { message, body: _ } => {
                CoreError::Deserialization { message }
            }
        }
    }
}
