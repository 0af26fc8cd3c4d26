//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use campus_config::ConfigError;
use campus_core::{CoreError, ResourceKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the service: {message}")]
    #[diagnostic(
        code(campus::connection_failed),
        help(
            "Check that the service is running and the URL is right.\n\
             Try: campus resources"
        )
    )]
    ConnectionFailed { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(campus::timeout),
        help("Increase the timeout with --timeout or check service responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Service responses ────────────────────────────────────────────
    #[error("{resource} '{identifier}' not found")]
    #[diagnostic(
        code(campus::not_found),
        help("Run: campus list {resource} to see available records")
    )]
    NotFound {
        resource: ResourceKind,
        identifier: String,
    },

    #[error("Request rejected (HTTP {status}): {message}")]
    #[diagnostic(code(campus::rejected))]
    Rejected { status: u16, message: String },

    #[error("Service error (HTTP {status}): {message}")]
    #[diagnostic(code(campus::service_error))]
    ServiceError { status: u16, message: String },

    #[error("No endpoint configured for {resource}")]
    #[diagnostic(
        code(campus::no_endpoint),
        help(
            "Set a gateway (--gateway or CAMPUS_GATEWAY) or a URL for the {resource} service \
             (services.<service> in your profile, or CAMPUS_SERVICES__<SERVICE>)."
        )
    )]
    NoEndpoint { resource: ResourceKind },

    #[error(transparent)]
    #[diagnostic(code(campus::core))]
    Core(CoreError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(campus::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(campus::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(campus::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: campus config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No service endpoints configured")]
    #[diagnostic(
        code(campus::no_config),
        help(
            "Create a profile with: campus config init\n\
             Or pass --gateway / set CAMPUS_GATEWAY.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(campus::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(campus::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { status, .. } => match status {
                401 | 403 => exit_code::PERMISSION,
                404 => exit_code::NOT_FOUND,
                409 => exit_code::CONFLICT,
                _ => exit_code::GENERAL,
            },
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::ServiceError { .. }
            | Self::NoEndpoint { .. }
            | Self::Core(_)
            | Self::NoConfig { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }

    /// A 404 on a known record becomes `NotFound`; everything else converts as usual.
    pub fn for_record(err: CoreError, resource: ResourceKind, id: &str) -> Self {
        if err.is_not_found() {
            Self::NotFound {
                resource,
                identifier: id.to_owned(),
            }
        } else {
            err.into()
        }
    }
}

// ── Conversion from CoreError ───────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { message } => Self::ConnectionFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Client { status, message } => Self::Rejected { status, message },
            CoreError::Server { status, message } => Self::ServiceError { status, message },
            CoreError::NoSource { resource } => Self::NoEndpoint { resource },
            other => Self::Core(other),
        }
    }
}
