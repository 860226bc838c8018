//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use pepfob_config::ConfigError;
use pepfob_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the router at {url}")]
    #[diagnostic(
        code(pepfob::unreachable),
        help(
            "Check that the router is powered and on this network.\n\
             Reason: {reason}\n\
             Override the address with --router or router.ip in the settings file."
        )
    )]
    Unreachable { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The router rejected the admin username or password")]
    #[diagnostic(
        code(pepfob::auth_failed),
        help("Update the password with: pepfob config set-password")
    )]
    AuthFailed,

    #[error("No router admin password configured")]
    #[diagnostic(
        code(pepfob::no_credentials),
        help(
            "Store one with: pepfob config set-password\n\
             Or set the PEPFOB_ROUTER_PASSWORD environment variable."
        )
    )]
    NoCredentials,

    #[error("Router session lost: {message}")]
    #[diagnostic(
        code(pepfob::session_lost),
        help("Run: pepfob session --force-recreate")
    )]
    SessionLost { message: String },

    #[error("The admin account lacks API permission (GET: {get}, POST: {post})")]
    #[diagnostic(
        code(pepfob::permission),
        help("Grant the account read and write access under System > Admin Security.")
    )]
    PermissionDenied { get: bool, post: bool },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pepfob::not_found),
        help("Run: pepfob {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Router error{}: {message}", .code.map(|c| format!(" ({c})")).unwrap_or_default())]
    #[diagnostic(code(pepfob::api_error))]
    ApiError { code: Option<i64>, message: String },

    #[error("Unexpected router response: {message}")]
    #[diagnostic(
        code(pepfob::bad_response),
        help("Re-run with -vv to log the raw exchange.")
    )]
    BadResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pepfob::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(pepfob::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Settings error: {message}")]
    #[diagnostic(
        code(pepfob::config),
        help("Inspect the file with: pepfob config show")
    )]
    Config { message: String },

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(pepfob::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials | Self::SessionLost { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in the router address an `Unreachable` error refers to.
    pub fn at_router(self, url: &str) -> Self {
        match self {
            Self::Unreachable { reason, .. } => Self::Unreachable {
                url: url.to_owned(),
                reason,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { reason } => CliError::Unreachable {
                url: String::new(),
                reason,
            },

            CoreError::InvalidCredentials => CliError::AuthFailed,

            CoreError::InsufficientPermission { get, post } => {
                CliError::PermissionDenied { get, post }
            }

            e @ (CoreError::SessionExpired { .. }
            | CoreError::TokenExpiredOrInvalid { .. }
            | CoreError::NotLoggedIn) => CliError::SessionLost {
                message: e.to_string(),
            },

            CoreError::NoClient => CliError::NotFound {
                resource_type: "API client".into(),
                identifier: "(any)".into(),
                list_command: "clients list".into(),
            },

            CoreError::ApiRejected { code, message } => CliError::ApiError { code, message },

            e @ (CoreError::MalformedResponse { .. } | CoreError::UnsupportedWanType { .. }) => {
                CliError::BadResponse {
                    message: e.to_string(),
                }
            }

            CoreError::Store { message } | CoreError::Config { message } => {
                CliError::Config { message }
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials => CliError::NoCredentials,
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
