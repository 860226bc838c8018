// ── Core error types ──
//
// Device-level errors from pepfob-core. Consumers never see raw envelope
// codes or JSON parse failures; the `From<pepfob_api::Error>` impl
// translates transport-layer errors into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Router unreachable: {reason}")]
    Unreachable { reason: String },

    // ── Authentication errors ────────────────────────────────────────
    #[error("Invalid router credentials")]
    InvalidCredentials,

    #[error("Router account lacks API permission (GET: {get}, POST: {post})")]
    InsufficientPermission { get: bool, post: bool },

    /// The admin cookie was rejected. `recovered` reports whether the
    /// in-band re-login succeeded, so an immediate retry should work.
    #[error("Admin session expired (re-login {})", outcome(*.recovered))]
    SessionExpired { recovered: bool },

    /// The access token was rejected. `recovered` reports whether the
    /// in-band token refresh succeeded.
    #[error("Access token expired or invalid (refresh {})", outcome(*.recovered))]
    TokenExpiredOrInvalid { recovered: bool },

    #[error("Not logged in to the router")]
    NotLoggedIn,

    #[error("No API client available")]
    NoClient,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed router response: {message}")]
    MalformedResponse { message: String },

    #[error("Router rejected request: {message}")]
    ApiRejected { code: Option<i64>, message: String },

    #[error("Unsupported WAN type {kind:?} for WAN {id}")]
    UnsupportedWanType { id: u8, kind: String },

    // ── Persistence & configuration ──────────────────────────────────
    #[error("Credential store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

fn outcome(recovered: bool) -> &'static str {
    if recovered { "succeeded" } else { "failed" }
}

impl CoreError {
    /// `true` when the failed call already triggered a successful
    /// recovery, so invoking it again right away will likely succeed.
    pub fn retry_ready(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired { recovered: true } | Self::TokenExpiredOrInvalid { recovered: true }
        )
    }

    /// `true` if the router could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pepfob_api::Error> for CoreError {
    fn from(err: pepfob_api::Error) -> Self {
        match err {
            pepfob_api::Error::InvalidCredentials => CoreError::InvalidCredentials,
            pepfob_api::Error::InsufficientPermission { get, post } => {
                CoreError::InsufficientPermission { get, post }
            }
            pepfob_api::Error::SessionExpired => CoreError::SessionExpired { recovered: false },
            pepfob_api::Error::InvalidAccessToken => {
                CoreError::TokenExpiredOrInvalid { recovered: false }
            }
            pepfob_api::Error::MissingCookie => CoreError::MalformedResponse {
                message: "login response carried no session cookie".into(),
            },
            pepfob_api::Error::Transport(e) => CoreError::Unreachable {
                reason: e.to_string(),
            },
            pepfob_api::Error::Tls(msg) => CoreError::Unreachable {
                reason: format!("TLS error: {msg}"),
            },
            pepfob_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            pepfob_api::Error::Rejected { code, message } => CoreError::ApiRejected {
                code: Some(code),
                message,
            },
            pepfob_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recovered_auth_errors_are_retry_ready() {
        assert!(CoreError::SessionExpired { recovered: true }.retry_ready());
        assert!(CoreError::TokenExpiredOrInvalid { recovered: true }.retry_ready());
        assert!(!CoreError::TokenExpiredOrInvalid { recovered: false }.retry_ready());
        assert!(!CoreError::NoClient.retry_ready());
    }

    #[test]
    fn api_errors_map_onto_taxonomy() {
        let rejected: CoreError = pepfob_api::Error::Rejected {
            code: 404,
            message: "Not found".into(),
        }
        .into();
        assert!(matches!(rejected, CoreError::ApiRejected { code: Some(404), .. }));

        let token: CoreError = pepfob_api::Error::InvalidAccessToken.into();
        assert!(matches!(token, CoreError::TokenExpiredOrInvalid { recovered: false }));
    }
}
