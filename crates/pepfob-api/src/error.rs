use thiserror::Error;

/// Top-level error type for the `pepfob-api` crate.
///
/// Covers every failure mode of the router REST surface: login,
/// transport, the `{stat, code, message}` envelope, and payload decoding.
/// `pepfob-core` maps these into the device-level taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected with code 301 / "Unauthorized".
    #[error("Invalid router credentials")]
    InvalidCredentials,

    /// Login succeeded but the account lacks GET or POST permission.
    #[error("Router account lacks API permission (GET: {get}, POST: {post})")]
    InsufficientPermission { get: bool, post: bool },

    /// Admin session cookie was rejected (401 / "Unauthorized").
    #[error("Admin session expired -- login required")]
    SessionExpired,

    /// Access token was rejected (401 / "Invalid access token").
    #[error("Access token expired or invalid")]
    InvalidAccessToken,

    /// Login reported success but no `auth=` cookie was set.
    #[error("Login response carried no session cookie")]
    MissingCookie,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Router API ──────────────────────────────────────────────────
    /// Envelope reported `stat != "ok"` for a non-auth reason.
    #[error("Router rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the router could not be reached at all
    /// (no envelope was ever received).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Returns `true` if this error indicates the cookie or token has
    /// expired and an in-band recovery might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::InvalidAccessToken)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// The envelope error code, if the router produced one.
    pub fn api_error_code(&self) -> Option<i64> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            Self::SessionExpired | Self::InvalidAccessToken => Some(401),
            Self::InvalidCredentials => Some(301),
            _ => None,
        }
    }
}
