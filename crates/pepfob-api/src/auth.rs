use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Credentials attached to a single router request.
///
/// The router API is stateless per call: the admin cookie travels in the
/// `Cookie` header and the access token in the `accessToken` query
/// parameter. Either may be absent (e.g. before login, or while no API
/// client has been granted a token yet).
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub cookie: Option<SecretString>,
    pub token: Option<SecretString>,
}

impl AuthContext {
    pub fn new(cookie: Option<SecretString>, token: Option<SecretString>) -> Self {
        Self { cookie, token }
    }

    /// The `Cookie` header value, if a session cookie is held.
    pub(crate) fn cookie_header(&self) -> Option<&str> {
        self.cookie
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|c| !c.is_empty())
    }

    /// The access token as sent on the query string (empty when absent).
    pub(crate) fn token_param(&self) -> &str {
        self.token.as_ref().map_or("", ExposeSecret::expose_secret)
    }
}

/// Permission scope of a router API client.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ClientScope {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl ClientScope {
    /// The scope string the router expects on `auth.client` calls.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::ReadOnly => "api.read-only",
            Self::ReadWrite => "api",
        }
    }

    /// Decode a router scope string. Anything other than the full `api`
    /// scope is treated as read-only.
    pub fn from_wire(scope: &str) -> Self {
        if scope == "api" {
            Self::ReadWrite
        } else {
            Self::ReadOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_wire_names_round_trip() {
        assert_eq!(ClientScope::from_wire(ClientScope::ReadOnly.as_wire()), ClientScope::ReadOnly);
        assert_eq!(ClientScope::from_wire(ClientScope::ReadWrite.as_wire()), ClientScope::ReadWrite);
    }

    #[test]
    fn unknown_scope_is_read_only() {
        assert_eq!(ClientScope::from_wire("api.admin"), ClientScope::ReadOnly);
        assert_eq!(ClientScope::from_wire(""), ClientScope::ReadOnly);
    }

    #[test]
    fn scope_parses_from_config_names() {
        assert_eq!("read-only".parse::<ClientScope>().ok(), Some(ClientScope::ReadOnly));
        assert_eq!(ClientScope::ReadWrite.to_string(), "read-write");
    }

    #[test]
    fn empty_cookie_is_not_sent() {
        let auth = AuthContext::new(Some(SecretString::from(String::new())), None);
        assert!(auth.cookie_header().is_none());
        assert_eq!(auth.token_param(), "");
    }
}
