// Admin login
//
// The router hands back its admin session in a `Set-Cookie` header whose
// name depends on the scheme (`bauth` over plain HTTP, `pauth` over TLS).
// The cookie is extracted by locating the `auth=` marker rather than a
// fixed name.

use reqwest::header::SET_COOKIE;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::Error;
use crate::router::client::{MSG_UNAUTHORIZED, RouterClient, classify, parse_envelope};
use crate::router::models::LoginResponse;
use crate::router::paths;

const COOKIE_MARKER: &str = "auth=";

impl RouterClient {
    /// Authenticate with the admin account and return the session cookie
    /// (`name=value`, ready for the `Cookie` header).
    ///
    /// `POST /api/login` with `{username, password}`.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let url = self.api_url(paths::LOGIN)?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let cookie = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(extract_auth_cookie);

        let text = resp.text().await.map_err(Error::Transport)?;
        let envelope = parse_envelope(&text)?;

        if envelope.stat != "ok"
            && envelope.code == Some(301)
            && envelope.message.as_deref() == Some(MSG_UNAUTHORIZED)
        {
            return Err(Error::InvalidCredentials);
        }
        let payload = classify(envelope)?;

        let login: LoginResponse =
            serde_json::from_value(payload).map_err(|e| Error::Deserialization {
                message: format!("login response: {e}"),
                body: text.clone(),
            })?;

        if let Some(permission) = login.permission {
            if !permission.allows_get() || !permission.allows_post() {
                warn!(
                    get = permission.allows_get(),
                    post = permission.allows_post(),
                    "admin account lacks API permission"
                );
                return Err(Error::InsufficientPermission {
                    get: permission.allows_get(),
                    post: permission.allows_post(),
                });
            }
        }

        let cookie = cookie.ok_or(Error::MissingCookie)?;
        debug!("login successful");
        Ok(SecretString::from(cookie))
    }
}

/// Pull the session cookie out of one `Set-Cookie` header value.
///
/// Takes the character before `auth=` (when there is one) as part of the
/// name and stops at the first `;`.
pub(crate) fn extract_auth_cookie(header: &str) -> Option<String> {
    let marker = header.find(COOKIE_MARKER)?;
    let start = header[..marker]
        .char_indices()
        .next_back()
        .map_or(marker, |(i, _)| i);
    let rest = &header[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_http_cookie() {
        assert_eq!(
            extract_auth_cookie("bauth=abc123; Path=/; HttpOnly").as_deref(),
            Some("bauth=abc123")
        );
    }

    #[test]
    fn tls_cookie_without_attributes() {
        assert_eq!(extract_auth_cookie("pauth=xyz").as_deref(), Some("pauth=xyz"));
    }

    #[test]
    fn marker_at_start_has_no_prefix() {
        assert_eq!(extract_auth_cookie("auth=1; Secure").as_deref(), Some("auth=1"));
    }

    #[test]
    fn unrelated_cookie_is_ignored() {
        assert!(extract_auth_cookie("lang=en; Path=/").is_none());
    }
}
