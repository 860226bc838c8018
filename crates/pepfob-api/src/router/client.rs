// Router API HTTP client
//
// Wraps `reqwest::Client` with router URL construction, credential
// attachment, and envelope classification. Endpoint groups (login,
// clients, status) are implemented as inherent methods in sibling files
// so this module stays focused on transport mechanics.

use reqwest::Method;
use reqwest::header::COOKIE;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::AuthContext;
use crate::error::Error;
use crate::router::models::Envelope;
use crate::transport::TransportConfig;

/// Envelope message the router pairs with code 401 for a dead admin cookie.
pub(crate) const MSG_UNAUTHORIZED: &str = "Unauthorized";
/// Envelope message the router pairs with code 401 for a dead access token.
pub(crate) const MSG_INVALID_TOKEN: &str = "Invalid access token";

/// Raw HTTP client for the router's JSON API.
///
/// Stateless per call: credentials are passed in through an
/// [`AuthContext`] on every request, and every method returns the
/// unwrapped `response` payload of the `{stat, code, message, response}`
/// envelope.
pub struct RouterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RouterClient {
    /// Create a router client from a `TransportConfig`.
    ///
    /// `base_url` is the router root, e.g. `http://192.168.50.1:88`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a router client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The router base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path such as `/api/status.traffic`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue a request and unwrap the envelope.
    ///
    /// GETs carry the access token in the `accessToken` query parameter
    /// (empty when none is held); admin POSTs authenticate by cookie
    /// alone. The admin cookie, when present, rides the `Cookie` header. HTTP status codes are ignored: the router reports
    /// failures in the envelope, so the body is always parsed.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        auth: &AuthContext,
    ) -> Result<Value, Error> {
        let mut url = self.api_url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            if method == Method::GET {
                pairs.append_pair("accessToken", auth.token_param());
            }
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        debug!("{} {}", method, redact_token(&url));

        let mut builder = self.http.request(method, url);
        if let Some(cookie) = auth.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(len = body.len(), "router response");

        parse_envelope(&body).and_then(classify)
    }

    /// Send a GET request and unwrap the envelope.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth: &AuthContext,
    ) -> Result<Value, Error> {
        self.request(Method::GET, path, query, None, auth).await
    }

    /// Send a POST request with a JSON body and unwrap the envelope.
    pub async fn post(&self, path: &str, body: &Value, auth: &AuthContext) -> Result<Value, Error> {
        self.request(Method::POST, path, &[], Some(body), auth).await
    }

    /// Check whether the router answers HTTP at all.
    ///
    /// Makes up to `attempts` GETs against the base URL; any HTTP
    /// response (whatever its status) counts as reachable.
    pub async fn probe(&self, attempts: u32) -> bool {
        for attempt in 1..=attempts.max(1) {
            match self.http.get(self.base_url.clone()).send().await {
                Ok(resp) => {
                    trace!(status = %resp.status(), attempt, "router answered probe");
                    return true;
                }
                Err(e) => debug!(attempt, error = %e, "router probe failed"),
            }
        }
        false
    }
}

// ── Envelope handling ────────────────────────────────────────────────

pub(crate) fn parse_envelope(body: &str) -> Result<Envelope, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

/// Map a decoded envelope to its payload or a typed failure.
pub(crate) fn classify(envelope: Envelope) -> Result<Value, Error> {
    if envelope.stat == "ok" {
        return Ok(envelope.response);
    }

    let code = envelope.code.unwrap_or_default();
    let message = envelope.message.unwrap_or_default();
    Err(match (code, message.as_str()) {
        (401, MSG_UNAUTHORIZED) => Error::SessionExpired,
        (401, MSG_INVALID_TOKEN) => Error::InvalidAccessToken,
        _ => Error::Rejected { code, message },
    })
}

/// Strip the token value from a URL before it reaches the logs.
fn redact_token(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "accessToken" && !v.is_empty() {
                "***".to_owned()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ok_envelope_yields_response() {
        let out = classify(envelope(json!({"stat": "ok", "response": {"a": 1}}))).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn unauthorized_and_invalid_token_are_distinct() {
        let expired = classify(envelope(
            json!({"stat": "fail", "code": 401, "message": "Unauthorized"}),
        ));
        assert!(matches!(expired, Err(Error::SessionExpired)));

        let token = classify(envelope(
            json!({"stat": "fail", "code": 401, "message": "Invalid access token"}),
        ));
        assert!(matches!(token, Err(Error::InvalidAccessToken)));
    }

    #[test]
    fn other_failures_keep_code_and_message() {
        let err = classify(envelope(
            json!({"stat": "fail", "code": 400, "message": "Invalid client"}),
        ))
        .unwrap_err();
        assert_eq!(err.api_error_code(), Some(400));
        assert!(err.to_string().contains("Invalid client"));
    }

    #[test]
    fn malformed_body_is_a_deserialization_error() {
        let err = parse_envelope("<html>").unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn token_is_redacted_in_logs() {
        let url = Url::parse("http://r/api/x?accessToken=secret&id=2").unwrap();
        let shown = redact_token(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("id=2"));
    }
}
