// API client provisioning and token grant
//
// Admin-scoped endpoints: they need the session cookie, and the router
// rejects them with 401 / "Unauthorized" once that cookie has expired.

use serde_json::{Value, json};
use tracing::debug;

use crate::auth::{AuthContext, ClientScope};
use crate::error::Error;
use crate::router::client::RouterClient;
use crate::router::models::{ApiClient, TokenGrant};
use crate::router::{decode, paths};

impl RouterClient {
    /// List the API clients registered on the router.
    ///
    /// `GET /api/auth.client`
    pub async fn list_clients(&self, auth: &AuthContext) -> Result<Vec<ApiClient>, Error> {
        let payload = self.get(paths::AUTH_CLIENT, &[], auth).await?;
        if payload.is_null() {
            return Ok(Vec::new());
        }
        decode(payload)
    }

    /// Register a new API client.
    ///
    /// `POST /api/auth.client` with `{action: "add", name, scope}`.
    pub async fn add_client(
        &self,
        name: &str,
        scope: ClientScope,
        auth: &AuthContext,
    ) -> Result<ApiClient, Error> {
        debug!(name, scope = %scope, "adding API client");
        let body = json!({
            "action": "add",
            "name": name,
            "scope": scope.as_wire(),
        });
        decode(self.post(paths::AUTH_CLIENT, &body, auth).await?)
    }

    /// Remove an API client by id.
    ///
    /// `POST /api/auth.client` with `{action: "remove", clientId}`.
    pub async fn remove_client(&self, client_id: &str, auth: &AuthContext) -> Result<(), Error> {
        debug!(client_id, "removing API client");
        let body = json!({
            "action": "remove",
            "clientId": client_id,
        });
        let _: Value = self.post(paths::AUTH_CLIENT, &body, auth).await?;
        Ok(())
    }

    /// Exchange a client's id and secret for an access token.
    ///
    /// `POST /api/auth.token.grant` with `{clientId, clientSecret}`.
    pub async fn grant_token(
        &self,
        client_id: &str,
        client_secret: &str,
        auth: &AuthContext,
    ) -> Result<TokenGrant, Error> {
        debug!(client_id, "requesting access token");
        let body = json!({
            "clientId": client_id,
            "clientSecret": client_secret,
        });
        let grant: TokenGrant = decode(self.post(paths::TOKEN_GRANT, &body, auth).await?)?;
        if grant.access_token.is_empty() {
            return Err(Error::Deserialization {
                message: "token grant carried no accessToken".into(),
                body: String::new(),
            });
        }
        Ok(grant)
    }
}
