// ── Router session lifecycle ──
//
// Owns the admin cookie, the API client registry and the active access
// token. All session state sits behind one async mutex that is held for
// the whole of each operation, so a token refresh can never interleave
// with a login or a fetch from another worker.

use std::sync::Arc;

use pepfob_api::models::{LocationResponse, SystemInfoResponse};
use pepfob_api::{AuthContext, ClientScope, Method, RouterClient, decode, paths};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{PurgePolicy, RouterConfig};
use crate::error::CoreError;
use crate::model::{ClientRecord, RouterInfo, RouterLocation};
use crate::store::{CredentialJar, CredentialStore, JAR_NAMESPACE};

/// Admin login credentials, kept for implicit re-login.
struct Credentials {
    username: String,
    password: SecretString,
}

struct SessionState {
    cookie: Option<SecretString>,
    token: Option<SecretString>,
    clients: Vec<ClientRecord>,
    credentials: Credentials,
}

impl SessionState {
    fn auth(&self) -> AuthContext {
        AuthContext::new(self.cookie.clone(), self.token.clone())
    }
}

/// Router session and credential manager.
///
/// Cheap to share behind an `Arc`: every worker that talks to the router
/// goes through the same instance.
pub struct SessionManager {
    client: RouterClient,
    store: Arc<dyn CredentialStore>,
    client_name: String,
    client_scope: ClientScope,
    force_recreate: bool,
    probe_attempts: u32,
    purge: PurgePolicy,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Build a manager for `config`, restoring any persisted cookie and
    /// token from `store`.
    pub fn new(config: &RouterConfig, store: Arc<dyn CredentialStore>) -> Result<Self, CoreError> {
        let client = RouterClient::new(config.url.clone(), &config.transport())?;
        Ok(Self::with_client(client, config, store))
    }

    /// Build a manager around a pre-built `RouterClient`.
    pub fn with_client(
        client: RouterClient,
        config: &RouterConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let jar = load_jar(store.as_ref());
        Self {
            client,
            store,
            client_name: config.client_name.clone(),
            client_scope: config.client_scope,
            force_recreate: config.force_recreate_clients,
            probe_attempts: config.probe_attempts,
            purge: config.purge,
            state: Mutex::new(SessionState {
                cookie: jar.cookie,
                token: jar.token,
                clients: Vec::new(),
                credentials: Credentials {
                    username: config.username.clone(),
                    password: config.password.clone(),
                },
            }),
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub async fn has_cookie(&self) -> bool {
        self.state.lock().await.cookie.is_some()
    }

    pub async fn has_token(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// The locally known API clients, as of the last list/create/delete.
    pub async fn clients(&self) -> Vec<ClientRecord> {
        self.state.lock().await.clients.clone()
    }

    /// Whether bootstrap recreates clients instead of reusing one.
    pub fn force_recreate(&self) -> bool {
        self.force_recreate
    }

    /// Fixed-attempt reachability check. Any HTTP answer counts.
    pub async fn probe(&self) -> bool {
        self.client.probe(self.probe_attempts).await
    }

    // ── Public operations ────────────────────────────────────────────

    /// Log in with new admin credentials. They become the credentials
    /// used for implicit re-login.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, CoreError> {
        let mut state = self.state.lock().await;
        state.credentials = Credentials {
            username: username.to_owned(),
            password: password.clone(),
        };
        self.login_locked(&mut state).await
    }

    /// Idempotent bootstrap: reachable router, valid cookie, usable token.
    ///
    /// A cached cookie and token are reused as-is. Without a token the
    /// first existing client is granted one, falling back to deleting
    /// every client and provisioning a fresh one. `force_recreate_clients`
    /// skips the reuse step.
    pub async fn ensure_session(&self, force_recreate_clients: bool) -> Result<SecretString, CoreError> {
        if !self.probe().await {
            return Err(CoreError::Unreachable {
                reason: format!("no answer from {}", self.client.base_url()),
            });
        }

        let mut state = self.state.lock().await;
        let mut cookie = match state.cookie.clone() {
            Some(cookie) => cookie,
            None => self.login_locked(&mut state).await?,
        };

        if state.token.is_some() {
            debug!("reusing cached access token");
            return Ok(cookie);
        }

        if let Err(e) = self.list_clients_locked(&mut state).await {
            if !matches!(e, CoreError::SessionExpired { .. }) {
                return Err(e);
            }
            warn!("cached admin cookie rejected, logging in again");
            cookie = self.login_locked(&mut state).await?;
            self.list_clients_locked(&mut state).await?;
        }
        if force_recreate_clients {
            info!("recreating API clients");
            self.recreate_locked(&mut state).await?;
            return Ok(cookie);
        }

        match state.clients.first().cloned() {
            Some(first) => {
                if let Err(e) = self.grant_locked(&mut state, &first.id, &first.secret).await {
                    warn!(client_id = %first.id, error = %e, "grant failed, recreating clients");
                    self.recreate_locked(&mut state).await?;
                }
            }
            None => {
                self.create_client_locked(&mut state, &self.client_name, self.client_scope)
                    .await?;
            }
        }
        Ok(cookie)
    }

    /// Replace the local client list with the router's.
    pub async fn list_clients(&self) -> Result<Vec<ClientRecord>, CoreError> {
        let mut state = self.state.lock().await;
        match self.list_clients_locked(&mut state).await {
            Ok(()) => Ok(state.clients.clone()),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    /// Provision a client and grant it a token.
    pub async fn create_client(&self, name: &str, scope: ClientScope) -> Result<ClientRecord, CoreError> {
        let mut state = self.state.lock().await;
        match self.create_client_locked(&mut state, name, scope).await {
            Ok(record) => Ok(record),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    pub async fn delete_client(&self, id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        match self.delete_client_locked(&mut state, id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    /// Delete every client on the router, re-listing between deletions.
    pub async fn delete_all_clients(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let result = match self.list_clients_locked(&mut state).await {
            Ok(()) => self.delete_all_locked(&mut state).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    /// Grant a token to a known client and make it the active token.
    pub async fn grant_token(&self, client_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let secret = state
            .clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.secret.clone())
            .ok_or(CoreError::NoClient)?;
        match self.grant_locked(&mut state, client_id, &secret).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    /// Drop the active token and provision a fresh client in place of all
    /// existing ones.
    pub async fn refresh_token(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        match self.refresh_locked(&mut state).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.recover(&mut state, e).await),
        }
    }

    /// The single authenticated I/O chokepoint.
    ///
    /// A 401 triggers in-band recovery (re-login for a dead cookie, token
    /// refresh for a dead token) but the call itself still fails; the
    /// returned error's [`CoreError::retry_ready`] says whether an
    /// immediate retry should succeed.
    pub async fn send_authenticated(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, CoreError> {
        let mut state = self.state.lock().await;
        let auth = state.auth();
        match self.client.request(method, path, query, body, &auth).await {
            Ok(payload) => Ok(payload),
            Err(e) => Err(self.recover(&mut state, e.into()).await),
        }
    }

    /// Router identity and uptime.
    pub async fn system_info(&self) -> Result<RouterInfo, CoreError> {
        let payload = self
            .send_authenticated(Method::GET, paths::SYSTEM_INFO, &[], None)
            .await?;
        Ok(decode::<SystemInfoResponse>(payload)?.into())
    }

    /// Router GPS location.
    pub async fn location(&self) -> Result<RouterLocation, CoreError> {
        let payload = self
            .send_authenticated(Method::GET, paths::LOCATION, &[], None)
            .await?;
        Ok(decode::<LocationResponse>(payload)?.into())
    }

    /// Forget the session and erase the persisted jar (factory reset).
    pub async fn forget(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        state.cookie = None;
        state.token = None;
        state.clients.clear();
        self.store.erase(JAR_NAMESPACE)
    }

    // ── Recovery ─────────────────────────────────────────────────────

    /// Run the in-band recovery matching `err` and report its outcome.
    async fn recover(&self, state: &mut SessionState, err: CoreError) -> CoreError {
        match err {
            CoreError::SessionExpired { .. } => {
                warn!("admin session expired, logging in again");
                state.cookie = None;
                let recovered = match self.login_locked(state).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(error = %e, "re-login failed");
                        false
                    }
                };
                CoreError::SessionExpired { recovered }
            }
            CoreError::TokenExpiredOrInvalid { .. } => {
                warn!("access token rejected, refreshing");
                let recovered = match self.refresh_locked(state).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "token refresh failed");
                        false
                    }
                };
                CoreError::TokenExpiredOrInvalid { recovered }
            }
            other => other,
        }
    }

    // ── Locked operations ────────────────────────────────────────────
    //
    // These run with the state lock held and never recover on their own,
    // so a refresh cannot recurse into another refresh.

    async fn login_locked(&self, state: &mut SessionState) -> Result<SecretString, CoreError> {
        let cookie = self
            .client
            .login(&state.credentials.username, &state.credentials.password)
            .await?;
        info!(user = %state.credentials.username, "logged in to router");
        state.cookie = Some(cookie.clone());
        self.persist(state);
        Ok(cookie)
    }

    fn require_cookie(state: &SessionState) -> Result<(), CoreError> {
        if state.cookie.is_some() {
            Ok(())
        } else {
            Err(CoreError::NotLoggedIn)
        }
    }

    async fn list_clients_locked(&self, state: &mut SessionState) -> Result<(), CoreError> {
        let listed = self.client.list_clients(&state.auth()).await?;
        state.clients = listed.into_iter().map(ClientRecord::from).collect();
        debug!(count = state.clients.len(), "listed API clients");
        Ok(())
    }

    async fn create_client_locked(
        &self,
        state: &mut SessionState,
        name: &str,
        scope: ClientScope,
    ) -> Result<ClientRecord, CoreError> {
        Self::require_cookie(state)?;
        let created: ClientRecord = self
            .client
            .add_client(name, scope, &state.auth())
            .await?
            .into();
        info!(client_id = %created.id, name, "created API client");
        state.clients.push(created.clone());
        self.grant_locked(state, &created.id, &created.secret).await?;
        Ok(state
            .clients
            .iter()
            .find(|c| c.id == created.id)
            .cloned()
            .unwrap_or(created))
    }

    async fn delete_client_locked(&self, state: &mut SessionState, id: &str) -> Result<(), CoreError> {
        Self::require_cookie(state)?;
        self.client.remove_client(id, &state.auth()).await?;
        state.clients.retain(|c| c.id != id);
        info!(client_id = id, "deleted API client");
        Ok(())
    }

    async fn delete_all_locked(&self, state: &mut SessionState) -> Result<(), CoreError> {
        let mut attempt = 0;
        loop {
            let Some(first) = state.clients.first().map(|c| c.id.clone()) else {
                return Ok(());
            };
            if attempt >= self.purge.max_attempts {
                return Err(CoreError::ApiRejected {
                    code: None,
                    message: format!(
                        "{} API clients left after {attempt} delete attempts",
                        state.clients.len()
                    ),
                });
            }

            if let Err(e) = self.delete_client_locked(state, &first).await {
                if matches!(e, CoreError::NotLoggedIn | CoreError::SessionExpired { .. }) {
                    return Err(e);
                }
                warn!(client_id = %first, error = %e, "client delete failed");
            }
            self.list_clients_locked(state).await?;

            if !state.clients.is_empty() {
                let pause = self.purge.delay_for(attempt);
                debug!(remaining = state.clients.len(), ?pause, "waiting before next delete");
                tokio::time::sleep(pause).await;
            }
            attempt += 1;
        }
    }

    async fn recreate_locked(&self, state: &mut SessionState) -> Result<(), CoreError> {
        self.delete_all_locked(state).await?;
        self.create_client_locked(state, &self.client_name, self.client_scope)
            .await?;
        Ok(())
    }

    async fn grant_locked(
        &self,
        state: &mut SessionState,
        client_id: &str,
        secret: &SecretString,
    ) -> Result<(), CoreError> {
        Self::require_cookie(state)?;
        let grant = self
            .client
            .grant_token(client_id, secret.expose_secret(), &state.auth())
            .await?;
        let token = SecretString::from(grant.access_token);
        if let Some(record) = state.clients.iter_mut().find(|c| c.id == client_id) {
            record.token = Some(token.clone());
            record.token_expiry_secs = grant.expires_in;
        }
        state.token = Some(token);
        info!(client_id, expires_in = grant.expires_in, "access token granted");
        self.persist(state);
        Ok(())
    }

    async fn refresh_locked(&self, state: &mut SessionState) -> Result<(), CoreError> {
        state.token = None;
        self.persist(state);

        self.list_clients_locked(state).await?;
        if !state.clients.is_empty() {
            self.delete_all_locked(state).await?;
        }
        self.create_client_locked(state, &self.client_name, self.client_scope)
            .await?;
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────────

    fn persist(&self, state: &SessionState) {
        let jar = CredentialJar {
            cookie: state.cookie.clone(),
            token: state.token.clone(),
        };
        let saved = jar
            .encode()
            .map_err(|e| CoreError::Store {
                message: e.to_string(),
            })
            .and_then(|bytes| self.store.save(JAR_NAMESPACE, &bytes));
        if let Err(e) = saved {
            warn!(error = %e, "could not persist credential jar");
        }
    }
}

/// Best-effort jar restore: anything unreadable counts as empty.
fn load_jar(store: &dyn CredentialStore) -> CredentialJar {
    match store.load(JAR_NAMESPACE) {
        Ok(Some(bytes)) => CredentialJar::decode(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring corrupt credential jar");
            CredentialJar::default()
        }),
        Ok(None) => CredentialJar::default(),
        Err(e) => {
            warn!(error = %e, "could not read credential jar");
            CredentialJar::default()
        }
    }
}
