// ── Router-side records ──

use pepfob_api::ClientScope;
use secrecy::SecretString;
use serde::Serialize;

/// An API client registered on the router.
///
/// Identity is the router-assigned `id`; several records may share a name.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub name: String,
    pub id: String,
    pub secret: SecretString,
    /// Token granted to this client, if any.
    pub token: Option<SecretString>,
    pub token_expiry_secs: u64,
    pub scope: ClientScope,
}

/// Identity and uptime of the router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterInfo {
    pub name: String,
    pub uptime_secs: u64,
    pub serial: String,
    pub firmware: String,
    pub product_code: String,
    pub hardware_revision: String,
}

/// GPS fix reported by the router, kept as the router formats it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterLocation {
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
}

impl RouterLocation {
    /// A router without a GPS fix reports empty coordinates.
    pub fn has_fix(&self) -> bool {
        !self.latitude.is_empty() && !self.longitude.is_empty()
    }
}
