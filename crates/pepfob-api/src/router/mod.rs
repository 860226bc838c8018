// Router administrative API
//
// `RouterClient` transport plus endpoint groups. Status endpoints have no
// typed helpers here: they are fetched through the session layer (which
// owns recovery) and decoded with [`decode`] into the models below.

pub mod client;
pub mod clients;
pub mod login;
pub mod models;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

pub use client::RouterClient;

/// Endpoint paths, relative to the router root.
pub mod paths {
    pub const LOGIN: &str = "/api/login";
    pub const AUTH_CLIENT: &str = "/api/auth.client";
    pub const TOKEN_GRANT: &str = "/api/auth.token.grant";
    pub const WAN_CONNECTION: &str = "/api/status.wan.connection";
    pub const TRAFFIC: &str = "/api/status.traffic";
    pub const SYSTEM_INFO: &str = "/api/status.system.info";
    pub const LOCATION: &str = "/api/info.location";
}

/// Query for a WAN-scoped status call. Id 0 means "all WANs" and sends no
/// `id` parameter.
pub fn wan_query(id: u8) -> Vec<(&'static str, String)> {
    if id == 0 {
        Vec::new()
    } else {
        vec![("id", id.to_string())]
    }
}

/// Decode an envelope payload into a typed model.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, Error> {
    serde_json::from_value(payload.clone()).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: payload.to_string(),
    })
}
