// Router API response types
//
// Models for the router's JSON API. Every response is wrapped in the
// `Envelope`. Fields use `#[serde(default)]` liberally because the router
// omits most fields for disabled links and across firmware versions.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

// ── Response Envelope ────────────────────────────────────────────────

/// Uniform router response wrapper.
///
/// ```json
/// { "stat": "ok", "response": { ... } }
/// { "stat": "fail", "code": 401, "message": "Invalid access token" }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub stat: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response: serde_json::Value,
}

// ── Lenient scalars ──────────────────────────────────────────────────

/// Accept a string, a number, a bool or null and produce a string.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accept an integer, a float or a numeric string and produce a `u64`.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    #[allow(clippy::as_conversions, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let parsed = match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_default())
}

// ── Login ────────────────────────────────────────────────────────────

/// Payload of a successful `/api/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub permission: Option<Permission>,
}

/// HTTP-verb permissions granted to the admin account (1 = allowed).
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Permission {
    #[serde(rename = "GET", default)]
    pub get: i64,
    #[serde(rename = "POST", default)]
    pub post: i64,
}

impl Permission {
    pub fn allows_get(self) -> bool {
        self.get == 1
    }

    pub fn allows_post(self) -> bool {
        self.post == 1
    }
}

// ── API clients ──────────────────────────────────────────────────────

/// An API client as returned by `auth.client` list/add calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiClient {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "clientId", default, deserialize_with = "lenient_string")]
    pub client_id: String,
    #[serde(rename = "clientSecret", default, deserialize_with = "lenient_string")]
    pub client_secret: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scope: String,
}

/// Result of `auth.token.grant`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(rename = "accessToken", default, deserialize_with = "lenient_string")]
    pub access_token: String,
    #[serde(rename = "expiresIn", default, deserialize_with = "lenient_u64")]
    pub expires_in: u64,
}

// ── System info & location ───────────────────────────────────────────

/// Payload of `/api/status.system.info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfoResponse {
    #[serde(default)]
    pub device: DeviceInfo,
    #[serde(default)]
    pub uptime: Uptime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "serialNumber", default, deserialize_with = "lenient_string")]
    pub serial_number: String,
    #[serde(rename = "firmwareVersion", default, deserialize_with = "lenient_string")]
    pub firmware_version: String,
    #[serde(rename = "productCode", default, deserialize_with = "lenient_string")]
    pub product_code: String,
    #[serde(rename = "hardwareRevision", default, deserialize_with = "lenient_string")]
    pub hardware_revision: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Uptime {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub second: u64,
}

/// Payload of `/api/info.location`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationResponse {
    #[serde(default)]
    pub location: GpsFix,
}

/// Coordinates are kept as the router formats them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpsFix {
    #[serde(default, deserialize_with = "lenient_string")]
    pub latitude: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub longitude: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub altitude: String,
}

// ── WAN connection status ────────────────────────────────────────────

/// Payload of `/api/status.wan.connection`.
///
/// `order` lists WAN ids; each WAN object sits under its id as a string
/// key (`"1"`, `"2"`, ...). The objects are heterogeneous by `type`, so
/// they are kept raw and decoded one at a time by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanConnectionStatus {
    #[serde(default)]
    pub order: Vec<u8>,
    #[serde(flatten)]
    pub entries: HashMap<String, serde_json::Value>,
}

impl WanConnectionStatus {
    /// Iterate WAN descriptors in router order, decoding each independently.
    /// Ids listed in `order` with no matching object are skipped.
    pub fn links(&self) -> impl Iterator<Item = (u8, Result<RawWan, Error>)> + '_ {
        self.order.iter().filter_map(|id| {
            let value = self.entries.get(&id.to_string())?;
            let decoded = serde_json::from_value::<RawWan>(value.clone()).map_err(|e| {
                Error::Deserialization {
                    message: format!("WAN {id}: {e}"),
                    body: value.to_string(),
                }
            });
            Some((*id, decoded))
        })
    }
}

/// One WAN descriptor, with every type-specific block optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWan {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Human-readable connection status ("Connected", "Disabled", ...).
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(rename = "statusLed", default, deserialize_with = "lenient_string")]
    pub status_led: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub priority: u64,
    #[serde(rename = "managementOnly", default)]
    pub management_only: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default)]
    pub cellular: Option<RawCellular>,
    #[serde(default)]
    pub signal: Option<RawSignal>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ssid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bssid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCellular {
    #[serde(rename = "signalLevel", default, deserialize_with = "lenient_u64")]
    pub signal_level: u64,
    /// Radio access technology ("LTE", "5G", ...).
    #[serde(default, deserialize_with = "lenient_string")]
    pub network: String,
    #[serde(default)]
    pub carrier: Option<RawCarrier>,
    #[serde(default)]
    pub sim: Option<RawSimTable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCarrier {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

/// Ordered SIM slots, keyed like the WAN table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSimTable {
    #[serde(default)]
    pub order: Vec<u8>,
    #[serde(flatten)]
    pub slots: HashMap<String, serde_json::Value>,
}

impl RawSimTable {
    /// SIM slots in router order. Undecodable or missing slots come back
    /// as an all-default (not detected) slot so positions stay stable.
    pub fn slots(&self) -> impl Iterator<Item = (u8, RawSim)> + '_ {
        self.order.iter().map(|id| {
            let sim = self
                .slots
                .get(&id.to_string())
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            (*id, sim)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSim {
    #[serde(rename = "simCardDetected", default)]
    pub detected: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub iccid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub strength: i64,
}

// ── Traffic ──────────────────────────────────────────────────────────

/// Payload of `/api/status.traffic`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrafficResponse {
    #[serde(default)]
    pub bandwidth: BandwidthTable,
}

/// Per-WAN bandwidth counters keyed by WAN id, plus a shared unit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandwidthTable {
    #[serde(default)]
    pub order: Vec<u8>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(flatten)]
    pub entries: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBandwidth {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub overall: RawRates,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRates {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub download: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub upload: u64,
}

impl BandwidthTable {
    /// Bandwidth entries in router order. Entries that fail to decode are
    /// skipped.
    pub fn entries(&self) -> impl Iterator<Item = (u8, RawBandwidth)> + '_ {
        self.order.iter().filter_map(|id| {
            let value = self.entries.get(&id.to_string())?;
            serde_json::from_value(value.clone()).ok().map(|bw| (*id, bw))
        })
    }
}
