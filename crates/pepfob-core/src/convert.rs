// ── API-to-domain type conversions ──
//
// Bridges raw `pepfob_api` response types into canonical
// `pepfob_core::model` types. Disabled WANs keep only their headline
// fields; everything else is filled from the payload only when the link
// is enabled.

use pepfob_api::ClientScope;
use pepfob_api::models::{
    ApiClient, LocationResponse, RawCellular, RawWan, SystemInfoResponse, WanConnectionStatus,
};
use secrecy::SecretString;
use tracing::warn;

use crate::error::CoreError;
use crate::model::wan::STATUS_DISABLED;
use crate::model::{
    CellularLink, ClientRecord, LedColor, RouterInfo, RouterLocation, SimSlot, WanKind, WanLink,
    WifiLink, order_by_priority,
};

// ── Helpers ────────────────────────────────────────────────────────

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn saturate_u8(v: u64) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

// ── WAN ────────────────────────────────────────────────────────────

fn cellular_from_raw(raw: Option<RawCellular>, enabled: bool) -> CellularLink {
    let Some(raw) = raw else {
        return CellularLink::default();
    };

    let mut link = CellularLink {
        carrier: None,
        network_type: raw.network,
        signal_level: saturate_u8(raw.signal_level),
        sim_cards: Vec::new(),
    };
    if !enabled {
        return link;
    }

    link.carrier = raw.carrier.and_then(|c| non_empty(c.name));
    if let Some(table) = raw.sim {
        link.sim_cards = table
            .slots()
            .map(|(_, sim)| {
                if sim.detected {
                    SimSlot {
                        detected: true,
                        active: sim.active,
                        iccid: non_empty(sim.iccid),
                    }
                } else {
                    SimSlot::default()
                }
            })
            .collect();
    }
    link
}

/// Convert one raw WAN descriptor, dispatching on its `type`.
pub fn wan_from_raw(id: u8, raw: RawWan) -> Result<WanLink, CoreError> {
    let enabled = raw.message != STATUS_DISABLED;

    let kind = match raw.kind.as_str() {
        "ethernet" => WanKind::Ethernet,
        "cellular" => WanKind::Cellular(cellular_from_raw(raw.cellular, enabled)),
        "wifi" => WanKind::WiFi(if enabled {
            WifiLink {
                ssid: non_empty(raw.ssid),
                bssid: non_empty(raw.bssid),
                strength: raw.signal.map(|s| s.strength),
            }
        } else {
            WifiLink::default()
        }),
        other => {
            return Err(CoreError::UnsupportedWanType {
                id,
                kind: other.to_owned(),
            });
        }
    };

    Ok(WanLink {
        id,
        name: raw.name,
        ip: if enabled { non_empty(raw.ip) } else { None },
        status: raw.message,
        status_led: LedColor::from_wire(&raw.status_led),
        priority: saturate_u32(raw.priority),
        management_only: raw.management_only,
        upload: 0,
        download: 0,
        unit: String::new(),
        kind,
    })
}

/// Build the ordered WAN list from a connection-status payload.
///
/// Undecodable or unsupported entries and entries without a name are
/// skipped; the rest are ordered by priority.
pub fn wan_links(status: &WanConnectionStatus) -> Vec<WanLink> {
    let mut links: Vec<WanLink> = status
        .links()
        .filter_map(|(id, raw)| {
            let converted = raw.map_err(CoreError::from).and_then(|raw| wan_from_raw(id, raw));
            match converted {
                Ok(link) if link.name.is_empty() => {
                    warn!(wan_id = id, "discarding WAN without a name");
                    None
                }
                Ok(link) => Some(link),
                Err(e) => {
                    warn!(wan_id = id, error = %e, "skipping WAN entry");
                    None
                }
            }
        })
        .collect();
    order_by_priority(&mut links);
    links
}

// ── Clients ────────────────────────────────────────────────────────

impl From<ApiClient> for ClientRecord {
    fn from(c: ApiClient) -> Self {
        Self {
            scope: ClientScope::from_wire(&c.scope),
            name: c.name,
            id: c.client_id,
            secret: SecretString::from(c.client_secret),
            token: None,
            token_expiry_secs: 0,
        }
    }
}

// ── Router info ────────────────────────────────────────────────────

impl From<SystemInfoResponse> for RouterInfo {
    fn from(r: SystemInfoResponse) -> Self {
        Self {
            name: r.device.name,
            uptime_secs: r.uptime.second,
            serial: r.device.serial_number,
            firmware: r.device.firmware_version,
            product_code: r.device.product_code,
            hardware_revision: r.device.hardware_revision,
        }
    }
}

impl From<LocationResponse> for RouterLocation {
    fn from(r: LocationResponse) -> Self {
        Self {
            latitude: r.location.latitude,
            longitude: r.location.longitude,
            altitude: r.location.altitude,
        }
    }
}
