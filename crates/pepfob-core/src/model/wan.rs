// ── WAN domain types ──

use serde::Serialize;

/// Connection status string the router reports for a switched-off WAN.
pub const STATUS_DISABLED: &str = "Disabled";

/// Status LED colour the router attaches to each WAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedColor {
    Green,
    Yellow,
    Red,
    Gray,
    #[default]
    Unknown,
}

impl LedColor {
    pub fn from_wire(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "green" => Self::Green,
            "yellow" | "orange" => Self::Yellow,
            "red" => Self::Red,
            "gray" | "grey" | "empty" => Self::Gray,
            _ => Self::Unknown,
        }
    }
}

/// One SIM slot of a cellular WAN. `active` and `iccid` are only
/// meaningful when `detected` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimSlot {
    pub detected: bool,
    pub active: bool,
    pub iccid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellularLink {
    pub carrier: Option<String>,
    /// Radio access technology ("LTE", "5G", ...).
    pub network_type: String,
    pub signal_level: u8,
    pub sim_cards: Vec<SimSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WifiLink {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub strength: Option<i64>,
}

/// Type-specific part of a WAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::Display)]
#[serde(tag = "type", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WanKind {
    Ethernet,
    Cellular(CellularLink),
    #[strum(serialize = "wifi")]
    WiFi(WifiLink),
}

/// A router uplink with its health and live rates.
///
/// Only `name`, `status`, `status_led`, `priority` and `management_only`
/// are populated for a disabled WAN; everything else stays at its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WanLink {
    /// Router-assigned id, stable across polls.
    pub id: u8,
    pub name: String,
    pub ip: Option<String>,
    pub status: String,
    pub status_led: LedColor,
    /// Lower wins; 0 means unset and sorts last.
    pub priority: u32,
    pub management_only: bool,
    pub upload: u64,
    pub download: u64,
    pub unit: String,
    pub kind: WanKind,
}

impl WanLink {
    pub fn is_disabled(&self) -> bool {
        self.status == STATUS_DISABLED
    }

    pub fn cellular(&self) -> Option<&CellularLink> {
        match &self.kind {
            WanKind::Cellular(c) => Some(c),
            _ => None,
        }
    }
}

/// Stable sort by ascending priority with unset (0) priorities last.
pub fn order_by_priority(links: &mut [WanLink]) {
    links.sort_by_key(|l| (l.priority == 0, l.priority));
}
