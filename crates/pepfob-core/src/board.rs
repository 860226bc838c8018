// ── Board collaborator ──
//
// Everything the orchestrator needs from the hardware: radio control,
// the buzzer, power, battery and identity. The firmware target and the
// terminal simulator each provide one.

use std::future::Future;

use secrecy::SecretString;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
pub enum WifiMode {
    #[default]
    Off,
    Station,
    #[strum(serialize = "Access Point")]
    AccessPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
pub enum WifiStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub ssid: String,
    pub rssi: i32,
    pub secured: bool,
}

pub trait Board: Send + Sync + 'static {
    fn wifi_mode(&self) -> WifiMode;
    fn wifi_status(&self) -> WifiStatus;
    /// Local address while connected as a station.
    fn wifi_ip(&self) -> Option<String>;

    /// Begin joining `ssid`. Progress shows up in `wifi_status`.
    fn start_station(&self, ssid: &str, password: &SecretString);
    fn start_access_point(&self, ssid: &str, password: &SecretString);
    fn stop_wifi(&self);

    fn scan(&self) -> impl Future<Output = Vec<ScanResult>> + Send;
    /// `true` when `target` answered.
    fn ping(&self, target: &str) -> impl Future<Output = bool> + Send;

    fn beep(&self);
    fn power_off(&self);
    fn restart(&self);

    fn battery_percent(&self) -> Option<u8>;
    fn hardware_id(&self) -> String;
}
